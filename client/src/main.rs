use clap::Parser;
use client::input::InputPattern;
use client::network::{Client, ClientOptions};
use log::info;
use shared::{NetConfig, NetConfigArgs};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Fraction of inputs to drop on purpose (0.0 - 1.0)
    #[arg(long, default_value = "0.0")]
    packet_loss: f64,

    /// Movement pattern to drive the local player with
    #[arg(short = 'p', long, value_enum, default_value = "circle")]
    pattern: InputPattern,

    /// Stop after this many seconds
    #[arg(short = 'd', long)]
    duration: Option<u64>,

    #[command(flatten)]
    net: NetConfigArgs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = NetConfig::from(args.net);

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }
    if args.packet_loss > 0.0 {
        info!("Dropping {:.0}% of inputs", args.packet_loss * 100.0);
    }
    info!(
        "Tick rate {}Hz, snapshots every {} server steps, interpolation {}",
        config.tick_rate,
        config.broadcast_interval(),
        config.interpolation_enabled
    );

    let options = ClientOptions {
        server_addr: args.server,
        fake_ping_ms: args.fake_ping,
        packet_loss: args.packet_loss,
        pattern: args.pattern,
        run_for: args.duration.map(Duration::from_secs),
    };

    let mut client = Client::new(options, config).await?;

    client.run().await?;

    Ok(())
}
