use clap::Parser;
use log::info;
use server::network::Server;
use shared::{NetConfig, NetConfigArgs};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Maximum number of connected clients
    #[arg(short, long, default_value = "16")]
    max_clients: usize,

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
    let address = format!("{}:{}", args.host, args.port);

    info!("Starting server on {}", address);
    info!(
        "Tick rate {}Hz, net update frequency {}Hz, max {} clients",
        config.tick_rate, config.net_update_frequency, args.max_clients
    );

    let mut server = Server::new(&address, config, args.max_clients).await?;

    server.run().await?;

    Ok(())
}
