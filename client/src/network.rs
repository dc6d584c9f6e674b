use crate::game::{ClientGameState, SnapshotDisposition};
use crate::input::{InputManager, InputPattern};
use crate::reconciliation::ReconcileOutcome;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{InputSample, NetConfig, Packet, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};

/// Options for the headless client that are not simulation tunables.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub server_addr: String,
    /// Simulated round-trip latency, split evenly between both directions.
    pub fake_ping_ms: u64,
    /// Fraction of outgoing inputs dropped on purpose, in `[0, 1]`.
    pub packet_loss: f64,
    pub pattern: InputPattern,
    /// Stop after this long; run until Ctrl+C when `None`.
    pub run_for: Option<Duration>,
}

pub struct Client {
    socket: Arc<UdpSocket>,
    server_addr: SocketAddr,
    connected: bool,

    game_state: ClientGameState,
    input_manager: InputManager,

    fake_ping_ms: u64,
    packet_loss: f64,
    rng: StdRng,
    run_for: Option<Duration>,
}

impl Client {
    pub async fn new(
        options: ClientOptions,
        config: NetConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);
        let server_addr = options.server_addr.parse()?;
        let world = shared::default_world(&config);

        Ok(Client {
            socket,
            server_addr,
            connected: false,
            game_state: ClientGameState::new(config, world),
            input_manager: InputManager::new(options.pattern),
            fake_ping_ms: options.fake_ping_ms,
            packet_loss: options.packet_loss.clamp(0.0, 1.0),
            rng: StdRng::from_entropy(),
            run_for: options.run_for,
        })
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server at {}...", self.server_addr);

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
        };
        self.send_packet(&packet).await
    }

    /// Sends without blocking the tick loop; simulated latency is applied on a
    /// spawned task.
    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        let data = packet.encode()?;

        if self.fake_ping_ms == 0 {
            self.socket.send_to(&data, self.server_addr).await?;
            return Ok(());
        }

        let socket = Arc::clone(&self.socket);
        let addr = self.server_addr;
        let delay = Duration::from_millis(self.fake_ping_ms / 2);
        tokio::spawn(async move {
            sleep(delay).await;
            if let Err(e) = socket.send_to(&data, addr).await {
                error!("Failed to send delayed packet: {}", e);
            }
        });
        Ok(())
    }

    /// Spawns task that reads datagrams off the socket and forwards them to
    /// the tick loop. Simulated latency is applied per datagram on its own
    /// task so the loop never waits on it.
    fn spawn_network_receiver(&self) -> (mpsc::UnboundedReceiver<Vec<u8>>, JoinHandle<()>) {
        let socket = Arc::clone(&self.socket);
        let delay = Duration::from_millis(self.fake_ping_ms / 2);
        let (packet_tx, packet_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, _)) => {
                        let data = buffer[0..len].to_vec();
                        if delay.is_zero() {
                            if packet_tx.send(data).is_err() {
                                break;
                            }
                        } else {
                            let packet_tx = packet_tx.clone();
                            tokio::spawn(async move {
                                sleep(delay).await;
                                let _ = packet_tx.send(data);
                            });
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });

        (packet_rx, handle)
    }

    fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Connected { client_id, spawn } => {
                info!("Connected! Client ID: {}", client_id);
                self.connected = true;
                self.game_state.on_connected(client_id, spawn);
            }

            Packet::ServerSnapshot {
                entity_id,
                snapshot,
            } => match self.game_state.on_snapshot(entity_id, &snapshot) {
                SnapshotDisposition::Reconciled(ReconcileOutcome::Corrected {
                    divergence,
                    replayed,
                }) => {
                    debug!(
                        "Corrected by {:.3} units, replayed {} inputs",
                        divergence.location_error, replayed
                    );
                }
                SnapshotDisposition::Reconciled(_)
                | SnapshotDisposition::Interpolated { .. }
                | SnapshotDisposition::Ignored => {}
            },

            Packet::PlayerLeft { entity_id } => {
                if self.game_state.on_player_left(entity_id) {
                    info!("Player {} left", entity_id);
                }
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connected = false;
                self.game_state.on_disconnected();
            }

            other => {
                warn!("Unexpected packet type {}", other.kind());
            }
        }
    }

    async fn send_input(&mut self, sample: InputSample) -> Result<(), Box<dyn std::error::Error>> {
        if !self.connected {
            return Ok(());
        }

        if self.packet_loss > 0.0 && self.rng.gen_bool(self.packet_loss) {
            debug!("Dropping input {} (simulated loss)", sample.sequence);
            return Ok(());
        }

        self.send_packet(&Packet::ClientInput { sample }).await
    }

    fn log_status(&self) {
        let Some(player) = self.game_state.local_player() else {
            info!("Waiting for server...");
            return;
        };

        let location = player.transform().location;
        let metrics = player.metrics();
        info!(
            "pos ({:.2}, {:.2}, {:.2}) | unconfirmed {} | corrections {} (max {:.3}) | dropped snapshots {} | observing {}",
            location.x,
            location.y,
            location.z,
            player.history().len(),
            metrics.corrections,
            metrics.max_correction_distance,
            metrics.dropped_snapshots,
            self.game_state.observed_count()
        );
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let tick_duration = self.game_state.config().tick_duration();
        let max_elapsed = self.game_state.config().max_elapsed;
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut status_interval = interval(Duration::from_secs(1));

        let (mut packet_rx, receiver) = self.spawn_network_receiver();

        let started = Instant::now();
        let mut last_tick = Instant::now();

        loop {
            if self.run_for.is_some_and(|limit| started.elapsed() >= limit) {
                info!("Run time elapsed, stopping");
                break;
            }

            tokio::select! {
                Some(data) = packet_rx.recv() => {
                    match Packet::decode(&data) {
                        Ok(packet) => self.handle_packet(packet),
                        Err(e) => warn!("Discarding malformed packet: {}", e),
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32().clamp(f32::EPSILON, max_elapsed);
                    last_tick = now;

                    let axes = self.input_manager.update(dt);
                    if let Some(sample) = self.game_state.tick(axes, dt) {
                        if let Err(e) = self.send_input(sample).await {
                            error!("Error sending input: {}", e);
                        }
                    }
                },

                _ = status_interval.tick() => {
                    self.log_status();
                },

                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down");
                    break;
                }
            }
        }

        receiver.abort();

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }

        Ok(())
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}
