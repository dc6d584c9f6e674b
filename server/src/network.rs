//! Server network layer handling UDP communications and the authority loop

use crate::client_manager::ClientManager;
use crate::game::GameState;
use log::{debug, error, info, warn};
use shared::{InputSample, NetConfig, Packet, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { client_id: u32 },
    Shutdown,
}

/// Messages sent from the authority loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<u32>,
    },
}

/// Main server coordinating networking and authoritative simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    game_state: GameState,
    started: Instant,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        config: NetConfig,
        max_clients: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();
        let world = shared::default_world(&config);

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            game_state: GameState::new(config, world),
            started: Instant::now(),
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Handle for stopping [`run`](Self::run) from another task.
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    /// Seconds since the server started; stamped on every snapshot.
    fn server_time(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match Packet::decode(&buffer[0..len]) {
                        Ok(packet) => {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        }
                        Err(e) => warn!("Failed to decode packet from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if Some(client_id) == exclude {
                                continue;
                            }

                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    async fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = packet.encode()?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn broadcast_packet(&self, packet: Packet, exclude: Option<u32>) {
        if let Err(e) = self
            .game_tx
            .send(GameMessage::BroadcastPacket { packet, exclude })
        {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Processes one decoded packet
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = packet.validate(self.game_state.config()) {
            warn!("Dropping {} from {}: {}", packet.kind(), addr, e);
            let mut clients = self.clients.write().await;
            if let Some(client_id) = clients.find_client_by_addr(addr) {
                clients.record_rejected(client_id);
            }
            return;
        }

        match packet {
            Packet::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                if client_version != PROTOCOL_VERSION {
                    warn!(
                        "Rejecting {}: protocol {} != {}",
                        addr, client_version, PROTOCOL_VERSION
                    );
                    let response = Packet::Disconnected {
                        reason: format!("Protocol version {} required", PROTOCOL_VERSION),
                    };
                    self.send_packet(response, addr);
                    return;
                }

                // Remove existing connection if present
                let existing_client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(existing_id) = existing_client_id {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    self.clients.write().await.remove_client(&existing_id);
                    self.remove_player(existing_id);
                }

                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr)
                };

                let response = match client_id {
                    Some(client_id) => {
                        let spawn = self.game_state.add_player(client_id);
                        Packet::Connected { client_id, spawn }
                    }
                    None => Packet::Disconnected {
                        reason: "Server full".to_string(),
                    },
                };
                self.send_packet(response, addr);
            }

            Packet::ClientInput { sample } => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                match client_id {
                    Some(client_id) => self.handle_input(client_id, sample).await,
                    None => debug!("Input from unknown address {}", addr),
                }
            }

            Packet::Disconnect => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    self.clients.write().await.remove_client(&client_id);
                    self.remove_player(client_id);
                }
            }

            other => {
                warn!("Unexpected packet type {} from {}", other.kind(), addr);
            }
        }
    }

    /// Drops the player's pawn and tells the remaining clients to do the same.
    fn remove_player(&mut self, client_id: u32) {
        self.game_state.remove_player(&client_id);
        self.broadcast_packet(
            Packet::PlayerLeft {
                entity_id: client_id,
            },
            Some(client_id),
        );
    }

    fn handle_client_timeout(&mut self, client_id: u32) {
        info!("Client {} timed out", client_id);
        self.remove_player(client_id);
    }

    /// Simulates one validated client input, broadcasting the result when
    /// the player's broadcast counter says so.
    async fn handle_input(&mut self, client_id: u32, sample: InputSample) {
        self.clients.write().await.record_input(client_id);

        let server_time = self.server_time();
        if let Some(snapshot) = self.game_state.apply_input(client_id, &sample, server_time) {
            self.broadcast_packet(
                Packet::ServerSnapshot {
                    entity_id: client_id,
                    snapshot,
                },
                None,
            );
        }
    }

    /// Main server loop
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut status_interval = interval(Duration::from_secs(5));

        info!(
            "Server started: {}Hz simulation, snapshot every {} inputs",
            self.game_state.config().tick_rate,
            self.game_state.config().broadcast_interval()
        );

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            self.handle_client_timeout(client_id);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = status_interval.tick() => {
                    let client_count = {
                        let clients = self.clients.read().await;
                        clients.len()
                    };

                    if client_count > 0 {
                        let (simulated, discarded) = self
                            .game_state
                            .players
                            .values()
                            .fold((0u64, 0u64), |(simulated, discarded), player| {
                                (
                                    simulated + player.inputs_simulated(),
                                    discarded + player.inputs_discarded(),
                                )
                            });
                        debug!(
                            "Uptime {:.0}s: {} clients, {} inputs simulated, {} discarded",
                            self.server_time(),
                            client_count,
                            simulated,
                            discarded
                        );
                    }
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{InputAxes, SequenceId, Transform};

    async fn test_server() -> Server {
        Server::new("127.0.0.1:0", NetConfig::default(), 2)
            .await
            .unwrap()
    }

    fn client_addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn input(sequence: u16, elapsed_seconds: f32) -> Packet {
        Packet::ClientInput {
            sample: InputSample {
                sequence: SequenceId(sequence),
                axes: InputAxes::forward(1.0),
                elapsed_seconds,
                predicted: Transform::default(),
            },
        }
    }

    async fn connect(server: &mut Server, addr: SocketAddr) -> u32 {
        server
            .handle_packet(
                Packet::Connect {
                    client_version: PROTOCOL_VERSION,
                },
                addr,
            )
            .await;
        loop {
            match server.game_rx.try_recv() {
                Ok(GameMessage::SendPacket {
                    packet: Packet::Connected { client_id, .. },
                    addr: to,
                }) => {
                    assert_eq!(to, addr);
                    return client_id;
                }
                // Departure notices for a replaced connection.
                Ok(GameMessage::BroadcastPacket { .. }) => continue,
                other => panic!("Expected Connected, got {:?}", other),
            }
        }
    }

    fn expect_player_left(server: &mut Server, client_id: u32) {
        match server.game_rx.try_recv() {
            Ok(GameMessage::BroadcastPacket {
                packet: Packet::PlayerLeft { entity_id },
                exclude,
            }) => {
                assert_eq!(entity_id, client_id);
                assert_eq!(exclude, Some(client_id));
            }
            other => panic!("Expected PlayerLeft, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_spawns_player() {
        let mut server = test_server().await;
        let client_id = connect(&mut server, client_addr(9001)).await;

        assert_eq!(client_id, 1);
        assert!(server.game_state().player(client_id).is_some());
    }

    #[tokio::test]
    async fn test_server_full() {
        let mut server = test_server().await;
        connect(&mut server, client_addr(9001)).await;
        connect(&mut server, client_addr(9002)).await;

        server
            .handle_packet(
                Packet::Connect {
                    client_version: PROTOCOL_VERSION,
                },
                client_addr(9003),
            )
            .await;
        match server.game_rx.try_recv() {
            Ok(GameMessage::SendPacket {
                packet: Packet::Disconnected { reason },
                ..
            }) => assert_eq!(reason, "Server full"),
            other => panic!("Expected Disconnected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_protocol_version_rejected() {
        let mut server = test_server().await;
        server
            .handle_packet(
                Packet::Connect {
                    client_version: PROTOCOL_VERSION + 1,
                },
                client_addr(9001),
            )
            .await;

        assert!(matches!(
            server.game_rx.try_recv(),
            Ok(GameMessage::SendPacket {
                packet: Packet::Disconnected { .. },
                ..
            })
        ));
        assert!(server.game_state().players.is_empty());
    }

    #[tokio::test]
    async fn test_inputs_broadcast_every_interval() {
        let mut server = test_server().await;
        let addr = client_addr(9001);
        let client_id = connect(&mut server, addr).await;

        for sequence in 0..6 {
            server.handle_packet(input(sequence, 1.0 / 60.0), addr).await;
        }

        match server.game_rx.try_recv() {
            Ok(GameMessage::BroadcastPacket {
                packet: Packet::ServerSnapshot {
                    entity_id,
                    snapshot,
                },
                exclude: None,
            }) => {
                assert_eq!(entity_id, client_id);
                assert_eq!(snapshot.sequence, SequenceId(5));
            }
            other => panic!("Expected snapshot broadcast, got {:?}", other),
        }
        assert!(server.game_rx.try_recv().is_err());
        assert_eq!(
            server.game_state().player(client_id).unwrap().inputs_simulated(),
            6
        );
    }

    #[tokio::test]
    async fn test_duplicate_input_simulated_once() {
        let mut server = test_server().await;
        let addr = client_addr(9001);
        let client_id = connect(&mut server, addr).await;

        server.handle_packet(input(0, 0.1), addr).await;
        server.handle_packet(input(0, 0.1), addr).await;

        let player = server.game_state().player(client_id).unwrap();
        assert_eq!(player.inputs_simulated(), 1);
        assert_eq!(player.inputs_discarded(), 1);
        let clients = server.clients.read().await;
        assert_eq!(clients.get(client_id).unwrap().inputs_received, 2);
    }

    #[tokio::test]
    async fn test_invalid_input_never_simulated() {
        let mut server = test_server().await;
        let addr = client_addr(9001);
        let client_id = connect(&mut server, addr).await;

        server.handle_packet(input(0, f32::NAN), addr).await;
        server.handle_packet(input(400, 1.0 / 60.0), addr).await;
        server.handle_packet(input(1, 10.0), addr).await;

        assert_eq!(
            server.game_state().player(client_id).unwrap().inputs_simulated(),
            0
        );
        let clients = server.clients.read().await;
        assert_eq!(clients.get(client_id).unwrap().inputs_rejected, 3);
    }

    #[tokio::test]
    async fn test_input_from_unknown_address_ignored() {
        let mut server = test_server().await;
        server.handle_packet(input(0, 1.0 / 60.0), client_addr(9009)).await;
        assert!(server.game_state().players.is_empty());
        assert!(server.game_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnect_removes_player() {
        let mut server = test_server().await;
        let addr = client_addr(9001);
        let client_id = connect(&mut server, addr).await;

        server.handle_packet(Packet::Disconnect, addr).await;
        assert!(server.game_state().player(client_id).is_none());
        assert!(server.clients.read().await.is_empty());
        expect_player_left(&mut server, client_id);
    }

    #[tokio::test]
    async fn test_timeout_announces_departure() {
        let mut server = test_server().await;
        let stale = connect(&mut server, client_addr(9001)).await;
        connect(&mut server, client_addr(9002)).await;

        server.clients.write().await.remove_client(&stale);
        server.handle_client_timeout(stale);

        assert!(server.game_state().player(stale).is_none());
        assert_eq!(server.game_state().players.len(), 1);
        expect_player_left(&mut server, stale);
    }

    #[tokio::test]
    async fn test_reconnect_replaces_existing_client() {
        let mut server = test_server().await;
        let addr = client_addr(9001);
        let first = connect(&mut server, addr).await;
        let second = connect(&mut server, addr).await;

        assert_ne!(first, second);
        assert!(server.game_state().player(first).is_none());
        assert!(server.game_rx.try_recv().is_err());
        assert!(server.game_state().player(second).is_some());
        assert_eq!(server.clients.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_run() {
        let mut server = test_server().await;
        let handle = server.shutdown_handle();
        handle.send(ServerMessage::Shutdown).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), server.run()).await;
        assert!(result.is_ok());
    }
}
