use crate::authority::{ServerPlayer, SimulationStep};
use crate::history::LagCompensationError;
use log::info;
use shared::{
    AuthoritativeSnapshot, InputSample, NetConfig, PlaneWorld, SequenceId, Transform, Vec3,
    ARENA_HALF_EXTENT,
};
use std::collections::HashMap;

/// Distance between neighbouring spawn points along the x axis.
const SPAWN_SPACING: f32 = 6.0;

pub struct GameState {
    pub players: HashMap<u32, ServerPlayer>,
    config: NetConfig,
    world: PlaneWorld,
}

impl GameState {
    pub fn new(config: NetConfig, world: PlaneWorld) -> Self {
        Self {
            players: HashMap::new(),
            config,
            world,
        }
    }

    /// Spawns a player for a freshly connected client and returns where it
    /// stands.
    pub fn add_player(&mut self, client_id: u32) -> Transform {
        let span = ARENA_HALF_EXTENT * 1.5;
        let spawn_x = (client_id as f32 * SPAWN_SPACING) % span - span / 2.0;
        let spawn = Transform::new(Vec3::new(spawn_x, 0.0, 0.0), Default::default());

        let player = ServerPlayer::new(client_id, spawn, &self.config);

        info!(
            "Added player {} at ({:.2}, {:.2}, {:.2})",
            client_id, spawn.location.x, spawn.location.y, spawn.location.z
        );
        self.players.insert(client_id, player);
        spawn
    }

    pub fn remove_player(&mut self, client_id: &u32) {
        if self.players.remove(client_id).is_some() {
            info!("Removed player {}", client_id);
        }
    }

    /// Simulates one already validated input. Returns the snapshot when it is
    /// due for broadcast; duplicate and out-of-date inputs yield nothing.
    pub fn apply_input(
        &mut self,
        client_id: u32,
        sample: &InputSample,
        server_time: f32,
    ) -> Option<AuthoritativeSnapshot> {
        let player = self.players.get_mut(&client_id)?;
        let SimulationStep {
            snapshot,
            broadcast,
        } = player.simulate(sample, server_time, &self.world)?;
        broadcast.then_some(snapshot)
    }

    /// Lag-compensation lookup for one player.
    pub fn rewind_player(
        &mut self,
        client_id: u32,
        sequence: SequenceId,
    ) -> Option<Result<Transform, LagCompensationError>> {
        self.players
            .get_mut(&client_id)
            .map(|player| player.rewind_to(sequence))
    }

    pub fn restore_player(&mut self, client_id: u32) -> bool {
        self.players
            .get_mut(&client_id)
            .is_some_and(|player| player.restore_after_rewind())
    }

    pub fn player(&self, client_id: u32) -> Option<&ServerPlayer> {
        self.players.get(&client_id)
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }
}
