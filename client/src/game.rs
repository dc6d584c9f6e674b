use crate::interpolation::Interpolator;
use crate::prediction::LocalPlayer;
use crate::reconciliation::ReconcileOutcome;
use log::{debug, info};
use shared::{
    AuthoritativeSnapshot, Collision, InputAxes, InputSample, NetConfig, PlaneWorld, Role,
    Transform,
};
use std::collections::HashMap;

/// A pawn as seen by this client, tagged by the role the client plays for it.
pub enum Pawn {
    Predicted(LocalPlayer),
    Observed(Interpolator),
}

impl Pawn {
    pub fn role(&self) -> Role {
        match self {
            Pawn::Predicted(_) => Role::PredictingClient,
            Pawn::Observed(_) => Role::ObservingClient,
        }
    }

    pub fn transform(&self) -> Transform {
        match self {
            Pawn::Predicted(player) => player.transform(),
            Pawn::Observed(interpolator) => interpolator.transform(),
        }
    }
}

/// What happened to an inbound snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SnapshotDisposition {
    Reconciled(ReconcileOutcome),
    Interpolated { accepted: bool },
    /// Snapshot for our own pawn before the connection handshake completed.
    Ignored,
}

/// All pawns this client knows about, plus the world they move in.
pub struct ClientGameState {
    config: NetConfig,
    world: PlaneWorld,
    client_id: Option<u32>,
    pawns: HashMap<u32, Pawn>,
}

impl ClientGameState {
    pub fn new(config: NetConfig, world: PlaneWorld) -> Self {
        Self {
            config,
            world,
            client_id: None,
            pawns: HashMap::new(),
        }
    }

    /// Called once the server has accepted us and told us where we spawned.
    pub fn on_connected(&mut self, client_id: u32, spawn: Transform) {
        info!(
            "Spawned as {} at ({:.2}, {:.2}, {:.2})",
            client_id, spawn.location.x, spawn.location.y, spawn.location.z
        );
        self.client_id = Some(client_id);
        self.pawns.insert(
            client_id,
            Pawn::Predicted(LocalPlayer::new(spawn, &self.config)),
        );
    }

    pub fn on_disconnected(&mut self) {
        self.client_id = None;
        self.pawns.clear();
    }

    /// Routes a snapshot to reconciliation or interpolation depending on who
    /// owns the pawn.
    pub fn on_snapshot(
        &mut self,
        entity_id: u32,
        snapshot: &AuthoritativeSnapshot,
    ) -> SnapshotDisposition {
        if Role::on_client(self.client_id, entity_id).predicts() {
            return match self.pawns.get_mut(&entity_id) {
                Some(Pawn::Predicted(player)) => {
                    SnapshotDisposition::Reconciled(player.reconcile(snapshot, &self.world))
                }
                _ => SnapshotDisposition::Ignored,
            };
        }

        let config = &self.config;
        let pawn = self.pawns.entry(entity_id).or_insert_with(|| {
            debug!("Observing new entity {}", entity_id);
            Pawn::Observed(Interpolator::new(
                config.net_update_frequency,
                config.interpolation_enabled,
            ))
        });
        match pawn {
            Pawn::Observed(interpolator) => SnapshotDisposition::Interpolated {
                accepted: interpolator.push(snapshot),
            },
            Pawn::Predicted(_) => SnapshotDisposition::Ignored,
        }
    }

    /// Drops an observed pawn whose owner left. Our own pawn is only removed
    /// by [`on_disconnected`](Self::on_disconnected). Returns true when a
    /// pawn was removed.
    pub fn on_player_left(&mut self, entity_id: u32) -> bool {
        if self.client_id == Some(entity_id) {
            return false;
        }
        let removed = self.pawns.remove(&entity_id).is_some();
        if removed {
            debug!("Entity {} left", entity_id);
        }
        removed
    }

    /// Runs one client frame: predicts the local pawn and advances every
    /// observed pawn's blend. Returns the input to send to the server.
    pub fn tick(&mut self, axes: InputAxes, elapsed: f32) -> Option<InputSample> {
        let mut outgoing = None;
        for pawn in self.pawns.values_mut() {
            match pawn {
                Pawn::Predicted(player) => {
                    outgoing = player.predict(axes, elapsed, &self.world);
                }
                Pawn::Observed(interpolator) => {
                    interpolator.tick(elapsed);
                }
            }
        }
        outgoing
    }

    pub fn client_id(&self) -> Option<u32> {
        self.client_id
    }

    pub fn local_player(&self) -> Option<&LocalPlayer> {
        match self.client_id.and_then(|id| self.pawns.get(&id)) {
            Some(Pawn::Predicted(player)) => Some(player),
            _ => None,
        }
    }

    pub fn pawn(&self, entity_id: u32) -> Option<&Pawn> {
        self.pawns.get(&entity_id)
    }

    pub fn observed_count(&self) -> usize {
        self.pawns
            .values()
            .filter(|pawn| pawn.role() == Role::ObservingClient)
            .count()
    }

    /// Transforms to display this frame, keyed by entity id.
    pub fn render_transforms(&self) -> Vec<(u32, Transform)> {
        let mut transforms: Vec<(u32, Transform)> = self
            .pawns
            .iter()
            .map(|(id, pawn)| (*id, pawn.transform()))
            .collect();
        transforms.sort_by_key(|(id, _)| *id);
        transforms
    }

    pub fn world(&self) -> &dyn Collision {
        &self.world
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }
}
