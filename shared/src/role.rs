//! Which engines run for a pawn in the current process.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The owning client: predicts locally and reconciles against snapshots.
    PredictingClient,
    /// The server: simulates received inputs and broadcasts the result.
    AuthoritativeServer,
    /// Any other client: interpolates between received snapshots.
    ObservingClient,
}

impl Role {
    /// Role a client plays for `entity_id` given the id the server assigned it.
    pub fn on_client(local_id: Option<u32>, entity_id: u32) -> Role {
        if local_id == Some(entity_id) {
            Role::PredictingClient
        } else {
            Role::ObservingClient
        }
    }

    pub fn predicts(self) -> bool {
        self == Role::PredictingClient
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::PredictingClient => "predicting client",
            Role::AuthoritativeServer => "authoritative server",
            Role::ObservingClient => "observing client",
        };
        f.write_str(name)
    }
}
