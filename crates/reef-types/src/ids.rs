//! Newtype identifiers for catalog entities.
//!
//! Every entity is keyed by a [`uuid::Uuid`] wrapped in a distinct type so
//! a `ProfileId` can never be passed where a `JobId` is expected.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(ConnectionId);
entity_id!(DestinationId);
entity_id!(ProfileId);
entity_id!(ImportProfileId);
entity_id!(DependencyId);
entity_id!(ExecutionId);
entity_id!(JobId);
entity_id!(WebhookTriggerId);
