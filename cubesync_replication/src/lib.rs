//! # Cubesync Replication
//!
//! Keeps the poses of locally-owned entities approximately in sync across clients.
//!
//! Outbound:
//! - [`discovery`] periodically finds the entities tagged [`Player`](components::Player) or
//!   [`Cube`](components::Cube) and gives them a stable identity through the
//!   [`IdentityRegistry`](registry::IdentityRegistry)
//! - [`send`] compares their pose with the last one sent and batches those that changed past a
//!   threshold, or all of them on a forced resync
//!
//! Inbound:
//! - [`remote`] applies the received batches: self-echoes are dropped, every other identity gets
//!   a puppet that is spawned (or adopted) and configured once, then moved to the received pose

use bevy_ecs::prelude::SystemSet;

pub mod components;
pub mod config;
pub mod discovery;
mod plugin;
pub mod registry;
pub mod remote;
pub mod send;
pub mod spawner;

pub mod prelude {
    pub use crate::ReplicationSystems;
    pub use crate::components::{
        Animator, Behaviour, CharacterController, Cube, DisplayColor, PhysicsBody, Placeholder,
        Player, RemoteReplica,
    };
    pub use crate::config::ReplicationConfig;
    pub use crate::discovery::{DiscoveryTimer, ReplicationEntry, ReplicationSet};
    pub use crate::plugin::ReplicationPlugin;
    pub use crate::registry::{Category, IdentityRegistry};
    pub use crate::remote::{RemoteEntities, RemoteEntity};
    pub use crate::spawner::{PlaceholderSpawner, RemoteSpawner, Spawner, TemplateSpawner};
}

#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum ReplicationSystems {
    // PreUpdate
    /// Apply the received batches to the World
    Receive,

    // PostUpdate
    /// Scan the World for new local entities
    Discover,
    /// Send the poses that changed since the last send
    Send,
}
