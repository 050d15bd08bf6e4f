use crate::config::ReplicationConfig;
use crate::discovery::{self, DiscoveryTimer, ReplicationSet};
use crate::registry::IdentityRegistry;
use crate::remote::{self, RemoteEntities};
use crate::send;
use crate::spawner::RemoteSpawner;
use crate::ReplicationSystems;
use bevy_app::{App, Plugin, PostUpdate, PreUpdate};
use bevy_ecs::prelude::*;
use cubesync_connection::prelude::{ConnectionSystems, ReceivedBatches};

/// Publishes the local entities and materializes the remote ones.
///
/// Needs the [`Connection`](cubesync_connection::prelude::Connection) resource added by the
/// `ConnectionPlugin`. Insert a [`RemoteSpawner`] before adding the plugin to customize how
/// remote entities are spawned.
#[derive(Default)]
pub struct ReplicationPlugin {
    pub config: ReplicationConfig,
}

impl Plugin for ReplicationPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.config.clone())
            .insert_resource(DiscoveryTimer::new(&self.config))
            .init_resource::<IdentityRegistry>()
            .init_resource::<ReplicationSet>()
            .init_resource::<RemoteEntities>()
            .init_resource::<RemoteSpawner>()
            .init_resource::<ReceivedBatches>();

        app.configure_sets(
            PreUpdate,
            ReplicationSystems::Receive.after(ConnectionSystems::Receive),
        );
        app.configure_sets(
            PostUpdate,
            (ReplicationSystems::Discover, ReplicationSystems::Send)
                .chain()
                .before(ConnectionSystems::Send),
        );
        app.add_systems(PreUpdate, remote::receive.in_set(ReplicationSystems::Receive));
        app.add_systems(
            PostUpdate,
            (
                discovery::rescan.in_set(ReplicationSystems::Discover),
                send::send.in_set(ReplicationSystems::Send),
            ),
        );
    }
}
