use crate::client::Connection;
use crate::config::ConnectionConfig;
use crate::inbound::{self, ReceivedBatches};
use bevy_app::{App, Plugin, PostUpdate, PreUpdate, Startup};
use bevy_ecs::prelude::*;
use cubesync_core::prelude::{LocalIdentity, PersistentSeed};
use cubesync_transport::TransportBuilder;
use std::sync::Arc;

#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum ConnectionSystems {
    // PRE UPDATE
    /// Handle the transport lifecycle events, then drain the inbound queue
    Receive,

    // POST UPDATE
    /// Flush the frames queued this tick to the transport
    Send,
}

/// Adds the [`Connection`] resource and the systems driving it
pub struct ConnectionPlugin {
    pub config: ConnectionConfig,
    pub builder: Arc<dyn TransportBuilder>,
}

impl ConnectionPlugin {
    pub fn new(config: ConnectionConfig, builder: impl TransportBuilder + 'static) -> Self {
        Self {
            config,
            builder: Arc::new(builder),
        }
    }

    fn process_link_events(mut connection: ResMut<Connection>) {
        connection.process_link_events();
    }

    fn flush(mut connection: ResMut<Connection>) {
        connection.flush();
    }

    fn auto_connect(mut connection: ResMut<Connection>) {
        if connection.config().auto_connect {
            // failures are logged by the connection
            let _ = connection.connect();
        }
    }
}

impl Plugin for ConnectionPlugin {
    fn build(&self, app: &mut App) {
        let player_id = app
            .world_mut()
            .get_resource_or_insert_with(|| LocalIdentity::new(PersistentSeed::generate()))
            .player_id()
            .clone();
        app.insert_resource(Connection::new(
            self.config.clone(),
            self.builder.clone(),
            player_id,
        ));
        app.init_resource::<ReceivedBatches>();
        app.add_systems(Startup, Self::auto_connect);
        app.add_systems(
            PreUpdate,
            (Self::process_link_events, inbound::receive)
                .chain()
                .in_set(ConnectionSystems::Receive),
        );
        app.add_systems(PostUpdate, Self::flush.in_set(ConnectionSystems::Send));
    }
}
