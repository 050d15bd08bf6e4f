/*! # Cubesync

Client-side entity replication for a live multiplayer scene.

Every client publishes the pose of the entities it owns (its player avatar, the cubes it
spawned) to a relay, and materializes puppets for the entities owned by everyone else.

```rust,ignore
use bevy_app::App;
use cubesync::prelude::*;

App::new().add_plugins(ClientPlugins::websocket(
    ClientConfig::default().with_connection(
        ConnectionConfig::default().with_url("ws://localhost:8080/ws"),
    ),
));
```

Tag the entities to publish with [`Player`](prelude::Player) or [`Cube`](prelude::Cube), and
drive the connection through the [`Connection`](prelude::Connection) resource.
*/
use bevy_app::{App, Plugin, PluginGroup, PluginGroupBuilder};
use cubesync_connection::prelude::{ConnectionConfig, ConnectionPlugin};
use cubesync_core::prelude::{IdentityConfig, LocalIdentity};
use cubesync_replication::prelude::{ReplicationConfig, ReplicationPlugin};
use cubesync_transport::TransportBuilder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Identities and poses
pub mod shared {
    pub use cubesync_core::*;
}

pub mod messages {
    pub use cubesync_messages::*;
}

pub mod transport {
    pub use cubesync_transport::*;
}

pub mod connection {
    pub use cubesync_connection::*;
}

pub mod replication {
    pub use cubesync_replication::*;
}

#[cfg(feature = "crossbeam")]
pub mod crossbeam {
    pub use cubesync_crossbeam::*;
}

#[cfg(feature = "websocket")]
pub mod websocket {
    pub use cubesync_websocket::*;
}

/// Prelude containing commonly used types
pub mod prelude {
    pub use crate::{ClientConfig, ClientPlugins, IdentityPlugin};
    pub use cubesync_connection::prelude::*;
    pub use cubesync_core::prelude::*;
    pub use cubesync_replication::prelude::*;
    pub use cubesync_transport::prelude::*;

    #[cfg(feature = "crossbeam")]
    pub use cubesync_crossbeam::prelude::*;
    #[cfg(feature = "websocket")]
    pub use cubesync_websocket::prelude::*;
}

/// Configuration of a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub identity: IdentityConfig,
    pub connection: ConnectionConfig,
    pub replication: ReplicationConfig,
}

impl ClientConfig {
    pub fn with_identity(mut self, identity: IdentityConfig) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = connection;
        self
    }

    pub fn with_replication(mut self, replication: ReplicationConfig) -> Self {
        self.replication = replication;
        self
    }
}

/// Creates the [`LocalIdentity`] of the process, once, when the app is built
pub struct IdentityPlugin {
    pub config: IdentityConfig,
}

impl Plugin for IdentityPlugin {
    fn build(&self, app: &mut App) {
        if app.world().contains_resource::<LocalIdentity>() {
            return;
        }
        let identity = LocalIdentity::from_config(&self.config);
        info!(player_id = %identity.player_id(), "Local identity ready");
        app.insert_resource(identity);
    }
}

/// A plugin group containing all the client plugins.
///
/// - [`IdentityPlugin`]: creates the [`LocalIdentity`] from the persistent seed
/// - [`ConnectionPlugin`]: the connection lifecycle and the inbound dispatcher
/// - [`ReplicationPlugin`]: discovery, delta sending and remote entities
pub struct ClientPlugins {
    pub config: ClientConfig,
    pub builder: Arc<dyn TransportBuilder>,
}

impl ClientPlugins {
    pub fn new(config: ClientConfig, builder: impl TransportBuilder + 'static) -> Self {
        Self {
            config,
            builder: Arc::new(builder),
        }
    }

    #[cfg(feature = "websocket")]
    pub fn websocket(config: ClientConfig) -> Self {
        Self::new(config, cubesync_websocket::WebSocketBuilder)
    }

    #[cfg(feature = "crossbeam")]
    pub fn crossbeam(config: ClientConfig, server: cubesync_crossbeam::CrossbeamServer) -> Self {
        Self::new(config, cubesync_crossbeam::CrossbeamBuilder::new(server))
    }
}

impl PluginGroup for ClientPlugins {
    fn build(self) -> PluginGroupBuilder {
        PluginGroupBuilder::start::<Self>()
            .add(IdentityPlugin {
                config: self.config.identity,
            })
            .add(ConnectionPlugin {
                config: self.config.connection,
                builder: self.builder,
            })
            .add(ReplicationPlugin {
                config: self.config.replication,
            })
    }
}
