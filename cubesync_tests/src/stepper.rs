use bevy_app::App;
use bevy_ecs::prelude::*;
use bevy_time::Time;
use core::time::Duration;
use cubesync::crossbeam::{ClientId, CrossbeamServer, RouteMode};
use cubesync::messages::{Inbound, decode};
use cubesync::prelude::*;
use tracing::info;

/// Seeds of the clients created by the stepper, in creation order
pub const SEEDS: [&str; 4] = ["alpha", "bravo", "charlie", "delta"];

/// Stepper with:
/// - n client Apps, each with its own [`LocalIdentity`]
/// - 1 [`CrossbeamServer`] relaying the frames between them
///
/// Time is advanced manually, so that every client sees the same frame duration.
/// In a frame, every client app is updated, then the server routes the frames they sent.
pub struct ClientStepper {
    pub client_apps: Vec<App>,
    pub server: CrossbeamServer,
    pub config: ClientConfig,
    pub frame_duration: Duration,
}

impl ClientStepper {
    /// One client, not connected yet
    pub fn single() -> Self {
        Self::with_clients(1)
    }

    pub fn with_clients(n: usize) -> Self {
        Self::new(n, Self::default_config())
    }

    pub fn default_config() -> ClientConfig {
        ClientConfig::default()
            .with_connection(ConnectionConfig::default().with_platform("test"))
    }

    pub fn new(n: usize, config: ClientConfig) -> Self {
        let mut stepper = Self {
            client_apps: vec![],
            server: CrossbeamServer::new(RouteMode::BroadcastOthers),
            config,
            frame_duration: Duration::from_millis(10),
        };
        for _ in 0..n {
            stepper.new_client();
        }
        stepper
    }

    pub fn new_client(&mut self) -> usize {
        let id = self.client_apps.len();
        let seed = SEEDS
            .get(id)
            .map_or_else(|| format!("client{id}"), |seed| (*seed).to_owned());
        let mut app = App::new();
        app.init_resource::<Time>();
        app.insert_resource(LocalIdentity::with_session(
            PersistentSeed::new(seed).unwrap(),
            "1",
        ));
        app.add_plugins(ClientPlugins::crossbeam(
            self.config.clone(),
            self.server.clone(),
        ));
        app.finish();
        app.cleanup();
        self.client_apps.push(app);
        id
    }

    pub fn client_app(&mut self) -> &mut App {
        assert_eq!(self.client_apps.len(), 1);
        &mut self.client_apps[0]
    }

    pub fn world(&self, id: usize) -> &World {
        self.client_apps[id].world()
    }

    pub fn world_mut(&mut self, id: usize) -> &mut World {
        self.client_apps[id].world_mut()
    }

    pub fn connection(&self, id: usize) -> &Connection {
        self.world(id).resource::<Connection>()
    }

    pub fn connection_mut(&mut self, id: usize) -> Mut<'_, Connection> {
        self.world_mut(id).resource_mut::<Connection>()
    }

    pub fn state(&self, id: usize) -> ClientState {
        self.connection(id).state()
    }

    pub fn player_id(&self, id: usize) -> NetworkId {
        self.world(id).resource::<LocalIdentity>().player_id().clone()
    }

    pub fn remotes(&self, id: usize) -> &RemoteEntities {
        self.world(id).resource::<RemoteEntities>()
    }

    /// Position of the puppet representing `network_id` in the world of client `id`
    pub fn remote_translation(&self, id: usize, network_id: &str) -> Option<bevy_math::Vec3> {
        let remote = self.remotes(id).get(&NetworkId::from(network_id))?;
        self.world(id)
            .get::<bevy_transform::components::Transform>(remote.entity())
            .map(|transform| transform.translation)
    }

    /// Starts connecting one client. The handshake completes on the next frames.
    pub fn connect(&mut self, id: usize) {
        self.connection_mut(id).connect().unwrap();
    }

    /// Connects every client, then frame steps until they are all connected
    pub fn connect_all(&mut self) {
        for id in 0..self.client_apps.len() {
            self.connect(id);
        }
        self.wait_for_connection();
    }

    /// Frame step until all clients are connected
    pub fn wait_for_connection(&mut self) {
        for _ in 0..50 {
            if (0..self.client_apps.len()).all(|id| self.state(id) == ClientState::Connected) {
                info!("Clients are all connected");
                break;
            }
            self.frame_step(1);
        }
    }

    /// Frame step until client `id` is connected
    pub fn wait_for_connection_of(&mut self, id: usize) {
        for _ in 0..50 {
            if self.state(id) == ClientState::Connected {
                break;
            }
            self.frame_step(1);
        }
    }

    /// Id given by the server to client `id`, if it is connected to the server
    pub fn server_id(&self, id: usize) -> Option<ClientId> {
        self.server.client_ids().get(id).copied()
    }

    /// Batches routed by the server since the last call, decoded, with their sender
    pub fn take_batches(&self) -> Vec<(ClientId, cubesync::messages::CubeBatch)> {
        self.server
            .take_received()
            .into_iter()
            .filter_map(|(from, text)| match decode(&text) {
                Ok(Inbound::Cubes(batch)) => Some((from, batch)),
                _ => None,
            })
            .collect()
    }

    pub fn advance_time(&mut self, duration: Duration) {
        self.client_apps.iter_mut().for_each(|app| {
            app.world_mut().resource_mut::<Time>().advance_by(duration);
        });
    }

    /// Advance the world by one frame duration
    pub fn frame_step(&mut self, n: usize) {
        for _ in 0..n {
            self.advance_time(self.frame_duration);
            self.client_apps.iter_mut().for_each(|app| {
                app.update();
            });
            self.server.step();
        }
    }

    /// Frame step for the given duration
    pub fn step_for(&mut self, duration: Duration) {
        let frames = duration.as_nanos().div_ceil(self.frame_duration.as_nanos());
        self.frame_step(frames as usize);
    }
}
