//! Headless client: connects to a relay, publishes a player and some orbiting cubes, and logs
//! the remote entities it receives.
//!
//! ```text
//! cargo run -p cubesync_headless -- --url ws://localhost:8080/ws --cubes 3
//! ```
use bevy_app::{App, ScheduleRunnerPlugin, Startup, Update};
use bevy_ecs::prelude::*;
use bevy_math::{Quat, Vec3};
use bevy_time::{Time, TimePlugin};
use bevy_transform::components::Transform;
use clap::Parser;
use core::time::Duration;
use cubesync::prelude::*;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// CLI options of the headless client
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Relay endpoint. Overrides the one of the config file.
    #[arg(long)]
    url: Option<String>,

    /// Number of cubes to spawn around the player
    #[arg(long, default_value_t = 3)]
    cubes: usize,

    /// JSON file containing a client config
    #[arg(long)]
    config: Option<PathBuf>,

    /// File storing the persistent seed across runs
    #[arg(long)]
    seed_path: Option<PathBuf>,

    /// Frames per second of the app loop
    #[arg(long, default_value_t = 60)]
    fps: u32,
}

impl Cli {
    fn client_config(&self) -> ClientConfig {
        let mut config = match &self.config {
            Some(path) => match std::fs::read_to_string(path)
                .map_err(|e| e.to_string())
                .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()))
            {
                Ok(config) => config,
                Err(e) => {
                    error!(?path, "Could not read the config, using the defaults: {e}");
                    ClientConfig::default()
                }
            },
            None => ClientConfig::default(),
        };
        if let Some(url) = &self.url {
            config.connection.url = url.clone();
        }
        if let Some(seed_path) = &self.seed_path {
            config.identity.seed_path = Some(seed_path.clone());
        }
        config.connection.auto_connect = true;
        config
    }
}

/// Angular speed of the cubes around the player, in radians per second
const ORBIT_SPEED: f32 = 0.8;
const ORBIT_RADIUS: f32 = 2.5;

#[derive(Component)]
struct Orbit {
    phase: f32,
}

#[derive(Resource)]
struct CubeCount(usize);

fn spawn_scene(mut commands: Commands, count: Res<CubeCount>) {
    commands.spawn((Name::new("Player"), Player, Transform::default()));
    for i in 0..count.0 {
        let phase = i as f32 * core::f32::consts::TAU / count.0 as f32;
        let hue = (i * 255 / count.0.max(1)) as u8;
        commands.spawn((
            Name::new(format!("Cube {i}")),
            Cube,
            Orbit { phase },
            DisplayColor::new(255 - hue, hue, 128),
            Transform::default(),
        ));
    }
    info!(cubes = count.0, "Spawned the local scene");
}

fn orbit(time: Res<Time>, mut cubes: Query<(&Orbit, &mut Transform)>) {
    let t = time.elapsed_secs() * ORBIT_SPEED;
    for (orbit, mut transform) in cubes.iter_mut() {
        let angle = t + orbit.phase;
        transform.translation = Vec3::new(angle.cos(), 0.5, angle.sin()) * ORBIT_RADIUS;
        transform.rotation = Quat::from_rotation_y(-angle);
    }
}

fn log_state(connection: Res<Connection>, mut last: Local<Option<ClientState>>) {
    let state = connection.state();
    if *last != Some(state) {
        info!("Status: {}", state.label());
        *last = Some(state);
    }
}

fn log_remotes(remotes: Res<RemoteEntities>, mut last: Local<usize>) {
    if remotes.len() != *last {
        info!(remotes = remotes.len(), "Remote entities changed");
        *last = remotes.len();
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.client_config();
    info!(url = %config.connection.url, "Starting headless client");

    App::new()
        .add_plugins((
            ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(1.0 / f64::from(cli.fps.max(1)))),
            TimePlugin,
        ))
        .add_plugins(ClientPlugins::websocket(config))
        .insert_resource(CubeCount(cli.cubes))
        .add_systems(Startup, spawn_scene)
        .add_systems(Update, (orbit, log_state, log_remotes))
        .run();
}
