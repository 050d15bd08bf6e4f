//! Creation of the representations of remote entities
use crate::components::Placeholder;
use bevy_ecs::prelude::*;
use bevy_transform::components::Transform;
use cubesync_core::prelude::Pose;

/// Creates the representation of a remote entity at its initial pose
pub trait Spawner: Send + Sync {
    fn spawn_remote_player(&mut self, world: &mut World, pose: Pose, name_hint: &str) -> Entity;

    fn spawn_remote_cube(&mut self, world: &mut World, pose: Pose, name_hint: &str) -> Entity;
}

/// The [`Spawner`] used by replication
#[derive(Resource)]
pub struct RemoteSpawner(pub Box<dyn Spawner>);

impl RemoteSpawner {
    pub fn new(spawner: impl Spawner + 'static) -> Self {
        Self(Box::new(spawner))
    }
}

impl Default for RemoteSpawner {
    fn default() -> Self {
        Self::new(PlaceholderSpawner)
    }
}

/// Spawns a bare entity carrying a [`Placeholder`] shape
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderSpawner;

impl PlaceholderSpawner {
    fn spawn(world: &mut World, shape: Placeholder, pose: Pose, name_hint: &str) -> Entity {
        world
            .spawn((Name::new(name_hint.to_owned()), Transform::from(pose), shape))
            .id()
    }
}

impl Spawner for PlaceholderSpawner {
    fn spawn_remote_player(&mut self, world: &mut World, pose: Pose, name_hint: &str) -> Entity {
        Self::spawn(world, Placeholder::Capsule, pose, name_hint)
    }

    fn spawn_remote_cube(&mut self, world: &mut World, pose: Pose, name_hint: &str) -> Entity {
        Self::spawn(world, Placeholder::Cuboid, pose, name_hint)
    }
}

pub type Template = Box<dyn Fn(&mut World, Pose, &str) -> Entity + Send + Sync>;

/// Spawns user-provided templates, falls back to [`PlaceholderSpawner`] for missing ones
#[derive(Default)]
pub struct TemplateSpawner {
    player: Option<Template>,
    cube: Option<Template>,
}

impl TemplateSpawner {
    pub fn with_player(
        mut self,
        template: impl Fn(&mut World, Pose, &str) -> Entity + Send + Sync + 'static,
    ) -> Self {
        self.player = Some(Box::new(template));
        self
    }

    pub fn with_cube(
        mut self,
        template: impl Fn(&mut World, Pose, &str) -> Entity + Send + Sync + 'static,
    ) -> Self {
        self.cube = Some(Box::new(template));
        self
    }
}

impl Spawner for TemplateSpawner {
    fn spawn_remote_player(&mut self, world: &mut World, pose: Pose, name_hint: &str) -> Entity {
        match &self.player {
            Some(template) => template(world, pose, name_hint),
            None => PlaceholderSpawner.spawn_remote_player(world, pose, name_hint),
        }
    }

    fn spawn_remote_cube(&mut self, world: &mut World, pose: Pose, name_hint: &str) -> Entity {
        match &self.cube {
            Some(template) => template(world, pose, name_hint),
            None => PlaceholderSpawner.spawn_remote_cube(world, pose, name_hint),
        }
    }
}
