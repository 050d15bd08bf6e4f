//! Local discovery: finds the locally-owned entities that have to be published
use crate::components::{Cube, Player, RemoteReplica};
use crate::config::ReplicationConfig;
use crate::registry::{Category, IdentityRegistry};
use bevy_ecs::prelude::*;
use bevy_time::{Time, Timer, TimerMode};
use cubesync_core::prelude::{LocalIdentity, NetworkId, Pose};
use indexmap::IndexMap;
use tracing::{debug, trace};

/// A published entity, with the last pose actually sent for it
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicationEntry {
    pub id: NetworkId,
    /// Unrounded pose of the last send, `None` until the entity is sent once
    pub last_sent: Option<Pose>,
}

/// The locally-owned entities currently published, in discovery order
#[derive(Resource, Default, Debug)]
pub struct ReplicationSet {
    pub(crate) entries: IndexMap<Entity, ReplicationEntry>,
}

impl ReplicationSet {
    /// Starts tracking the entity. Returns false if it was already tracked.
    pub fn track(&mut self, entity: Entity, id: NetworkId) -> bool {
        if self.entries.contains_key(&entity) {
            return false;
        }
        self.entries.insert(entity, ReplicationEntry { id, last_sent: None });
        true
    }

    /// Stops tracking every entity for which `alive` returns false, returns the removed entities
    pub fn prune(&mut self, mut alive: impl FnMut(Entity) -> bool) -> Vec<Entity> {
        let mut removed = Vec::new();
        self.entries.retain(|entity, _| {
            let keep = alive(*entity);
            if !keep {
                removed.push(*entity);
            }
            keep
        });
        removed
    }

    pub fn get(&self, entity: Entity) -> Option<&ReplicationEntry> {
        self.entries.get(&entity)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.entries.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &ReplicationEntry)> {
        self.entries.iter().map(|(entity, entry)| (*entity, entry))
    }
}

/// Paces the rescans. The first scan happens on the first frame.
#[derive(Resource, Debug)]
pub struct DiscoveryTimer {
    timer: Timer,
    pending: bool,
}

impl DiscoveryTimer {
    pub fn new(config: &ReplicationConfig) -> Self {
        Self {
            timer: Timer::new(config.rescan_interval, TimerMode::Repeating),
            pending: true,
        }
    }

    /// Requests a rescan on the next frame
    pub fn request(&mut self) {
        self.pending = true;
    }

    fn tick(&mut self, time: &Time) -> bool {
        self.timer.tick(time.delta());
        core::mem::take(&mut self.pending) || self.timer.just_finished()
    }
}

/// Adds newly appeared local entities to the replication set and prunes destroyed ones.
///
/// Discovery is additive: an entity that loses its category tag stays published until it is
/// destroyed.
pub(crate) fn rescan(
    time: Res<Time>,
    mut timer: ResMut<DiscoveryTimer>,
    local: Res<LocalIdentity>,
    mut registry: ResMut<IdentityRegistry>,
    mut set: ResMut<ReplicationSet>,
    candidates: Query<(Entity, Has<Player>, Has<Cube>, Has<RemoteReplica>), Or<(With<Player>, With<Cube>)>>,
    live: Query<Entity>,
) {
    if !timer.tick(&time) {
        return;
    }
    for (entity, is_player, is_cube, is_remote) in candidates.iter() {
        if is_remote || set.contains(entity) {
            continue;
        }
        let category = Category::of(is_player, is_cube, is_remote);
        if let Some(id) = registry.identity_for(&local, entity, category) {
            debug!(?entity, %id, "Discovered local entity");
            set.track(entity, id);
        }
    }
    for entity in set.prune(|entity| live.contains(entity)) {
        trace!(?entity, "Entity destroyed, no longer replicated");
        registry.forget(entity);
    }
}
