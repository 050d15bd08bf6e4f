//! Lifecycle of the puppets representing entities owned by other clients
use crate::components::{
    Animator, Behaviour, CharacterController, Cube, PhysicsBody, Player, RemoteReplica,
};
use crate::config::ReplicationConfig;
use crate::spawner::{RemoteSpawner, Spawner};
use bevy_ecs::prelude::*;
use bevy_math::Vec3;
use bevy_platform::collections::HashMap;
use bevy_time::Time;
use bevy_transform::components::Transform;
use core::time::Duration;
use cubesync_connection::prelude::ReceivedBatches;
use cubesync_core::prelude::{EntityKind, LocalIdentity, NetworkId, Pose};
use cubesync_messages::prelude::CubeBatch;
use tracing::{debug, info, trace};

/// Representation of a remote entity.
///
/// A representation is configured as a puppet exactly once, when it moves from `JustSpawned`
/// to `Configured`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteEntity {
    /// Spawned or adopted, not yet configured
    JustSpawned(Entity),
    Configured(Entity),
}

impl RemoteEntity {
    pub fn entity(&self) -> Entity {
        match self {
            RemoteEntity::JustSpawned(entity) | RemoteEntity::Configured(entity) => *entity,
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, RemoteEntity::Configured(_))
    }
}

#[derive(Debug)]
struct RemoteRecord {
    remote: RemoteEntity,
    /// Elapsed time of the last received update
    last_update: Duration,
}

/// Every remote entity materialized in the scene, by identity
#[derive(Resource, Default, Debug)]
pub struct RemoteEntities {
    records: HashMap<NetworkId, RemoteRecord>,
}

impl RemoteEntities {
    pub fn get(&self, id: &NetworkId) -> Option<RemoteEntity> {
        self.records.get(id).map(|record| record.remote)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NetworkId, RemoteEntity)> {
        self.records.iter().map(|(id, record)| (id, record.remote))
    }

    /// Applies every entry of a received batch.
    ///
    /// Self-owned entries are skipped. Other entries get a configured puppet, spawned or
    /// adopted if needed, which is then moved to the received pose.
    pub fn apply(
        &mut self,
        world: &mut World,
        local: &LocalIdentity,
        spawner: &mut dyn Spawner,
        config: &ReplicationConfig,
        batch: &CubeBatch,
        now: Duration,
    ) {
        for state in &batch.cubes {
            if local.owns(&state.id) {
                trace!(id = %state.id, "Skipping self-echo");
                continue;
            }
            let pose = state.pose();
            let remote = match self.live_record(world, &state.id) {
                Some(remote) => remote,
                None => self.materialize(world, spawner, &state.id, pose),
            };
            let remote = match remote {
                RemoteEntity::JustSpawned(entity) => {
                    configure_puppet(world, entity, &state.id, config);
                    RemoteEntity::Configured(entity)
                }
                configured => configured,
            };
            self.records.insert(
                state.id.clone(),
                RemoteRecord {
                    remote,
                    last_update: now,
                },
            );
            set_pose(world, remote.entity(), pose);
        }
    }

    fn live_record(&self, world: &World, id: &NetworkId) -> Option<RemoteEntity> {
        self.records
            .get(id)
            .map(|record| record.remote)
            .filter(|remote| world.get_entity(remote.entity()).is_ok())
    }

    /// Adopts an orphaned puppet of the same identity, or spawns a new representation
    fn materialize(
        &self,
        world: &mut World,
        spawner: &mut dyn Spawner,
        id: &NetworkId,
        pose: Pose,
    ) -> RemoteEntity {
        if let Some(entity) = self.find_orphan(world, id) {
            debug!(%id, ?entity, "Adopting orphaned puppet");
            return RemoteEntity::JustSpawned(entity);
        }
        let entity = match id.kind() {
            EntityKind::Player => {
                spawner.spawn_remote_player(world, pose, &format!("Remote Player [{id}]"))
            }
            EntityKind::Cube => spawner.spawn_remote_cube(world, pose, &format!("Remote Cube [{id}]")),
        };
        info!(%id, ?entity, "Spawned remote entity");
        RemoteEntity::JustSpawned(entity)
    }

    fn find_orphan(&self, world: &mut World, id: &NetworkId) -> Option<Entity> {
        let mut replicas = world.query::<(Entity, &RemoteReplica)>();
        replicas
            .iter(world)
            .find(|(entity, replica)| {
                replica.id == *id
                    && !self
                        .records
                        .values()
                        .any(|record| record.remote.entity() == *entity)
            })
            .map(|(entity, _)| entity)
    }

    /// Despawns the puppets that received no update within `timeout`
    pub fn expire(&mut self, world: &mut World, now: Duration, timeout: Duration) {
        self.records.retain(|id, record| {
            if now.saturating_sub(record.last_update) <= timeout {
                return true;
            }
            info!(%id, "Remote entity timed out");
            world.despawn(record.remote.entity());
            false
        });
    }

    /// Despawns every puppet and forgets them
    pub fn clear(&mut self, world: &mut World) {
        for (_, record) in self.records.drain() {
            world.despawn(record.remote.entity());
        }
    }
}

fn set_pose(world: &mut World, entity: Entity, pose: Pose) {
    let Ok(mut entity_mut) = world.get_entity_mut(entity) else {
        return;
    };
    match entity_mut.get_mut::<Transform>() {
        Some(mut transform) => {
            transform.translation = pose.position;
            transform.rotation = pose.rotation;
        }
        None => {
            entity_mut.insert(Transform::from(pose));
        }
    }
}

/// The entity and all its descendants
fn hierarchy(world: &World, root: Entity) -> Vec<Entity> {
    let mut entities = vec![root];
    let mut i = 0;
    while i < entities.len() {
        if let Some(children) = world.get::<Children>(entities[i]) {
            entities.extend(children.to_vec());
        }
        i += 1;
    }
    entities
}

/// Turns a representation into a puppet driven only by received poses
pub fn configure_puppet(world: &mut World, root: Entity, id: &NetworkId, config: &ReplicationConfig) {
    for entity in hierarchy(world, root) {
        let Ok(mut entity_mut) = world.get_entity_mut(entity) else {
            continue;
        };
        entity_mut.remove::<(Player, Cube)>();
        if let Some(mut behaviour) = entity_mut.get_mut::<Behaviour>() {
            if config.disabled_behaviours.contains(&behaviour.name) {
                behaviour.enabled = false;
            }
        }
        if let Some(mut body) = entity_mut.get_mut::<PhysicsBody>() {
            body.kinematic = true;
            body.linear_velocity = Vec3::ZERO;
            body.angular_velocity = Vec3::ZERO;
        }
        if let Some(mut controller) = entity_mut.get_mut::<CharacterController>() {
            controller.enabled = false;
        }
        if let Some(mut animator) = entity_mut.get_mut::<Animator>() {
            animator.apply_root_motion = false;
        }
    }
    if let Ok(mut entity_mut) = world.get_entity_mut(root) {
        entity_mut.insert(RemoteReplica { id: id.clone() });
    }
    debug!(%id, ?root, "Configured puppet");
}

/// Applies the batches dispatched this tick, then expires stale puppets
pub(crate) fn receive(world: &mut World) {
    let batches: Vec<CubeBatch> = world.resource_mut::<ReceivedBatches>().drain().collect();
    let now = world
        .get_resource::<Time>()
        .map_or(Duration::ZERO, |time| time.elapsed());
    world.resource_scope(|world, mut remotes: Mut<RemoteEntities>| {
        let config = world.resource::<ReplicationConfig>().clone();
        if !batches.is_empty() {
            let local = world.resource::<LocalIdentity>().clone();
            world.resource_scope(|world, mut spawner: Mut<RemoteSpawner>| {
                for batch in &batches {
                    remotes.apply(world, &local, spawner.0.as_mut(), &config, batch, now);
                }
            });
        }
        if let Some(timeout) = config.remote_timeout {
            remotes.expire(world, now, timeout);
        }
    });
}
