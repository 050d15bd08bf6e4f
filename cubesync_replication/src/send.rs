//! Delta encoder: sends the poses that changed enough since the last send
use crate::components::{DisplayColor, RemoteReplica};
use crate::config::ReplicationConfig;
use crate::discovery::ReplicationSet;
use bevy_ecs::prelude::*;
use bevy_time::Time;
use bevy_transform::components::Transform;
use cubesync_connection::prelude::*;
use cubesync_core::prelude::Pose;
use cubesync_messages::prelude::*;
use tracing::{error, trace, warn};

/// What the encoder reads from a tracked entity
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    pub pose: Pose,
    pub color: DisplayColor,
    pub remote: bool,
}

impl ReplicationSet {
    /// Builds the batch of every dirty entry and records the poses as sent.
    ///
    /// An entry is dirty if it was never sent, if it moved or turned past a threshold, or if
    /// `force_all` is set. Entities that cannot be read, are puppets, or have a non-finite pose
    /// are skipped.
    pub fn collect_dirty(
        &mut self,
        force_all: bool,
        config: &ReplicationConfig,
        mut read: impl FnMut(Entity) -> Option<Snapshot>,
    ) -> CubeBatch {
        let mut cubes = Vec::new();
        for (entity, entry) in self.entries.iter_mut() {
            let Some(snapshot) = read(*entity) else {
                continue;
            };
            if snapshot.remote {
                continue;
            }
            if !snapshot.pose.is_finite() {
                warn!(?entity, id = %entry.id, pose = ?snapshot.pose, "Skipping non-finite pose");
                continue;
            }
            let dirty = force_all
                || entry.last_sent.is_none_or(|previous| {
                    snapshot.pose.exceeds(
                        &previous,
                        config.position_threshold,
                        config.rotation_threshold_degrees,
                    )
                });
            if !dirty {
                continue;
            }
            cubes.push(CubeState::new(
                entry.id.clone(),
                snapshot.color.to_hex(),
                &snapshot.pose,
            ));
            entry.last_sent = Some(snapshot.pose);
        }
        CubeBatch::new(cubes)
    }
}

/// Sends one batch whenever the connection cadence asks for it
pub(crate) fn send(
    time: Res<Time>,
    config: Res<ReplicationConfig>,
    mut connection: ResMut<Connection>,
    mut set: ResMut<ReplicationSet>,
    poses: Query<(&Transform, Option<&DisplayColor>, Has<RemoteReplica>)>,
) {
    let Some(due) = connection.tick_send(time.delta()) else {
        return;
    };
    let batch = set.collect_dirty(due.force_all, &config, |entity| {
        poses.get(entity).ok().map(|(transform, color, remote)| Snapshot {
            pose: Pose::from(transform),
            color: color.copied().unwrap_or_default(),
            remote,
        })
    });
    if batch.is_empty() {
        trace!(force_all = due.force_all, "Nothing to send");
        return;
    }
    trace!(len = batch.len(), force_all = due.force_all, "Sending batch");
    match encode_batch(&batch) {
        Ok(text) => connection.send(text),
        Err(e) => error!("Could not encode batch: {e}"),
    }
}
