use bevy_ecs::prelude::Resource;
use core::time::Duration;
use serde::{Deserialize, Serialize};

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    /// Minimum distance an entity has to move before it is sent again
    pub position_threshold: f32,
    /// Minimum rotation, in degrees, before an entity is sent again
    pub rotation_threshold_degrees: f32,
    /// Interval between two scans for new local entities
    pub rescan_interval: Duration,
    /// Names of the input/control [`Behaviour`](crate::components::Behaviour)s disabled on puppets
    pub disabled_behaviours: Vec<String>,
    /// Puppets that received no update for this long are despawned. `None` keeps them forever.
    pub remote_timeout: Option<Duration>,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            position_threshold: 0.01,
            rotation_threshold_degrees: 1.0,
            rescan_interval: Duration::from_millis(500),
            disabled_behaviours: vec!["PlayerHandler".to_owned(), "Jump".to_owned()],
            remote_timeout: None,
        }
    }
}

impl ReplicationConfig {
    pub fn with_position_threshold(mut self, threshold: f32) -> Self {
        self.position_threshold = threshold;
        self
    }

    pub fn with_rotation_threshold_degrees(mut self, threshold: f32) -> Self {
        self.rotation_threshold_degrees = threshold;
        self
    }

    pub fn with_rescan_interval(mut self, interval: Duration) -> Self {
        self.rescan_interval = interval;
        self
    }

    pub fn with_disabled_behaviours<S: Into<String>>(
        mut self,
        names: impl IntoIterator<Item = S>,
    ) -> Self {
        self.disabled_behaviours = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_remote_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.remote_timeout = timeout;
        self
    }
}
