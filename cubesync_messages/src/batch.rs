use bevy_math::{Quat, Vec3};
use cubesync_core::pose::{normalize_or_identity, round_wire};
use cubesync_core::prelude::{NetworkId, Pose};
use serde::{Deserialize, Serialize};

/// Pose of a single entity inside a [`CubeBatch`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeState {
    pub id: NetworkId,
    /// `#RRGGBB` display hint. Receivers never apply it.
    pub color: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub qx: f32,
    pub qy: f32,
    pub qz: f32,
    pub qw: f32,
}

impl CubeState {
    /// Builds the wire state of `pose`, every component rounded to the wire precision
    pub fn new(id: NetworkId, color: impl Into<String>, pose: &Pose) -> Self {
        let Pose { position, rotation } = *pose;
        Self {
            id,
            color: color.into(),
            x: round_wire(position.x),
            y: round_wire(position.y),
            z: round_wire(position.z),
            qx: round_wire(rotation.x),
            qy: round_wire(rotation.y),
            qz: round_wire(rotation.z),
            qw: round_wire(rotation.w),
        }
    }

    /// The received pose. The quaternion is renormalized since rounding breaks its unit norm.
    pub fn pose(&self) -> Pose {
        Pose::new(
            Vec3::new(self.x, self.y, self.z),
            normalize_or_identity(Quat::from_xyzw(self.qx, self.qy, self.qz, self.qw)),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CubeBatch {
    pub cubes: Vec<CubeState>,
}

impl CubeBatch {
    pub fn new(cubes: Vec<CubeState>) -> Self {
        Self { cubes }
    }

    pub fn is_empty(&self) -> bool {
        self.cubes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cubes.len()
    }
}
