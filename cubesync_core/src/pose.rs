//! Position + orientation of a replicated entity
use bevy_math::{Quat, Vec3};
use bevy_transform::components::Transform;

/// Number of decimals kept for every pose component on the wire
pub const WIRE_DECIMALS: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Euclidean distance between the two positions
    pub fn distance(&self, other: &Self) -> f32 {
        self.position.distance(other.position)
    }

    /// Rotation angle in degrees needed to go from one orientation to the other
    pub fn angle_degrees(&self, other: &Self) -> f32 {
        angle_between_degrees(self.rotation, other.rotation)
    }

    /// Returns false if any component is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite()
    }

    /// Returns true if the pose moved further than either threshold away from `previous`
    pub fn exceeds(&self, previous: &Self, position_threshold: f32, rotation_threshold: f32) -> bool {
        self.distance(previous) > position_threshold
            || self.angle_degrees(previous) > rotation_threshold
    }
}

impl From<&Transform> for Pose {
    fn from(transform: &Transform) -> Self {
        Self::new(transform.translation, transform.rotation)
    }
}

impl From<Pose> for Transform {
    fn from(pose: Pose) -> Self {
        Transform::from_translation(pose.position).with_rotation(pose.rotation)
    }
}

/// Rounds to [`WIRE_DECIMALS`] decimals
pub fn round_wire(value: f32) -> f32 {
    let scale = 10f32.powi(WIRE_DECIMALS);
    (value * scale).round() / scale
}

/// Renormalizes a quaternion that went over the wire.
///
/// Degenerate inputs (zero norm, NaN or infinite components) become the identity rotation.
pub fn normalize_or_identity(rotation: Quat) -> Quat {
    let length = rotation.length();
    if !length.is_finite() || length <= f32::EPSILON {
        return Quat::IDENTITY;
    }
    rotation / length
}

/// Angle of the rotation between two unit quaternions, in degrees.
///
/// Uses `4 * atan2(|a - b|, |a + b|)` which stays accurate for tiny angles, where `acos` of
/// the dot product loses all precision in f32.
pub fn angle_between_degrees(a: Quat, b: Quat) -> f32 {
    // q and -q are the same rotation
    let b = if a.dot(b) < 0.0 { -b } else { b };
    (4.0 * (a - b).length().atan2((a + b).length())).to_degrees()
}
