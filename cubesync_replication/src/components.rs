//! Components read and written by replication
use bevy_ecs::prelude::Component;
use bevy_math::Vec3;
use bevy_reflect::Reflect;
use cubesync_core::prelude::NetworkId;

/// Category tag: the locally-owned player avatar
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq, Reflect)]
pub struct Player;

/// Category tag: a locally-owned movable cube
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq, Reflect)]
pub struct Cube;

/// Marks a puppet driven by the poses received for `id`.
///
/// Entities with this marker are never published.
#[derive(Component, Debug, Clone, PartialEq, Eq, Reflect)]
pub struct RemoteReplica {
    pub id: NetworkId,
}

/// Display color sent along with the pose. Puppets never apply it.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub struct DisplayColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Default for DisplayColor {
    fn default() -> Self {
        Self::WHITE
    }
}

impl DisplayColor {
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#RRGGBB`
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Named input/control behaviour run by the local movement code
#[derive(Component, Debug, Clone, PartialEq, Eq, Reflect)]
pub struct Behaviour {
    pub name: String,
    pub enabled: bool,
}

impl Behaviour {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
        }
    }
}

/// Rigid body stepped by the local physics
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Reflect)]
pub struct PhysicsBody {
    /// Kinematic bodies are moved by hand, never simulated
    pub kinematic: bool,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

/// Autonomous navigation / character controller
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub struct CharacterController {
    pub enabled: bool,
}

impl Default for CharacterController {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub struct Animator {
    pub apply_root_motion: bool,
}

impl Default for Animator {
    fn default() -> Self {
        Self {
            apply_root_motion: true,
        }
    }
}

/// Generic shape spawned when no template is configured for a remote kind
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum Placeholder {
    Capsule,
    Cuboid,
}
