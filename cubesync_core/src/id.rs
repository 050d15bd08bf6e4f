//! Module to handle the identities entities are published under
use bevy_reflect::Reflect;
use core::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};

const PLAYER_PREFIX: &str = "player:";
const CUBE_PREFIX: &str = "cube:";

/// The category an identity belongs to, derived from its prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Reflect)]
pub enum EntityKind {
    /// `player:<seed>-<session>`, one per connecting process
    Player,
    /// `cube:<seed>:<suffix>`, one per spawned object
    Cube,
}

/// Globally unique identifier of a replicated entity.
///
/// Two shapes exist:
/// - `player:<persistentSeed>-<sessionSuffix>`
/// - `cube:<persistentSeed>:<randomSuffix>`
///
/// Identifiers received from the network are kept verbatim, even if they match neither shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Reflect)]
#[serde(transparent)]
pub struct NetworkId(String);

impl NetworkId {
    pub fn player(seed: &str, session: &str) -> Self {
        Self(format!("{PLAYER_PREFIX}{seed}-{session}"))
    }

    pub fn cube(seed: &str, suffix: u64) -> Self {
        Self(format!("{CUBE_PREFIX}{seed}:{suffix:016x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifiers starting with `player:` are players, everything else is treated as a cube.
    pub fn kind(&self) -> EntityKind {
        if self.0.starts_with(PLAYER_PREFIX) {
            EntityKind::Player
        } else {
            EntityKind::Cube
        }
    }

    /// Returns true if this identifier was derived from the given persistent seed.
    ///
    /// The seed has to be followed by the separator of its shape, so that a seed which is a
    /// prefix of another seed does not match.
    pub fn has_seed(&self, seed: &str) -> bool {
        if seed.is_empty() {
            return false;
        }
        if let Some(rest) = self.0.strip_prefix(PLAYER_PREFIX) {
            return rest
                .strip_prefix(seed)
                .is_some_and(|tail| tail.starts_with('-'));
        }
        if let Some(rest) = self.0.strip_prefix(CUBE_PREFIX) {
            return rest
                .strip_prefix(seed)
                .is_some_and(|tail| tail.starts_with(':'));
        }
        false
    }
}

impl Display for NetworkId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NetworkId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for NetworkId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_shapes() {
        let player = NetworkId::player("abc", "42");
        assert_eq!(player.as_str(), "player:abc-42");
        assert_eq!(player.kind(), EntityKind::Player);

        let cube = NetworkId::cube("abc", 0xff);
        assert_eq!(cube.as_str(), "cube:abc:00000000000000ff");
        assert_eq!(cube.kind(), EntityKind::Cube);
    }

    #[test]
    fn test_unknown_prefix_is_a_cube() {
        assert_eq!(NetworkId::from("player_1700000000").kind(), EntityKind::Cube);
    }

    #[test]
    fn test_has_seed() {
        assert!(NetworkId::from("player:abc-1").has_seed("abc"));
        assert!(NetworkId::from("cube:abc:123").has_seed("abc"));
        // the seed must be followed by the separator of the shape
        assert!(!NetworkId::from("cube:abcd:123").has_seed("abc"));
        assert!(!NetworkId::from("player:abcd-1").has_seed("abc"));
        assert!(!NetworkId::from("cube:abc-1").has_seed("abc"));
        assert!(!NetworkId::from("cube:abc:123").has_seed(""));
        assert!(!NetworkId::from("abc:123").has_seed("abc"));
    }
}
