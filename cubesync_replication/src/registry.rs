//! Stable network identities of local entities
use bevy_ecs::entity::Entity;
use bevy_ecs::prelude::Resource;
use bevy_platform::collections::HashMap;
use cubesync_core::prelude::{LocalIdentity, NetworkId};
use tracing::debug;

/// How an entity is categorized in the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Player,
    Cube,
    /// Puppet of an entity owned by someone else
    Remote,
    Untagged,
}

impl Category {
    pub fn of(is_player: bool, is_cube: bool, is_remote: bool) -> Self {
        match (is_remote, is_player, is_cube) {
            (true, _, _) => Category::Remote,
            (_, true, _) => Category::Player,
            (_, _, true) => Category::Cube,
            _ => Category::Untagged,
        }
    }
}

/// Maps local entities to the identity they are published under.
///
/// An identity is assigned once and kept until the entity is forgotten.
#[derive(Resource, Default, Debug)]
pub struct IdentityRegistry {
    ids: HashMap<Entity, NetworkId>,
}

impl IdentityRegistry {
    /// Returns the identity of the entity, assigning one on first use.
    ///
    /// Puppets and untagged entities never get an identity.
    pub fn identity_for(
        &mut self,
        local: &LocalIdentity,
        entity: Entity,
        category: Category,
    ) -> Option<NetworkId> {
        if let Some(id) = self.ids.get(&entity) {
            return Some(id.clone());
        }
        let id = match category {
            Category::Player => local.player_id().clone(),
            Category::Cube => local.new_cube_id(),
            Category::Remote | Category::Untagged => return None,
        };
        debug!(?entity, %id, "Assigned network identity");
        self.ids.insert(entity, id.clone());
        Some(id)
    }

    pub fn get(&self, entity: Entity) -> Option<&NetworkId> {
        self.ids.get(&entity)
    }

    pub fn forget(&mut self, entity: Entity) -> Option<NetworkId> {
        self.ids.remove(&entity)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
