//! Contains a set of shared types
//!
//! - [`id`]: the string identities entities are published under
//! - [`identity`]: the process-wide seed those identities are derived from
//! - [`pose`]: position + orientation math used by the delta encoder and the receiver

pub mod id;
pub mod identity;
pub mod pose;

pub mod prelude {
    pub use crate::id::{EntityKind, NetworkId};
    pub use crate::identity::{IdentityConfig, IdentityError, LocalIdentity, PersistentSeed};
    pub use crate::pose::Pose;
}
