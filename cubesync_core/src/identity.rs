//! Process-wide identity of the local client.
//!
//! The [`PersistentSeed`] survives process restarts when a seed store is configured; the session
//! suffix is regenerated on every start so that a new run never collides with a replica left over
//! from a previous run.
use crate::id::NetworkId;
use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub type Result<T> = core::result::Result<T, IdentityError>;

#[derive(thiserror::Error, Debug)]
pub enum IdentityError {
    #[error("could not access the seed store {}: {source}", .path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("the seed store {} does not contain a valid seed", .0.display())]
    InvalidSeed(PathBuf),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// File where the persistent seed is stored. If `None`, a fresh seed is generated on every start.
    pub seed_path: Option<PathBuf>,
}

impl IdentityConfig {
    pub fn with_seed_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.seed_path = Some(path.into());
        self
    }
}

/// Random identifier of this installation, embedded in every identity we publish
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PersistentSeed(String);

impl PersistentSeed {
    pub fn generate() -> Self {
        Self(format!("{:032x}", rand::random::<u128>()))
    }

    /// Wraps an existing seed.
    ///
    /// Returns `None` for a blank seed, or one containing anything else than ASCII
    /// alphanumerics and `_`: the identity separators `-` and `:` would let another client's
    /// identity match our seed.
    pub fn new(seed: impl Into<String>) -> Option<Self> {
        let seed = seed.into();
        let seed = seed.trim();
        if seed.is_empty()
            || !seed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return None;
        }
        Some(Self(seed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads the seed from `path`. A missing file is not an error.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match fs::read_to_string(path) {
            Ok(content) => Self::new(content)
                .map(Some)
                .ok_or_else(|| IdentityError::InvalidSeed(path.to_path_buf())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(IdentityError::Store {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn store(&self, path: &Path) -> Result<()> {
        let to_store_error = |source| IdentityError::Store {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(to_store_error)?;
        }
        fs::write(path, &self.0).map_err(to_store_error)
    }

    /// Loads the seed from the store, or generates and stores a new one.
    ///
    /// Store failures are logged and fall back to a seed that only lives for this process.
    pub fn load_or_generate(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::generate();
        };
        match Self::load(path) {
            Ok(Some(seed)) => {
                debug!(path = %path.display(), "Loaded persistent seed");
                return seed;
            }
            Ok(None) => {}
            Err(e) => warn!("Regenerating persistent seed: {e}"),
        }
        let seed = Self::generate();
        match seed.store(path) {
            Ok(()) => info!(path = %path.display(), "Stored new persistent seed"),
            Err(e) => warn!("Persistent seed will not survive a restart: {e}"),
        }
        seed
    }
}

/// Identity of the local process: persistent seed + per-session suffix.
///
/// Created once when the client starts and held for the lifetime of the process.
#[derive(Resource, Debug, Clone)]
pub struct LocalIdentity {
    seed: PersistentSeed,
    session: String,
    player_id: NetworkId,
}

impl LocalIdentity {
    /// Creates the identity for a new session of the given seed
    pub fn new(seed: PersistentSeed) -> Self {
        Self::with_session(seed, format!("{:016x}", rand::random::<u64>()))
    }

    pub fn with_session(seed: PersistentSeed, session: impl Into<String>) -> Self {
        let session = session.into();
        let player_id = NetworkId::player(seed.as_str(), &session);
        Self {
            seed,
            session,
            player_id,
        }
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        Self::new(PersistentSeed::load_or_generate(config.seed_path.as_deref()))
    }

    pub fn seed(&self) -> &PersistentSeed {
        &self.seed
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    /// The identity of the local player entity for this session
    pub fn player_id(&self) -> &NetworkId {
        &self.player_id
    }

    /// Synthesizes a fresh cube identity, with 64 bits of randomness
    pub fn new_cube_id(&self) -> NetworkId {
        NetworkId::cube(self.seed.as_str(), rand::random::<u64>())
    }

    /// Returns true if the identifier was published by this installation
    pub fn owns(&self, id: &NetworkId) -> bool {
        id.has_seed(self.seed.as_str())
    }
}
