//! # Cubesync Messages
//!
//! Wire format exchanged between clients through the relay.
//!
//! Every payload is a UTF-8 JSON text frame:
//! - [`JoinMessage`]: sent once per connection, announces the local player
//! - [`CubeBatch`]: poses of every entity that changed, tagged with `"type": "cubes"`
//!
//! Inbound frames are routed on their `type` discriminator with [`decode`].

mod batch;
mod error;
mod join;

pub use batch::{CubeBatch, CubeState};
pub use error::{MessageError, Result};
pub use join::JoinMessage;

use serde::{Deserialize, Serialize};

pub mod prelude {
    pub use crate::batch::{CubeBatch, CubeState};
    pub use crate::error::MessageError;
    pub use crate::join::JoinMessage;
    pub use crate::{Inbound, decode, encode_batch, encode_join};
}

/// Value of the `type` field of a [`CubeBatch`]
pub const CUBES_TYPE: &str = "cubes";

/// Messages that carry a `type` discriminator
#[derive(Serialize)]
#[serde(tag = "type")]
enum Tagged<'a> {
    #[serde(rename = "cubes")]
    Cubes(&'a CubeBatch),
}

/// Only the discriminator of an inbound frame, the rest of the payload is ignored
#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// A decoded inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Cubes(CubeBatch),
    /// A well-formed frame whose type we do not handle
    Other(String),
}

pub fn encode_batch(batch: &CubeBatch) -> Result<String> {
    Ok(serde_json::to_string(&Tagged::Cubes(batch))?)
}

pub fn encode_join(join: &JoinMessage) -> Result<String> {
    Ok(serde_json::to_string(join)?)
}

/// Reads the `type` discriminator of the frame, then decodes the payload for that type
pub fn decode(text: &str) -> Result<Inbound> {
    let envelope: Envelope = serde_json::from_str(text)?;
    match envelope.kind {
        None => Err(MessageError::MissingType),
        Some(kind) if kind == CUBES_TYPE => Ok(Inbound::Cubes(serde_json::from_str(text)?)),
        Some(kind) => Ok(Inbound::Other(kind)),
    }
}
