use cubesync_core::prelude::NetworkId;
use serde::{Deserialize, Serialize};

/// Announcement sent once right after the connection opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinMessage {
    #[serde(rename = "playerId")]
    pub player_id: NetworkId,
    pub platform: String,
}

impl JoinMessage {
    pub fn new(player_id: NetworkId, platform: impl Into<String>) -> Self {
        Self {
            player_id,
            platform: platform.into(),
        }
    }
}
