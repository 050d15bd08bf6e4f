use core::time::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Endpoint of the relay
    pub url: String,
    /// Platform announced in the join message
    pub platform: String,
    /// Interval between two delta sends
    pub send_interval: Duration,
    /// Interval between two forced full sends
    pub resync_interval: Duration,
    /// Send every tracked entity right after the connection opens
    pub force_send_on_connect: bool,
    /// Connect as soon as the app starts
    pub auto_connect: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/ws".to_owned(),
            platform: std::env::consts::OS.to_owned(),
            send_interval: Duration::from_millis(100),
            resync_interval: Duration::from_secs(2),
            force_send_on_connect: true,
            auto_connect: false,
        }
    }
}

impl ConnectionConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn with_send_interval(mut self, send_interval: Duration) -> Self {
        self.send_interval = send_interval;
        self
    }

    pub fn with_resync_interval(mut self, resync_interval: Duration) -> Self {
        self.resync_interval = resync_interval;
        self
    }

    pub fn with_force_send_on_connect(mut self, force: bool) -> Self {
        self.force_send_on_connect = force;
        self
    }

    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }
}
