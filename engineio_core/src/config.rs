//! Handshake tunables advertised to clients.

use std::time::Duration;

/// Default interval at which clients are told to heartbeat.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_millis(25_000);

/// Default silence window after which clients consider the server gone.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Values advertised in the `OPEN` handshake.
///
/// The core only advertises these; it runs no liveness checks of its
/// own. Enforcement belongs to clients and to the layer above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineIoConfig {
    /// Advertised `pingInterval`, in whole milliseconds on the wire.
    pub ping_interval: Duration,
    /// Advertised `pingTimeout`, in whole milliseconds on the wire.
    pub ping_timeout: Duration,
}

impl Default for EngineIoConfig {
    fn default() -> Self {
        Self {
            ping_interval: DEFAULT_PING_INTERVAL,
            ping_timeout: DEFAULT_PING_TIMEOUT,
        }
    }
}

impl EngineIoConfig {
    /// Override the advertised ping interval.
    #[must_use]
    pub const fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Override the advertised ping timeout.
    #[must_use]
    pub const fn with_ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }
}
