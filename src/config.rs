//! Client configuration.

use std::time::Duration;

use crate::client::PendingQuestionPolicy;
use crate::protocol::{DEFAULT_HUB_URL, DEFAULT_PLAYER};

/// Delays before each reconnect attempt, in order. Exhausting the list ends
/// the session.
pub const DEFAULT_RECONNECT_DELAYS: [Duration; 4] = [
    Duration::from_secs(0),
    Duration::from_secs(2),
    Duration::from_secs(10),
    Duration::from_secs(30),
];

/// Interval between client pings.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Silence from the hub after which the link is considered dead.
pub const DEFAULT_SERVER_TIMEOUT: Duration = Duration::from_secs(30);

/// Time allowed for the protocol handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(15);

/// Time allowed for the hub to complete an invocation.
pub const DEFAULT_INVOCATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Time `disconnect` waits for the connection task before aborting it.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Configuration for a quiz session.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use math_game::ClientConfig;
///
/// let config = ClientConfig::new("http://localhost:5168/gamehub")
///     .with_player("Ada")
///     .with_reconnect_delays(vec![Duration::from_millis(500)]);
/// assert_eq!(config.player, "Ada");
/// assert_eq!(config.reconnect_delays.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Hub endpoint, `http(s)://` or `ws(s)://`.
    pub hub_url: String,
    /// Name reported with every answer.
    pub player: String,
    pub reconnect_delays: Vec<Duration>,
    pub keepalive_interval: Duration,
    pub server_timeout: Duration,
    pub handshake_timeout: Duration,
    pub invocation_timeout: Duration,
    pub shutdown_timeout: Duration,
    /// What to do with a question that arrives while another is unanswered.
    pub pending_policy: PendingQuestionPolicy,
}

impl ClientConfig {
    /// Create a configuration for `hub_url` with default values.
    pub fn new(hub_url: impl Into<String>) -> Self {
        Self {
            hub_url: hub_url.into(),
            player: DEFAULT_PLAYER.to_string(),
            reconnect_delays: DEFAULT_RECONNECT_DELAYS.to_vec(),
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            server_timeout: DEFAULT_SERVER_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            invocation_timeout: DEFAULT_INVOCATION_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            pending_policy: PendingQuestionPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_player(mut self, player: impl Into<String>) -> Self {
        self.player = player.into();
        self
    }

    /// Replace the reconnect schedule. An empty schedule disables reconnects.
    #[must_use]
    pub fn with_reconnect_delays(mut self, delays: Vec<Duration>) -> Self {
        self.reconnect_delays = delays;
        self
    }

    /// Set the keepalive interval. Zero is clamped to one millisecond.
    #[must_use]
    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval.max(Duration::from_millis(1));
        self
    }

    #[must_use]
    pub fn with_server_timeout(mut self, timeout: Duration) -> Self {
        self.server_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_invocation_timeout(mut self, timeout: Duration) -> Self {
        self.invocation_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_pending_policy(mut self, policy: PendingQuestionPolicy) -> Self {
        self.pending_policy = policy;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HUB_URL)
    }
}
