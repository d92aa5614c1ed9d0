/// Configuration schemas - all config structures defined once with defaults
use crate::config_struct;

// ============================================================================
// CONNECTION CONFIGURATION
// ============================================================================

config_struct! {
    /// Socket endpoint and acknowledgement handling
    pub struct ConnectionConfig {
        /// WebSocket endpoint the transport dials
        url: String = "ws://127.0.0.1:4000/socket".to_string(),

        /// How long an action waits for ack-ok/ack-err before failing with Timeout
        ack_timeout_ms: u64 = 5000,

        /// Upper bound on in-flight actions awaiting acknowledgement
        max_pending_acks: usize = 1000,
    }
}

// ============================================================================
// RECONNECT CONFIGURATION
// ============================================================================

config_struct! {
    /// Reconnect backoff after transport loss
    pub struct ReconnectConfig {
        /// Retry the first attempt with no delay
        first_attempt_immediate: bool = true,

        /// Delay before the first delayed attempt
        initial_delay_ms: u64 = 500,

        /// Cap on the computed delay
        max_delay_ms: u64 = 30_000,

        /// Growth factor between attempts
        multiplier: f64 = 2.0,

        /// Fraction of the delay randomized in both directions (0.0 - 1.0)
        jitter_ratio: f64 = 0.2,
    }
}

// ============================================================================
// HEARTBEAT CONFIGURATION
// ============================================================================

config_struct! {
    /// Keepalive for the websocket transport
    pub struct HeartbeatConfig {
        /// Send a ping after this much silence
        interval_secs: u64 = 30,

        /// Treat the socket as lost after this much silence
        idle_timeout_secs: u64 = 90,

        /// Treat the socket as lost when a ping goes unanswered this long
        pong_timeout_secs: u64 = 10,
    }
}

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Root configuration
    pub struct Config {
        connection: ConnectionConfig = ConnectionConfig::default(),
        reconnect: ReconnectConfig = ReconnectConfig::default(),
        heartbeat: HeartbeatConfig = HeartbeatConfig::default(),
    }
}
