/// Socket health tracking for the websocket transport
///
/// Tracks inbound activity and outstanding pings so the transport can send a
/// keepalive after a quiet period and give up on a socket that went silent.
use std::time::{ Duration, Instant };

use crate::config::HeartbeatConfig;

/// What the transport should do on a health tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthVerdict {
    Healthy,
    SendPing,
    /// No inbound traffic for longer than the idle timeout
    Idle,
    /// A ping went unanswered for longer than the pong timeout
    PongOverdue,
}

#[derive(Debug)]
pub struct SocketHealth {
    /// Last inbound frame of any kind
    last_activity: Instant,

    /// Outstanding ping, cleared by any inbound frame
    last_ping: Option<Instant>,

    heartbeat_interval: Duration,
    idle_timeout: Duration,
    pong_timeout: Duration,
}

impl SocketHealth {
    pub fn new(config: &HeartbeatConfig) -> Self {
        Self {
            last_activity: Instant::now(),
            last_ping: None,
            heartbeat_interval: Duration::from_secs(config.interval_secs),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            pong_timeout: Duration::from_secs(config.pong_timeout_secs),
        }
    }

    pub fn record_activity(&mut self) {
        self.last_activity = Instant::now();
        self.last_ping = None;
    }

    pub fn record_ping(&mut self) {
        self.last_ping = Some(Instant::now());
    }

    pub fn seconds_since_activity(&self) -> u64 {
        self.last_activity.elapsed().as_secs()
    }

    pub fn check(&self) -> HealthVerdict {
        if self.last_activity.elapsed() > self.idle_timeout {
            return HealthVerdict::Idle;
        }
        match self.last_ping {
            Some(ping) if ping.elapsed() > self.pong_timeout => HealthVerdict::PongOverdue,
            Some(_) => HealthVerdict::Healthy,
            None if self.last_activity.elapsed() > self.heartbeat_interval =>
                HealthVerdict::SendPing,
            None => HealthVerdict::Healthy,
        }
    }
}
