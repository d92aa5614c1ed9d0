/// Process-wide connection slot
///
/// The binary installs one `Connection` at startup; library code that has no
/// handle of its own resolves it here. Tests build isolated connections and
/// leave this empty.
use chrono::{ DateTime, Utc };
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::errors::{ HubError, HubResult };
use crate::hub::Connection;

static CONNECTION: Lazy<RwLock<Option<Connection>>> = Lazy::new(|| RwLock::new(None));

/// Startup timestamp, for uptime reporting
pub static STARTUP_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// Install the process-wide connection, returning any previous one
pub fn install(connection: Connection) -> Option<Connection> {
    CONNECTION.write().replace(connection)
}

pub fn current() -> Option<Connection> {
    CONNECTION.read().clone()
}

/// The installed connection, or `NotReady` when none was installed
pub fn require() -> HubResult<Connection> {
    current().ok_or(HubError::NotReady)
}

/// Remove the installed connection (it is not disconnected)
pub fn take() -> Option<Connection> {
    CONNECTION.write().take()
}

pub fn uptime_secs() -> i64 {
    (Utc::now() - *STARTUP_TIME).num_seconds()
}
