use std::sync::atomic::{ AtomicU64, Ordering };

/// Correlation reference generator
///
/// Refs are decimal strings of a per-connection monotonic counter, so they
/// never repeat for the lifetime of a connection (across reconnects too).
#[derive(Debug)]
pub struct RefGenerator {
    next: AtomicU64,
}

impl RefGenerator {
    pub fn new() -> Self {
        Self { next: AtomicU64::new(1) }
    }

    pub fn next_ref(&self) -> String {
        self.next.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

impl Default for RefGenerator {
    fn default() -> Self {
        Self::new()
    }
}
