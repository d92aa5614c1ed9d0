/// Pending acknowledgement table
///
/// Maps an outbound ref to the waiter of its `ack-ok` / `ack-err`. An entry
/// is removed the moment it is taken and resolving consumes it, so a ref is
/// answered at most once.
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{ Duration, Instant };
use tokio::sync::oneshot;

use super::topic::TopicInner;
use crate::errors::{ HubError, HubResult };

pub type AckSender = oneshot::Sender<HubResult<Value>>;
pub type AckReceiver = oneshot::Receiver<HubResult<Value>>;

/// What an acknowledgement means for connection state
pub(crate) enum AckKind {
    /// Caller-issued subscribe; `ack-ok` marks the topic subscribed
    Subscribe(Arc<TopicInner>),
    /// Caller-issued unsubscribe; `ack-ok` tears the topic down
    Unsubscribe(Arc<TopicInner>),
    /// Automatic subscribe after reconnect; `ack-err` surfaces `unsubscribed`
    Resubscribe(Arc<TopicInner>),
    /// Topic push awaiting its reply
    Request,
}

pub(crate) struct PendingEntry {
    pub kind: AckKind,
    pub sent_at: Instant,
    sender: AckSender,
}

impl PendingEntry {
    /// Deliver the outcome; the waiter may already be gone (dropped future)
    pub fn resolve(self, result: HubResult<Value>) {
        let _ = self.sender.send(result);
    }
}

pub(crate) struct PendingAcks {
    entries: HashMap<String, PendingEntry>,
    limit: usize,
}

impl PendingAcks {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: HashMap::new(),
            limit,
        }
    }

    /// Register a waiter for `reference`
    pub fn insert(&mut self, reference: &str, kind: AckKind) -> HubResult<AckReceiver> {
        if self.entries.len() >= self.limit {
            return Err(HubError::PendingLimit { limit: self.limit });
        }
        debug_assert!(!self.entries.contains_key(reference), "ref {} registered twice", reference);

        let (sender, receiver) = oneshot::channel();
        self.entries.insert(reference.to_string(), PendingEntry {
            kind,
            sent_at: Instant::now(),
            sender,
        });
        Ok(receiver)
    }

    /// Remove the entry for `reference`; `None` if it was never registered or already answered
    pub fn take(&mut self, reference: &str) -> Option<PendingEntry> {
        self.entries.remove(reference)
    }

    /// Remove every entry (disconnect / transport loss)
    pub fn drain(&mut self) -> Vec<PendingEntry> {
        self.entries
            .drain()
            .map(|(_, entry)| entry)
            .collect()
    }

    /// Remove every entry registered at least `max_age` ago
    pub fn take_expired(&mut self, max_age: Duration) -> Vec<(String, PendingEntry)> {
        let stale: Vec<String> = self.entries
            .iter()
            .filter(|(_, entry)| entry.sent_at.elapsed() >= max_age)
            .map(|(reference, _)| reference.clone())
            .collect();
        stale
            .into_iter()
            .filter_map(|reference| {
                let entry = self.entries.remove(&reference)?;
                Some((reference, entry))
            })
            .collect()
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.entries.contains_key(reference)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
