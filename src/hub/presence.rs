/// Presence tracking for a topic
///
/// The server sends a full `presence:state` snapshot (object keyed by
/// participant id) and incremental `presence:join` / `presence:leave` diffs.
/// A diff is a single entry object carrying `participantId`, or an array of
/// such entries.
use serde_json::Value;
use std::collections::HashMap;

use super::message::{ EVENT_PRESENCE_JOIN, EVENT_PRESENCE_LEAVE, EVENT_PRESENCE_STATE };

const PARTICIPANT_ID: &str = "participantId";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresenceOp {
    State,
    Join,
    Leave,
}

impl PresenceOp {
    pub fn from_event(event: &str) -> Option<Self> {
        match event {
            EVENT_PRESENCE_STATE => Some(PresenceOp::State),
            EVENT_PRESENCE_JOIN => Some(PresenceOp::Join),
            EVENT_PRESENCE_LEAVE => Some(PresenceOp::Leave),
            _ => None,
        }
    }

    pub fn event(&self) -> &'static str {
        match self {
            PresenceOp::State => EVENT_PRESENCE_STATE,
            PresenceOp::Join => EVENT_PRESENCE_JOIN,
            PresenceOp::Leave => EVENT_PRESENCE_LEAVE,
        }
    }
}

/// Merged presence map: participant id → latest presence state
#[derive(Debug, Clone, Default)]
pub struct Presence {
    entries: HashMap<String, Value>,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one server diff; returns the number of entries it touched
    pub fn apply(&mut self, op: PresenceOp, diff: &Value) -> usize {
        match op {
            PresenceOp::State => {
                self.entries = match diff.as_object() {
                    Some(map) =>
                        map
                            .iter()
                            .map(|(id, state)| (id.clone(), state.clone()))
                            .collect(),
                    None => HashMap::new(),
                };
                self.entries.len()
            }
            PresenceOp::Join => {
                let mut touched = 0;
                for entry in diff_entries(diff) {
                    if let Some(id) = participant_id(entry) {
                        self.entries.insert(id, entry.clone());
                        touched += 1;
                    }
                }
                touched
            }
            PresenceOp::Leave => {
                let mut touched = 0;
                for entry in diff_entries(diff) {
                    if let Some(id) = participant_id(entry) {
                        if self.entries.remove(&id).is_some() {
                            touched += 1;
                        }
                    }
                }
                touched
            }
        }
    }

    pub fn get(&self, participant_id: &str) -> Option<&Value> {
        self.entries.get(participant_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.entries.clone()
    }
}

fn diff_entries(diff: &Value) -> Vec<&Value> {
    match diff {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn participant_id(entry: &Value) -> Option<String> {
    match entry.get(PARTICIPANT_ID)? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
