#![allow(warnings)]

pub mod arguments;
pub mod config;
pub mod errors;
pub mod global;
pub mod hub;
pub mod logger;

pub use errors::{ HubError, HubResult };
pub use hub::{ Ack, ChannelEvent, Connection, HubEvent, Stage, Status, Topic, TopicChannel };

/// Serializes tests that rewrite the process-wide argument list
#[cfg(test)]
pub(crate) static TEST_ARGS_LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());
