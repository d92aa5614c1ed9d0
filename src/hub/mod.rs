/// Topic hub client
///
/// One persistent socket multiplexes many named topics. The client
/// identifies on the reserved `topichub` control topic, correlates every
/// outbound action with its `ack-ok` / `ack-err` by ref, and reconnects on
/// its own while keeping subscriptions intact from the caller's side.
///
/// ## Architecture
/// - `Connection` is the single owner of protocol state and the topic registry
/// - Transport callbacks and caller operations serialize through one lock
/// - Listener callbacks run after the lock is released
/// - Each socket gets a generation; callbacks from a replaced socket are ignored
///
/// ## Key Components
/// - `connection`: stage/status machine, identify, routing, reconnect
/// - `topic`: subscribe/unsubscribe, listeners, presence, status handlers
/// - `channel`: callbacks → ordered pull queue (`Stream`)
/// - `message`: wire envelopes and reserved names
/// - `pending`: bounded ref → waiter table
/// - `transport`: socket seam; `websocket`: tokio-tungstenite implementation
/// - `backoff`, `health`, `metrics`, `presence`, `refs`: supporting pieces
pub mod backoff;
pub mod channel;
pub mod connection;
pub mod health;
pub mod message;
pub mod metrics;
mod pending;
pub mod presence;
pub mod refs;
pub mod topic;
pub mod transport;
#[cfg(feature = "websocket")]
pub mod websocket;

#[cfg(test)]
mod tests;

pub use channel::{ ChannelEvent, TopicChannel };
pub use connection::{ Ack, Connection, HubEvent, Stage, Status };
pub use message::{ InboundEnvelope, OutboundEnvelope, TopicEvent, CONTROL_TOPIC };
pub use metrics::ConnectionMetricsSnapshot;
pub use presence::PresenceOp;
pub use topic::Topic;
pub use transport::{ Transport, TransportSink };
#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransport;
