//! End-to-end scenarios against a mock transport

use parking_lot::Mutex;
use serde_json::{ json, Value };
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::Arc;
use std::time::Duration;

use super::transport::mock::MockTransport;
use super::*;
use crate::config::Config;
use crate::errors::HubError;

fn test_config() -> Config {
    let mut config = Config::default();
    config.connection.ack_timeout_ms = 200;
    config.reconnect.jitter_ratio = 0.0;
    config.reconnect.initial_delay_ms = 20;
    config
}

fn setup_with(config: &Config) -> (Connection, MockTransport) {
    let transport = MockTransport::new();
    let connection = Connection::from_config(transport.clone(), config);
    (connection, transport)
}

fn setup() -> (Connection, MockTransport) {
    setup_with(&test_config())
}

/// Acknowledge the most recent identify frame
fn ack_identify(transport: &MockTransport) -> String {
    let identify = transport.last_sent();
    assert!(identify.is_identify());
    transport.ack(CONTROL_TOPIC, &identify.reference, true, json!({}));
    identify.reference
}

fn identified() -> (Connection, MockTransport) {
    let (connection, transport) = setup();
    connection.connect("TOKEN").unwrap();
    transport.sink().opened();
    ack_identify(&transport);
    assert_eq!(connection.status(), Status::Identified);
    (connection, transport)
}

/// Subscribe `name` and acknowledge it
async fn subscribed(connection: &Connection, transport: &MockTransport, name: &str) -> Topic {
    let topic = connection.topic(name);
    let ack = topic.subscribe(None);
    let reference = ack.reference().expect("subscribe sent").to_string();
    transport.ack(name, &reference, true, json!({}));
    ack.await.unwrap();
    assert!(topic.is_subscribed());
    topic
}

fn counter() -> (Arc<AtomicUsize>, impl Fn(&Value) + Send + Sync + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let handle = count.clone();
    (count, move |_: &Value| {
        handle.fetch_add(1, Ordering::SeqCst);
    })
}

// ============================================================================
// CONNECTION LIFECYCLE
// ============================================================================

#[test]
fn test_fresh_connect_sequence() {
    let (connection, transport) = setup();
    assert_eq!(connection.stage(), Stage::Closed);
    assert_eq!(connection.status(), Status::Closed);

    // Handlers may call back into the connection
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let inner = connection.clone();
    connection.on(HubEvent::Identify, move |_| seen_clone.lock().push(inner.status()));

    connection.connect("TOKEN").unwrap();
    assert_eq!(connection.stage(), Stage::Connecting);
    assert_eq!(connection.status(), Status::Connecting);

    transport.sink().opened();
    assert_eq!(connection.status(), Status::Identifying);

    let identify = transport.last_sent();
    assert_eq!(identify.topic, "topichub");
    assert_eq!(identify.action, "identify");
    assert_eq!(identify.payload, json!({"token": "TOKEN"}));

    transport.ack(CONTROL_TOPIC, &identify.reference, true, json!({}));
    assert_eq!(connection.stage(), Stage::Connecting);
    assert_eq!(connection.status(), Status::Identified);
    assert_eq!(*seen.lock(), vec![Status::Identified]);
}

#[test]
fn test_reconnect_sequence() {
    let (connection, transport) = identified();
    let first_ref = transport.last_sent().reference;

    let (identifies, on_identify) = counter();
    let (disconnects, on_disconnect) = counter();
    connection.on(HubEvent::Identify, on_identify).on(HubEvent::Disconnect, on_disconnect);

    transport.sink().closed("server went away");
    assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    assert_eq!(connection.stage(), Stage::Reconnecting);
    assert_eq!(connection.status(), Status::Reconnecting);

    // First attempt is immediate
    assert_eq!(transport.open_count(), 2);
    transport.sink().opened();
    assert_eq!(connection.status(), Status::Identifying);

    let identify = transport.last_sent();
    assert!(identify.is_identify());
    assert_ne!(identify.reference, first_ref);

    transport.ack(CONTROL_TOPIC, &identify.reference, true, json!({}));
    assert_eq!(connection.stage(), Stage::Reconnecting);
    assert_eq!(connection.status(), Status::Identified);
    assert_eq!(identifies.load(Ordering::SeqCst), 1);
    assert_eq!(connection.reconnect_attempt(), 0);
    assert_eq!(connection.metrics().transport_losses, 1);
}

#[test]
fn test_identified_iff_handshake_completed_on_open_transport() {
    let (connection, transport) = setup();
    let check = |open: bool, acked: bool| {
        assert_eq!(
            connection.status() == Status::Identified,
            connection.stage() != Stage::Closed && open && acked
        );
    };

    check(false, false);
    connection.connect("TOKEN").unwrap();
    check(false, false);
    transport.sink().opened();
    check(true, false);
    ack_identify(&transport);
    check(true, true);
    transport.sink().closed("lost");
    check(false, false);
    transport.sink().opened();
    check(true, false);
    ack_identify(&transport);
    check(true, true);
    connection.disconnect();
    check(false, false);
}

#[test]
fn test_connect_twice_is_rejected() {
    let (connection, _transport) = setup();
    connection.connect("TOKEN").unwrap();
    assert!(matches!(connection.connect("TOKEN"), Err(HubError::AlreadyConnected)));

    connection.disconnect();
    assert!(connection.connect("OTHER").is_ok());
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let (connection, transport) = identified();
    let topic = subscribed(&connection, &transport, "discussions/discussion/1").await;

    let statuses = Arc::new(Mutex::new(Vec::new()));
    let statuses_clone = statuses.clone();
    topic.on_status(move |status| statuses_clone.lock().push(status));
    let (unsubscribed, on_unsubscribed) = counter();
    topic.on(TopicEvent::Unsubscribed, on_unsubscribed);

    let pending = topic.request("message:create", json!({"body": "hi"}));

    connection.disconnect();
    assert!(matches!(pending.await, Err(HubError::Cancelled)));
    assert_eq!(connection.status(), Status::Closed);
    assert!(topic.is_closed());
    assert!(connection.topic_names().is_empty());
    assert_eq!(transport.close_count(), 1);

    connection.disconnect();
    assert_eq!(connection.status(), Status::Closed);
    assert_eq!(transport.close_count(), 1);

    assert_eq!(*statuses.lock(), vec![Status::Closed]);
    assert_eq!(unsubscribed.load(Ordering::SeqCst), 0);
    assert_eq!(connection.metrics().acks_cancelled, 1);
}

#[test]
fn test_identify_rejection_closes_connection() {
    let (connection, transport) = setup();
    let payload = Arc::new(Mutex::new(Value::Null));
    let payload_clone = payload.clone();
    connection.on(HubEvent::IdentifyRejected, move |p| {
        *payload_clone.lock() = p.clone();
    });

    connection.connect("BAD").unwrap();
    transport.sink().opened();
    let identify = transport.last_sent();
    transport.ack(CONTROL_TOPIC, &identify.reference, false, json!({"message": "invalid token"}));

    assert_eq!(connection.status(), Status::Closed);
    assert_eq!(transport.close_count(), 1);
    assert_eq!(*payload.lock(), json!({"message": "invalid token"}));
    // No reconnect after a rejection
    assert_eq!(transport.open_count(), 1);
}

#[test]
fn test_send_requires_identify() {
    let (connection, transport) = setup();
    let business = || OutboundEnvelope::new("t", "message:create", json!({}), "99");

    assert!(matches!(connection.send(business()), Err(HubError::NotReady)));

    connection.connect("TOKEN").unwrap();
    transport.sink().opened();
    assert!(matches!(connection.send(business()), Err(HubError::NotReady)));
    assert!(matches!(connection.topic("t").send("message:create", json!({})), Err(HubError::NotReady)));

    ack_identify(&transport);
    connection.send(business()).unwrap();
    assert_eq!(transport.last_sent().action, "message:create");
}

#[tokio::test]
async fn test_subscribe_before_identify_is_not_ready() {
    let (connection, transport) = setup();
    connection.connect("TOKEN").unwrap();

    let sent_before = transport.sent().len();
    let result = connection.topic("t").subscribe(None).await;
    assert!(matches!(result, Err(HubError::NotReady)));
    assert_eq!(transport.sent().len(), sent_before);
}

// ============================================================================
// ACKNOWLEDGEMENTS
// ============================================================================

#[tokio::test]
async fn test_subscribe_rejected_keeps_topic_unsubscribed() {
    let (connection, transport) = identified();
    let topic = connection.topic("t");

    let ack = topic.subscribe(None);
    let sent = transport.last_sent();
    assert_eq!(sent.topic, "t");
    assert_eq!(sent.action, "subscribe");
    assert_eq!(sent.payload, json!({}));
    assert_eq!(topic.reference().as_deref(), Some(sent.reference.as_str()));

    transport.ack("t", &sent.reference, false, json!({"message": "denied"}));

    let err = ack.await.unwrap_err();
    assert_eq!(err.server_message(), Some("denied"));
    assert!(err.to_string().contains("denied"));
    assert!(!topic.is_subscribed());
}

#[tokio::test]
async fn test_subscribe_with_invitation_token() {
    let (connection, transport) = identified();
    let topic = connection.topic("t");

    let ack = topic.subscribe(Some("INVITE"));
    let sent = transport.last_sent();
    assert_eq!(sent.payload, json!({"token": "INVITE"}));

    transport.ack("t", &sent.reference, true, json!({"joined": true}));
    assert_eq!(ack.await.unwrap(), json!({"joined": true}));
    assert!(topic.is_subscribed());
}

#[tokio::test]
async fn test_ack_timeout_removes_pending_entry() {
    let mut config = test_config();
    config.connection.ack_timeout_ms = 50;
    let (connection, transport) = setup_with(&config);
    connection.connect("TOKEN").unwrap();
    transport.sink().opened();
    ack_identify(&transport);

    let topic = connection.topic("t");
    let ack = topic.subscribe(None);
    let reference = ack.reference().unwrap().to_string();
    assert_eq!(connection.pending_count(), 1);

    assert!(matches!(ack.await, Err(HubError::Timeout { ms: 50 })));
    assert_eq!(connection.pending_count(), 0);
    assert_eq!(connection.metrics().acks_timed_out, 1);

    // A late reply finds nothing to resolve
    transport.ack("t", &reference, true, json!({}));
    assert!(!topic.is_subscribed());
}

#[tokio::test]
async fn test_dropped_ack_still_expires() {
    let mut config = test_config();
    config.connection.ack_timeout_ms = 50;
    config.connection.max_pending_acks = 1;
    let (connection, transport) = setup_with(&config);
    connection.connect("TOKEN").unwrap();
    transport.sink().opened();
    ack_identify(&transport);

    let topic = connection.topic("t");
    drop(topic.subscribe(None));
    assert_eq!(connection.pending_count(), 1);
    assert!(matches!(topic.request("ping", json!({})).await, Err(HubError::PendingLimit { limit: 1 })));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(connection.pending_count(), 0);
    assert_eq!(connection.metrics().acks_timed_out, 1);

    // The slot is free again
    let ack = topic.request("ping", json!({}));
    assert!(ack.reference().is_some());
}

#[tokio::test]
async fn test_unanswered_channel_unsubscribe_expires() {
    let mut config = test_config();
    config.connection.ack_timeout_ms = 50;
    let (connection, transport) = setup_with(&config);
    connection.connect("TOKEN").unwrap();
    transport.sink().opened();
    ack_identify(&transport);
    let topic = subscribed(&connection, &transport, "t").await;

    drop(TopicChannel::new(&topic));
    assert_eq!(connection.pending_count(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(connection.pending_count(), 0);
    assert!(!topic.is_closed());
}

#[tokio::test]
async fn test_pending_limit() {
    let mut config = test_config();
    config.connection.max_pending_acks = 2;
    let (connection, transport) = setup_with(&config);
    connection.connect("TOKEN").unwrap();
    transport.sink().opened();
    ack_identify(&transport);

    let topic = connection.topic("t");
    let _first = topic.request("message:create", json!({}));
    let _second = topic.request("message:create", json!({}));
    let sent = transport.sent().len();

    let third = topic.request("message:create", json!({})).await;
    assert!(matches!(third, Err(HubError::PendingLimit { limit: 2 })));
    assert_eq!(transport.sent().len(), sent);
}

#[tokio::test]
async fn test_request_resolves_with_reply_payload() {
    let (connection, transport) = identified();
    let topic = subscribed(&connection, &transport, "t").await;

    let ack = topic.request("message:create", json!({"body": "hello"}));
    let sent = transport.last_sent();
    assert_eq!(sent.action, "message:create");
    assert_eq!(sent.payload, json!({"body": "hello"}));

    transport.ack("t", &sent.reference, true, json!({"id": 7}));
    assert_eq!(ack.await.unwrap(), json!({"id": 7}));
    assert_eq!(connection.pending_count(), 0);
}

#[tokio::test]
async fn test_pending_rejected_on_transport_loss() {
    let (connection, transport) = identified();
    let topic = subscribed(&connection, &transport, "t").await;

    let ack = topic.request("message:create", json!({}));
    transport.sink().closed("reset");

    assert!(matches!(ack.await, Err(HubError::NotReady)));
    assert_eq!(connection.pending_count(), 0);
}

#[tokio::test]
async fn test_acks_are_not_forwarded_to_listeners() {
    let (connection, transport) = identified();
    let topic = subscribed(&connection, &transport, "t").await;

    let (acks_seen, on_ack) = counter();
    topic.on("ack-ok", on_ack);

    let ack = topic.request("message:create", json!({}));
    let reference = ack.reference().unwrap().to_string();
    transport.ack("t", &reference, true, json!({}));
    ack.await.unwrap();

    // Unknown refs are dropped too
    transport.ack("t", "does-not-exist", true, json!({}));
    assert_eq!(acks_seen.load(Ordering::SeqCst), 0);
}

// ============================================================================
// TOPICS
// ============================================================================

#[tokio::test]
async fn test_presence_join_then_leave() {
    let (connection, transport) = identified();
    let topic = subscribed(&connection, &transport, "t").await;

    let ops = Arc::new(Mutex::new(Vec::new()));
    let ops_clone = ops.clone();
    topic.on_presence(move |op, _| ops_clone.lock().push(op));

    transport.push("t", "presence:join", json!({"participantId": "p1", "typing": false}));
    assert!(topic.presence().contains_key("p1"));

    transport.push("t", "presence:leave", json!({"participantId": "p1"}));
    assert!(topic.presence().is_empty());
    assert_eq!(*ops.lock(), vec![PresenceOp::Join, PresenceOp::Leave]);
}

#[tokio::test]
async fn test_events_only_reach_their_topic() {
    let (connection, transport) = identified();
    let a = subscribed(&connection, &transport, "a").await;
    let b = subscribed(&connection, &transport, "b").await;

    let (a_count, on_a) = counter();
    let (b_count, on_b) = counter();
    a.on(TopicEvent::MessageCreated, on_a);
    b.on(TopicEvent::MessageCreated, on_b);

    transport.push("a", "message:created", json!({"id": 1}));
    transport.push("a", "message:created", json!({"id": 2}));
    transport.push("b", "message:created", json!({"id": 3}));
    transport.push("unknown", "message:created", json!({"id": 4}));

    assert_eq!(a_count.load(Ordering::SeqCst), 2);
    assert_eq!(b_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_server_unsubscribed_tears_topic_down() {
    let (connection, transport) = identified();
    let topic = subscribed(&connection, &transport, "t").await;

    let payload = Arc::new(Mutex::new(Value::Null));
    let payload_clone = payload.clone();
    topic.on(TopicEvent::Unsubscribed, move |p| {
        *payload_clone.lock() = p.clone();
    });

    transport.push("t", "unsubscribed", json!({"reason": "removed"}));

    assert_eq!(*payload.lock(), json!({"reason": "removed"}));
    assert!(topic.is_closed());
    assert!(connection.topic_names().is_empty());
    assert!(matches!(topic.subscribe(None).await, Err(HubError::TopicClosed { .. })));

    // Re-resolving yields a fresh, usable handle
    let fresh = connection.topic("t");
    assert!(!fresh.is_closed());
    assert!(!fresh.is_subscribed());
}

#[tokio::test]
async fn test_unsubscribe_removes_topic() {
    let (connection, transport) = identified();
    let topic = subscribed(&connection, &transport, "t").await;

    let ack = topic.unsubscribe();
    let sent = transport.last_sent();
    assert_eq!(sent.action, "unsubscribe");
    transport.ack("t", &sent.reference, true, json!({}));
    ack.await.unwrap();

    assert!(topic.is_closed());
    assert!(!topic.is_subscribed());
    assert!(connection.topic_names().is_empty());
}

#[tokio::test]
async fn test_resubscribe_after_reconnect_uses_token_provider() {
    let (connection, transport) = identified();
    let topic = connection.topic_with_token("t", || Some("INV".to_string()));

    let ack = topic.subscribe(None);
    let first = transport.last_sent();
    assert_eq!(first.payload, json!({"token": "INV"}));
    transport.ack("t", &first.reference, true, json!({}));
    ack.await.unwrap();

    let statuses = Arc::new(Mutex::new(Vec::new()));
    let statuses_clone = statuses.clone();
    topic.on_status(move |status| statuses_clone.lock().push(status));

    transport.sink().closed("lost");
    assert!(topic.is_subscribed());
    transport.sink().opened();
    ack_identify(&transport);

    let resubscribe = transport.last_sent();
    assert_eq!(resubscribe.topic, "t");
    assert_eq!(resubscribe.action, "subscribe");
    assert_eq!(resubscribe.payload, json!({"token": "INV"}));
    assert_ne!(resubscribe.reference, first.reference);

    transport.ack("t", &resubscribe.reference, true, json!({}));
    assert!(topic.is_subscribed());
    assert_eq!(
        *statuses.lock(),
        vec![Status::Reconnecting, Status::Identifying, Status::Identified]
    );
}

#[tokio::test]
async fn test_token_provider_may_call_into_connection() {
    let (connection, transport) = identified();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let observer = connection.clone();
    let topic = connection.topic_with_token("t", move || {
        seen_clone.lock().push(observer.status());
        Some("INV".to_string())
    });

    let ack = topic.subscribe(None);
    let first = transport.last_sent();
    transport.ack("t", &first.reference, true, json!({}));
    ack.await.unwrap();

    transport.sink().closed("lost");
    transport.sink().opened();

    // Run the handshake on its own thread so a lock held across the
    // provider call shows up as a timeout instead of a hung test
    let (done_tx, done_rx) = std::sync::mpsc::channel();
    let worker_transport = transport.clone();
    std::thread::spawn(move || {
        ack_identify(&worker_transport);
        let _ = done_tx.send(());
    });
    done_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("identify handshake finished while the provider queried the connection");

    let resubscribe = transport.last_sent();
    assert_eq!(resubscribe.action, "subscribe");
    assert_eq!(resubscribe.payload, json!({"token": "INV"}));
    assert_eq!(*seen.lock(), vec![Status::Identified, Status::Identified]);

    transport.ack("t", &resubscribe.reference, true, json!({}));
    assert!(topic.is_subscribed());
}

#[tokio::test]
async fn test_rejected_resubscribe_surfaces_unsubscribed() {
    let (connection, transport) = identified();
    let topic = subscribed(&connection, &transport, "t").await;

    let payload = Arc::new(Mutex::new(Value::Null));
    let payload_clone = payload.clone();
    topic.on(TopicEvent::Unsubscribed, move |p| {
        *payload_clone.lock() = p.clone();
    });

    transport.sink().closed("lost");
    transport.sink().opened();
    ack_identify(&transport);

    let resubscribe = transport.last_sent();
    transport.ack("t", &resubscribe.reference, false, json!({"message": "invitation expired"}));

    assert!(!topic.is_subscribed());
    assert!(!topic.is_closed());
    assert_eq!(*payload.lock(), json!({"message": "invitation expired"}));
}

#[tokio::test]
async fn test_unsubscribed_topics_are_not_resubscribed() {
    let (connection, transport) = identified();
    let _idle = connection.topic("idle");

    transport.sink().closed("lost");
    transport.sink().opened();
    ack_identify(&transport);

    assert!(transport.last_sent().is_identify());
}

// ============================================================================
// TRANSPORT EDGE CASES
// ============================================================================

#[tokio::test]
async fn test_stale_transport_callbacks_are_ignored() {
    let (connection, transport) = identified();
    let topic = subscribed(&connection, &transport, "t").await;
    let (messages, on_message) = counter();
    topic.on(TopicEvent::MessageCreated, on_message);

    let stale = transport.sink();
    stale.closed("lost");
    assert_eq!(transport.open_count(), 2);

    let frame = InboundEnvelope::new("t", "message:created", json!({})).to_json().unwrap();
    stale.frame(&frame);
    stale.opened();
    stale.closed("lost again");

    assert_eq!(messages.load(Ordering::SeqCst), 0);
    assert_eq!(connection.status(), Status::Reconnecting);
    assert_eq!(transport.open_count(), 2);
    assert_ne!(stale.generation(), transport.sink().generation());
}

#[tokio::test]
async fn test_disconnect_fires_once_across_failed_attempts() {
    let (connection, transport) = identified();
    let (disconnects, on_disconnect) = counter();
    connection.on(HubEvent::Disconnect, on_disconnect);

    transport.sink().closed("lost");
    // The immediate retry fails before opening
    transport.sink().closed("refused");

    assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    assert_eq!(connection.reconnect_attempt(), 2);
    connection.disconnect();
}

#[tokio::test]
async fn test_delayed_reconnect_uses_backoff() {
    let mut config = test_config();
    config.reconnect.first_attempt_immediate = false;
    let (connection, transport) = setup_with(&config);
    connection.connect("TOKEN").unwrap();
    transport.sink().opened();
    ack_identify(&transport);

    transport.sink().closed("lost");
    assert_eq!(transport.open_count(), 1);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(transport.open_count(), 2);
    assert_eq!(connection.status(), Status::Reconnecting);
}

#[tokio::test]
async fn test_disconnect_cancels_scheduled_reconnect() {
    let mut config = test_config();
    config.reconnect.first_attempt_immediate = false;
    let (connection, transport) = setup_with(&config);
    connection.connect("TOKEN").unwrap();
    transport.sink().opened();

    transport.sink().closed("lost");
    connection.disconnect();

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(transport.open_count(), 1);
    assert_eq!(connection.status(), Status::Closed);
}

#[test]
fn test_undecodable_frames_are_counted_and_dropped() {
    let (connection, transport) = identified();
    transport.sink().frame("not json");
    transport.sink().frame(r#"{"topic":"t"}"#);

    assert_eq!(connection.metrics().decode_errors, 2);
    assert_eq!(connection.status(), Status::Identified);
}

#[test]
fn test_send_failure_is_reported() {
    let (connection, transport) = identified();
    transport.set_fail_sends(true);

    let envelope = OutboundEnvelope::new("t", "message:create", json!({}), connection.next_ref());
    assert!(matches!(connection.send(envelope), Err(HubError::Transport(_))));
}

// ============================================================================
// EVENT CHANNEL
// ============================================================================

#[tokio::test]
async fn test_channel_preserves_order() {
    let (connection, transport) = identified();
    let topic = subscribed(&connection, &transport, "t").await;
    let mut channel = TopicChannel::new(&topic);

    transport.push("t", "message:created", json!({"n": 1}));
    transport.push("t", "presence:join", json!({"participantId": "p1"}));
    transport.push("t", "message:updated", json!({"n": 2}));
    transport.push("t", "custom:event", json!({"ignored": true}));

    assert_eq!(
        channel.recv().await,
        Some(ChannelEvent::Topic { event: "message:created".to_string(), payload: json!({"n": 1}) })
    );
    assert_eq!(
        channel.recv().await,
        Some(ChannelEvent::Presence { op: PresenceOp::Join, diff: json!({"participantId": "p1"}) })
    );
    let third = channel.recv().await.unwrap();
    assert_eq!(third.name(), "message:updated");
    assert!(channel.try_recv().is_none());

    transport.sink().closed("lost");
    assert_eq!(channel.recv().await, Some(ChannelEvent::Status(Status::Reconnecting)));
    connection.disconnect();
}

#[tokio::test]
async fn test_channel_close_unsubscribes() {
    let (connection, transport) = identified();
    let topic = subscribed(&connection, &transport, "t").await;
    let channel = TopicChannel::with_events(&topic, ["message:created"]);

    let closing = tokio::spawn(channel.close());
    for _ in 0..100 {
        if transport.last_sent().action == "unsubscribe" {
            break;
        }
        tokio::task::yield_now().await;
    }

    let sent = transport.last_sent();
    assert_eq!(sent.action, "unsubscribe");
    transport.ack("t", &sent.reference, true, json!({}));

    closing.await.unwrap().unwrap();
    assert!(topic.is_closed());
}

#[tokio::test]
async fn test_channel_ends_when_topic_is_torn_down() {
    use futures::StreamExt;

    let (connection, transport) = identified();
    let topic = subscribed(&connection, &transport, "t").await;
    let mut channel = TopicChannel::new(&topic);

    transport.push("t", "unsubscribed", json!({}));

    let last = channel.next().await.unwrap();
    assert_eq!(last.name(), "unsubscribed");
    assert_eq!(channel.next().await, None);
}

#[tokio::test]
async fn test_dropping_open_channel_sends_unsubscribe() {
    let (connection, transport) = identified();
    let topic = subscribed(&connection, &transport, "t").await;

    let channel = TopicChannel::new(&topic);
    drop(channel);

    let sent = transport.last_sent();
    assert_eq!(sent.topic, "t");
    assert_eq!(sent.action, "unsubscribe");

    // The ack still tears the topic down with nobody waiting
    transport.ack("t", &sent.reference, true, json!({}));
    assert!(topic.is_closed());
}
