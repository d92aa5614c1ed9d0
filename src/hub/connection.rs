/// Connection state machine
///
/// Owns the transport, the pending-ack table and the topic registry. Every
/// transition happens under one lock; listener callbacks are collected while
/// it is held and run once it is released, so handlers may call back into
/// the connection.
///
/// Lock order: connection state, then topic state. Never the reverse.
use parking_lot::{ Mutex, RwLock };
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{ Arc, Weak };
use std::task::{ Context, Poll };
use std::time::Duration;

use super::backoff::Backoff;
use super::message::{ InboundEnvelope, OutboundEnvelope, TopicEvent, ACTION_SUBSCRIBE };
use super::metrics::{ ConnectionMetrics, ConnectionMetricsSnapshot };
use super::pending::{ AckKind, AckReceiver, PendingAcks, PendingEntry };
use super::refs::RefGenerator;
use super::topic::{ Topic, TopicInner };
use super::transport::{ Transport, TransportSink };
use crate::config::{ self, Config };
use crate::errors::{ HubError, HubResult };
use crate::logger::{ self, LogTag };

// ============================================================================
// STAGE & STATUS
// ============================================================================

/// Coarse lifecycle phase, driven by `connect` / `disconnect` / transport loss
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Closed,
    Connecting,
    Reconnecting,
}

/// Connectivity as shown to collaborators, derived from the stage, the
/// transport-open flag and the identify handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Closed,
    Connecting,
    Identifying,
    Reconnecting,
    Identified,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Closed => "closed",
            Status::Connecting => "connecting",
            Status::Identifying => "identifying",
            Status::Reconnecting => "reconnecting",
            Status::Identified => "identified",
        }
    }

    /// Derive status from its three inputs
    pub fn derive(stage: Stage, transport_open: bool, identified: bool) -> Self {
        match stage {
            Stage::Closed => Status::Closed,
            _ if transport_open && identified => Status::Identified,
            _ if transport_open => Status::Identifying,
            Stage::Connecting => Status::Connecting,
            Stage::Reconnecting => Status::Reconnecting,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Connection-wide notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HubEvent {
    /// Identify handshake acknowledged (payload: ack payload)
    Identify,
    /// Live connection lost; reconnect scheduled (payload: `{"reason": ..}`)
    Disconnect,
    /// Server refused the token; connection closed (payload: ack-err payload)
    IdentifyRejected,
}

pub type GlobalHandler = Arc<dyn Fn(&Value) + Send + Sync>;

type Effect = Box<dyn FnOnce() + Send>;

fn run_effects(effects: Vec<Effect>) {
    for effect in effects {
        effect();
    }
}

// ============================================================================
// ACK FUTURE
// ============================================================================

/// Outcome of an action awaiting `ack-ok` / `ack-err`.
///
/// The frame is already written when an `Ack` is returned; dropping it only
/// discards the reply. Resolves with the `ack-ok` payload, `AckError` for
/// `ack-err`, `Timeout` after the configured ack timeout, `Cancelled` on
/// `disconnect`, or `NotReady` if the transport drops first.
pub struct Ack {
    reference: Option<String>,
    inner: Pin<Box<dyn Future<Output = HubResult<Value>> + Send>>,
}

impl Ack {
    pub(crate) fn failed(error: HubError) -> Self {
        Self {
            reference: None,
            inner: Box::pin(async move { Err(error) }),
        }
    }

    fn pending(shared: Weak<Shared>, reference: String, rx: AckReceiver, timeout_ms: u64) -> Self {
        let expiring = reference.clone();
        let inner = async move {
            let mut rx = rx;
            match tokio::time::timeout(Duration::from_millis(timeout_ms), &mut rx).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(HubError::Cancelled),
                Err(_) => {
                    if let Some(shared) = shared.upgrade() {
                        shared.expire(&expiring);
                    }
                    // The reply may have raced the deadline
                    match rx.try_recv() {
                        Ok(result) => result,
                        Err(_) => Err(HubError::Timeout { ms: timeout_ms }),
                    }
                }
            }
        };
        Self {
            reference: Some(reference),
            inner: Box::pin(inner),
        }
    }

    /// Correlation ref of the sent frame; `None` if nothing was sent
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }
}

impl Future for Ack {
    type Output = HubResult<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl fmt::Debug for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ack").field("reference", &self.reference).finish()
    }
}

// ============================================================================
// SHARED STATE
// ============================================================================

struct HubState {
    stage: Stage,
    transport_open: bool,
    identified: bool,
    token: Option<String>,
    /// Ref of the identify action in flight
    identify_ref: Option<String>,
    /// Bumped on every open and every loss; stale transport callbacks are ignored
    generation: u64,
    reconnect_attempt: u32,
    pending: PendingAcks,
    topics: HashMap<String, Arc<TopicInner>>,
    last_status: Status,
}

impl HubState {
    fn status(&self) -> Status {
        Status::derive(self.stage, self.transport_open, self.identified)
    }
}

pub(crate) struct Shared {
    transport: Box<dyn Transport>,
    state: Mutex<HubState>,
    refs: RefGenerator,
    ack_timeout_ms: u64,
    backoff: Backoff,
    metrics: Arc<ConnectionMetrics>,
    handlers: RwLock<HashMap<HubEvent, Vec<GlobalHandler>>>,
}

impl Shared {
    fn fire(&self, event: HubEvent, payload: Value, effects: &mut Vec<Effect>) {
        let handlers = self.handlers.read().get(&event).cloned().unwrap_or_default();
        if handlers.is_empty() {
            return;
        }
        effects.push(
            Box::new(move || {
                for handler in handlers {
                    handler(&payload);
                }
            })
        );
    }

    /// Queue status handlers of subscribed topics if the derived status moved
    fn status_effects(&self, state: &mut HubState, effects: &mut Vec<Effect>) {
        let status = state.status();
        if status == state.last_status {
            return;
        }
        logger::debug(
            LogTag::Connection,
            &format!("Status {} → {}", state.last_status, status)
        );
        state.last_status = status;

        for topic in state.topics.values() {
            if !topic.is_subscribed() {
                continue;
            }
            for handler in topic.status_handlers() {
                effects.push(Box::new(move || handler(status)));
            }
        }
    }

    fn write(&self, envelope: &OutboundEnvelope) -> HubResult<()> {
        let frame = envelope.to_json()?;
        logger::debug(LogTag::Codec, &format!("→ {}", frame));
        self.transport.send(frame)?;
        self.metrics.inc_sent();
        Ok(())
    }

    /// Allocate a ref, register its waiter and write the frame. The entry
    /// expires after the ack timeout whether or not anyone awaits it.
    fn register(
        self: &Arc<Self>,
        state: &mut HubState,
        topic: &str,
        action: &str,
        payload: Value,
        kind: AckKind
    ) -> HubResult<(String, AckReceiver)> {
        let reference = self.refs.next_ref();
        match &kind {
            AckKind::Subscribe(inner) | AckKind::Unsubscribe(inner) | AckKind::Resubscribe(inner) => {
                inner.set_reference(&reference);
            }
            AckKind::Request => {}
        }

        // Without a runtime no expiry timer runs; stale entries go here instead
        for (stale, entry) in state.pending.take_expired(Duration::from_millis(self.ack_timeout_ms)) {
            self.time_out(&stale, entry);
        }

        let rx = state.pending.insert(&reference, kind)?;
        let envelope = OutboundEnvelope::new(topic, action, payload, reference.clone());
        if let Err(e) = self.write(&envelope) {
            state.pending.take(&reference);
            return Err(e);
        }
        self.schedule_expiry(&reference);
        Ok((reference, rx))
    }

    fn schedule_expiry(self: &Arc<Self>, reference: &str) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let weak = Arc::downgrade(self);
        let reference = reference.to_string();
        let timeout = Duration::from_millis(self.ack_timeout_ms);
        handle.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(shared) = weak.upgrade() {
                shared.expire(&reference);
            }
        });
    }

    /// Send an action that awaits its acknowledgement
    pub(crate) fn request(
        self: &Arc<Self>,
        topic: &str,
        action: &str,
        payload: Value,
        kind: AckKind
    ) -> Ack {
        let mut state = self.state.lock();
        if state.status() != Status::Identified {
            return Ack::failed(HubError::NotReady);
        }
        match self.register(&mut state, topic, action, payload, kind) {
            Ok((reference, rx)) => {
                drop(state);
                Ack::pending(Arc::downgrade(self), reference, rx, self.ack_timeout_ms)
            }
            Err(e) => Ack::failed(e),
        }
    }

    /// Send an action nobody waits on
    pub(crate) fn push(&self, topic: &str, action: &str, payload: Value) -> HubResult<()> {
        let state = self.state.lock();
        if state.status() != Status::Identified {
            return Err(HubError::NotReady);
        }
        self.write(&OutboundEnvelope::new(topic, action, payload, self.refs.next_ref()))
    }

    /// Drop a waiter whose ack never came; a ref already answered is left alone
    fn expire(&self, reference: &str) {
        let entry = self.state.lock().pending.take(reference);
        if let Some(entry) = entry {
            self.time_out(reference, entry);
        }
    }

    fn time_out(&self, reference: &str, entry: PendingEntry) {
        self.metrics.inc_timed_out();
        logger::warning(
            LogTag::Connection,
            &format!(
                "No acknowledgement for ref {} after {}ms",
                reference,
                entry.sent_at.elapsed().as_millis()
            )
        );
        entry.resolve(Err(HubError::Timeout { ms: self.ack_timeout_ms }));
    }

    /// Deliberate close: pending waiters cancelled, registry emptied silently
    fn shutdown(self: &Arc<Self>, state: &mut HubState, effects: &mut Vec<Effect>) {
        state.stage = Stage::Closed;
        state.transport_open = false;
        state.identified = false;
        state.identify_ref = None;
        state.token = None;
        state.reconnect_attempt = 0;
        state.generation += 1;

        let cancelled = state.pending.drain();
        if !cancelled.is_empty() {
            self.metrics.inc_cancelled(cancelled.len() as u64);
            logger::debug(
                LogTag::Connection,
                &format!("Cancelling {} pending acknowledgements", cancelled.len())
            );
        }
        for entry in cancelled {
            entry.resolve(Err(HubError::Cancelled));
        }

        // Subscribed topics still see the final status before teardown
        self.status_effects(state, effects);

        for (_, topic) in state.topics.drain() {
            topic.mark_closed();
            effects.push(Box::new(move || topic.clear_listeners()));
        }

        let shared = self.clone();
        effects.push(Box::new(move || shared.transport.close()));
    }

    // ------------------------------------------------------------------------
    // Transport callbacks
    // ------------------------------------------------------------------------

    pub(crate) fn on_transport_open(self: &Arc<Self>, generation: u64) {
        let mut effects = Vec::new();
        {
            let mut state = self.state.lock();
            if generation != state.generation || state.stage == Stage::Closed {
                logger::debug(LogTag::Transport, &format!("Ignoring stale open (generation {})", generation));
                return;
            }

            state.transport_open = true;
            state.identified = false;

            let reference = self.refs.next_ref();
            let token = state.token.clone().unwrap_or_default();
            state.identify_ref = Some(reference.clone());

            logger::info(LogTag::Connection, "Transport open, identifying");
            if let Err(e) = self.write(&OutboundEnvelope::identify(&token, reference)) {
                // The transport reports the loss through its sink
                logger::error(LogTag::Connection, &format!("Failed to send identify: {}", e));
            }

            self.status_effects(&mut state, &mut effects);
        }
        run_effects(effects);
    }

    pub(crate) fn on_transport_frame(self: &Arc<Self>, generation: u64, text: &str) {
        self.metrics.inc_received();
        logger::debug(LogTag::Codec, &format!("← {}", text));

        let envelope = match InboundEnvelope::from_json(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.metrics.inc_decode_error();
                logger::warning(LogTag::Codec, &format!("Dropping undecodable frame: {}", e));
                return;
            }
        };

        let mut effects = Vec::new();
        {
            let mut state = self.state.lock();
            if generation != state.generation || state.stage == Stage::Closed {
                logger::debug(
                    LogTag::Transport,
                    &format!("Ignoring frame from stale transport (generation {})", generation)
                );
                return;
            }

            if envelope.is_ack() {
                self.handle_ack(&mut state, envelope, &mut effects);
            } else {
                self.route(&mut state, envelope, &mut effects);
            }

            self.status_effects(&mut state, &mut effects);
        }
        run_effects(effects);
    }

    pub(crate) fn on_transport_closed(self: &Arc<Self>, generation: u64, reason: &str) {
        let mut effects = Vec::new();
        let (expected, delay) = {
            let mut state = self.state.lock();
            if generation != state.generation || state.stage == Stage::Closed {
                return;
            }

            // Fire `disconnect` when a live socket drops or when first entering
            // Reconnecting; repeated failed reopen attempts stay quiet
            let notify = state.stage != Stage::Reconnecting || state.transport_open;

            self.metrics.inc_transport_loss();
            state.stage = Stage::Reconnecting;
            state.transport_open = false;
            state.identified = false;
            state.identify_ref = None;
            state.reconnect_attempt = state.reconnect_attempt.saturating_add(1);
            state.generation += 1;

            for entry in state.pending.drain() {
                entry.resolve(Err(HubError::NotReady));
            }

            let delay = self.backoff.delay(state.reconnect_attempt);
            logger::warning(
                LogTag::Connection,
                &format!(
                    "Transport lost ({}), reconnect attempt {} in {}ms",
                    reason,
                    state.reconnect_attempt,
                    delay.as_millis()
                )
            );

            if notify {
                self.fire(HubEvent::Disconnect, serde_json::json!({ "reason": reason }), &mut effects);
            }
            self.status_effects(&mut state, &mut effects);

            (state.generation, delay)
        };
        run_effects(effects);

        self.schedule_reopen(expected, delay);
    }

    // ------------------------------------------------------------------------
    // Inbound handling
    // ------------------------------------------------------------------------

    fn handle_ack(
        self: &Arc<Self>,
        state: &mut HubState,
        envelope: InboundEnvelope,
        effects: &mut Vec<Effect>
    ) {
        let reference = match envelope.reference.clone() {
            Some(reference) => reference,
            None => {
                logger::warning(LogTag::Connection, &format!("{} without ref dropped", envelope.event));
                return;
            }
        };
        let ok = envelope.is_ack_ok();

        if state.identify_ref.as_deref() == Some(reference.as_str()) {
            state.identify_ref = None;
            self.metrics.record_ack(ok);
            if ok {
                self.complete_identify(state, envelope.payload, effects);
            } else {
                logger::error(
                    LogTag::Connection,
                    &format!("Identify rejected by server: {}", envelope.payload)
                );
                self.shutdown(state, effects);
                self.fire(HubEvent::IdentifyRejected, envelope.payload, effects);
            }
            return;
        }

        let entry = match state.pending.take(&reference) {
            Some(entry) => entry,
            None => {
                logger::debug(
                    LogTag::Connection,
                    &format!("{} for unknown ref {} dropped", envelope.event, reference)
                );
                return;
            }
        };
        self.metrics.record_ack(ok);

        match &entry.kind {
            AckKind::Subscribe(topic) => {
                if ok {
                    topic.set_subscribed(true);
                    logger::info(LogTag::Topic, &format!("Subscribed to {}", topic.name()));
                }
            }
            AckKind::Resubscribe(topic) => {
                if ok {
                    topic.set_subscribed(true);
                    logger::debug(LogTag::Topic, &format!("Resubscribed to {}", topic.name()));
                } else {
                    logger::warning(
                        LogTag::Topic,
                        &format!("Resubscribe to {} rejected: {}", topic.name(), envelope.payload)
                    );
                    topic.set_subscribed(false);
                    let topic = topic.clone();
                    let notice = InboundEnvelope::new(
                        topic.name(),
                        TopicEvent::Unsubscribed.code(),
                        envelope.payload.clone()
                    );
                    effects.push(Box::new(move || topic.dispatch(&notice)));
                }
            }
            AckKind::Unsubscribe(topic) => {
                if ok {
                    self.remove_topic(state, topic);
                    logger::info(LogTag::Topic, &format!("Unsubscribed from {}", topic.name()));
                    let topic = topic.clone();
                    effects.push(Box::new(move || topic.clear_listeners()));
                }
            }
            AckKind::Request => {}
        }

        let result = if ok {
            Ok(envelope.payload)
        } else {
            Err(HubError::AckError { payload: envelope.payload })
        };
        entry.resolve(result);
    }

    fn complete_identify(
        self: &Arc<Self>,
        state: &mut HubState,
        payload: Value,
        effects: &mut Vec<Effect>
    ) {
        state.identified = true;
        state.reconnect_attempt = 0;
        self.metrics.inc_identified();
        logger::info(LogTag::Connection, "Identified");

        self.fire(HubEvent::Identify, payload, effects);

        let topics: Vec<Arc<TopicInner>> = state.topics
            .values()
            .filter(|topic| topic.is_subscribed())
            .cloned()
            .collect();
        if topics.is_empty() {
            return;
        }

        // Token providers are caller code, so they run once the lock is released
        let generation = state.generation;
        let shared = self.clone();
        effects.push(Box::new(move || shared.resubscribe(generation, topics)));
    }

    /// Re-send subscribe for each topic that was subscribed before the loss
    fn resubscribe(self: &Arc<Self>, generation: u64, topics: Vec<Arc<TopicInner>>) {
        let payloads: Vec<(Arc<TopicInner>, Value)> = topics
            .into_iter()
            .map(|topic| {
                let payload = topic.subscribe_payload(None);
                (topic, payload)
            })
            .collect();

        let mut state = self.state.lock();
        if state.generation != generation || state.status() != Status::Identified {
            logger::debug(
                LogTag::Topic,
                &format!("Skipping resubscribe for generation {}; connection moved on", generation)
            );
            return;
        }

        for (topic, payload) in payloads {
            if topic.is_closed() {
                continue;
            }
            let name = topic.name().to_string();
            // The reply is handled by `handle_ack`; nobody awaits the receiver
            if
                let Err(e) = self.register(
                    &mut state,
                    &name,
                    ACTION_SUBSCRIBE,
                    payload,
                    AckKind::Resubscribe(topic.clone())
                )
            {
                logger::warning(LogTag::Topic, &format!("Resubscribe to {} failed: {}", name, e));
            }
        }
    }

    /// Deliver a business event; server `unsubscribed` also tears the topic down
    fn route(&self, state: &mut HubState, envelope: InboundEnvelope, effects: &mut Vec<Effect>) {
        let topic = match state.topics.get(&envelope.topic) {
            Some(topic) => topic.clone(),
            None => {
                logger::debug(
                    LogTag::Topic,
                    &format!("{} on unregistered topic {} dropped", envelope.event, envelope.topic)
                );
                return;
            }
        };

        if envelope.event == TopicEvent::Unsubscribed.code() {
            self.remove_topic(state, &topic);
            logger::info(LogTag::Topic, &format!("Server unsubscribed {}", topic.name()));
            effects.push(
                Box::new(move || {
                    topic.dispatch(&envelope);
                    topic.clear_listeners();
                })
            );
        } else {
            effects.push(Box::new(move || topic.dispatch(&envelope)));
        }
    }

    fn remove_topic(&self, state: &mut HubState, topic: &Arc<TopicInner>) {
        let registered = state.topics
            .get(topic.name())
            .map(|current| Arc::ptr_eq(current, topic))
            .unwrap_or(false);
        if registered {
            state.topics.remove(topic.name());
        }
        topic.mark_closed();
    }

    // ------------------------------------------------------------------------
    // Reconnect
    // ------------------------------------------------------------------------

    fn schedule_reopen(self: &Arc<Self>, expected: u64, delay: Duration) {
        if delay.is_zero() {
            self.reopen(expected);
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let weak = Arc::downgrade(self);
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(shared) = weak.upgrade() {
                        shared.reopen(expected);
                    }
                });
            }
            Err(_) => {
                logger::error(
                    LogTag::Connection,
                    "No async runtime available to schedule reconnect; staying disconnected"
                );
            }
        }
    }

    fn reopen(self: &Arc<Self>, expected: u64) {
        let sink = {
            let state = self.state.lock();
            if state.generation != expected || state.stage == Stage::Closed {
                return;
            }
            TransportSink::new(self, expected)
        };
        logger::debug(LogTag::Transport, &format!("Reopening transport (generation {})", expected));
        self.transport.open(sink);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.transport.close();
    }
}

// ============================================================================
// CONNECTION HANDLE
// ============================================================================

/// Cloneable handle to one multiplexed connection
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
}

impl Connection {
    /// Build with the process-wide configuration
    pub fn new<T: Transport>(transport: T) -> Self {
        Self::from_config(transport, &config::get_config_clone())
    }

    pub fn from_config<T: Transport>(transport: T, config: &Config) -> Self {
        let state = HubState {
            stage: Stage::Closed,
            transport_open: false,
            identified: false,
            token: None,
            identify_ref: None,
            generation: 0,
            reconnect_attempt: 0,
            pending: PendingAcks::new(config.connection.max_pending_acks),
            topics: HashMap::new(),
            last_status: Status::Closed,
        };

        Self {
            shared: Arc::new(Shared {
                transport: Box::new(transport),
                state: Mutex::new(state),
                refs: RefGenerator::new(),
                ack_timeout_ms: config.connection.ack_timeout_ms,
                backoff: Backoff::new(config.reconnect.clone()),
                metrics: ConnectionMetrics::new(),
                handlers: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Connection over a websocket to `config.connection.url`
    #[cfg(feature = "websocket")]
    pub fn websocket(config: &Config) -> Self {
        let transport = super::websocket::WebSocketTransport::new(
            &config.connection.url,
            config.heartbeat.clone()
        );
        Self::from_config(transport, config)
    }

    /// Open the transport and identify with `token` once it is up
    pub fn connect(&self, token: &str) -> HubResult<()> {
        let mut effects = Vec::new();
        let sink = {
            let mut state = self.shared.state.lock();
            if state.stage != Stage::Closed {
                return Err(HubError::AlreadyConnected);
            }
            state.token = Some(token.to_string());
            state.stage = Stage::Connecting;
            state.reconnect_attempt = 0;
            state.generation += 1;
            self.shared.status_effects(&mut state, &mut effects);
            TransportSink::new(&self.shared, state.generation)
        };
        run_effects(effects);

        logger::info(LogTag::Connection, "Connecting");
        self.shared.transport.open(sink);
        Ok(())
    }

    /// Close the transport, cancel pending acks and empty the registry.
    /// Calling it again is a no-op.
    pub fn disconnect(&self) {
        let mut effects = Vec::new();
        {
            let mut state = self.shared.state.lock();
            if state.stage == Stage::Closed {
                return;
            }
            self.shared.shutdown(&mut state, &mut effects);
        }
        run_effects(effects);
        logger::info(LogTag::Connection, "Disconnected");
    }

    pub fn status(&self) -> Status {
        self.shared.state.lock().status()
    }

    pub fn stage(&self) -> Stage {
        self.shared.state.lock().stage
    }

    pub fn is_identified(&self) -> bool {
        self.status() == Status::Identified
    }

    pub fn reconnect_attempt(&self) -> u32 {
        self.shared.state.lock().reconnect_attempt
    }

    pub fn pending_count(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    pub fn metrics(&self) -> ConnectionMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Register a connection-wide notification handler
    pub fn on<F>(&self, event: HubEvent, handler: F) -> &Self where F: Fn(&Value) + Send + Sync + 'static {
        self.shared.handlers.write().entry(event).or_default().push(Arc::new(handler));
        self
    }

    /// Existing topic with this name, or a new unsubscribed one
    pub fn topic(&self, name: &str) -> Topic {
        let inner = self.shared.state
            .lock()
            .topics.entry(name.to_string())
            .or_insert_with(|| TopicInner::new(name))
            .clone();
        Topic::new(inner, Arc::downgrade(&self.shared))
    }

    /// As `topic`, installing the invitation-token provider used when the
    /// topic is re-subscribed after a reconnect
    pub fn topic_with_token<F>(&self, name: &str, provider: F) -> Topic
        where F: Fn() -> Option<String> + Send + Sync + 'static
    {
        let topic = self.topic(name);
        topic.inner().set_token_provider(Arc::new(provider));
        topic
    }

    pub fn topic_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.state.lock().topics.keys().cloned().collect();
        names.sort();
        names
    }

    /// Write one envelope. Anything but identify requires an identified connection.
    pub fn send(&self, envelope: OutboundEnvelope) -> HubResult<()> {
        let state = self.shared.state.lock();
        if !envelope.is_identify() && state.status() != Status::Identified {
            return Err(HubError::NotReady);
        }
        self.shared.write(&envelope)
    }

    /// Fresh correlation ref for a hand-built envelope
    pub fn next_ref(&self) -> String {
        self.shared.refs.next_ref()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Connection")
            .field("stage", &state.stage)
            .field("status", &state.status())
            .field("topics", &state.topics.len())
            .field("pending", &state.pending.len())
            .finish()
    }
}
