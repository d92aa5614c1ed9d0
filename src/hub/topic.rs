/// Topics multiplexed over the connection
///
/// The connection's registry owns every `TopicInner`; callers hold `Topic`
/// handles. Once a topic is torn down (acknowledged unsubscribe, server
/// `unsubscribed`, or disconnect) its handle reports `TopicClosed` and the
/// caller must resolve a fresh one through `Connection::topic`.
use parking_lot::{ Mutex, RwLock };
use serde_json::{ json, Value };
use std::collections::HashMap;
use std::fmt;
use std::sync::{ Arc, Weak };

use super::connection::{ Ack, Shared, Status };
use super::message::{ InboundEnvelope, ACTION_SUBSCRIBE, ACTION_UNSUBSCRIBE };
use super::pending::AckKind;
use super::presence::{ Presence, PresenceOp };
use crate::errors::{ HubError, HubResult };
use crate::logger::{ self, LogTag };

pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;
pub type PresenceHandler = Arc<dyn Fn(PresenceOp, &Value) + Send + Sync>;
pub type StatusHandler = Arc<dyn Fn(Status) + Send + Sync>;

/// Supplies the invitation token used when the topic is re-subscribed
/// automatically after a reconnect
pub type TokenProvider = Arc<dyn Fn() -> Option<String> + Send + Sync>;

#[derive(Default)]
struct TopicState {
    subscribed: bool,
    closed: bool,
    /// Ref of the latest subscribe/unsubscribe sent for this topic
    reference: Option<String>,
}

#[derive(Default)]
struct Listeners {
    events: HashMap<String, Vec<EventHandler>>,
    presence: Vec<PresenceHandler>,
    status: Vec<StatusHandler>,
}

pub(crate) struct TopicInner {
    name: String,
    state: Mutex<TopicState>,
    presence: RwLock<Presence>,
    listeners: RwLock<Listeners>,
    token_provider: RwLock<Option<TokenProvider>>,
}

impl TopicInner {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            state: Mutex::new(TopicState::default()),
            presence: RwLock::new(Presence::new()),
            listeners: RwLock::new(Listeners::default()),
            token_provider: RwLock::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_subscribed(&self) -> bool {
        self.state.lock().subscribed
    }

    pub fn set_subscribed(&self, subscribed: bool) {
        self.state.lock().subscribed = subscribed;
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn reference(&self) -> Option<String> {
        self.state.lock().reference.clone()
    }

    pub fn set_reference(&self, reference: &str) {
        self.state.lock().reference = Some(reference.to_string());
    }

    /// Make every handle unusable. Listeners stay until `clear_listeners` so
    /// a final event can still be delivered.
    pub fn mark_closed(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.subscribed = false;
    }

    /// Drop every handler (closing any channel fed by them)
    pub fn clear_listeners(&self) {
        *self.listeners.write() = Listeners::default();
    }

    pub fn set_token_provider(&self, provider: TokenProvider) {
        *self.token_provider.write() = Some(provider);
    }

    /// Payload for a subscribe action: the explicit token, else the provider's
    pub fn subscribe_payload(&self, invitation_token: Option<&str>) -> Value {
        let token = match invitation_token {
            Some(token) => Some(token.to_string()),
            None => self.token_provider.read().as_ref().and_then(|provider| provider()),
        };
        match token {
            Some(token) => json!({ "token": token }),
            None => json!({}),
        }
    }

    pub fn status_handlers(&self) -> Vec<StatusHandler> {
        self.listeners.read().status.clone()
    }

    /// Deliver one inbound envelope to this topic's handlers.
    ///
    /// Must be called without the connection lock held.
    pub fn dispatch(&self, envelope: &InboundEnvelope) {
        if let Some(op) = PresenceOp::from_event(&envelope.event) {
            let touched = self.presence.write().apply(op, &envelope.payload);
            logger::debug(
                LogTag::Topic,
                &format!("{} {} merged ({} entries touched)", self.name, envelope.event, touched)
            );

            let handlers = self.listeners.read().presence.clone();
            for handler in handlers {
                handler(op, &envelope.payload);
            }
        }

        let handlers = self.listeners
            .read()
            .events.get(&envelope.event)
            .cloned()
            .unwrap_or_default();

        if handlers.is_empty() && PresenceOp::from_event(&envelope.event).is_none() {
            logger::verbose(
                LogTag::Topic,
                &format!("{}: no listener for {}", self.name, envelope.event)
            );
        }

        for handler in handlers {
            handler(&envelope.payload);
        }
    }
}

/// Handle to one topic
#[derive(Clone)]
pub struct Topic {
    inner: Arc<TopicInner>,
    shared: Weak<Shared>,
}

impl Topic {
    pub(crate) fn new(inner: Arc<TopicInner>, shared: Weak<Shared>) -> Self {
        Self { inner, shared }
    }

    pub(crate) fn inner(&self) -> &Arc<TopicInner> {
        &self.inner
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn is_subscribed(&self) -> bool {
        self.inner.is_subscribed()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Ref of the latest subscribe/unsubscribe sent for this topic
    pub fn reference(&self) -> Option<String> {
        self.inner.reference()
    }

    fn closed_error(&self) -> HubError {
        HubError::TopicClosed { topic: self.inner.name().to_string() }
    }

    fn shared(&self) -> HubResult<Arc<Shared>> {
        if self.inner.is_closed() {
            return Err(self.closed_error());
        }
        self.shared.upgrade().ok_or_else(|| self.closed_error())
    }

    /// Subscribe with an invitation token, or the token provider's token
    /// when `None`. The frame is sent immediately; the returned `Ack`
    /// resolves with the server's reply.
    pub fn subscribe(&self, invitation_token: Option<&str>) -> Ack {
        let shared = match self.shared() {
            Ok(shared) => shared,
            Err(e) => {
                return Ack::failed(e);
            }
        };
        let payload = self.inner.subscribe_payload(invitation_token);
        shared.request(
            self.inner.name(),
            ACTION_SUBSCRIBE,
            payload,
            AckKind::Subscribe(self.inner.clone())
        )
    }

    /// Leave the topic; on `ack-ok` it is removed from the registry and this
    /// handle becomes unusable
    pub fn unsubscribe(&self) -> Ack {
        let shared = match self.shared() {
            Ok(shared) => shared,
            Err(e) => {
                return Ack::failed(e);
            }
        };
        shared.request(
            self.inner.name(),
            ACTION_UNSUBSCRIBE,
            json!({}),
            AckKind::Unsubscribe(self.inner.clone())
        )
    }

    /// Register a handler for one event name. Handlers run in registration order.
    pub fn on<E, F>(&self, event: E, handler: F) -> &Self
        where E: AsRef<str>, F: Fn(&Value) + Send + Sync + 'static
    {
        self.inner.listeners
            .write()
            .events.entry(event.as_ref().to_string())
            .or_default()
            .push(Arc::new(handler));
        self
    }

    /// Called after each presence diff is merged
    pub fn on_presence<F>(&self, handler: F) -> &Self
        where F: Fn(PresenceOp, &Value) + Send + Sync + 'static
    {
        self.inner.listeners.write().presence.push(Arc::new(handler));
        self
    }

    /// Called on every connection status change while subscribed
    pub fn on_status<F>(&self, handler: F) -> &Self where F: Fn(Status) + Send + Sync + 'static {
        self.inner.listeners.write().status.push(Arc::new(handler));
        self
    }

    /// Copy of the merged presence map
    pub fn presence(&self) -> HashMap<String, Value> {
        self.inner.presence.read().snapshot()
    }

    /// Push an action on this topic without waiting for its reply
    pub fn send(&self, action: &str, payload: Value) -> HubResult<()> {
        let shared = self.shared()?;
        shared.push(self.inner.name(), action, payload)
    }

    /// Push an action on this topic and wait for its reply
    pub fn request(&self, action: &str, payload: Value) -> Ack {
        match self.shared() {
            Ok(shared) => shared.request(self.inner.name(), action, payload, AckKind::Request),
            Err(e) => Ack::failed(e),
        }
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topic")
            .field("name", &self.inner.name())
            .field("subscribed", &self.inner.is_subscribed())
            .field("closed", &self.inner.is_closed())
            .finish()
    }
}
