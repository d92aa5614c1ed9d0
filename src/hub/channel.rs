/// Push-to-pull bridge for one topic
///
/// `TopicChannel` turns a topic's callbacks into an ordered queue the caller
/// drains with `recv().await` or as a `Stream`. Events arrive in the order
/// the connection dispatched them. The queue ends when the channel is closed
/// or the topic is torn down.
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;
use std::task::{ Context, Poll };
use tokio::sync::mpsc;

use super::connection::Status;
use super::message::TopicEvent;
use super::presence::PresenceOp;
use super::topic::Topic;
use crate::errors::{ HubError, HubResult };
use crate::logger::{ self, LogTag };

/// One item pulled from a `TopicChannel`
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Topic {
        event: String,
        payload: Value,
    },
    Presence {
        op: PresenceOp,
        diff: Value,
    },
    Status(Status),
}

impl ChannelEvent {
    /// Wire event name, or `status` for status changes
    pub fn name(&self) -> &str {
        match self {
            ChannelEvent::Topic { event, .. } => event.as_str(),
            ChannelEvent::Presence { op, .. } => op.event(),
            ChannelEvent::Status(_) => "status",
        }
    }
}

pub struct TopicChannel {
    topic: Topic,
    rx: mpsc::UnboundedReceiver<ChannelEvent>,
    /// Cleared by `close` / drop; handlers stop enqueueing once it is false
    open: Arc<AtomicBool>,
}

impl TopicChannel {
    /// Bridge every business event plus presence and status
    pub fn new(topic: &Topic) -> Self {
        Self::with_events(topic, TopicEvent::ALL.iter().map(|event| event.code()))
    }

    /// Bridge only the listed event names (presence and status are always bridged)
    pub fn with_events<I, S>(topic: &Topic, events: I) -> Self
        where I: IntoIterator<Item = S>, S: AsRef<str>
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(true));

        for event in events {
            let name = event.as_ref().to_string();
            let tx = tx.clone();
            let open = open.clone();
            topic.on(name.clone(), move |payload| {
                if open.load(Ordering::Acquire) {
                    let _ = tx.send(ChannelEvent::Topic {
                        event: name.clone(),
                        payload: payload.clone(),
                    });
                }
            });
        }

        {
            let tx = tx.clone();
            let open = open.clone();
            topic.on_presence(move |op, diff| {
                if open.load(Ordering::Acquire) {
                    let _ = tx.send(ChannelEvent::Presence { op, diff: diff.clone() });
                }
            });
        }

        {
            let open = open.clone();
            topic.on_status(move |status| {
                if open.load(Ordering::Acquire) {
                    let _ = tx.send(ChannelEvent::Status(status));
                }
            });
        }

        logger::debug(LogTag::Channel, &format!("Channel opened on {}", topic.name()));

        Self {
            topic: topic.clone(),
            rx,
            open,
        }
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Next event in arrival order; `None` once closed or the topic is gone
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        if !self.is_open() {
            return None;
        }
        self.rx.recv().await
    }

    /// Next already-queued event, without waiting
    pub fn try_recv(&mut self) -> Option<ChannelEvent> {
        if !self.is_open() {
            return None;
        }
        self.rx.try_recv().ok()
    }

    /// Stop the queue and unsubscribe the topic. A topic that is already
    /// torn down counts as success.
    pub async fn close(mut self) -> HubResult<()> {
        self.open.store(false, Ordering::Release);
        self.rx.close();

        logger::debug(LogTag::Channel, &format!("Closing channel on {}", self.topic.name()));

        match self.topic.unsubscribe().await {
            Ok(_) | Err(HubError::TopicClosed { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Stream for TopicChannel {
    type Item = ChannelEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if !self.is_open() {
            return Poll::Ready(None);
        }
        self.rx.poll_recv(cx)
    }
}

impl Drop for TopicChannel {
    fn drop(&mut self) {
        if self.open.swap(false, Ordering::AcqRel) {
            // The frame goes out now; the reply is not awaited
            let ack = self.topic.unsubscribe();
            logger::debug(
                LogTag::Channel,
                &format!(
                    "Channel on {} dropped while open (unsubscribe ref {:?})",
                    self.topic.name(),
                    ack.reference()
                )
            );
        }
    }
}
