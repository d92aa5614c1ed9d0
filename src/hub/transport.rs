/// Transport seam between the connection state machine and a socket
///
/// A transport only moves text frames. Lifecycle flows back through the
/// `TransportSink` handed to `open`: `opened`, then any number of `frame`
/// calls, then one `closed`. Frames must be delivered one at a time; the
/// connection processes each before returning.
use std::sync::{ Arc, Weak };

use super::connection::Shared;
use crate::errors::HubResult;

pub trait Transport: Send + Sync + 'static {
    /// Start opening a socket; report the outcome through `sink`.
    ///
    /// Called without any connection lock held. Opening may complete
    /// asynchronously; a failed attempt reports `sink.closed`.
    fn open(&self, sink: TransportSink);

    /// Queue one text frame on the open socket.
    ///
    /// Must not call back into the sink synchronously.
    fn send(&self, frame: String) -> HubResult<()>;

    /// Deliberately close the socket. No sink callbacks are expected afterwards.
    fn close(&self);
}

/// Callback handle for one opened socket
///
/// Each `open` gets a sink stamped with a fresh generation; callbacks from a
/// superseded socket are ignored by the connection.
#[derive(Clone)]
pub struct TransportSink {
    shared: Weak<Shared>,
    generation: u64,
}

impl TransportSink {
    pub(crate) fn new(shared: &Arc<Shared>, generation: u64) -> Self {
        Self {
            shared: Arc::downgrade(shared),
            generation,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The socket is open and ready for frames
    pub fn opened(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.on_transport_open(self.generation);
        }
    }

    /// One inbound text frame
    pub fn frame(&self, text: &str) {
        if let Some(shared) = self.shared.upgrade() {
            shared.on_transport_frame(self.generation, text);
        }
    }

    /// The socket failed to open, errored, or was closed by the server
    pub fn closed(&self, reason: &str) {
        if let Some(shared) = self.shared.upgrade() {
            shared.on_transport_closed(self.generation, reason);
        }
    }
}
