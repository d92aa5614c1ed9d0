/// WebSocket transport over tokio-tungstenite
///
/// Each `open` spawns one socket task that owns both halves of the stream:
/// - outbound frames arrive on an unbounded queue fed by `send`
/// - inbound text frames go to the sink one at a time, in receive order
/// - a one-second tick drives keepalive pings and idle detection
///
/// Dropping the queue sender (`close`, or a newer `open`) ends the task
/// quietly; any other exit reports `closed` through the sink.
use futures_util::{ SinkExt, StreamExt };
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{ connect_async, tungstenite::Message };

use super::health::{ HealthVerdict, SocketHealth };
use super::transport::{ Transport, TransportSink };
use crate::arguments::is_debug_transport_enabled;
use crate::config::HeartbeatConfig;
use crate::errors::{ HubError, HubResult };
use crate::logger::{ self, LogTag };

pub struct WebSocketTransport {
    url: String,
    heartbeat: HeartbeatConfig,
    writer: Mutex<Option<mpsc::UnboundedSender<Message>>>,
}

impl WebSocketTransport {
    pub fn new(url: &str, heartbeat: HeartbeatConfig) -> Self {
        Self {
            url: url.to_string(),
            heartbeat,
            writer: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for WebSocketTransport {
    fn open(&self, sink: TransportSink) {
        let (tx, rx) = mpsc::unbounded_channel();
        // Replacing the sender ends any previous socket task
        *self.writer.lock() = Some(tx);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(run_socket(self.url.clone(), self.heartbeat.clone(), sink, rx));
            }
            Err(_) => {
                logger::error(LogTag::Transport, "WebSocket transport needs a tokio runtime");
                self.writer.lock().take();
                sink.closed("no tokio runtime");
            }
        }
    }

    fn send(&self, frame: String) -> HubResult<()> {
        match self.writer.lock().as_ref() {
            Some(tx) =>
                tx
                    .send(Message::Text(frame))
                    .map_err(|_| HubError::Transport("socket task stopped".to_string())),
            None => Err(HubError::Transport("socket not open".to_string())),
        }
    }

    fn close(&self) {
        if self.writer.lock().take().is_some() {
            logger::debug(LogTag::Transport, &format!("Closing socket to {}", self.url));
        }
    }
}

/// Drive one socket until it fails or its outbound queue is dropped
async fn run_socket(
    url: String,
    heartbeat: HeartbeatConfig,
    sink: TransportSink,
    mut outbound: mpsc::UnboundedReceiver<Message>
) {
    if is_debug_transport_enabled() {
        logger::debug(
            LogTag::Transport,
            &format!("Dialing {} (generation {})", url, sink.generation())
        );
    }

    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            logger::warning(LogTag::Transport, &format!("Failed to connect to {}: {}", url, e));
            sink.closed(&format!("connect failed: {}", e));
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = stream.split();
    sink.opened();

    let mut health = SocketHealth::new(&heartbeat);
    let mut tick = tokio::time::interval(Duration::from_secs(1));

    let reason: Option<String> = loop {
        tokio::select! {
            biased;

            // Frames queued by the connection
            queued = outbound.recv() => {
                match queued {
                    Some(message) => {
                        if let Err(e) = ws_tx.send(message).await {
                            break Some(format!("write failed: {}", e));
                        }
                    }
                    None => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break None;
                    }
                }
            }

            // Frames from the server
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        health.record_activity();
                        sink.frame(&text);
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        health.record_activity();
                        match String::from_utf8(bytes) {
                            Ok(text) => sink.frame(&text),
                            Err(_) => {
                                logger::warning(LogTag::Transport, "Dropping non-UTF-8 binary frame");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        health.record_activity();
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break Some(match frame {
                            Some(frame) => format!("server closed ({} {})", frame.code, frame.reason),
                            None => "server closed".to_string(),
                        });
                    }
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(e)) => {
                        break Some(format!("websocket error: {}", e));
                    }
                    None => {
                        break Some("stream ended".to_string());
                    }
                }
            }

            _ = tick.tick() => {
                match health.check() {
                    HealthVerdict::Healthy => {}
                    HealthVerdict::SendPing => {
                        if is_debug_transport_enabled() {
                            logger::debug(LogTag::Transport, "Sending keepalive ping");
                        }
                        if ws_tx.send(Message::Ping(Vec::new())).await.is_err() {
                            break Some("ping failed".to_string());
                        }
                        health.record_ping();
                    }
                    HealthVerdict::Idle => {
                        break Some(format!("idle for {}s", health.seconds_since_activity()));
                    }
                    HealthVerdict::PongOverdue => {
                        break Some("pong timeout".to_string());
                    }
                }
            }
        }
    };

    match reason {
        Some(reason) => sink.closed(&reason),
        None => {
            if is_debug_transport_enabled() {
                logger::debug(
                    LogTag::Transport,
                    &format!("Socket generation {} closed locally", sink.generation())
                );
            }
        }
    }
}
