/*! # Cubesync WebSocket

[`Transport`] over a websocket, for `ws://` and `wss://` endpoints.

The socket is driven by a task running on the bevy [`IoTaskPool`]; frames to send are handed
to the task through a channel, and everything the task observes is reported through the
transport callbacks, from the task's thread.
*/
use async_compat::Compat;
use bevy_tasks::{IoTaskPool, TaskPool};
use cubesync_transport::Result;
use cubesync_transport::prelude::*;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::sync::oneshot;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};

pub mod prelude {
    pub use crate::{WebSocketBuilder, WebSocketTransport};
}

/// Close code of a normal closure
const NORMAL_CLOSURE: u16 = 1000;

#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketBuilder;

impl TransportBuilder for WebSocketBuilder {
    fn build(&self, url: &str) -> Result<Box<dyn Transport>> {
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(TransportError::InvalidEndpoint(url.to_owned()));
        }
        Ok(Box::new(WebSocketTransport::new(url)))
    }
}

pub struct WebSocketTransport {
    url: String,
    events: TransportEvents,
    state: SharedState,
    outgoing: Option<UnboundedSender<Message>>,
    close: Option<oneshot::Sender<()>>,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            events: TransportEvents::default(),
            state: SharedState::default(),
            outgoing: None,
            close: None,
        }
    }
}

impl Transport for WebSocketTransport {
    fn open(&mut self) -> Result<()> {
        if self.state.get() != TransportState::Closed {
            return Ok(());
        }
        let (outgoing_tx, outgoing_rx) = unbounded_channel();
        let (close_tx, close_rx) = oneshot::channel();
        self.outgoing = Some(outgoing_tx);
        self.close = Some(close_tx);
        self.state.set(TransportState::Connecting);
        debug!(url = ?self.url, "Opening websocket");

        let io = SocketTask {
            url: self.url.clone(),
            events: self.events.clone(),
            state: self.state.clone(),
        };
        IoTaskPool::get_or_init(TaskPool::new)
            .spawn(Compat::new(io.run(outgoing_rx, close_rx)))
            .detach();
        Ok(())
    }

    fn send(&mut self, text: String) -> Result<()> {
        if self.state.get() != TransportState::Open {
            return Err(TransportError::NotConnected);
        }
        let outgoing = self.outgoing.as_ref().ok_or(TransportError::NotConnected)?;
        outgoing
            .send(Message::Text(text.into()))
            .map_err(|_| TransportError::IoTaskGone)
    }

    fn close(&mut self) -> Result<()> {
        self.outgoing = None;
        match self.close.take() {
            Some(close) if self.state.get() != TransportState::Closed => {
                self.state.set(TransportState::Closing);
                close.send(()).map_err(|_| TransportError::IoTaskGone)
            }
            _ => {
                self.state.set(TransportState::Closed);
                Ok(())
            }
        }
    }

    fn state(&self) -> TransportState {
        self.state.get()
    }

    fn events(&self) -> &TransportEvents {
        &self.events
    }
}

struct SocketTask {
    url: String,
    events: TransportEvents,
    state: SharedState,
}

impl SocketTask {
    async fn run(self, mut outgoing: UnboundedReceiver<Message>, mut close: oneshot::Receiver<()>) {
        let stream = match connect_async(self.url.as_str()).await {
            Ok((stream, _)) => stream,
            Err(e) => {
                error!(url = ?self.url, "Websocket handshake failed: {e}");
                self.state.set(TransportState::Closed);
                self.events.emit_error(e.to_string());
                return;
            }
        };
        // closed while the handshake was in flight
        if self.state.get() != TransportState::Connecting {
            self.state.set(TransportState::Closed);
            return;
        }
        info!(url = ?self.url, "WebSocket handshake has been successfully completed");
        self.state.set(TransportState::Open);
        self.events.emit_open();

        let (mut write, mut read) = stream.split();
        let code = loop {
            tokio::select! {
                message = outgoing.recv() => {
                    let Some(message) = message else {
                        break None;
                    };
                    if let Err(e) = write.send(message).await {
                        error!("Encountered error while sending websocket msg: {e}");
                        self.events.emit_error(e.to_string());
                        break None;
                    }
                }
                _ = &mut close => {
                    let _ = write.send(Message::Close(None)).await;
                    break Some(NORMAL_CLOSURE);
                }
                incoming = read.next() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        self.events.emit_message(text.as_str().to_owned());
                    }
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                        Ok(text) => self.events.emit_message(text),
                        Err(e) => warn!("Dropping binary frame that is not UTF-8: {e}"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "WebSocket closed by the server");
                        // flushes the close reply queued by tungstenite
                        if let Err(e) = write.close().await {
                            trace!("Could not complete the close handshake: {e}");
                        }
                        break frame.map(|frame| u16::from(frame.code));
                    }
                    // ping and pong are answered by tungstenite
                    Some(Ok(other)) => trace!(?other, "Ignoring control frame"),
                    Some(Err(e)) => {
                        error!("Error while receiving websocket msg: {e}");
                        self.events.emit_error(e.to_string());
                        break None;
                    }
                    None => break None,
                },
            }
        };
        info!(url = ?self.url, ?code, "Close websocket connection");
        self.state.set(TransportState::Closed);
        self.events.emit_close(code);
    }
}
