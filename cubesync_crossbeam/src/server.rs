//! Relay server living in the same process as its clients
use crossbeam_channel::{Receiver, Sender};
use cubesync_transport::prelude::*;
use cubesync_transport::Result;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Close code of a normal closure
pub(crate) const NORMAL_CLOSURE: u16 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

/// Who receives a frame sent by a client
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum RouteMode {
    /// Back to the sender only
    Echo,
    /// To every client, including the sender
    Broadcast,
    /// To every client except the sender
    #[default]
    BroadcastOthers,
}

pub(crate) enum Frame {
    Connect {
        id: ClientId,
        events: TransportEvents,
        state: SharedState,
    },
    Text {
        from: ClientId,
        text: String,
    },
    Disconnect {
        id: ClientId,
    },
}

struct Peer {
    events: TransportEvents,
    state: SharedState,
}

#[derive(Default)]
struct ServerState {
    mode: RouteMode,
    refuse: bool,
    next_id: u64,
    clients: IndexMap<ClientId, Peer>,
    received: Vec<(ClientId, String)>,
}

impl ServerState {
    fn targets(&self, from: ClientId) -> Vec<TransportEvents> {
        self.clients
            .iter()
            .filter(|(id, _)| match self.mode {
                RouteMode::Echo => **id == from,
                RouteMode::Broadcast => true,
                RouteMode::BroadcastOthers => **id != from,
            })
            .map(|(_, peer)| peer.events.clone())
            .collect()
    }
}

/// Cheap handle to the relay: every clone talks to the same server.
///
/// Frames sent by clients are buffered until [`CrossbeamServer::step`] routes them.
/// Callbacks are never invoked while the server lock is held.
#[derive(Clone)]
pub struct CrossbeamServer {
    sender: Sender<Frame>,
    receiver: Receiver<Frame>,
    inner: Arc<Mutex<ServerState>>,
}

impl Default for CrossbeamServer {
    fn default() -> Self {
        Self::new(RouteMode::default())
    }
}

impl CrossbeamServer {
    pub fn new(mode: RouteMode) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            sender,
            receiver,
            inner: Arc::new(Mutex::new(ServerState {
                mode,
                ..Default::default()
            })),
        }
    }

    pub fn set_mode(&self, mode: RouteMode) {
        self.inner.lock().mode = mode;
    }

    /// While set, opening a transport fails immediately
    pub fn refuse_connections(&self, refuse: bool) {
        self.inner.lock().refuse = refuse;
    }

    pub(crate) fn admit(&self) -> Result<ClientId> {
        let mut inner = self.inner.lock();
        if inner.refuse {
            return Err(TransportError::Refused("crossbeam server".to_owned()));
        }
        inner.next_id += 1;
        Ok(ClientId(inner.next_id))
    }

    pub(crate) fn push(&self, frame: Frame) -> Result<()> {
        self.sender.send(frame).map_err(|_| TransportError::Closed)
    }

    /// Completes pending handshakes and routes every buffered frame, in arrival order
    pub fn step(&self) {
        let frames: Vec<Frame> = self.receiver.try_iter().collect();
        for frame in frames {
            match frame {
                Frame::Connect { id, events, state } => {
                    // the client gave up before the handshake completed
                    if state.get() != TransportState::Connecting {
                        continue;
                    }
                    state.set(TransportState::Open);
                    self.inner.lock().clients.insert(
                        id,
                        Peer {
                            events: events.clone(),
                            state,
                        },
                    );
                    info!(?id, "Client connected");
                    events.emit_open();
                }
                Frame::Text { from, text } => {
                    let targets = {
                        let mut inner = self.inner.lock();
                        if !inner.clients.contains_key(&from) {
                            warn!(?from, "Dropping frame from unknown client");
                            continue;
                        }
                        inner.received.push((from, text.clone()));
                        inner.targets(from)
                    };
                    trace!(?from, targets = targets.len(), "Routing frame");
                    for target in targets {
                        target.emit_message(text.clone());
                    }
                }
                Frame::Disconnect { id } => {
                    if self.inner.lock().clients.shift_remove(&id).is_some() {
                        info!(?id, "Client disconnected");
                    }
                }
            }
        }
    }

    /// Ids of the connected clients, in connection order
    pub fn client_ids(&self) -> Vec<ClientId> {
        self.inner.lock().clients.keys().copied().collect()
    }

    /// Every frame routed so far, with its sender
    pub fn received(&self) -> Vec<(ClientId, String)> {
        self.inner.lock().received.clone()
    }

    pub fn take_received(&self) -> Vec<(ClientId, String)> {
        core::mem::take(&mut self.inner.lock().received)
    }

    fn peer_events(&self, id: ClientId) -> Option<TransportEvents> {
        self.inner.lock().clients.get(&id).map(|peer| peer.events.clone())
    }

    /// Delivers a raw frame to every connected client
    pub fn inject(&self, text: &str) {
        let targets: Vec<_> = {
            let inner = self.inner.lock();
            inner.clients.values().map(|peer| peer.events.clone()).collect()
        };
        for target in targets {
            target.emit_message(text.to_owned());
        }
    }

    /// Delivers a raw frame to one client
    pub fn inject_to(&self, id: ClientId, text: &str) {
        if let Some(events) = self.peer_events(id) {
            events.emit_message(text.to_owned());
        }
    }

    /// Reports a transport error to the client, without closing the channel
    pub fn raise_error(&self, id: ClientId, error: &str) {
        if let Some(events) = self.peer_events(id) {
            debug!(?id, ?error, "Raising transport error");
            events.emit_error(error.to_owned());
        }
    }

    /// Closes the channel of one client from the server side
    pub fn close_client(&self, id: ClientId) {
        let peer = self.inner.lock().clients.shift_remove(&id);
        if let Some(peer) = peer {
            info!(?id, "Closing client");
            peer.state.set(TransportState::Closed);
            peer.events.emit_close(Some(NORMAL_CLOSURE));
        }
    }

    pub fn close_all(&self) {
        for id in self.client_ids() {
            self.close_client(id);
        }
    }
}
