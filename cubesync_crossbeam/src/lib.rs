/*! # Cubesync Crossbeam

In-process [`Transport`] backed by crossbeam channels, connected to a [`CrossbeamServer`]
that relays text frames between its clients the way the real relay does.

Useful for tests and for running several clients inside the same process.
*/

mod server;

pub use server::{ClientId, CrossbeamServer, RouteMode};

use cubesync_transport::prelude::*;
use cubesync_transport::Result;
use server::Frame;
use tracing::{debug, trace};

pub mod prelude {
    pub use crate::server::{ClientId, CrossbeamServer, RouteMode};
    pub use crate::{CrossbeamBuilder, CrossbeamTransport};
}

/// Opens a [`CrossbeamTransport`] to the given server, whatever the url
#[derive(Clone)]
pub struct CrossbeamBuilder {
    server: CrossbeamServer,
}

impl CrossbeamBuilder {
    pub fn new(server: CrossbeamServer) -> Self {
        Self { server }
    }
}

impl TransportBuilder for CrossbeamBuilder {
    fn build(&self, url: &str) -> Result<Box<dyn Transport>> {
        trace!(?url, "Building crossbeam transport");
        Ok(Box::new(CrossbeamTransport::new(self.server.clone())))
    }
}

pub struct CrossbeamTransport {
    server: CrossbeamServer,
    id: Option<ClientId>,
    events: TransportEvents,
    state: SharedState,
}

impl CrossbeamTransport {
    pub fn new(server: CrossbeamServer) -> Self {
        Self {
            server,
            id: None,
            events: TransportEvents::default(),
            state: SharedState::default(),
        }
    }

    /// Id assigned by the server, once the transport has been opened
    pub fn id(&self) -> Option<ClientId> {
        self.id
    }
}

impl Transport for CrossbeamTransport {
    fn open(&mut self) -> Result<()> {
        if self.state.get() != TransportState::Closed {
            return Ok(());
        }
        let id = self.server.admit()?;
        self.id = Some(id);
        self.state.set(TransportState::Connecting);
        debug!(?id, "Opening crossbeam transport");
        // the handshake completes on the next server step
        self.server.push(Frame::Connect {
            id,
            events: self.events.clone(),
            state: self.state.clone(),
        })
    }

    fn send(&mut self, text: String) -> Result<()> {
        match (self.state.get(), self.id) {
            (TransportState::Open, Some(id)) => self.server.push(Frame::Text { from: id, text }),
            _ => Err(TransportError::NotConnected),
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.state.get() == TransportState::Closed {
            return Ok(());
        }
        self.state.set(TransportState::Closed);
        let result = match self.id.take() {
            Some(id) => self.server.push(Frame::Disconnect { id }),
            None => Ok(()),
        };
        self.events.emit_close(Some(server::NORMAL_CLOSURE));
        result
    }

    fn state(&self) -> TransportState {
        self.state.get()
    }

    fn events(&self) -> &TransportEvents {
        &self.events
    }
}
