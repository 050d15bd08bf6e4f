use crate::cadence::{SendCadence, SendDue};
use crate::config::ConnectionConfig;
use crate::inbound::InboundQueue;
use bevy_ecs::prelude::Resource;
use bevy_platform::time::Instant;
use bevy_reflect::Reflect;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use crossbeam_channel::{Receiver, Sender};
use cubesync_core::prelude::NetworkId;
use cubesync_messages::prelude::*;
use cubesync_transport::prelude::*;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

pub type Result<T> = core::result::Result<T, ConnectionError>;

/// Errors related to the client connection
#[derive(thiserror::Error, Debug)]
pub enum ConnectionError {
    #[error("the client is shutting down")]
    ShuttingDown,
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum ClientState {
    /// Client is connected to the relay
    Connected,
    /// Client is connecting to the relay
    Connecting,
    #[default]
    /// Client is disconnected from the relay
    Disconnected,
}

impl ClientState {
    /// Text of the connection-state indicator
    pub fn label(&self) -> &'static str {
        match self {
            ClientState::Connected => "Connected",
            ClientState::Connecting => "Connecting...",
            ClientState::Disconnected => "Disconnected",
        }
    }
}

#[derive(Debug)]
enum LinkEventKind {
    Opened,
    Error(String),
    Closed(Option<u16>),
}

/// Lifecycle event reported by a transport callback
#[derive(Debug)]
struct LinkEvent {
    /// Connection attempt the event belongs to
    generation: u64,
    kind: LinkEventKind,
}

/// Connection to the relay.
///
/// Owns the transport and the `Disconnected -> Connecting -> Connected -> Disconnected`
/// state machine. Transport callbacks never touch this struct: lifecycle events and inbound
/// frames are queued and handled on the tick thread.
#[derive(Resource)]
pub struct Connection {
    config: ConnectionConfig,
    builder: Arc<dyn TransportBuilder>,
    transport: Option<Box<dyn Transport>>,
    state: ClientState,
    join: JoinMessage,
    /// Set before teardown begins; every callback checks it first
    shutting_down: Arc<AtomicBool>,
    generation: u64,
    link_tx: Sender<LinkEvent>,
    link_rx: Receiver<LinkEvent>,
    inbound: InboundQueue,
    /// Frames sent this tick, flushed to the transport at the end of the tick
    outbox: Vec<String>,
    cadence: SendCadence,
}

impl Connection {
    pub fn new(
        config: ConnectionConfig,
        builder: Arc<dyn TransportBuilder>,
        player_id: NetworkId,
    ) -> Self {
        let (link_tx, link_rx) = crossbeam_channel::unbounded();
        Self {
            join: JoinMessage::new(player_id, config.platform.clone()),
            cadence: SendCadence::new(&config),
            config,
            builder,
            transport: None,
            state: ClientState::Disconnected,
            shutting_down: Arc::new(AtomicBool::new(false)),
            generation: 0,
            link_tx,
            link_rx,
            inbound: InboundQueue::default(),
            outbox: Vec::new(),
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.state == ClientState::Connected
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// When the last inbound frame was received
    pub fn last_received(&self) -> Option<Instant> {
        self.inbound.last_received()
    }

    pub fn inbound(&self) -> &InboundQueue {
        &self.inbound
    }

    /// Number of callbacks registered on the current transport
    pub fn handler_count(&self) -> usize {
        self.transport
            .as_ref()
            .map_or(0, |transport| transport.events().handler_count())
    }

    fn set_state(&mut self, state: ClientState) {
        if self.state != state {
            info!(from = ?self.state, to = ?state, "Connection state changed");
            self.state = state;
        }
    }

    /// Starts a connection attempt. Does nothing while connecting or connected.
    ///
    /// If the transport cannot even be opened, the disconnect teardown runs and the client is
    /// back to `Disconnected`.
    pub fn connect(&mut self) -> Result<()> {
        if self.is_shutting_down() {
            return Err(ConnectionError::ShuttingDown);
        }
        if self.state != ClientState::Disconnected {
            debug!(state = ?self.state, "Ignoring connect request");
            return Ok(());
        }
        // a transport that reported an error is still around until we reconnect
        self.release_transport();
        self.generation += 1;
        self.set_state(ClientState::Connecting);
        if let Err(e) = self.open() {
            error!(url = ?self.config.url, "Could not connect: {e}");
            self.disconnect();
            return Err(e);
        }
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        let transport = self.builder.build(&self.config.url)?;
        self.subscribe(transport.events());
        self.transport.insert(transport).open()?;
        Ok(())
    }

    /// Registers exactly one handler per event type on the transport
    fn subscribe(&self, events: &TransportEvents) {
        let opened = self.forward_link_events();
        events.on_open(move || opened(LinkEventKind::Opened));
        let failed = self.forward_link_events();
        events.on_error(move |error| failed(LinkEventKind::Error(error)));
        let closed = self.forward_link_events();
        events.on_close(move |code| closed(LinkEventKind::Closed(code)));

        let inbound = self.inbound.clone();
        let shutting_down = self.shutting_down.clone();
        events.on_message(move |frame| {
            if shutting_down.load(Ordering::Acquire) {
                return;
            }
            inbound.push(frame);
        });
    }

    fn forward_link_events(&self) -> impl Fn(LinkEventKind) + Send + Sync + use<> {
        let tx = self.link_tx.clone();
        let shutting_down = self.shutting_down.clone();
        let generation = self.generation;
        move |kind| {
            if shutting_down.load(Ordering::Acquire) {
                return;
            }
            // the receiver lives as long as the connection
            let _ = tx.send(LinkEvent { generation, kind });
        }
    }

    /// Cancels periodic work, unregisters every callback, closes the transport, then goes
    /// back to `Disconnected`
    pub fn disconnect(&mut self) {
        self.cadence.cancel();
        self.release_transport();
        // anything delivered before the callbacks were removed is stale
        self.link_rx.try_iter().for_each(drop);
        self.inbound.clear();
        self.outbox.clear();
        self.set_state(ClientState::Disconnected);
    }

    fn release_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.events().clear();
            if let Err(e) = transport.close() {
                trace!("Ignoring error while closing the transport: {e}");
            }
        }
    }

    /// Connect button: ignored while connecting, disconnects when connected, connects otherwise
    pub fn toggle(&mut self) {
        match self.state {
            ClientState::Connecting => {}
            ClientState::Connected => self.disconnect(),
            ClientState::Disconnected => {
                // failures are already logged and torn down
                let _ = self.connect();
            }
        }
    }

    /// Tears the connection down for good. Further connect requests are refused.
    pub fn shutdown(&mut self) {
        self.shutting_down.store(true, Ordering::Release);
        self.disconnect();
    }

    /// Handles the lifecycle events reported by the transport since the last tick
    pub fn process_link_events(&mut self) {
        let events: Vec<LinkEvent> = self.link_rx.try_iter().collect();
        for event in events {
            if event.generation != self.generation {
                trace!(?event, "Ignoring event of a previous connection attempt");
                continue;
            }
            match event.kind {
                LinkEventKind::Opened => self.on_opened(),
                LinkEventKind::Error(error) => self.on_error(error),
                LinkEventKind::Closed(code) => {
                    info!(?code, "Transport closed");
                    self.cadence.cancel();
                    self.outbox.clear();
                    self.set_state(ClientState::Disconnected);
                }
            }
        }
    }

    fn on_opened(&mut self) {
        if self.state != ClientState::Connecting {
            return;
        }
        self.set_state(ClientState::Connected);
        match encode_join(&self.join) {
            Ok(join) => self.send(join),
            Err(e) => error!("Could not encode the join message: {e}"),
        }
        self.cadence.start(self.config.force_send_on_connect);
    }

    fn on_error(&mut self, error: String) {
        error!(?error, "Transport error");
        if self.state == ClientState::Connecting {
            // the channel never opened: same teardown as an explicit disconnect
            self.disconnect();
            return;
        }
        // handlers stay registered until the next connect or disconnect
        self.cadence.cancel();
        self.outbox.clear();
        self.set_state(ClientState::Disconnected);
    }

    /// Queues a text frame. Does nothing unless connected.
    pub fn send(&mut self, text: String) {
        if self.state != ClientState::Connected {
            trace!(state = ?self.state, "Not connected, dropping frame");
            return;
        }
        self.outbox.push(text);
    }

    /// Advances the send cadence, returns the send requested for this frame if any
    pub fn tick_send(&mut self, delta: Duration) -> Option<SendDue> {
        if self.state != ClientState::Connected {
            return None;
        }
        self.cadence.tick(delta)
    }

    /// Hands the queued frames to the transport. Frames are dropped if the channel is not open.
    pub fn flush(&mut self) {
        if self.outbox.is_empty() {
            return;
        }
        let frames = core::mem::take(&mut self.outbox);
        let Some(transport) = self
            .transport
            .as_mut()
            .filter(|transport| transport.state() == TransportState::Open)
        else {
            debug!(dropped = frames.len(), "Transport is not open, dropping frames");
            return;
        };
        for frame in frames {
            if let Err(e) = transport.send(frame) {
                warn!("Could not send frame: {e}");
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if !self.is_shutting_down() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubesync_crossbeam::prelude::*;
    use test_log::test;

    fn connection(server: &CrossbeamServer) -> Connection {
        Connection::new(
            ConnectionConfig::default().with_platform("test"),
            Arc::new(CrossbeamBuilder::new(server.clone())),
            NetworkId::player("abc", "1"),
        )
    }

    fn connected(server: &CrossbeamServer) -> Connection {
        let mut connection = connection(server);
        connection.connect().unwrap();
        server.step();
        connection.process_link_events();
        connection
    }

    #[test]
    fn test_labels() {
        assert_eq!(ClientState::Disconnected.label(), "Disconnected");
        assert_eq!(ClientState::Connecting.label(), "Connecting...");
        assert_eq!(ClientState::Connected.label(), "Connected");
    }

    #[test]
    fn test_connect_registers_one_handler_per_event() {
        let server = CrossbeamServer::default();
        let mut connection = connection(&server);
        connection.connect().unwrap();
        assert_eq!(connection.state(), ClientState::Connecting);
        assert_eq!(connection.handler_count(), 4);

        // a second connect while connecting is ignored
        connection.connect().unwrap();
        server.step();
        assert_eq!(server.client_ids().len(), 1);
        assert_eq!(connection.handler_count(), 4);
    }

    #[test]
    fn test_join_is_sent_on_open() {
        let server = CrossbeamServer::default();
        let mut connection = connected(&server);
        assert_eq!(connection.state(), ClientState::Connected);
        connection.flush();
        server.step();
        assert_eq!(
            server.received()[0].1,
            r#"{"playerId":"player:abc-1","platform":"test"}"#
        );
        // forced full send right after opening
        assert_eq!(
            connection.tick_send(Duration::ZERO),
            Some(SendDue { force_all: true })
        );
    }

    #[test]
    fn test_refused_connection_is_torn_down() {
        let server = CrossbeamServer::default();
        server.refuse_connections(true);
        let mut connection = connection(&server);
        assert!(matches!(
            connection.connect(),
            Err(ConnectionError::Transport(TransportError::Refused(_)))
        ));
        assert_eq!(connection.state(), ClientState::Disconnected);
        assert_eq!(connection.handler_count(), 0);
    }

    #[test]
    fn test_disconnect() {
        let server = CrossbeamServer::default();
        let mut connection = connected(&server);
        connection.send("pending".to_owned());
        connection.disconnect();
        assert_eq!(connection.state(), ClientState::Disconnected);
        assert_eq!(connection.handler_count(), 0);
        assert_eq!(connection.tick_send(Duration::from_secs(10)), None);

        connection.flush();
        server.step();
        assert!(server.received().is_empty());
        assert!(server.client_ids().is_empty());
    }

    #[test]
    fn test_server_close() {
        let server = CrossbeamServer::default();
        let mut connection = connected(&server);
        server.close_all();
        connection.process_link_events();
        assert_eq!(connection.state(), ClientState::Disconnected);
        assert_eq!(connection.tick_send(Duration::from_secs(10)), None);
    }

    #[test]
    fn test_error_while_connected() {
        let server = CrossbeamServer::default();
        let mut connection = connected(&server);
        let id = server.client_ids()[0];
        server.raise_error(id, "boom");
        connection.process_link_events();
        assert_eq!(connection.state(), ClientState::Disconnected);
        assert_eq!(connection.tick_send(Duration::from_secs(10)), None);
        // handlers stay registered until the next connect or disconnect
        assert_eq!(connection.handler_count(), 4);

        // reconnecting releases the errored transport first
        connection.connect().unwrap();
        server.step();
        connection.process_link_events();
        assert_eq!(connection.state(), ClientState::Connected);
        assert_eq!(server.client_ids().len(), 1);
    }

    #[test]
    fn test_toggle() {
        let server = CrossbeamServer::default();
        let mut connection = connection(&server);
        connection.toggle();
        assert_eq!(connection.state(), ClientState::Connecting);
        connection.toggle();
        assert_eq!(connection.state(), ClientState::Connecting);
        server.step();
        connection.process_link_events();
        assert_eq!(connection.state(), ClientState::Connected);
        connection.toggle();
        assert_eq!(connection.state(), ClientState::Disconnected);
    }

    #[test]
    fn test_shutdown() {
        let server = CrossbeamServer::default();
        let mut connection = connected(&server);
        connection.shutdown();
        assert!(connection.is_shutting_down());
        assert_eq!(connection.state(), ClientState::Disconnected);
        assert!(matches!(
            connection.connect(),
            Err(ConnectionError::ShuttingDown)
        ));
    }

    #[test]
    fn test_stale_events_are_ignored() {
        let server = CrossbeamServer::default();
        let mut connection = connection(&server);
        connection.connect().unwrap();
        connection.disconnect();
        connection.connect().unwrap();
        // the first attempt was abandoned before its handshake completed
        server.step();
        connection.process_link_events();
        assert_eq!(connection.state(), ClientState::Connected);
        assert_eq!(server.client_ids().len(), 1);
    }
}
