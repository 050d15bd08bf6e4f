use parking_lot::RwLock;
use std::sync::Arc;
use tracing::trace;

type OpenHandler = Box<dyn Fn() + Send + Sync>;
type MessageHandler = Box<dyn Fn(String) + Send + Sync>;
type ErrorHandler = Box<dyn Fn(String) + Send + Sync>;
type CloseHandler = Box<dyn Fn(Option<u16>) + Send + Sync>;

#[derive(Default)]
struct Handlers {
    open: Option<OpenHandler>,
    message: Option<MessageHandler>,
    error: Option<ErrorHandler>,
    close: Option<CloseHandler>,
}

/// The callbacks of a transport, at most one per event type.
///
/// Registering a handler replaces the previous one. Handlers run on whatever thread the
/// transport delivers events from, so they must not call back into the [`TransportEvents`].
#[derive(Default, Clone)]
pub struct TransportEvents(Arc<RwLock<Handlers>>);

impl core::fmt::Debug for TransportEvents {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TransportEvents")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

impl TransportEvents {
    pub fn on_open(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.0.write().open = Some(Box::new(handler));
    }

    pub fn on_message(&self, handler: impl Fn(String) + Send + Sync + 'static) {
        self.0.write().message = Some(Box::new(handler));
    }

    pub fn on_error(&self, handler: impl Fn(String) + Send + Sync + 'static) {
        self.0.write().error = Some(Box::new(handler));
    }

    pub fn on_close(&self, handler: impl Fn(Option<u16>) + Send + Sync + 'static) {
        self.0.write().close = Some(Box::new(handler));
    }

    /// Unregisters every handler. Events emitted afterwards are ignored.
    pub fn clear(&self) {
        *self.0.write() = Handlers::default();
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        let handlers = self.0.read();
        [
            handlers.open.is_some(),
            handlers.message.is_some(),
            handlers.error.is_some(),
            handlers.close.is_some(),
        ]
        .into_iter()
        .filter(|registered| *registered)
        .count()
    }

    pub fn emit_open(&self) {
        match &self.0.read().open {
            Some(handler) => handler(),
            None => trace!("open event without handler"),
        }
    }

    pub fn emit_message(&self, text: String) {
        match &self.0.read().message {
            Some(handler) => handler(text),
            None => trace!("message event without handler"),
        }
    }

    pub fn emit_error(&self, error: String) {
        match &self.0.read().error {
            Some(handler) => handler(error),
            None => trace!(?error, "error event without handler"),
        }
    }

    pub fn emit_close(&self, code: Option<u16>) {
        match &self.0.read().close {
            Some(handler) => handler(code),
            None => trace!(?code, "close event without handler"),
        }
    }
}
