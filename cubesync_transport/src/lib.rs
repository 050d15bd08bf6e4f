/*! # Cubesync Transport

Abstraction over the bidirectional channel a client talks to the relay through.

A [`Transport`] is opened towards a URL-like endpoint and carries UTF-8 text frames.
It reports what happens on the channel through the callbacks registered on its
[`TransportEvents`]: open, message, error and close. Those callbacks may run on any thread,
so they should only hand the data over to the tick thread.
*/

mod error;
mod events;
mod state;

pub use error::{Result, TransportError};
pub use events::TransportEvents;
pub use state::{SharedState, TransportState};

pub mod prelude {
    pub use crate::error::TransportError;
    pub use crate::events::TransportEvents;
    pub use crate::state::{SharedState, TransportState};
    pub use crate::{Transport, TransportBuilder};
}

/// A single channel to the relay
pub trait Transport: Send + Sync {
    /// Starts opening the channel.
    ///
    /// Returns an error if the channel cannot even be attempted. Otherwise the outcome is
    /// reported later through the open or error callbacks.
    fn open(&mut self) -> Result<()>;

    /// Queues a text frame. Fails if the channel is not open.
    fn send(&mut self, text: String) -> Result<()>;

    /// Starts closing the channel
    fn close(&mut self) -> Result<()>;

    fn state(&self) -> TransportState;

    /// Callbacks invoked when something happens on the channel
    fn events(&self) -> &TransportEvents;
}

/// Creates a new [`Transport`] for every connection attempt
pub trait TransportBuilder: Send + Sync {
    fn build(&self, url: &str) -> Result<Box<dyn Transport>>;
}
