/*! # Cubesync Connection

Connection lifecycle of a client.

- [`Connection`](client::Connection): the `Disconnected -> Connecting -> Connected` state
  machine around a [`Transport`](cubesync_transport::Transport), with at most one connection
  attempt alive at any time
- [`SendCadence`](cadence::SendCadence): the periodic delta send and full resync ticks
- [`InboundQueue`](inbound::InboundQueue): frames delivered by the transport, drained once per
  tick in arrival order and routed on their `type`
*/

pub mod cadence;
pub mod client;
pub mod config;
pub mod inbound;
mod plugin;

pub mod prelude {
    pub use crate::cadence::SendDue;
    pub use crate::client::{ClientState, Connection, ConnectionError};
    pub use crate::config::ConnectionConfig;
    pub use crate::inbound::ReceivedBatches;
    pub use crate::plugin::{ConnectionPlugin, ConnectionSystems};
}
