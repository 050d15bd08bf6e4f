use bevy_reflect::Reflect;
use core::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// State of the underlying channel, as reported by the transport itself
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum TransportState {
    #[default]
    Closed,
    Connecting,
    Open,
    Closing,
}

impl TransportState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Open,
            3 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// [`TransportState`] shared between a transport and the task driving its io
#[derive(Debug, Default, Clone)]
pub struct SharedState(Arc<AtomicU8>);

impl SharedState {
    pub fn get(&self) -> TransportState {
        TransportState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: TransportState) {
        self.0.store(state as u8, Ordering::Release);
    }
}
