//! Hand-off of inbound frames from the transport's thread to the tick thread
use bevy_ecs::prelude::{Res, ResMut, Resource};
use bevy_platform::time::Instant;
use cubesync_messages::prelude::*;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{trace, warn};

use crate::client::Connection;

#[derive(Default)]
struct Inbox {
    frames: VecDeque<String>,
    last_received: Option<Instant>,
}

/// FIFO of raw frames, filled by the transport callbacks and drained once per tick
#[derive(Default, Clone)]
pub struct InboundQueue(Arc<Mutex<Inbox>>);

impl InboundQueue {
    pub fn push(&self, frame: String) {
        let mut inbox = self.0.lock();
        inbox.frames.push_back(frame);
        inbox.last_received = Some(Instant::now());
    }

    /// Takes every queued frame, in arrival order
    pub fn drain(&self) -> Vec<String> {
        self.0.lock().frames.drain(..).collect()
    }

    pub fn clear(&self) {
        self.0.lock().frames.clear();
    }

    pub fn len(&self) -> usize {
        self.0.lock().frames.len()
    }

    pub fn last_received(&self) -> Option<Instant> {
        self.0.lock().last_received
    }
}

/// Batches decoded this tick, waiting to be applied to the scene
#[derive(Resource, Default, Debug)]
pub struct ReceivedBatches(Vec<CubeBatch>);

impl ReceivedBatches {
    pub fn push(&mut self, batch: CubeBatch) {
        self.0.push(batch);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = CubeBatch> + '_ {
        self.0.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Routes a single frame on its `type`. Unknown and malformed frames are dropped.
pub(crate) fn dispatch(frame: &str, batches: &mut ReceivedBatches) {
    match decode(frame) {
        Ok(Inbound::Cubes(batch)) => {
            trace!(len = batch.len(), "Received cubes batch");
            batches.push(batch);
        }
        Ok(Inbound::Other(kind)) => warn!(?kind, "Dropping message of unknown type"),
        Err(e) => warn!("Dropping malformed message: {e}"),
    }
}

/// Drains the inbound queue, exactly once per tick
pub(crate) fn receive(connection: Res<Connection>, mut batches: ResMut<ReceivedBatches>) {
    for frame in connection.inbound().drain() {
        dispatch(&frame, &mut batches);
    }
}
