//! Periodic send work started when the connection opens
use crate::config::ConnectionConfig;
use bevy_time::{Timer, TimerMode};
use core::time::Duration;

/// A send requested by the cadence for the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendDue {
    /// Every tracked entity has to be sent, changed or not
    pub force_all: bool,
}

#[derive(Debug, Clone)]
pub struct SendCadence {
    send: Timer,
    resync: Timer,
    active: bool,
    force_next: bool,
}

impl SendCadence {
    pub fn new(config: &ConnectionConfig) -> Self {
        Self {
            send: Timer::new(config.send_interval, TimerMode::Repeating),
            resync: Timer::new(config.resync_interval, TimerMode::Repeating),
            active: false,
            force_next: false,
        }
    }

    /// Starts both ticks. `force_now` requests a forced full send on the next frame.
    pub fn start(&mut self, force_now: bool) {
        self.send.reset();
        self.resync.reset();
        self.active = true;
        self.force_next = force_now;
    }

    /// Cancels every pending periodic send
    pub fn cancel(&mut self) {
        self.active = false;
        self.force_next = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn tick(&mut self, delta: Duration) -> Option<SendDue> {
        if !self.active {
            return None;
        }
        self.send.tick(delta);
        self.resync.tick(delta);
        let force_all = core::mem::take(&mut self.force_next) || self.resync.just_finished();
        (force_all || self.send.just_finished()).then_some(SendDue { force_all })
    }
}
