//! Pending heartbeat queue.

use crate::heartbeat::Heartbeat;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Multi-producer FIFO of heartbeats awaiting dispatch.
///
/// Producers push from any thread; the flush driver is the only consumer.
pub struct PendingQueue {
    sender: Sender<Heartbeat>,
    receiver: Receiver<Heartbeat>,
}

impl PendingQueue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Append a heartbeat at the tail.
    pub fn push(&self, heartbeat: Heartbeat) {
        // The receiver lives as long as the queue, so send cannot fail.
        let _ = self.sender.send(heartbeat);
    }

    /// Take the heartbeat at the head, if any.
    pub fn pop(&self) -> Option<Heartbeat> {
        self.receiver.try_recv().ok()
    }

    /// Take every heartbeat queued at the time of the call, in FIFO order.
    ///
    /// Heartbeats pushed while draining stay queued for the next flush.
    pub fn drain(&self) -> Vec<Heartbeat> {
        let queued = self.receiver.len();
        self.receiver.try_iter().take(queued).collect()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for PendingQueue {
    fn default() -> Self {
        Self::new()
    }
}
