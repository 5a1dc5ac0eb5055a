//! Period-expiry notification.
//!
//! Back-ends publish an event per elapsed period onto a bounded channel;
//! the application drains it from its own thread via
//! [`Pcm::dispatch_events`](crate::pcm::Pcm::dispatch_events). Nothing
//! runs in signal context.

use crate::Frames;
use crossbeam_channel::{bounded, Receiver, Sender};

/// One elapsed hardware period.
#[derive(Debug, Clone, Copy)]
pub struct PeriodEvent {
    /// Hardware pointer at the period boundary.
    pub hw_ptr: Frames,
}

pub type PeriodSender = Sender<PeriodEvent>;
pub type PeriodReceiver = Receiver<PeriodEvent>;

/// Bounded channel for period events. A full channel drops the oldest
/// semantics is not wanted here: the sender drops the *new* event
/// instead, since the dispatcher only cares that it runs at least once
/// per drained batch.
pub fn period_channel(capacity: usize) -> (PeriodSender, PeriodReceiver) {
    bounded(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_drop_on_full() {
        let (tx, rx) = period_channel(2);
        assert!(tx.try_send(PeriodEvent { hw_ptr: 1 }).is_ok());
        assert!(tx.try_send(PeriodEvent { hw_ptr: 2 }).is_ok());
        assert!(tx.try_send(PeriodEvent { hw_ptr: 3 }).is_err());
        assert_eq!(rx.try_iter().count(), 2);
    }
}
