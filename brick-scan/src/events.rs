//! Subscriber side of the scan event stream.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use futures_util::{Stream, stream};
use tokio::{sync::mpsc, time::Instant};

use crate::Debouncer;

/// A decoded barcode value and the moment it was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    /// Decoded text.
    pub value: String,
    /// Detection instant.
    pub detected_at: Instant,
}

impl ScanEvent {
    /// Create an event stamped with the current instant.
    #[must_use]
    pub fn now(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            detected_at: Instant::now(),
        }
    }
}

/// Per-subscriber queues fed by the capture pipeline.
#[derive(Debug, Clone, Default)]
pub(crate) struct Subscribers(Arc<Mutex<Vec<mpsc::UnboundedSender<ScanEvent>>>>);

impl Subscribers {
    fn senders(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<ScanEvent>>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn subscribe(&self) -> ScanEvents {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.senders().push(sender);
        ScanEvents { receiver }
    }

    /// Queue `event` for every live subscriber; returns how many took it.
    pub(crate) fn publish(&self, event: &ScanEvent) -> usize {
        let mut senders = self.senders();
        senders.retain(|sender| sender.send(event.clone()).is_ok());
        senders.len()
    }

    pub(crate) fn count(&self) -> usize {
        self.senders().len()
    }

    /// Disconnect every subscriber once its queue drains.
    pub(crate) fn close(&self) {
        self.senders().clear();
    }
}

/// Raw scan events for one subscriber.
///
/// Every detection is delivered, including repeats. Events queue without
/// bound until the subscriber reads them, so a slow reader never loses one.
#[derive(Debug)]
pub struct ScanEvents {
    receiver: mpsc::UnboundedReceiver<ScanEvent>,
}

impl ScanEvents {
    /// Wait for the next event; `None` once the capture has been dropped.
    pub async fn next(&mut self) -> Option<ScanEvent> {
        self.receiver.recv().await
    }

    /// Take an already queued event without waiting.
    pub fn try_next(&mut self) -> Option<ScanEvent> {
        self.receiver.try_recv().ok()
    }

    /// Adapt into a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = ScanEvent> + Send {
        stream::unfold(self, |mut events| async move {
            events.next().await.map(|event| (event, events))
        })
    }

    /// Drop repeats of a value seen within `window` of its last delivery.
    #[must_use]
    pub fn debounced(self, window: Duration) -> DebouncedScanEvents {
        DebouncedScanEvents {
            events: self,
            debouncer: Debouncer::new(window),
        }
    }
}

/// Scan events filtered through a [`Debouncer`].
#[derive(Debug)]
pub struct DebouncedScanEvents {
    events: ScanEvents,
    debouncer: Debouncer,
}

impl DebouncedScanEvents {
    /// Wait for the next event that passes the debounce window.
    pub async fn next(&mut self) -> Option<ScanEvent> {
        loop {
            let event = self.events.next().await?;
            if self.debouncer.admit(&event.value, event.detected_at) {
                return Some(event);
            }
        }
    }

    /// Take the next queued event that passes the window, without waiting.
    pub fn try_next(&mut self) -> Option<ScanEvent> {
        loop {
            let event = self.events.try_next()?;
            if self.debouncer.admit(&event.value, event.detected_at) {
                return Some(event);
            }
        }
    }

    /// Adapt into a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = ScanEvent> + Send {
        stream::unfold(self, |mut events| async move {
            events.next().await.map(|event| (event, events))
        })
    }
}
