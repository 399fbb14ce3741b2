//! The capture task and its lifecycle.

use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{BarcodeDetector, FrameSource, ScanEvent, ScanEvents, events::Subscribers};

struct Pipeline {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Pipeline {
    fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Runs frames through a detector and fans decoded values out to every
/// subscriber.
///
/// At most one pipeline runs at a time. [`Self::stop`] cancels it and a new
/// one can then be set up; dropping the capture cancels it as well.
pub struct BarcodeCapture<D> {
    detector: Arc<D>,
    subscribers: Subscribers,
    pipeline: Mutex<Option<Pipeline>>,
}

impl<D> std::fmt::Debug for BarcodeCapture<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BarcodeCapture")
            .field("subscribers", &self.subscribers.count())
            .finish_non_exhaustive()
    }
}

impl<D: BarcodeDetector> BarcodeCapture<D> {
    /// Create an idle capture around `detector`.
    #[must_use]
    pub fn new(detector: D) -> Self {
        Self {
            detector: Arc::new(detector),
            subscribers: Subscribers::default(),
            pipeline: Mutex::new(None),
        }
    }

    /// Start analysing `frames`.
    ///
    /// Returns `false` without touching `frames` when a pipeline is already
    /// running. A pipeline whose source has run dry no longer counts.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn set_up_camera<F: FrameSource>(&self, frames: F) -> bool {
        let mut pipeline = self.pipeline.lock().unwrap_or_else(PoisonError::into_inner);
        if pipeline.as_ref().is_some_and(Pipeline::is_running) {
            debug!("capture pipeline already running");
            return false;
        }
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_pipeline(
            frames,
            Arc::clone(&self.detector),
            self.subscribers.clone(),
            cancel.clone(),
        ));
        *pipeline = Some(Pipeline { cancel, task });
        debug!("capture pipeline started");
        true
    }

    /// Whether a pipeline is currently running.
    pub fn is_active(&self) -> bool {
        self.pipeline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(Pipeline::is_running)
    }

    /// Cancel the running pipeline, if any.
    ///
    /// Returns whether a pipeline was running. Subscribers stay connected and
    /// receive events from the next pipeline.
    pub fn stop(&self) -> bool {
        let stopped = self
            .pipeline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        stopped.is_some_and(|pipeline| {
            let running = pipeline.is_running();
            pipeline.cancel.cancel();
            running
        })
    }

    /// Receive events from now on.
    pub fn subscribe(&self) -> ScanEvents {
        self.subscribers.subscribe()
    }
}

impl<D> Drop for BarcodeCapture<D> {
    fn drop(&mut self) {
        let pipeline = self
            .pipeline
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(pipeline) = pipeline {
            pipeline.cancel.cancel();
        }
        self.subscribers.close();
    }
}

async fn run_pipeline<F, D>(
    mut frames: F,
    detector: Arc<D>,
    subscribers: Subscribers,
    cancel: CancellationToken,
) where
    F: FrameSource,
    D: BarcodeDetector,
{
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("capture pipeline cancelled");
                return;
            }
            frame = frames.next_frame() => frame,
        };
        let Some(frame) = next else {
            debug!("frame source exhausted");
            return;
        };
        match detector.detect(&frame) {
            Ok(codes) => {
                let first = codes.into_iter().next().and_then(|code| code.raw_value);
                let Some(value) = first else {
                    continue;
                };
                // No subscribers is not an error; the value is simply unseen.
                if subscribers.publish(&ScanEvent::now(value)) == 0 {
                    debug!("scan on frame {} had no subscribers", frame.sequence);
                }
            }
            Err(err) => warn!("{err}"),
        }
    }
}
