//! Barcode capture pipeline for Brick Collector.
//!
//! A [`FrameSource`] (camera, keyboard-wedge scanner, test fixture) feeds
//! frames to a [`BarcodeDetector`]. [`BarcodeCapture`] runs that loop as a
//! cancellable task and queues the first decoded value of every frame that
//! contains one for each subscriber. The raw stream repeats a value for as
//! long as the code stays in view; [`ScanEvents::debounced`] applies an
//! explicit [`Debouncer`] policy on the consumer side.
//!
//! # Examples
//!
//! ```
//! use brick_scan::{BarcodeCapture, LineFrameSource, TextPayloadDetector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
//! runtime.block_on(async {
//!     let capture = BarcodeCapture::new(TextPayloadDetector);
//!     let mut events = capture.subscribe();
//!     let scanner = LineFrameSource::new(&b"673419266192\n"[..]);
//!     assert!(capture.set_up_camera(scanner));
//!
//!     let event = events.next().await.map(|event| event.value);
//!     assert_eq!(event.as_deref(), Some("673419266192"));
//! });
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod capture;
mod debounce;
mod events;
mod frame;
mod line;

pub use capture::BarcodeCapture;
pub use debounce::Debouncer;
pub use events::{DebouncedScanEvents, ScanEvent, ScanEvents};
pub use frame::{BarcodeDetector, BarcodeFormat, DecodedBarcode, DetectError, Frame, FrameSource};
pub use line::{LineFrameSource, TextPayloadDetector};
