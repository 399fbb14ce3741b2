//! Frames, detectors and the values they decode.

use async_trait::async_trait;
use thiserror::Error;

/// One unit of input handed to a [`BarcodeDetector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Position of the frame in its source, starting at zero.
    pub sequence: u64,
    /// Raw frame contents.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a frame.
    #[must_use]
    pub const fn new(sequence: u64, payload: Vec<u8>) -> Self {
        Self { sequence, payload }
    }
}

/// Symbology of a decoded barcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarcodeFormat {
    /// UPC-A, twelve digits.
    UpcA,
    /// EAN-13, thirteen digits.
    Ean13,
    /// EAN-8, eight digits.
    Ean8,
    /// QR code.
    Qr,
    /// Anything else the detector reports.
    Unknown,
}

/// A code found in a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBarcode {
    /// Decoded text; `None` when the detector saw a code it could not read.
    pub raw_value: Option<String>,
    /// Detected symbology.
    pub format: BarcodeFormat,
}

/// A detector failed to analyse a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("barcode detection failed on frame {sequence}: {message}")]
pub struct DetectError {
    /// Sequence number of the offending frame.
    pub sequence: u64,
    /// Detector-supplied description.
    pub message: String,
}

/// Produces frames until the underlying device stops.
#[async_trait]
pub trait FrameSource: Send + 'static {
    /// Wait for the next frame; `None` once the source is exhausted.
    async fn next_frame(&mut self) -> Option<Frame>;
}

/// Finds barcodes in a frame.
///
/// Codes are returned in the detector's order of confidence; the capture
/// pipeline only looks at the first.
pub trait BarcodeDetector: Send + Sync + 'static {
    /// Analyse `frame`.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError`] when the frame cannot be analysed. The
    /// pipeline logs the failure and moves on to the next frame.
    fn detect(&self, frame: &Frame) -> Result<Vec<DecodedBarcode>, DetectError>;
}
