//! Keyboard-wedge scanners: each input line is one frame.

use async_trait::async_trait;
use log::warn;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::{BarcodeDetector, BarcodeFormat, DecodedBarcode, DetectError, Frame, FrameSource};

/// Frames read line by line from a text stream such as stdin.
///
/// Line terminators are stripped. The source ends at end of input or on the
/// first read error.
#[derive(Debug)]
pub struct LineFrameSource<R> {
    reader: R,
    sequence: u64,
}

impl<R> LineFrameSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    /// Read frames from `reader`.
    #[must_use]
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            sequence: 0,
        }
    }
}

#[async_trait]
impl<R> FrameSource for LineFrameSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    async fn next_frame(&mut self) -> Option<Frame> {
        let mut line = Vec::new();
        match self.reader.read_until(b'\n', &mut line).await {
            Ok(0) => None,
            Ok(_) => {
                while matches!(line.last(), Some(b'\n' | b'\r')) {
                    line.pop();
                }
                let frame = Frame::new(self.sequence, line);
                self.sequence = self.sequence.saturating_add(1);
                Some(frame)
            }
            Err(err) => {
                warn!("scanner input failed: {err}");
                None
            }
        }
    }
}

/// Treats the frame payload as the decoded text of a single code.
///
/// Blank payloads contain no code. Digit-only payloads of retail lengths are
/// classified as UPC-A, EAN-13 or EAN-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextPayloadDetector;

impl TextPayloadDetector {
    fn classify(value: &str) -> BarcodeFormat {
        if !value.bytes().all(|b| b.is_ascii_digit()) {
            return BarcodeFormat::Unknown;
        }
        match value.len() {
            12 => BarcodeFormat::UpcA,
            13 => BarcodeFormat::Ean13,
            8 => BarcodeFormat::Ean8,
            _ => BarcodeFormat::Unknown,
        }
    }
}

impl BarcodeDetector for TextPayloadDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<DecodedBarcode>, DetectError> {
        let text = std::str::from_utf8(&frame.payload).map_err(|err| DetectError {
            sequence: frame.sequence,
            message: err.to_string(),
        })?;
        let value = text.trim();
        if value.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![DecodedBarcode {
            raw_value: Some(value.to_owned()),
            format: Self::classify(value),
        }])
    }
}

#[cfg(test)]
mod tests {
    //! Coverage for the keyboard-wedge adapters.
    #![expect(clippy::expect_used, reason = "tests fail fast on broken fixtures")]

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[tokio::test]
    async fn splits_input_into_frames() {
        let mut source = LineFrameSource::new(&b"673419266192\r\n\n75192\n"[..]);

        let first = source.next_frame().await.expect("first frame");
        assert_eq!(first, Frame::new(0, b"673419266192".to_vec()));
        let second = source.next_frame().await.expect("blank frame");
        assert_eq!(second, Frame::new(1, Vec::new()));
        let third = source.next_frame().await.expect("last frame");
        assert_eq!(third.payload, b"75192");
        assert_eq!(source.next_frame().await, None);
    }

    #[rstest]
    #[case("673419266192", BarcodeFormat::UpcA)]
    #[case("5702015866873", BarcodeFormat::Ean13)]
    #[case("96385074", BarcodeFormat::Ean8)]
    #[case("75192-1", BarcodeFormat::Unknown)]
    fn classifies_payloads(#[case] payload: &str, #[case] format: BarcodeFormat) {
        let frame = Frame::new(0, format!("  {payload} ").into_bytes());
        let codes = TextPayloadDetector.detect(&frame).expect("detect");
        assert_eq!(
            codes,
            vec![DecodedBarcode {
                raw_value: Some(payload.to_owned()),
                format,
            }]
        );
    }

    #[rstest]
    fn blank_payload_has_no_code() {
        let codes = TextPayloadDetector
            .detect(&Frame::new(3, b"   ".to_vec()))
            .expect("detect");
        assert!(codes.is_empty());
    }

    #[rstest]
    fn invalid_utf8_is_a_detection_error() {
        let err = TextPayloadDetector
            .detect(&Frame::new(7, vec![0xff, 0xfe]))
            .expect_err("not text");
        assert_eq!(err.sequence, 7);
    }
}
