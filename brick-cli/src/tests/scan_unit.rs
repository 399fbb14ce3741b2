//! The `scan` command over in-memory scanner input.

use super::helpers::json_lines;
use super::*;
use crate::scan::scan_with;
use brick_core::test_support::{MemoryReferenceStore, sample_records};
use rstest::rstest;
use std::{io::Cursor, time::Duration};

#[rstest]
#[tokio::test]
async fn repeated_codes_are_printed_once() {
    let store = MemoryReferenceStore::with_records(sample_records());
    let input = Cursor::new(b"673419266192\n673419266192\r\n\n10236-1\n000000000000\n".to_vec());
    let mut buffer = Vec::new();

    let printed = scan_with(&store, input, Duration::from_secs(60), &mut buffer)
        .await
        .expect("scan");

    let lines = json_lines(&buffer);
    assert_eq!(printed, 3);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["record"]["name"], "Millennium Falcon");
    assert_eq!(lines[1]["matched_by"], "primary_number");
    assert_eq!(lines[2]["code"], "000000000000");
    assert!(lines[2]["record"].is_null());
}

#[rstest]
#[tokio::test]
async fn empty_input_prints_nothing() {
    let store = MemoryReferenceStore::with_records(sample_records());
    let mut buffer = Vec::new();

    let printed = scan_with(&store, Cursor::new(Vec::new()), Duration::from_secs(1), &mut buffer)
        .await
        .expect("scan");

    assert_eq!(printed, 0);
    assert!(buffer.is_empty());
}

fn distinct_codes(count: usize) -> Vec<u8> {
    (0..count)
        .map(|n| format!("{:012}\n", 900_000_000_000_u64 + n as u64))
        .collect::<String>()
        .into_bytes()
}

#[rstest]
#[tokio::test]
async fn long_batches_are_printed_in_full() {
    let store = MemoryReferenceStore::with_records(sample_records());
    let mut buffer = Vec::new();

    let printed = scan_with(
        &store,
        Cursor::new(distinct_codes(200)),
        Duration::from_secs(60),
        &mut buffer,
    )
    .await
    .expect("scan");

    let lines = json_lines(&buffer);
    assert_eq!(printed, 200);
    assert_eq!(lines.len(), 200);
    assert_eq!(lines[0]["code"], "900000000000");
    assert_eq!(lines[199]["code"], "900000000199");
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn trailing_codes_survive_on_worker_threads() {
    let store = MemoryReferenceStore::with_records(sample_records());

    for _ in 0..20 {
        let mut buffer = Vec::new();
        let printed = scan_with(
            &store,
            Cursor::new(distinct_codes(50)),
            Duration::from_secs(60),
            &mut buffer,
        )
        .await
        .expect("scan");

        assert_eq!(printed, 50);
        assert_eq!(json_lines(&buffer).len(), 50);
    }
}
