#![expect(
    clippy::expect_used,
    reason = "tests should fail fast when setup breaks"
)]

//! Behavioural coverage for `BarcodeCapture` fed by a keyboard-wedge scanner.

use std::{cell::RefCell, time::Duration};

use brick_scan::{
    BarcodeCapture, DebouncedScanEvents, LineFrameSource, ScanEvents, TextPayloadDetector,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tokio::runtime::Runtime;

const FALCON: &str = "673419266192";
const EAN: &str = "5702015866873";

struct CaptureWorld {
    runtime: Runtime,
    capture: BarcodeCapture<TextPayloadDetector>,
    input: RefCell<Vec<&'static str>>,
    raw: RefCell<Option<ScanEvents>>,
    debounced: RefCell<Option<DebouncedScanEvents>>,
    second_set_up: RefCell<Option<bool>>,
}

impl CaptureWorld {
    fn scanner(&self) -> LineFrameSource<std::io::Cursor<Vec<u8>>> {
        let mut text = self.input.borrow().join("\n");
        text.push('\n');
        LineFrameSource::new(std::io::Cursor::new(text.into_bytes()))
    }

    fn set_up(&self) -> bool {
        let _guard = self.runtime.enter();
        self.capture.set_up_camera(self.scanner())
    }
}

#[fixture]
fn world() -> CaptureWorld {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("build test runtime");
    let capture = BarcodeCapture::new(TextPayloadDetector);
    let raw = capture.subscribe();
    CaptureWorld {
        runtime,
        capture,
        input: RefCell::new(Vec::new()),
        raw: RefCell::new(Some(raw)),
        debounced: RefCell::new(None),
        second_set_up: RefCell::new(None),
    }
}

#[given("a scanner that reads \"673419266192, 673419266192, 5702015866873\"")]
fn repeated_then_other(world: &CaptureWorld) {
    world.input.replace(vec![FALCON, FALCON, EAN]);
}

#[given("a scanner that reads \"673419266192, 673419266192, 5702015866873, 673419266192\"")]
fn repeated_with_return(world: &CaptureWorld) {
    world.input.replace(vec![FALCON, FALCON, EAN, FALCON]);
}

#[given("a subscriber debouncing repeats within one second")]
fn debouncing_subscriber(world: &CaptureWorld) {
    let events = world.capture.subscribe().debounced(Duration::from_secs(1));
    world.debounced.replace(Some(events));
}

#[when("the capture pipeline is set up")]
fn set_up(world: &CaptureWorld) {
    assert!(world.set_up(), "first set up should start a pipeline");
}

#[when("the capture pipeline is set up again")]
fn set_up_again(world: &CaptureWorld) {
    world.second_set_up.replace(Some(world.set_up()));
}

#[then("the second set up was ignored")]
fn second_ignored(world: &CaptureWorld) {
    assert_eq!(*world.second_set_up.borrow(), Some(false));
}

#[then("the raw events are \"673419266192, 673419266192, 5702015866873\"")]
fn raw_events(world: &CaptureWorld) {
    let mut raw = world.raw.take().expect("raw subscriber");
    let values = world.runtime.block_on(async {
        let mut values = Vec::new();
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_secs(1), raw.next()).await
        {
            values.push(event.value);
        }
        values
    });
    assert_eq!(values, vec![FALCON, FALCON, EAN]);
}

#[then("the debounced events are \"673419266192, 5702015866873\"")]
fn debounced_events(world: &CaptureWorld) {
    let mut debounced = world.debounced.take().expect("debounced subscriber");
    let values = world.runtime.block_on(async {
        let mut values = Vec::new();
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_secs(1), debounced.next()).await
        {
            values.push(event.value);
        }
        values
    });
    assert_eq!(values, vec![FALCON, EAN]);
}

#[scenario(path = "tests/features/barcode_capture.feature", index = 0)]
fn raw_delivery(world: CaptureWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/barcode_capture.feature", index = 1)]
fn debounced_delivery(world: CaptureWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/barcode_capture.feature", index = 2)]
fn idempotent_set_up(world: CaptureWorld) {
    let _ = world;
}
