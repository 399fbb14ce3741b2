//! `scan` command: look up every code a keyboard-wedge scanner types.
//!
//! Each stdin line is one frame. Repeats inside the debounce window are
//! dropped, and every admitted code is printed as one JSON line.

use std::{io::Write, time::Duration};

use brick_core::ReferenceStore;
use brick_scan::{BarcodeCapture, LineFrameSource, ScanEvent, TextPayloadDetector};
use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncBufRead;
use tracing::{debug, info};

use crate::{
    ARG_BUNDLED, ARG_DATABASE, ARG_DEBOUNCE_MS, ARG_MIN_SIZE, CliError,
    catalogue::{CatalogueConfig, lookup_code, open_catalogue},
    output::write_json_line,
};

/// Window in which a repeated code is ignored.
pub(crate) const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1_500);

const IDLE_POLL: Duration = Duration::from_millis(50);

/// CLI arguments for the `scan` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Read one scanned code per line from stdin, ignore repeats \
                 inside the debounce window, and print the catalogue match \
                 for each code as a JSON line. Stops at end of input.",
    about = "Read scanned codes from stdin and look each one up"
)]
#[ortho_config(prefix = "BRICK")]
pub(crate) struct ScanArgs {
    /// Milliseconds during which a repeated code is ignored.
    #[arg(long = ARG_DEBOUNCE_MS, value_name = "ms")]
    #[serde(default)]
    pub(crate) debounce_ms: Option<u64>,
    /// Path to the bundled, read-only catalogue.
    #[arg(long = ARG_BUNDLED, value_name = "path")]
    #[serde(default)]
    pub(crate) bundled: Option<Utf8PathBuf>,
    /// Path of the writable catalogue copy.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Smallest size in bytes accepted as a complete copy.
    #[arg(long = ARG_MIN_SIZE, value_name = "bytes")]
    #[serde(default)]
    pub(crate) min_size: Option<u64>,
}

/// Resolved `scan` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScanConfig {
    pub(crate) debounce: Duration,
    pub(crate) catalogue: CatalogueConfig,
}

impl From<ScanArgs> for ScanConfig {
    fn from(args: ScanArgs) -> Self {
        Self {
            debounce: args
                .debounce_ms
                .map_or(DEFAULT_DEBOUNCE, Duration::from_millis),
            catalogue: CatalogueConfig::from_layers(args.bundled, args.database, args.min_size),
        }
    }
}

pub(crate) async fn run_scan<R>(
    args: ScanArgs,
    input: R,
    writer: &mut dyn Write,
) -> Result<(), CliError>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = ScanConfig::from(merged);
    let (store, _) = open_catalogue(config.catalogue).await?;
    let scanned = scan_with(&store, input, config.debounce, writer).await?;
    info!(scanned, "input closed");
    Ok(())
}

/// Look up each debounced code read from `input`; returns how many were
/// printed.
pub(crate) async fn scan_with<S, R>(
    store: &S,
    input: R,
    debounce: Duration,
    writer: &mut dyn Write,
) -> Result<usize, CliError>
where
    S: ReferenceStore + ?Sized,
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let capture = BarcodeCapture::new(TextPayloadDetector);
    let mut events = capture.subscribe().debounced(debounce);
    capture.set_up_camera(LineFrameSource::new(input));

    let mut printed = 0;
    loop {
        tokio::select! {
            biased;
            event = events.next() => {
                let Some(event) = event else { break };
                print_lookup(store, &event, writer)?;
                printed += 1;
            }
            () = tokio::time::sleep(IDLE_POLL) => {
                if capture.is_active() {
                    continue;
                }
                // The pipeline may have queued its last codes after `next`
                // was polled.
                while let Some(event) = events.try_next() {
                    print_lookup(store, &event, writer)?;
                    printed += 1;
                }
                break;
            }
        }
    }
    Ok(printed)
}

fn print_lookup<S>(store: &S, event: &ScanEvent, writer: &mut dyn Write) -> Result<(), CliError>
where
    S: ReferenceStore + ?Sized,
{
    debug!(code = %event.value, "scanned");
    write_json_line(writer, &lookup_code(store, &event.value))
}
