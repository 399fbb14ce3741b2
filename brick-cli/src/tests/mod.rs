//! Shared test harness modules for the Brick Collector CLI.
#![expect(
    clippy::panic,
    reason = "Tests assert panic branches to surface unexpected CLI outcomes"
)]

use super::*;

mod config_unit;
mod helpers;
mod resolve_unit;
mod scan_unit;
