//! Command-line interface for the Brick Collector engine.
//!
//! Every subcommand prints JSON on stdout; diagnostics go to stderr through
//! a `tracing-subscriber` formatter that also receives the library crates'
//! `log` records.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;

mod catalogue;
mod error;
mod output;
mod prices;
mod resolve;
mod scan;

pub use error::CliError;

use catalogue::{LookupArgs, ProvisionArgs, SearchArgs};
use prices::PricesArgs;
use resolve::ResolveArgs;
use scan::ScanArgs;

const ARG_BUNDLED: &str = "bundled";
const ARG_DATABASE: &str = "database";
const ARG_MIN_SIZE: &str = "min-size";
const ARG_CODE: &str = "code";
const ARG_PATTERN: &str = "pattern";
const ARG_SET_NUMBER: &str = "set-number";
const ARG_PRICE_API_KEY: &str = "price-api-key";
const ARG_PRICE_BASE_URL: &str = "price-base-url";
const ARG_CURRENCY: &str = "currency";
const ARG_LAT: &str = "lat";
const ARG_LON: &str = "lon";
const ARG_GEOAPIFY_API_KEY: &str = "geoapify-api-key";
const ARG_GEOCODER_BASE_URL: &str = "geocoder-base-url";
const ARG_LANGUAGE: &str = "language";
const ARG_DEBOUNCE_MS: &str = "debounce-ms";

const ENV_CODE: &str = "BRICK_CMDS_LOOKUP_CODE";
const ENV_PATTERN: &str = "BRICK_CMDS_SEARCH_PATTERN";
const ENV_SET_NUMBER: &str = "BRICK_CMDS_PRICES_SET_NUMBER";
const ENV_PRICE_API_KEY: &str = "BRICK_CMDS_PRICES_PRICE_API_KEY";
const ENV_LAT: &str = "BRICK_CMDS_RESOLVE_LAT";
const ENV_LON: &str = "BRICK_CMDS_RESOLVE_LON";

/// Run the Brick Collector CLI with the current process arguments and
/// environment.
///
/// # Errors
///
/// Returns [`CliError::ArgumentParsing`] for invalid arguments (including
/// `--help`), and the failing command's error otherwise.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    init_logging(cli.verbose, cli.quiet);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let mut stdout = std::io::stdout().lock();
    runtime.block_on(dispatch(cli.command, &mut stdout))
}

async fn dispatch(command: Command, writer: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Provision(args) => catalogue::run_provision(args, writer).await,
        Command::Lookup(args) => catalogue::run_lookup(args, writer).await,
        Command::Search(args) => catalogue::run_search(args, writer).await,
        Command::Prices(args) => prices::run_prices(args, writer).await,
        Command::Resolve(args) => resolve::run_resolve(args, writer).await,
        Command::Scan(args) => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            scan::run_scan(args, stdin, writer).await
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = verbosity_level(verbose, quiet);
    let installed = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    if installed.is_err() {
        tracing::debug!("a global subscriber was already installed");
    }
}

const fn verbosity_level(verbose: u8, quiet: bool) -> Level {
    match (verbose, quiet) {
        (0, true) => Level::ERROR,
        (0, false) => Level::WARN,
        (1, _) => Level::INFO,
        (2, _) => Level::DEBUG,
        _ => Level::TRACE,
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "brick",
    about = "Look up, price and scan LEGO sets from the bundled catalogue",
    version
)]
struct Cli {
    /// Increase diagnostic output (-v, -vv, -vvv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Only report errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Copy the bundled catalogue into writable storage if needed.
    Provision(ProvisionArgs),
    /// Find a set by the code printed on its box, or by set number.
    Lookup(LookupArgs),
    /// Search set names.
    Search(SearchArgs),
    /// Refresh a set's prices from the price service.
    Prices(PricesArgs),
    /// Resolve the city around a coordinate.
    Resolve(ResolveArgs),
    /// Read scanned codes from stdin and look each one up.
    Scan(ScanArgs),
}

#[cfg(test)]
mod tests;
