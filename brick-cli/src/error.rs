//! Error types emitted by the Brick Collector CLI.
//!
//! Library failures are wrapped rather than flattened so `{err}` carries the
//! full `#[source]` chain to the terminal.

use std::sync::Arc;

use brick_core::{ApiKeyError, CoordinateError, ProvisionError, ReferenceStoreError};
use brick_data::{PriceLookupError, ProviderBuildError};
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors emitted by the Brick Collector CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// An API key was blank after configuration merging.
    #[error("invalid {field}: {source}")]
    InvalidApiKey {
        field: &'static str,
        #[source]
        source: ApiKeyError,
    },
    /// The supplied latitude or longitude was out of range.
    #[error(transparent)]
    InvalidCoordinate(#[from] CoordinateError),
    /// The async runtime could not be started.
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    BackgroundTask(#[from] tokio::task::JoinError),
    /// Copying the bundled catalogue failed.
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    /// The provisioned catalogue could not be opened.
    #[error("failed to open catalogue at {path:?}: {source}")]
    OpenCatalogue {
        path: Utf8PathBuf,
        #[source]
        source: ReferenceStoreError,
    },
    /// Constructing an HTTP client failed.
    #[error("failed to build {service} client: {source}")]
    BuildClient {
        service: &'static str,
        #[source]
        source: ProviderBuildError,
    },
    /// The price service lookup failed.
    #[error(transparent)]
    PriceLookup(#[from] PriceLookupError),
    /// Serializing command output failed.
    #[error("failed to serialize output: {0}")]
    SerializeOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
