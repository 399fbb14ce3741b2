//! Catalogue commands: `provision`, `lookup` and `search`.

use std::io::Write;

use brick_core::{
    DEFAULT_MIN_PLAUSIBLE_SIZE, FileResource, ProvisionerConfig, ProvisioningState,
    ReferenceRecord, ReferenceStore, ReferenceStoreProvisioner, SqliteReferenceStore,
};
use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    ARG_BUNDLED, ARG_CODE, ARG_DATABASE, ARG_MIN_SIZE, ARG_PATTERN, CliError, ENV_CODE,
    ENV_PATTERN, output::write_json,
};

/// Bundled catalogue shipped next to the binary.
pub(crate) const DEFAULT_BUNDLED_PATH: &str = "assets/lego_sets.db";

/// Writable copy used by every command.
pub(crate) const DEFAULT_DATABASE_PATH: &str = "databases/lego_sets.db";

/// Where the catalogue comes from and where it lives once provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CatalogueConfig {
    pub(crate) bundled: Utf8PathBuf,
    pub(crate) database: Utf8PathBuf,
    pub(crate) min_size: u64,
}

impl CatalogueConfig {
    /// Fill unset layers with the default locations.
    pub(crate) fn from_layers(
        bundled: Option<Utf8PathBuf>,
        database: Option<Utf8PathBuf>,
        min_size: Option<u64>,
    ) -> Self {
        Self {
            bundled: bundled.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_BUNDLED_PATH)),
            database: database.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE_PATH)),
            min_size: min_size.unwrap_or(DEFAULT_MIN_PLAUSIBLE_SIZE),
        }
    }

    fn provisioner(&self) -> ReferenceStoreProvisioner<FileResource> {
        let config =
            ProvisionerConfig::new(self.database.clone()).with_min_plausible_size(self.min_size);
        ReferenceStoreProvisioner::new(FileResource::new(self.bundled.clone()), config)
    }
}

/// Provision the catalogue on the blocking pool, then open it.
pub(crate) async fn open_catalogue(
    config: CatalogueConfig,
) -> Result<(SqliteReferenceStore, ProvisioningState), CliError> {
    tokio::task::spawn_blocking(move || {
        let state = config.provisioner().ensure_provisioned()?;
        debug!(path = %state.path, size = state.size_bytes, copied = state.copied, "catalogue ready");
        let store =
            SqliteReferenceStore::open(&state.path).map_err(|source| CliError::OpenCatalogue {
                path: state.path.clone(),
                source,
            })?;
        Ok::<_, CliError>((store, state))
    })
    .await?
}

/// How a lookup matched its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum MatchKind {
    ExternalCode,
    PrimaryNumber,
}

/// Result of looking up one code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct LookupOutcome {
    pub(crate) code: String,
    pub(crate) matched_by: Option<MatchKind>,
    pub(crate) record: Option<ReferenceRecord>,
}

/// Look `code` up as a UPC first and as a set number second.
pub(crate) fn lookup_code<S>(store: &S, code: &str) -> LookupOutcome
where
    S: ReferenceStore + ?Sized,
{
    let code = code.trim();
    let found = store
        .get_by_external_code(code)
        .map(|record| (MatchKind::ExternalCode, record))
        .or_else(|| {
            store
                .get_by_primary_number(code)
                .map(|record| (MatchKind::PrimaryNumber, record))
        });
    let (matched_by, record) = found.unzip();
    LookupOutcome {
        code: code.to_owned(),
        matched_by,
        record,
    }
}

/// CLI arguments for the `provision` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Copy the bundled catalogue into writable storage if needed")]
#[ortho_config(prefix = "BRICK")]
pub(crate) struct ProvisionArgs {
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

impl ProvisionArgs {
    fn into_config(self) -> Result<CatalogueConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        Ok(CatalogueConfig::from_layers(
            merged.bundled,
            merged.database,
            merged.min_size,
        ))
    }
}

pub(crate) async fn run_provision(
    args: ProvisionArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    provision_with(args.into_config()?, writer).await
}

pub(crate) async fn provision_with(
    config: CatalogueConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let state = tokio::task::spawn_blocking(move || config.provisioner().ensure_provisioned())
        .await??;
    info!(path = %state.path, copied = state.copied, "catalogue provisioned");
    write_json(writer, &state)
}

/// CLI arguments for the `lookup` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Look a set up by the UPC printed on its box. Codes that \
                 match no UPC are retried as primary set numbers such as \
                 10236-1.",
    about = "Find a set by external code or set number"
)]
#[ortho_config(prefix = "BRICK")]
pub(crate) struct LookupArgs {
    /// UPC or set number to look up.
    #[arg(value_name = ARG_CODE)]
    #[serde(default)]
    pub(crate) code: Option<String>,
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

/// Resolved `lookup` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LookupConfig {
    pub(crate) code: String,
    pub(crate) catalogue: CatalogueConfig,
}

impl TryFrom<LookupArgs> for LookupConfig {
    type Error = CliError;

    fn try_from(args: LookupArgs) -> Result<Self, Self::Error> {
        let code = args.code.ok_or(CliError::MissingArgument {
            field: ARG_CODE,
            env: ENV_CODE,
        })?;
        Ok(Self {
            code,
            catalogue: CatalogueConfig::from_layers(args.bundled, args.database, args.min_size),
        })
    }
}

impl LookupArgs {
    fn into_config(self) -> Result<LookupConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        LookupConfig::try_from(merged)
    }
}

pub(crate) async fn run_lookup(args: LookupArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    lookup_with(args.into_config()?, writer).await
}

pub(crate) async fn lookup_with(
    config: LookupConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let (store, _) = open_catalogue(config.catalogue).await?;
    write_json(writer, &lookup_code(&store, &config.code))
}

/// CLI arguments for the `search` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(about = "Search set names for a substring")]
#[ortho_config(prefix = "BRICK")]
pub(crate) struct SearchArgs {
    /// Substring matched against set names.
    #[arg(value_name = ARG_PATTERN)]
    #[serde(default)]
    pub(crate) pattern: Option<String>,
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

/// Resolved `search` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SearchConfig {
    pub(crate) pattern: String,
    pub(crate) catalogue: CatalogueConfig,
}

impl TryFrom<SearchArgs> for SearchConfig {
    type Error = CliError;

    fn try_from(args: SearchArgs) -> Result<Self, Self::Error> {
        let pattern = args.pattern.ok_or(CliError::MissingArgument {
            field: ARG_PATTERN,
            env: ENV_PATTERN,
        })?;
        Ok(Self {
            pattern,
            catalogue: CatalogueConfig::from_layers(args.bundled, args.database, args.min_size),
        })
    }
}

pub(crate) async fn run_search(args: SearchArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    search_with(SearchConfig::try_from(merged)?, writer).await
}

pub(crate) async fn search_with(
    config: SearchConfig,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let (store, _) = open_catalogue(config.catalogue).await?;
    write_json(writer, &store.search(&config.pattern))
}

#[cfg(test)]
pub(crate) fn lookup_config_from_layers(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<LookupConfig, CliError> {
    let merged = LookupArgs::merge_from_layers(layers).map_err(CliError::from)?;
    LookupConfig::try_from(merged)
}
