//! One-time materialisation of the bundled catalogue into writable storage.
//!
//! The application ships the catalogue as a read-only resource. Before the
//! first query the provisioner copies it to a fixed local path, discarding
//! any earlier copy too small to be a real catalogue. Copies stream through a
//! fixed buffer into a sibling `*.part` file that is renamed into place once
//! synced, so an interrupted copy never leaves a truncated dataset at the
//! destination.

use std::{
    fmt,
    io::{self, Read, Write},
    sync::{Mutex, PoisonError},
};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs_utf8::Dir;
use log::{debug, warn};
use thiserror::Error;

/// Smallest local copy accepted as a real catalogue, in bytes.
pub const DEFAULT_MIN_PLAUSIBLE_SIZE: u64 = 100_000;

const COPY_BUFFER_SIZE: usize = 8 * 1024;
const PARTIAL_SUFFIX: &str = ".part";

/// Source of the read-only catalogue shipped with the application.
pub trait BundledResource: Send + Sync {
    /// Human-readable name used in logs and errors.
    fn describe(&self) -> String;

    /// Size of the resource in bytes, when cheaply known.
    fn size_hint(&self) -> Option<u64> {
        None
    }

    /// Open a fresh reader positioned at the start of the resource.
    fn open(&self) -> io::Result<Box<dyn Read + Send + '_>>;
}

/// Catalogue shipped as a file next to the application.
#[derive(Debug, Clone)]
pub struct FileResource {
    path: Utf8PathBuf,
}

impl FileResource {
    /// Use the file at `path` as the bundled catalogue.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BundledResource for FileResource {
    fn describe(&self) -> String {
        self.path.to_string()
    }

    fn size_hint(&self) -> Option<u64> {
        brick_fs::regular_file_len(&self.path).ok().flatten()
    }

    fn open(&self) -> io::Result<Box<dyn Read + Send + '_>> {
        let file = brick_fs::open_utf8_file(&self.path)?;
        Ok(Box::new(file))
    }
}

/// Catalogue embedded in the binary, typically via `include_bytes!`.
#[derive(Clone, Copy)]
pub struct StaticResource {
    name: &'static str,
    bytes: &'static [u8],
}

impl StaticResource {
    /// Wrap embedded bytes under a descriptive name.
    #[must_use]
    pub const fn new(name: &'static str, bytes: &'static [u8]) -> Self {
        Self { name, bytes }
    }
}

impl fmt::Debug for StaticResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticResource")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl BundledResource for StaticResource {
    fn describe(&self) -> String {
        self.name.to_owned()
    }

    fn size_hint(&self) -> Option<u64> {
        u64::try_from(self.bytes.len()).ok()
    }

    fn open(&self) -> io::Result<Box<dyn Read + Send + '_>> {
        Ok(Box::new(self.bytes))
    }
}

/// Where and how strictly the catalogue is provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionerConfig {
    destination: Utf8PathBuf,
    min_plausible_size: u64,
}

impl ProvisionerConfig {
    /// Provision into `destination` with [`DEFAULT_MIN_PLAUSIBLE_SIZE`].
    pub fn new(destination: impl Into<Utf8PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            min_plausible_size: DEFAULT_MIN_PLAUSIBLE_SIZE,
        }
    }

    /// Override the plausibility threshold.
    #[must_use]
    pub fn with_min_plausible_size(mut self, bytes: u64) -> Self {
        self.min_plausible_size = bytes;
        self
    }

    /// Fixed local path of the catalogue copy.
    #[must_use]
    pub fn destination(&self) -> &Utf8Path {
        &self.destination
    }

    /// Smallest accepted local copy, in bytes.
    #[must_use]
    pub const fn min_plausible_size(&self) -> u64 {
        self.min_plausible_size
    }
}

/// Outcome of provisioning, shared by every reader of the local copy.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ProvisioningState {
    /// Path of the local copy.
    pub path: Utf8PathBuf,
    /// Size of the local copy in bytes.
    pub size_bytes: u64,
    /// Whether this provisioner performed the copy.
    pub copied: bool,
}

/// Errors raised while provisioning the catalogue.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The destination could not be inspected.
    #[error("failed to inspect local catalogue at {path}: {source}")]
    Inspect {
        /// Destination path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A corrupt local copy could not be removed.
    #[error("failed to remove corrupt catalogue at {path}: {source}")]
    RemoveCorrupt {
        /// Destination path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Reading the resource or writing the destination failed.
    #[error("failed to copy {resource} to {path}: {source}")]
    CopyFailed {
        /// Description of the bundled resource.
        resource: String,
        /// Destination path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The copy completed but is still below the plausibility threshold.
    #[error("catalogue at {path} is {size_bytes} bytes, below the {min_bytes}-byte minimum")]
    Implausible {
        /// Destination path.
        path: Utf8PathBuf,
        /// Size of the copy.
        size_bytes: u64,
        /// Configured threshold.
        min_bytes: u64,
    },
}

/// Copies the bundled catalogue into writable storage exactly once.
///
/// Share one provisioner (for example behind an `Arc`) between every handle
/// that opens the catalogue. The first [`ensure_provisioned`] call performs
/// the work under a mutex; later and concurrent callers receive the same
/// [`ProvisioningState`].
///
/// [`ensure_provisioned`]: Self::ensure_provisioned
///
/// # Examples
///
/// ```rust
/// use brick_core::{ProvisionerConfig, ReferenceStoreProvisioner, StaticResource};
/// use camino::Utf8PathBuf;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// static CATALOGUE: [u8; 64] = [0; 64];
/// let dir = tempfile::tempdir()?;
/// let target = Utf8PathBuf::from_path_buf(dir.path().join("sets.db"))
///     .map_err(|_| "temporary path is not UTF-8")?;
///
/// let provisioner = ReferenceStoreProvisioner::new(
///     StaticResource::new("sets.db", &CATALOGUE),
///     ProvisionerConfig::new(target).with_min_plausible_size(32),
/// );
/// let state = provisioner.ensure_provisioned()?;
/// assert!(state.copied);
/// assert_eq!(state.size_bytes, 64);
/// assert_eq!(provisioner.ensure_provisioned()?, state);
/// # Ok(())
/// # }
/// ```
pub struct ReferenceStoreProvisioner<R> {
    resource: R,
    config: ProvisionerConfig,
    state: Mutex<Option<ProvisioningState>>,
}

impl<R> fmt::Debug for ReferenceStoreProvisioner<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceStoreProvisioner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<R: BundledResource> ReferenceStoreProvisioner<R> {
    /// Create a provisioner for `resource`.
    pub fn new(resource: R, config: ProvisionerConfig) -> Self {
        Self {
            resource,
            config,
            state: Mutex::new(None),
        }
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &ProvisionerConfig {
        &self.config
    }

    /// Make sure a plausible local copy exists and describe it.
    ///
    /// Idempotent and safe to call from many threads: only the first
    /// successful call touches the filesystem. A failed attempt is not
    /// cached, so the next call retries.
    pub fn ensure_provisioned(&self) -> Result<ProvisioningState, ProvisionError> {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = guard.as_ref() {
            return Ok(state.clone());
        }
        let state = self.provision()?;
        *guard = Some(state.clone());
        Ok(state)
    }

    fn provision(&self) -> Result<ProvisioningState, ProvisionError> {
        let path = self.config.destination();
        let min_bytes = self.config.min_plausible_size();

        if let Some(size_bytes) = self.local_size()? {
            if size_bytes >= min_bytes {
                debug!("catalogue already provisioned at {path} ({size_bytes} bytes)");
                return Ok(ProvisioningState {
                    path: path.to_path_buf(),
                    size_bytes,
                    copied: false,
                });
            }
            warn!("discarding catalogue at {path}: {size_bytes} bytes is below {min_bytes}");
            brick_fs::remove_file_if_exists(path).map_err(|source| {
                ProvisionError::RemoveCorrupt {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
        }

        if let Some(bundled) = self.resource.size_hint() {
            debug!("bundled catalogue {} is {bundled} bytes", self.resource.describe());
        }
        let copied_bytes = self.copy_resource()?;
        let size_bytes = self.local_size()?.unwrap_or_default();
        debug!("copied {copied_bytes} bytes to {path}; local size is {size_bytes} bytes");

        if size_bytes < min_bytes {
            if let Err(err) = brick_fs::remove_file_if_exists(path) {
                warn!("failed to remove implausible catalogue at {path}: {err}");
            }
            return Err(ProvisionError::Implausible {
                path: path.to_path_buf(),
                size_bytes,
                min_bytes,
            });
        }

        Ok(ProvisioningState {
            path: path.to_path_buf(),
            size_bytes,
            copied: true,
        })
    }

    fn local_size(&self) -> Result<Option<u64>, ProvisionError> {
        let path = self.config.destination();
        brick_fs::regular_file_len(path).map_err(|source| ProvisionError::Inspect {
            path: path.to_path_buf(),
            source,
        })
    }

    fn copy_resource(&self) -> Result<u64, ProvisionError> {
        let path = self.config.destination();
        let failed = |source: io::Error| ProvisionError::CopyFailed {
            resource: self.resource.describe(),
            path: path.to_path_buf(),
            source,
        };

        brick_fs::ensure_parent_dir(path).map_err(failed)?;
        let (dir, file_name) = brick_fs::open_dir_and_file(path).map_err(failed)?;
        let partial = format!("{file_name}{PARTIAL_SUFFIX}");

        let copied = match stream_copy(&self.resource, &dir, &partial) {
            Ok(copied) => copied,
            Err(err) => {
                if let Err(cleanup) = dir.remove_file(&partial) {
                    if cleanup.kind() != io::ErrorKind::NotFound {
                        warn!("failed to remove partial copy {partial}: {cleanup}");
                    }
                }
                return Err(failed(err));
            }
        };
        dir.rename(&partial, &dir, &file_name).map_err(failed)?;
        Ok(copied)
    }
}

fn stream_copy<R: BundledResource>(resource: &R, dir: &Dir, name: &str) -> io::Result<u64> {
    let mut reader = resource.open()?;
    let mut file = dir.create(name)?;
    let mut buffer = [0_u8; COPY_BUFFER_SIZE];
    let mut total = 0_u64;
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        let chunk = buffer
            .get(..read)
            .ok_or_else(|| io::Error::other(format!("reader reported {read} bytes")))?;
        file.write_all(chunk)?;
        total += read as u64;
    }
    file.flush()?;
    file.sync_all()?;
    Ok(total)
}
