//! Permission-gated, time-bounded access to the last known location.

use std::{
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use brick_core::{Coordinate, LocationError, LocationSource};
use log::{debug, warn};

/// Longest wait for the platform to report a fix.
pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Acquires a coordinate from a [`LocationSource`].
///
/// The permission flag is informational: the caller records what the
/// platform told it, and acquisition refuses to ask the source while the
/// flag is unset. Every request is bounded by [`Self::timeout`].
#[derive(Debug)]
pub struct LocationAcquisition<S> {
    source: S,
    permission: AtomicBool,
    timeout: Duration,
    last_published: Mutex<Option<Coordinate>>,
}

impl<S: LocationSource> LocationAcquisition<S> {
    /// Wrap `source` with permission unset and the default timeout.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            source,
            permission: AtomicBool::new(false),
            timeout: DEFAULT_LOCATION_TIMEOUT,
            last_published: Mutex::new(None),
        }
    }

    /// Bound every request by `timeout` instead of the default.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Underlying location source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Configured request bound.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Record whether the platform granted location permission.
    pub fn update_permission(&self, granted: bool) {
        self.permission.store(granted, Ordering::Release);
    }

    /// Whether permission is currently recorded as granted.
    pub fn has_permission(&self) -> bool {
        self.permission.load(Ordering::Acquire)
    }

    /// Re-acquire the source's platform client handle.
    pub fn reinitialize(&self) {
        self.source.initialize();
    }

    /// Last coordinate successfully acquired, if any.
    pub fn last_published(&self) -> Option<Coordinate> {
        *self
            .last_published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquire the current coordinate, reporting why none is available.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError::PermissionNotGranted`] without consulting the
    /// source while the flag is unset, [`LocationError::TimedOut`] when the
    /// source does not answer within [`Self::timeout`],
    /// [`LocationError::NoFix`] when it has no last known location, and the
    /// source's own error otherwise.
    pub async fn try_current_coordinate(&self) -> Result<Coordinate, LocationError> {
        if !self.has_permission() {
            return Err(LocationError::PermissionNotGranted);
        }
        let fix = tokio::time::timeout(self.timeout, self.source.last_known_location())
            .await
            .map_err(|_elapsed| LocationError::TimedOut {
                after: self.timeout,
            })??;
        let coordinate = fix.ok_or(LocationError::NoFix)?;
        *self
            .last_published
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(coordinate);
        Ok(coordinate)
    }

    /// Acquire the current coordinate, or `None` for any failure.
    ///
    /// Missing permission and a missing fix are logged at `debug`; source
    /// failures and timeouts at `warn`.
    pub async fn current_coordinate(&self) -> Option<Coordinate> {
        match self.try_current_coordinate().await {
            Ok(coordinate) => Some(coordinate),
            Err(err @ (LocationError::PermissionNotGranted | LocationError::NoFix)) => {
                debug!("no coordinate: {err}");
                None
            }
            Err(err) => {
                warn!("location acquisition failed: {err}");
                None
            }
        }
    }
}
