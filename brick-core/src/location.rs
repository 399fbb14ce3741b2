//! Platform location seam.
//!
//! The `LocationSource` trait abstracts the device's location services. The
//! acquisition layer in `brick-location` consults a permission flag, bounds
//! the wait, and collapses every [`LocationError`] to "no coordinate" for
//! callers that only care whether a fix is available.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::Coordinate;

/// Reasons a coordinate could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The caller has not reported a location permission grant.
    #[error("location permission has not been granted")]
    PermissionNotGranted,
    /// The platform rejected the request for lack of permission.
    #[error("location services denied the request")]
    PermissionDenied,
    /// Location services are reachable but hold no last-known fix.
    #[error("no last known location is available")]
    NoFix,
    /// The platform service failed.
    #[error("location services failed: {message}")]
    Unavailable {
        /// Description supplied by the platform.
        message: String,
    },
    /// No answer arrived within the configured bound.
    #[error("location request timed out after {after:?}")]
    TimedOut {
        /// Configured bound that elapsed.
        after: Duration,
    },
}

/// Access to the platform's last known device location.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use brick_core::{Coordinate, LocationError, LocationSource};
///
/// struct Fixed(Coordinate);
///
/// #[async_trait]
/// impl LocationSource for Fixed {
///     async fn last_known_location(&self) -> Result<Option<Coordinate>, LocationError> {
///         Ok(Some(self.0))
///     }
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let source = Fixed(Coordinate::new(43.0731, -89.4012)?);
/// let runtime = tokio::runtime::Builder::new_current_thread().build()?;
/// let found = runtime.block_on(source.last_known_location())?;
/// assert!(found.is_some());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// (Re)acquire the underlying platform client handle.
    ///
    /// Called whenever the owning resolver is initialised. The default does
    /// nothing, which suits sources without a handle to manage.
    fn initialize(&self) {}

    /// Return the last known location, or `Ok(None)` when the platform has
    /// no fix.
    async fn last_known_location(&self) -> Result<Option<Coordinate>, LocationError>;
}
