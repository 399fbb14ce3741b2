//! Location acquisition and city resolution for Brick Collector.
//!
//! Two layers sit on top of the `brick-core` seams:
//! - [`LocationAcquisition`] gates a [`LocationSource`](brick_core::LocationSource)
//!   behind a permission flag and a bounded wait, reporting "no coordinate"
//!   rather than failing.
//! - [`LocationResolver`] binds the geocoding API key, turns the acquired
//!   coordinate into a city name through a
//!   [`ReverseGeocoder`](brick_core::ReverseGeocoder), and caches the answer.
//!   A failed resolution yields [`NO_CITY`].
//!
//! # Examples
//!
//! ```
//! use brick_core::Coordinate;
//! use brick_core::test_support::{StubGeocoder, StubLocationSource};
//! use brick_location::LocationResolver;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let madison = Coordinate::new(43.0731, -89.4012)?;
//! let resolver = LocationResolver::new(
//!     StubLocationSource::with_coordinate(madison),
//!     StubGeocoder::with_place("Madison"),
//! );
//! resolver.initialize("my-geoapify-key");
//! resolver.update_permission(true);
//!
//! let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build()?;
//! let city = runtime.block_on(resolver.resolve_city_assuming_permission("", "en"));
//! assert_eq!(city, "Madison");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod acquisition;
mod resolver;

pub use acquisition::{DEFAULT_LOCATION_TIMEOUT, LocationAcquisition};
pub use resolver::{LocationResolver, NO_CITY, ResolutionPhase};
