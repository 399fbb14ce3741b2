//! Adapters to the services and databases around the Brick Collector core.
//!
//! Responsibilities:
//! - Reverse geocoding over HTTP ([`geocode`]).
//! - Set valuation lookups over HTTP and price refreshes ([`pricing`]).
//! - The local user-data store of profiles and want/sell lists
//!   ([`user_store`]).
//!
//! Boundaries:
//! - Domain types and seams live in `brick-core`; this crate only implements
//!   them against concrete transports.
//! - HTTP clients are async and never block the executor.
//!
//! Invariants:
//! - API keys never appear in logs or error messages.
//! - No global mutable state.
#![forbid(unsafe_code)]

mod error;
pub mod geocode;
pub mod pricing;
pub mod user_store;

pub use error::ProviderBuildError;
pub use geocode::{HttpReverseGeocoder, HttpReverseGeocoderConfig};
pub use pricing::{
    HttpPriceClient, HttpPriceClientConfig, PriceEvent, PriceLookupError, PriceRefresh,
    SetValuation, refresh_prices,
};
pub use user_store::{ListType, OwnedSet, UserProfile, UserStore, UserStoreError};

/// User agent sent by every HTTP client in this crate.
pub const DEFAULT_USER_AGENT: &str = concat!("brick-collector/", env!("CARGO_PKG_VERSION"));
