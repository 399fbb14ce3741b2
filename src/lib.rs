//! Facade crate for the Brick Collector engine.
//!
//! This crate re-exports the catalogue and location domain types and exposes
//! the store, location, scanning and HTTP components behind feature flags.

#![forbid(unsafe_code)]

pub use brick_core::{
    ApiKey, ApiKeyError, Coordinate, CoordinateError, GeocodeError, GeocodeQuery, LocationError,
    LocationSource, PLACEHOLDER_API_KEY, PlaceName, ReferenceRecord, ReferenceStore,
    ReverseGeocoder,
};

#[cfg(feature = "store-sqlite")]
pub use brick_core::{
    BundledResource, FileResource, ProvisionError, ProvisionerConfig, ProvisioningState,
    ReferenceStoreError, ReferenceStoreProvisioner, SqliteReferenceStore, StaticResource,
};

#[cfg(feature = "location")]
pub use brick_location::{LocationAcquisition, LocationResolver, NO_CITY, ResolutionPhase};

#[cfg(feature = "scan")]
pub use brick_scan::{BarcodeCapture, BarcodeDetector, FrameSource, ScanEvent, ScanEvents};

#[cfg(feature = "http")]
pub use brick_data::{
    HttpPriceClient, HttpReverseGeocoder, ListType, OwnedSet, UserStore, refresh_prices,
};
