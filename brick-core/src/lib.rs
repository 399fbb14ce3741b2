//! Core domain types for the Brick Collector engine.
//!
//! The crate owns the catalogue record model, validated location values, and
//! the seams (`ReferenceStore`, `LocationSource`, `ReverseGeocoder`) the rest
//! of the workspace implements. Constructors return `Result` so invalid input
//! surfaces early instead of travelling through the pipelines.
//!
//! With the `store-sqlite` feature the crate also provides the SQLite-backed
//! reference store and the provisioner that materialises the bundled dataset
//! into writable storage.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod credentials;
pub mod geocode;
pub mod location;
mod place;
mod record;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use credentials::{ApiKey, ApiKeyError, PLACEHOLDER_API_KEY};
pub use geocode::{GeocodeError, GeocodeQuery, ReverseGeocoder};
pub use location::{LocationError, LocationSource};
pub use place::{Coordinate, CoordinateError, PlaceName};
pub use record::ReferenceRecord;
pub use store::ReferenceStore;

#[cfg(feature = "store-sqlite")]
pub use store::{
    BundledResource, DEFAULT_MIN_PLAUSIBLE_SIZE, FileResource, ProvisionError, ProvisionerConfig,
    ProvisioningState, ReferenceStoreError, ReferenceStoreProvisioner, SqliteReferenceStore,
    StaticResource,
};
