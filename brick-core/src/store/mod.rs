//! Query access to the bundled set catalogue.
//!
//! The `ReferenceStore` trait is the read interface the scanning and search
//! flows depend on, plus the single write path that refreshes prices. Not
//! found is never an error: lookups return `None`, listings return an empty
//! vector and counts return zero.

use crate::ReferenceRecord;

#[cfg(feature = "store-sqlite")]
mod provision;
#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use provision::{
    BundledResource, DEFAULT_MIN_PLAUSIBLE_SIZE, FileResource, ProvisionError, ProvisionerConfig,
    ProvisioningState, ReferenceStoreProvisioner, StaticResource,
};
#[cfg(feature = "store-sqlite")]
pub use sqlite::{ReferenceStoreError, SqliteReferenceStore};

/// Keyed and filtered access to [`ReferenceRecord`] values.
///
/// Implementations swallow backend failures (logging them) and report them
/// the same way as "not found", so callers only ever branch on presence.
///
/// # Examples
///
/// ```rust
/// use brick_core::{ReferenceRecord, ReferenceStore, test_support::MemoryReferenceStore};
///
/// let store = MemoryReferenceStore::with_records([ReferenceRecord {
///     set_id: 7,
///     set_number: "75192-1".into(),
///     name: "Millennium Falcon".into(),
///     upc: Some("673419266192".into()),
///     ..ReferenceRecord::default()
/// }]);
///
/// let found = store.get_by_external_code("673419266192");
/// assert_eq!(found.map(|r| r.set_number), Some("75192-1".to_owned()));
/// assert!(store.get_by_external_code("000000000000").is_none());
/// ```
pub trait ReferenceStore: Send + Sync {
    /// Return the set whose UPC equals `code`.
    fn get_by_external_code(&self, code: &str) -> Option<ReferenceRecord>;

    /// Return the set whose primary number equals `number`.
    fn get_by_primary_number(&self, number: &str) -> Option<ReferenceRecord>;

    /// Return only the primary number of the set carrying UPC `code`.
    fn primary_number_for_external_code(&self, code: &str) -> Option<String>;

    /// Every set, ordered by display name.
    fn all(&self) -> Vec<ReferenceRecord>;

    /// Sets whose name contains `pattern`, ordered by display name.
    ///
    /// The pattern is matched literally: `%` and `_` carry no wildcard
    /// meaning. Matching follows SQLite `LIKE`, so ASCII letters compare
    /// case-insensitively.
    fn search(&self, pattern: &str) -> Vec<ReferenceRecord>;

    /// Sets in `category`, ordered by display name.
    fn list_by_category(&self, category: &str) -> Vec<ReferenceRecord>;

    /// Sets released in `year`, ordered by display name.
    fn list_by_year(&self, year: u16) -> Vec<ReferenceRecord>;

    /// Sets whose part count lies in `min..=max`, ordered by part count.
    fn list_by_part_count_range(&self, min: u32, max: u32) -> Vec<ReferenceRecord>;

    /// Every distinct category, sorted.
    fn distinct_categories(&self) -> Vec<String>;

    /// Total number of sets.
    fn count(&self) -> u64;

    /// Number of sets in `category`.
    fn count_by_category(&self, category: &str) -> u64;

    /// Overwrite both price columns of the set numbered `primary_number`.
    ///
    /// Both values change together or not at all. Returns `false` when the
    /// write fails or no set has that number.
    fn update_prices(
        &self,
        primary_number: &str,
        new_price: Option<f64>,
        used_price: Option<f64>,
    ) -> bool;
}

#[cfg(test)]
mod tests {
    use super::ReferenceStore;
    use crate::{ReferenceRecord, test_support::MemoryReferenceStore};
    use rstest::{fixture, rstest};

    fn record(id: i64, number: &str, name: &str, theme: &str, pieces: u32) -> ReferenceRecord {
        ReferenceRecord {
            set_id: id,
            set_number: number.into(),
            name: name.into(),
            theme: Some(theme.into()),
            pieces: Some(pieces),
            ..ReferenceRecord::default()
        }
    }

    #[fixture]
    fn store() -> MemoryReferenceStore {
        MemoryReferenceStore::with_records([
            record(1, "10236-1", "Ewok Village", "Star Wars", 1990),
            record(2, "21318-1", "Tree House", "Ideas", 3036),
            record(3, "75192-1", "Millennium Falcon", "Star Wars", 7541),
        ])
    }

    #[rstest]
    fn lists_are_ordered_by_name(store: MemoryReferenceStore) {
        let names: Vec<_> = store
            .list_by_category("Star Wars")
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Ewok Village", "Millennium Falcon"]);
    }

    #[rstest]
    fn part_count_range_is_inclusive(store: MemoryReferenceStore) {
        let numbers: Vec<_> = store
            .list_by_part_count_range(1990, 3036)
            .into_iter()
            .map(|r| r.set_number)
            .collect();
        assert_eq!(numbers, vec!["10236-1", "21318-1"]);
    }

    #[rstest]
    fn counts_by_category(store: MemoryReferenceStore) {
        assert_eq!(store.count(), 3);
        assert_eq!(store.count_by_category("Star Wars"), 2);
        assert_eq!(store.count_by_category("Technic"), 0);
    }

    #[rstest]
    fn update_prices_reports_unknown_numbers(store: MemoryReferenceStore) {
        assert!(!store.update_prices("00000-1", Some(1.0), None));
        assert!(store.update_prices("21318-1", Some(250.0), Some(180.0)));
        let updated = store.get_by_primary_number("21318-1").expect("record exists");
        assert_eq!(updated.new_price, Some(250.0));
        assert_eq!(updated.used_price, Some(180.0));
    }
}
