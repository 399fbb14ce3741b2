//! SQLite-backed reference store over the provisioned catalogue file.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use camino::{Utf8Path, Utf8PathBuf};
use log::warn;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Params, Row, TransactionBehavior, params};
use thiserror::Error;

use crate::ReferenceRecord;

use super::ReferenceStore;
use super::provision::{BundledResource, ProvisionError, ReferenceStoreProvisioner};

/// How long a connection waits on a lock held by the other connection.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Error raised when opening the catalogue database.
#[derive(Debug, Error)]
pub enum ReferenceStoreError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// The file opened but does not hold the `sets` table.
    #[error("SQLite database at {path} has no `sets` table")]
    MissingSetsTable {
        /// Location of the SQLite database on disk.
        path: Utf8PathBuf,
    },
    /// Provisioning the local copy failed before it could be opened.
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    /// Generic SQLite error while validating the database.
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

/// Reference store reading the `sets` table of a provisioned SQLite file.
///
/// Reads and the price write path use separate connections. The write runs
/// in an immediate transaction, so a concurrent reader observes either both
/// old prices or both new ones.
pub struct SqliteReferenceStore {
    path: Utf8PathBuf,
    reader: Mutex<Connection>,
    writer: Mutex<Connection>,
}

impl fmt::Debug for SqliteReferenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteReferenceStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteReferenceStore {
    /// Open the catalogue at `path`.
    ///
    /// The file must already exist; use [`Self::open_provisioned`] to copy
    /// the bundled dataset first.
    pub fn open(path: impl AsRef<Utf8Path>) -> Result<Self, ReferenceStoreError> {
        let path = path.as_ref();
        let reader = open_connection(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        if !has_sets_table(&reader)? {
            return Err(ReferenceStoreError::MissingSetsTable {
                path: path.to_path_buf(),
            });
        }
        let writer = open_connection(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;

        Ok(Self {
            path: path.to_path_buf(),
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        })
    }

    /// Provision the bundled dataset if needed, then open the local copy.
    pub fn open_provisioned<R>(
        provisioner: &ReferenceStoreProvisioner<R>,
    ) -> Result<Self, ReferenceStoreError>
    where
        R: BundledResource,
    {
        let state = provisioner.ensure_provisioned()?;
        Self::open(&state.path)
    }

    /// Location of the catalogue file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn read_records<P: Params>(
        &self,
        operation: &str,
        sql: &str,
        params: P,
    ) -> Vec<ReferenceRecord> {
        let connection = lock(&self.reader);
        match collect_records(&connection, sql, params) {
            Ok(records) => records,
            Err(err) => {
                warn!("{operation} failed on {}: {err}", self.path);
                Vec::new()
            }
        }
    }

    fn read_first<P: Params>(
        &self,
        operation: &str,
        sql: &str,
        params: P,
    ) -> Option<ReferenceRecord> {
        self.read_records(operation, sql, params).into_iter().next()
    }

    fn read_count<P: Params>(&self, operation: &str, sql: &str, params: P) -> u64 {
        let connection = lock(&self.reader);
        match connection.query_row(sql, params, |row| row.get::<_, i64>(0)) {
            Ok(count) => u64::try_from(count).unwrap_or_default(),
            Err(err) => {
                warn!("{operation} failed on {}: {err}", self.path);
                0
            }
        }
    }
}

impl ReferenceStore for SqliteReferenceStore {
    fn get_by_external_code(&self, code: &str) -> Option<ReferenceRecord> {
        self.read_first(
            "get_by_external_code",
            "SELECT * FROM sets WHERE upc = ?1 LIMIT 1",
            params![code],
        )
    }

    fn get_by_primary_number(&self, number: &str) -> Option<ReferenceRecord> {
        self.read_first(
            "get_by_primary_number",
            "SELECT * FROM sets WHERE set_number = ?1 LIMIT 1",
            params![number],
        )
    }

    fn primary_number_for_external_code(&self, code: &str) -> Option<String> {
        let connection = lock(&self.reader);
        let found = connection
            .query_row(
                "SELECT set_number FROM sets WHERE upc = ?1 LIMIT 1",
                params![code],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional();
        match found {
            Ok(number) => number.flatten(),
            Err(err) => {
                warn!("primary_number_for_external_code failed on {}: {err}", self.path);
                None
            }
        }
    }

    fn all(&self) -> Vec<ReferenceRecord> {
        self.read_records("all", "SELECT * FROM sets ORDER BY name", [])
    }

    fn search(&self, pattern: &str) -> Vec<ReferenceRecord> {
        let like = format!("%{}%", escape_like(pattern));
        self.read_records(
            "search",
            "SELECT * FROM sets WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name",
            params![like],
        )
    }

    fn list_by_category(&self, category: &str) -> Vec<ReferenceRecord> {
        self.read_records(
            "list_by_category",
            "SELECT * FROM sets WHERE theme = ?1 ORDER BY name",
            params![category],
        )
    }

    fn list_by_year(&self, year: u16) -> Vec<ReferenceRecord> {
        self.read_records(
            "list_by_year",
            "SELECT * FROM sets WHERE year = ?1 ORDER BY name",
            params![i64::from(year)],
        )
    }

    fn list_by_part_count_range(&self, min: u32, max: u32) -> Vec<ReferenceRecord> {
        self.read_records(
            "list_by_part_count_range",
            "SELECT * FROM sets WHERE pieces BETWEEN ?1 AND ?2 ORDER BY pieces",
            params![i64::from(min), i64::from(max)],
        )
    }

    fn distinct_categories(&self) -> Vec<String> {
        let connection = lock(&self.reader);
        let categories = connection
            .prepare_cached("SELECT DISTINCT theme FROM sets WHERE theme IS NOT NULL ORDER BY theme")
            .and_then(|mut statement| {
                let rows = statement
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>();
                rows
            });
        match categories {
            Ok(categories) => categories,
            Err(err) => {
                warn!("distinct_categories failed on {}: {err}", self.path);
                Vec::new()
            }
        }
    }

    fn count(&self) -> u64 {
        self.read_count("count", "SELECT COUNT(*) FROM sets", [])
    }

    fn count_by_category(&self, category: &str) -> u64 {
        self.read_count(
            "count_by_category",
            "SELECT COUNT(*) FROM sets WHERE theme = ?1",
            params![category],
        )
    }

    fn update_prices(
        &self,
        primary_number: &str,
        new_price: Option<f64>,
        used_price: Option<f64>,
    ) -> bool {
        let mut connection = lock(&self.writer);
        match write_prices(&mut connection, primary_number, new_price, used_price) {
            Ok(true) => true,
            Ok(false) => {
                warn!("update_prices: no set numbered {primary_number} in {}", self.path);
                false
            }
            Err(err) => {
                warn!("update_prices failed for {primary_number} on {}: {err}", self.path);
                false
            }
        }
    }
}

fn lock(connection: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    connection.lock().unwrap_or_else(PoisonError::into_inner)
}

fn open_connection(path: &Utf8Path, flags: OpenFlags) -> Result<Connection, ReferenceStoreError> {
    let connection =
        Connection::open_with_flags(path.as_std_path(), flags | OpenFlags::SQLITE_OPEN_NO_MUTEX)
            .map_err(|source| ReferenceStoreError::OpenDatabase {
                path: path.to_path_buf(),
                source,
            })?;
    connection.busy_timeout(BUSY_TIMEOUT)?;
    Ok(connection)
}

fn has_sets_table(connection: &Connection) -> rusqlite::Result<bool> {
    connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'sets')",
        [],
        |row| row.get(0),
    )
}

fn collect_records<P: Params>(
    connection: &Connection,
    sql: &str,
    params: P,
) -> rusqlite::Result<Vec<ReferenceRecord>> {
    let mut statement = connection.prepare_cached(sql)?;
    let mut rows = statement.query(params)?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        if let Some(record) = record_from_row(row) {
            records.push(record);
        }
    }
    Ok(records)
}

/// Read an optional column by name, treating absence and type mismatches as
/// `None`.
fn column<T: rusqlite::types::FromSql>(row: &Row<'_>, name: &str) -> Option<T> {
    row.get::<_, Option<T>>(name).ok().flatten()
}

fn record_from_row(row: &Row<'_>) -> Option<ReferenceRecord> {
    let set_id = column::<i64>(row, "set_id")?;
    let set_number = column::<String>(row, "set_number")?;
    Some(ReferenceRecord {
        set_id,
        set_number,
        name: column(row, "name").unwrap_or_default(),
        theme: column(row, "theme"),
        subtheme: column(row, "subtheme"),
        year: column::<i64>(row, "year").and_then(|year| u16::try_from(year).ok()),
        pieces: column::<i64>(row, "pieces").and_then(|pieces| u32::try_from(pieces).ok()),
        used_price: column(row, "used_price"),
        new_price: column(row, "new_price"),
        upc: column(row, "upc"),
        item_number_na: column(row, "item_number_na"),
        image_url: column(row, "image_url"),
        thumbnail_url: column(row, "thumbnail_url"),
    })
}

fn write_prices(
    connection: &mut Connection,
    primary_number: &str,
    new_price: Option<f64>,
    used_price: Option<f64>,
) -> rusqlite::Result<bool> {
    let transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let changed = transaction.execute(
        "UPDATE sets SET new_price = ?1, used_price = ?2 WHERE set_number = ?3",
        params![new_price, used_price, primary_number],
    )?;
    transaction.commit()?;
    Ok(changed > 0)
}

fn escape_like(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_records, write_reference_database};
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn catalogue() -> (TempDir, SqliteReferenceStore) {
        let dir = TempDir::new().expect("create temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("sets.db")).expect("utf-8 path");
        write_reference_database(&path, &sample_records()).expect("persist catalogue");
        let store = SqliteReferenceStore::open(&path).expect("open store");
        (dir, store)
    }

    #[rstest]
    fn finds_set_by_external_code(catalogue: (TempDir, SqliteReferenceStore)) {
        let (_dir, store) = catalogue;
        let record = store
            .get_by_external_code("673419266192")
            .expect("UPC is catalogued");
        assert_eq!(record.set_number, "75192-1");
        assert_eq!(record.name, "Millennium Falcon");
        assert_eq!(record.pieces, Some(7541));
    }

    #[rstest]
    fn unknown_codes_are_absent(catalogue: (TempDir, SqliteReferenceStore)) {
        let (_dir, store) = catalogue;
        assert!(store.get_by_external_code("000000000000").is_none());
        assert!(store.get_by_primary_number("00000-1").is_none());
        assert!(store.primary_number_for_external_code("000000000000").is_none());
    }

    #[rstest]
    fn resolves_primary_number_from_code(catalogue: (TempDir, SqliteReferenceStore)) {
        let (_dir, store) = catalogue;
        assert_eq!(
            store.primary_number_for_external_code("673419266192"),
            Some("75192-1".to_owned())
        );
    }

    #[rstest]
    fn search_matches_substrings_in_name_order(catalogue: (TempDir, SqliteReferenceStore)) {
        let (_dir, store) = catalogue;
        let names: Vec<_> = store.search("o").into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Ewok Village", "Millennium Falcon", "Tree House"]);
    }

    #[rstest]
    #[case("%")]
    #[case("_")]
    fn search_treats_wildcards_literally(
        catalogue: (TempDir, SqliteReferenceStore),
        #[case] pattern: &str,
    ) {
        let (_dir, store) = catalogue;
        assert!(store.search(pattern).is_empty());
    }

    #[rstest]
    fn lists_distinct_categories(catalogue: (TempDir, SqliteReferenceStore)) {
        let (_dir, store) = catalogue;
        assert_eq!(store.distinct_categories(), vec!["Ideas", "Star Wars"]);
        assert_eq!(store.count(), 3);
        assert_eq!(store.count_by_category("Star Wars"), 2);
    }

    #[rstest]
    fn lists_by_year_and_part_count(catalogue: (TempDir, SqliteReferenceStore)) {
        let (_dir, store) = catalogue;
        let by_year: Vec<_> = store.list_by_year(2017).into_iter().map(|r| r.set_number).collect();
        assert_eq!(by_year, vec!["75192-1"]);
        let by_pieces: Vec<_> = store
            .list_by_part_count_range(3000, 8000)
            .into_iter()
            .map(|r| r.set_number)
            .collect();
        assert_eq!(by_pieces, vec!["21318-1", "75192-1"]);
    }

    #[rstest]
    fn update_prices_writes_both_columns(catalogue: (TempDir, SqliteReferenceStore)) {
        let (_dir, store) = catalogue;
        assert!(store.update_prices("10236-1", Some(420.5), Some(310.0)));
        let record = store.get_by_primary_number("10236-1").expect("record exists");
        assert_eq!(record.new_price, Some(420.5));
        assert_eq!(record.used_price, Some(310.0));
    }

    #[rstest]
    fn update_prices_rejects_unknown_numbers(catalogue: (TempDir, SqliteReferenceStore)) {
        let (_dir, store) = catalogue;
        assert!(!store.update_prices("00000-1", Some(1.0), Some(1.0)));
    }

    #[rstest]
    fn rows_without_primary_number_are_skipped(catalogue: (TempDir, SqliteReferenceStore)) {
        let (_dir, store) = catalogue;
        let connection = Connection::open(store.path().as_std_path()).expect("open raw");
        connection
            .execute(
                "INSERT INTO sets (set_id, set_number, name, theme) VALUES (99, NULL, 'Orphan', 'Ideas')",
                [],
            )
            .expect("insert orphan");
        let ideas: Vec<_> = store
            .list_by_category("Ideas")
            .into_iter()
            .map(|r| r.set_id)
            .collect();
        assert_eq!(ideas, vec![2]);
    }

    #[rstest]
    fn null_columns_map_to_none(catalogue: (TempDir, SqliteReferenceStore)) {
        let (_dir, store) = catalogue;
        let record = store.get_by_primary_number("21318-1").expect("record exists");
        assert_eq!(record.subtheme, None);
        assert_eq!(record.upc, None);
    }

    #[rstest]
    fn open_rejects_databases_without_sets_table() {
        let dir = TempDir::new().expect("create temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("empty.db")).expect("utf-8 path");
        Connection::open(path.as_std_path())
            .and_then(|c| c.execute_batch("CREATE TABLE other (id INTEGER);"))
            .expect("create database");
        let err = SqliteReferenceStore::open(&path).expect_err("missing table");
        assert!(matches!(err, ReferenceStoreError::MissingSetsTable { .. }));
    }

    #[rstest]
    fn open_reports_missing_files() {
        let dir = TempDir::new().expect("create temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("absent.db")).expect("utf-8 path");
        let err = SqliteReferenceStore::open(&path).expect_err("missing file");
        assert!(matches!(err, ReferenceStoreError::OpenDatabase { .. }));
    }

    #[rstest]
    #[case("50%", "50\\%")]
    #[case("a_b", "a\\_b")]
    #[case("c:\\", "c:\\\\")]
    fn escapes_like_metacharacters(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(escape_like(raw), expected);
    }
}
