//! Test doubles shared by unit and behaviour tests across the workspace.
//!
//! Nothing here is meant for production use: the in-memory store performs
//! linear scans, and the stubs answer every call with a canned response.

use std::{
    io::{self, Read},
    sync::{
        Arc, Mutex, PoisonError, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use camino::Utf8Path;
use rusqlite::{Connection, params};

use crate::{
    Coordinate, GeocodeError, GeocodeQuery, LocationError, LocationSource, PlaceName,
    ReferenceRecord, ReferenceStore, ReverseGeocoder,
    store::{BundledResource, DEFAULT_MIN_PLAUSIBLE_SIZE},
};

/// DDL of the `sets` table as shipped in the bundled catalogue.
pub const SETS_SCHEMA: &str = "CREATE TABLE sets (
    set_id INTEGER PRIMARY KEY,
    set_number TEXT,
    name TEXT,
    theme TEXT,
    subtheme TEXT,
    year INTEGER,
    pieces INTEGER,
    used_price REAL,
    new_price REAL,
    upc TEXT,
    item_number_na TEXT,
    image_url TEXT,
    thumbnail_url TEXT,
    UNIQUE(set_number)
);";

/// Three well-known sets used throughout the tests.
///
/// The Millennium Falcon carries the UPC `673419266192`.
pub fn sample_records() -> Vec<ReferenceRecord> {
    vec![
        ReferenceRecord {
            set_id: 1,
            set_number: "10236-1".into(),
            name: "Ewok Village".into(),
            theme: Some("Star Wars".into()),
            subtheme: Some("Ultimate Collector Series".into()),
            year: Some(2013),
            pieces: Some(1990),
            used_price: Some(280.0),
            new_price: Some(400.0),
            upc: Some("673419192262".into()),
            item_number_na: Some("10236".into()),
            image_url: Some("https://images.brickset.com/sets/images/10236-1.jpg".into()),
            thumbnail_url: None,
        },
        ReferenceRecord {
            set_id: 2,
            set_number: "21318-1".into(),
            name: "Tree House".into(),
            theme: Some("Ideas".into()),
            year: Some(2019),
            pieces: Some(3036),
            ..ReferenceRecord::default()
        },
        ReferenceRecord {
            set_id: 3,
            set_number: "75192-1".into(),
            name: "Millennium Falcon".into(),
            theme: Some("Star Wars".into()),
            subtheme: Some("Ultimate Collector Series".into()),
            year: Some(2017),
            pieces: Some(7541),
            used_price: Some(650.0),
            new_price: Some(849.99),
            upc: Some("673419266192".into()),
            item_number_na: Some("75192".into()),
            image_url: Some("https://images.brickset.com/sets/images/75192-1.jpg".into()),
            thumbnail_url: Some("https://images.brickset.com/sets/small/75192-1.jpg".into()),
        },
    ]
}

/// Write a catalogue database holding `records` to `path`.
///
/// The file is padded past [`DEFAULT_MIN_PLAUSIBLE_SIZE`] so it passes the
/// provisioner's plausibility check.
pub fn write_reference_database(
    path: &Utf8Path,
    records: &[ReferenceRecord],
) -> rusqlite::Result<()> {
    let mut connection = Connection::open(path.as_std_path())?;
    let transaction = connection.transaction()?;
    transaction.execute_batch(SETS_SCHEMA)?;
    {
        let mut insert = transaction.prepare(
            "INSERT INTO sets (set_id, set_number, name, theme, subtheme, year, pieces, \
             used_price, new_price, upc, item_number_na, image_url, thumbnail_url) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )?;
        for record in records {
            insert.execute(params![
                record.set_id,
                record.set_number,
                record.name,
                record.theme,
                record.subtheme,
                record.year.map(i64::from),
                record.pieces.map(i64::from),
                record.used_price,
                record.new_price,
                record.upc,
                record.item_number_na,
                record.image_url,
                record.thumbnail_url,
            ])?;
        }
    }
    transaction.execute_batch("CREATE TABLE padding (data BLOB);")?;
    transaction.execute(
        "INSERT INTO padding (data) VALUES (zeroblob(?1))",
        params![i64::try_from(DEFAULT_MIN_PLAUSIBLE_SIZE).unwrap_or(i64::MAX)],
    )?;
    transaction.commit()
}

/// In-memory [`ReferenceStore`] performing linear scans.
#[derive(Debug, Default)]
pub struct MemoryReferenceStore {
    records: RwLock<Vec<ReferenceRecord>>,
}

impl MemoryReferenceStore {
    /// Create a store holding `records`.
    pub fn with_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ReferenceRecord>,
    {
        Self {
            records: RwLock::new(records.into_iter().collect()),
        }
    }

    fn filtered<F>(&self, keep: F) -> Vec<ReferenceRecord>
    where
        F: Fn(&ReferenceRecord) -> bool,
    {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut found: Vec<_> = records.iter().filter(|r| keep(r)).cloned().collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }
}

impl ReferenceStore for MemoryReferenceStore {
    fn get_by_external_code(&self, code: &str) -> Option<ReferenceRecord> {
        self.filtered(|r| r.has_external_code(code)).into_iter().next()
    }

    fn get_by_primary_number(&self, number: &str) -> Option<ReferenceRecord> {
        self.filtered(|r| r.set_number == number).into_iter().next()
    }

    fn primary_number_for_external_code(&self, code: &str) -> Option<String> {
        self.get_by_external_code(code).map(|r| r.set_number)
    }

    fn all(&self) -> Vec<ReferenceRecord> {
        self.filtered(|_| true)
    }

    fn search(&self, pattern: &str) -> Vec<ReferenceRecord> {
        let needle = pattern.to_ascii_lowercase();
        self.filtered(|r| r.name.to_ascii_lowercase().contains(&needle))
    }

    fn list_by_category(&self, category: &str) -> Vec<ReferenceRecord> {
        self.filtered(|r| r.theme.as_deref() == Some(category))
    }

    fn list_by_year(&self, year: u16) -> Vec<ReferenceRecord> {
        self.filtered(|r| r.year == Some(year))
    }

    fn list_by_part_count_range(&self, min: u32, max: u32) -> Vec<ReferenceRecord> {
        let mut found =
            self.filtered(|r| r.pieces.is_some_and(|pieces| (min..=max).contains(&pieces)));
        found.sort_by_key(|r| r.pieces);
        found
    }

    fn distinct_categories(&self) -> Vec<String> {
        let mut categories: Vec<_> = self.all().into_iter().filter_map(|r| r.theme).collect();
        categories.sort();
        categories.dedup();
        categories
    }

    fn count(&self) -> u64 {
        self.all().len() as u64
    }

    fn count_by_category(&self, category: &str) -> u64 {
        self.list_by_category(category).len() as u64
    }

    fn update_prices(
        &self,
        primary_number: &str,
        new_price: Option<f64>,
        used_price: Option<f64>,
    ) -> bool {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let mut updated = false;
        for record in records.iter_mut().filter(|r| r.set_number == primary_number) {
            record.new_price = new_price;
            record.used_price = used_price;
            updated = true;
        }
        updated
    }
}

/// Bundled resource over in-memory bytes that counts how often it is opened.
///
/// Clones share the counter, so a test can keep a clone after handing the
/// resource to a provisioner.
#[derive(Debug, Clone)]
pub struct CountingResource {
    bytes: Arc<Vec<u8>>,
    opens: Arc<AtomicUsize>,
}

impl CountingResource {
    /// Serve `bytes` as the bundled catalogue.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Arc::new(bytes),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of times the resource has been opened.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl BundledResource for CountingResource {
    fn describe(&self) -> String {
        "counting resource".to_owned()
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.bytes.len() as u64)
    }

    fn open(&self) -> io::Result<Box<dyn Read + Send + '_>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.bytes.as_slice()))
    }
}

#[derive(Debug, Clone)]
enum LocationReply {
    Ready(Result<Option<Coordinate>, LocationError>),
    Pending,
}

/// [`LocationSource`] returning a canned reply.
#[derive(Debug)]
pub struct StubLocationSource {
    reply: LocationReply,
    calls: AtomicUsize,
    initializations: AtomicUsize,
}

impl StubLocationSource {
    fn with_reply(reply: LocationReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            initializations: AtomicUsize::new(0),
        }
    }

    /// Always report `coordinate` as the last known fix.
    pub fn with_coordinate(coordinate: Coordinate) -> Self {
        Self::with_reply(LocationReply::Ready(Ok(Some(coordinate))))
    }

    /// Report that no fix is available.
    pub fn without_fix() -> Self {
        Self::with_reply(LocationReply::Ready(Ok(None)))
    }

    /// Fail every request with `error`.
    pub fn with_error(error: LocationError) -> Self {
        Self::with_reply(LocationReply::Ready(Err(error)))
    }

    /// Never answer, so callers hit their timeout.
    pub fn pending() -> Self {
        Self::with_reply(LocationReply::Pending)
    }

    /// Number of location requests received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of times [`LocationSource::initialize`] was invoked.
    pub fn initializations(&self) -> usize {
        self.initializations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationSource for StubLocationSource {
    fn initialize(&self) {
        self.initializations.fetch_add(1, Ordering::SeqCst);
    }

    async fn last_known_location(&self) -> Result<Option<Coordinate>, LocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            LocationReply::Ready(reply) => reply.clone(),
            LocationReply::Pending => std::future::pending().await,
        }
    }
}

/// [`ReverseGeocoder`] returning a canned reply and recording queries.
#[derive(Debug)]
pub struct StubGeocoder {
    reply: Result<Option<PlaceName>, GeocodeError>,
    calls: AtomicUsize,
    last_query: Mutex<Option<(Coordinate, GeocodeQuery)>>,
}

impl StubGeocoder {
    fn with_reply(reply: Result<Option<PlaceName>, GeocodeError>) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    /// Resolve every coordinate to `name`.
    ///
    /// A blank `name` behaves like [`Self::without_place`].
    pub fn with_place(name: &str) -> Self {
        Self::with_reply(Ok(PlaceName::new(name)))
    }

    /// Answer successfully without a place name.
    pub fn without_place() -> Self {
        Self::with_reply(Ok(None))
    }

    /// Fail every request with `error`.
    pub fn with_error(error: GeocodeError) -> Self {
        Self::with_reply(Err(error))
    }

    /// Number of reverse-geocoding requests received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Coordinate and query of the most recent request.
    pub fn last_query(&self) -> Option<(Coordinate, GeocodeQuery)> {
        self.last_query
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ReverseGeocoder for StubGeocoder {
    async fn reverse(
        &self,
        coordinate: Coordinate,
        query: &GeocodeQuery,
    ) -> Result<Option<PlaceName>, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_query
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some((coordinate, query.clone()));
        self.reply.clone()
    }
}
