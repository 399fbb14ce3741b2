//! Catalogue rows from the bundled reference dataset.

/// One LEGO set from the bundled catalogue.
///
/// The dataset is keyed by `set_id`; `set_number` is the primary number shown
/// to users (e.g. `"10236-1"`) and `upc` is the external code printed on the
/// box. Only the two price fields ever change after provisioning.
///
/// # Examples
///
/// ```
/// use brick_core::ReferenceRecord;
///
/// let record = ReferenceRecord {
///     set_id: 1,
///     set_number: "10236-1".into(),
///     name: "Ewok Village".into(),
///     upc: Some("673419192262".into()),
///     ..ReferenceRecord::default()
/// };
/// assert!(record.has_external_code("673419192262"));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReferenceRecord {
    /// Integer identifier of the row.
    pub set_id: i64,
    /// Primary set number.
    pub set_number: String,
    /// Display name.
    pub name: String,
    /// Category (theme), e.g. `"Star Wars"`.
    pub theme: Option<String>,
    /// Sub-category (subtheme).
    pub subtheme: Option<String>,
    /// Release year.
    pub year: Option<u16>,
    /// Number of parts.
    pub pieces: Option<u32>,
    /// Current value of a used copy.
    pub used_price: Option<f64>,
    /// Current value of a sealed copy.
    pub new_price: Option<f64>,
    /// External code (UPC) printed on the packaging.
    pub upc: Option<String>,
    /// Alternate North American item number.
    pub item_number_na: Option<String>,
    /// Full-size image URL.
    pub image_url: Option<String>,
    /// Thumbnail image URL.
    pub thumbnail_url: Option<String>,
}

impl ReferenceRecord {
    /// Whether the record's UPC equals `code`.
    #[must_use]
    pub fn has_external_code(&self, code: &str) -> bool {
        self.upc.as_deref() == Some(code)
    }
}
