//! BrickEconomy set response types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Envelope wrapping every successful set response.
#[derive(Debug, Deserialize)]
pub(crate) struct SetResponse {
    pub(crate) data: Option<SetValuation>,
}

/// Market data for one set as reported by the price service.
///
/// Every field is optional because the service omits what it does not know.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetValuation {
    /// Primary set number, e.g. `"10236-1"`.
    pub set_number: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Theme.
    pub theme: Option<String>,
    /// Release year.
    pub year: Option<u16>,
    /// Number of parts.
    pub pieces_count: Option<u32>,
    /// Number of minifigures.
    pub minifigs_count: Option<u32>,
    /// Whether the set has been retired.
    pub retired: Option<bool>,
    /// Original US retail price.
    pub retail_price_us: Option<f64>,
    /// Current value of a sealed copy.
    pub current_value_new: Option<f64>,
    /// Current value of a used copy.
    pub current_value_used: Option<f64>,
    /// Percentage growth over the last year.
    pub rolling_growth_lastyear: Option<f64>,
    /// New-condition price history, most recent first.
    #[serde(default)]
    pub price_events_new: Vec<PriceEvent>,
}

/// One historical new-condition price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEvent {
    /// Date of the observation as reported (`"N/A"` when missing).
    #[serde(default = "unknown_date")]
    pub date: String,
    /// Observed value (zero when missing).
    #[serde(default)]
    pub value: f64,
}

fn unknown_date() -> String {
    "N/A".to_owned()
}

struct OrNa<'a, T>(&'a Option<T>);

impl<T: fmt::Display> fmt::Display for OrNa<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => fmt::Display::fmt(value, f),
            None => f.write_str("N/A"),
        }
    }
}

impl fmt::Display for SetValuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Set: {} - {}", OrNa(&self.set_number), OrNa(&self.name))?;
        writeln!(f, "Theme: {}", OrNa(&self.theme))?;
        writeln!(f, "Year: {}", OrNa(&self.year))?;
        writeln!(f, "Pieces: {}", OrNa(&self.pieces_count))?;
        writeln!(f, "Minifigs: {}", OrNa(&self.minifigs_count))?;
        let retired = if self.retired == Some(true) { "Yes" } else { "No" };
        writeln!(f, "Retired: {retired}")?;
        writeln!(f, "Original Price: ${}", OrNa(&self.retail_price_us))?;
        writeln!(f, "Current Value (New): ${}", OrNa(&self.current_value_new))?;
        writeln!(f, "Current Value (Used): ${}", OrNa(&self.current_value_used))?;
        write!(f, "Growth (Last Year): {}%", OrNa(&self.rolling_growth_lastyear))
    }
}
