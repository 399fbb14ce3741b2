//! Geoapify reverse-geocoding response types.
//!
//! Only the fields the client reads are modelled; everything else in the
//! GeoJSON payload is ignored.
//!
//! See: <https://apidocs.geoapify.com/docs/geocoding/reverse-geocoding/>

use brick_core::PlaceName;
use serde::Deserialize;

/// GeoJSON feature collection returned with `format=geojson`.
#[derive(Debug, Default, Deserialize)]
pub struct FeatureCollection {
    /// Matches ordered by relevance.
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// One reverse-geocoding match.
#[derive(Debug, Default, Deserialize)]
pub struct Feature {
    /// Address components of the match.
    #[serde(default)]
    pub properties: Properties,
}

/// Address components used to name a place.
#[derive(Debug, Default, Deserialize)]
pub struct Properties {
    /// City, town or village.
    pub city: Option<String>,
    /// County, used when no city is known.
    pub county: Option<String>,
}

impl FeatureCollection {
    /// City of the first feature, else its county.
    ///
    /// Blank values count as absent.
    pub fn place_name(self) -> Option<PlaceName> {
        let properties = self.features.into_iter().next()?.properties;
        properties
            .city
            .and_then(PlaceName::new)
            .or_else(|| properties.county.and_then(PlaceName::new))
    }
}
