///! Display lookups: famous-object colours, per-type colours, orbit tiers
use orbwatch_common::ObjectType;
use orbwatch_common::tle::{FeatureVector, mean_altitude_km};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::PaletteConfig;

/// Upper altitude bound of low Earth orbit (km)
pub const LEO_CEILING_KM: f64 = 2_000.0;
/// Geostationary altitude (km)
pub const GEO_ALTITUDE_KM: f64 = 35_786.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrbitTier {
    Leo,
    Meo,
    Geo,
}

impl OrbitTier {
    pub fn from_altitude_km(altitude_km: f64) -> Self {
        if altitude_km < LEO_CEILING_KM {
            OrbitTier::Leo
        } else if altitude_km < GEO_ALTITUDE_KM {
            OrbitTier::Meo
        } else {
            OrbitTier::Geo
        }
    }

    /// Tier from the mean motion on line 2, if it parses.
    pub fn from_lines(line1: &str, line2: &str) -> Option<Self> {
        let features = FeatureVector::from_lines(line1, line2).ok()?;
        mean_altitude_km(features.mean_motion_rev_per_day).map(Self::from_altitude_km)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrbitTier::Leo => "LEO",
            OrbitTier::Meo => "MEO",
            OrbitTier::Geo => "GEO",
        }
    }

}

impl std::fmt::Display for OrbitTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Colour tables passed explicitly to whoever needs them
#[derive(Debug, Clone)]
pub struct DisplayPalette {
    /// Keys upper-cased
    famous: HashMap<String, String>,
    types: HashMap<ObjectType, String>,
    fallback: String,
}

impl DisplayPalette {
    pub fn from_config(config: &PaletteConfig) -> Self {
        let famous = config
            .famous
            .iter()
            .map(|(name, color)| (name.to_uppercase(), color.clone()))
            .collect();

        let mut types = HashMap::new();
        for (label, color) in &config.types {
            match label.parse::<ObjectType>() {
                Ok(object_type) => {
                    types.insert(object_type, color.clone());
                }
                Err(e) => tracing::warn!("Ignoring palette entry: {}", e),
            }
        }

        Self {
            famous,
            types,
            fallback: config.fallback.clone(),
        }
    }

    pub fn famous_color(&self, name: &str) -> Option<&str> {
        self.famous.get(&name.to_uppercase()).map(String::as_str)
    }

    /// Colour for a predicted type; `Unknown`'s colour, then the fallback,
    /// stand in for missing entries.
    pub fn color_for_type(&self, object_type: ObjectType) -> &str {
        self.types
            .get(&object_type)
            .or_else(|| self.types.get(&ObjectType::Unknown))
            .map(String::as_str)
            .unwrap_or(&self.fallback)
    }
}

impl Default for DisplayPalette {
    fn default() -> Self {
        Self::from_config(&PaletteConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_famous_lookup_case_insensitive() {
        let palette = DisplayPalette::default();
        assert_eq!(palette.famous_color("iss (zarya)"), Some("white"));
        assert_eq!(palette.famous_color("STARLINK-1130"), Some("blue"));
        assert_eq!(palette.famous_color("Hubble Space Telescope"), Some("violet"));
        assert_eq!(palette.famous_color("COSMOS 2251 DEB"), None);
    }

    #[test]
    fn test_type_colors() {
        let palette = DisplayPalette::default();
        assert_eq!(palette.color_for_type(ObjectType::Debris), "#ff4d4d");

        let mut config = PaletteConfig::default();
        config.types.retain(|k, _| k == "Unknown");
        config.types.insert("Satellite".to_string(), "pink".to_string());
        let sparse = DisplayPalette::from_config(&config);
        assert_eq!(sparse.color_for_type(ObjectType::Payload), "#cccccc");

        config.types.clear();
        let empty = DisplayPalette::from_config(&config);
        assert_eq!(empty.color_for_type(ObjectType::Payload), "red");
    }

    #[test]
    fn test_orbit_tiers() {
        assert_eq!(OrbitTier::from_altitude_km(400.0), OrbitTier::Leo);
        assert_eq!(OrbitTier::from_altitude_km(20_200.0), OrbitTier::Meo);
        assert_eq!(OrbitTier::from_altitude_km(35_786.0), OrbitTier::Geo);

        let l1 = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
        let l2 = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";
        assert_eq!(OrbitTier::from_lines(l1, l2), Some(OrbitTier::Leo));
        assert_eq!(OrbitTier::from_lines(l1, "2 garbage"), None);
    }
}
