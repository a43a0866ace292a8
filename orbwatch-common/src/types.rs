use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog object type, as predicted by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum ObjectType {
    #[serde(rename = "Payload")]
    Payload,
    #[serde(rename = "Rocket Body")]
    RocketBody,
    #[serde(rename = "Debris")]
    Debris,
    #[default]
    #[serde(rename = "Unknown")]
    Unknown,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Payload => "Payload",
            ObjectType::RocketBody => "Rocket Body",
            ObjectType::Debris => "Debris",
            ObjectType::Unknown => "Unknown",
        }
    }

    /// Lenient parse used for classifier and catalog labels.
    ///
    /// Anything unrecognised maps to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or(ObjectType::Unknown)
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ObjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "payload" | "pay" => Ok(ObjectType::Payload),
            "rocket body" | "rocketbody" | "rocket_body" | "r/b" | "rb" => Ok(ObjectType::RocketBody),
            "debris" | "deb" => Ok(ObjectType::Debris),
            "unknown" | "unk" => Ok(ObjectType::Unknown),
            _ => Err(format!("Unknown object type: {}", s)),
        }
    }
}

/// Where a fetched payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchOrigin {
    Cache,
    Network,
}

impl FetchOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchOrigin::Cache => "cache",
            FetchOrigin::Network => "network",
        }
    }
}

impl std::fmt::Display for FetchOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One tracked object's element set plus provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSetRecord {
    /// Catalog number, unique within a fetch group
    pub object_id: u32,
    /// Object name, "UNKNOWN" for legacy two-line input
    pub name: String,
    /// Line 1 exactly as delivered
    pub raw_line_1: String,
    /// Line 2 exactly as delivered
    pub raw_line_2: String,
    pub fetched_at: DateTime<Utc>,
    pub source_group: String,
}

/// Classifier output attached to a tracked object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub predicted_type: ObjectType,
    /// Always within [0, 1]
    pub predicted_confidence: f64,
    /// Opaque display token (colour name or hex)
    pub predicted_color: String,
}

impl Annotation {
    pub fn new(predicted_type: ObjectType, confidence: f64, color: impl Into<String>) -> Self {
        let predicted_confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            predicted_type,
            predicted_confidence,
            predicted_color: color.into(),
        }
    }

    /// Fallback used when classification is unavailable or fails.
    pub fn unknown(color: impl Into<String>) -> Self {
        Self::new(ObjectType::Unknown, 0.0, color)
    }
}

/// A trackable object for the duration of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    pub object_id: u32,
    pub name: String,
    pub line1: String,
    pub line2: String,
    /// Unset until a classifier has run
    #[serde(default)]
    pub annotation: Option<Annotation>,
}

impl TrackedObject {
    pub fn new(object_id: u32, name: impl Into<String>, line1: impl Into<String>, line2: impl Into<String>) -> Self {
        Self {
            object_id,
            name: name.into(),
            line1: line1.into(),
            line2: line2.into(),
            annotation: None,
        }
    }

    /// Predicted type, `Unknown` when not annotated.
    pub fn effective_type(&self) -> ObjectType {
        self.annotation
            .as_ref()
            .map(|a| a.predicted_type)
            .unwrap_or(ObjectType::Unknown)
    }

    pub fn confidence(&self) -> Option<f64> {
        self.annotation.as_ref().map(|a| a.predicted_confidence)
    }
}

impl From<&ElementSetRecord> for TrackedObject {
    fn from(record: &ElementSetRecord) -> Self {
        TrackedObject::new(
            record.object_id,
            record.name.clone(),
            record.raw_line_1.clone(),
            record.raw_line_2.clone(),
        )
    }
}

/// Position in km, fixed inertial frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub at: DateTime<Utc>,
    pub position_km: [f64; 3],
}

impl PositionSample {
    pub fn new(at: DateTime<Utc>, position_km: [f64; 3]) -> Self {
        Self { at, position_km }
    }

    pub fn distance_km(&self, other: &PositionSample) -> f64 {
        let dx = self.position_km[0] - other.position_km[0];
        let dy = self.position_km[1] - other.position_km[1];
        let dz = self.position_km[2] - other.position_km[2];
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Samples for one object over the shared time grid.
///
/// Index `i` refers to the same grid timestamp in every track of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub object_id: u32,
    pub samples: Vec<PositionSample>,
}

impl Track {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Minimum-separation event for one object pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProximityEvent {
    pub object_a: u32,
    pub object_b: u32,
    pub min_distance_km: f64,
    pub time_index: usize,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_type_labels() {
        assert_eq!(ObjectType::from_label("R/B"), ObjectType::RocketBody);
        assert_eq!(ObjectType::from_label("DEB"), ObjectType::Debris);
        assert_eq!(ObjectType::from_label("pay"), ObjectType::Payload);
        assert_eq!(ObjectType::from_label("Rocket Body"), ObjectType::RocketBody);
        assert_eq!(ObjectType::from_label("TBA"), ObjectType::Unknown);
        assert!("satellite".parse::<ObjectType>().is_err());
        assert_eq!(ObjectType::RocketBody.to_string(), "Rocket Body");
    }

    #[test]
    fn test_annotation_confidence_clamped() {
        assert_eq!(Annotation::new(ObjectType::Debris, 1.7, "red").predicted_confidence, 1.0);
        assert_eq!(Annotation::new(ObjectType::Debris, -0.2, "red").predicted_confidence, 0.0);
        assert_eq!(Annotation::new(ObjectType::Debris, f64::NAN, "red").predicted_confidence, 0.0);
    }

    #[test]
    fn test_unannotated_object_is_unknown() {
        let obj = TrackedObject::new(25544, "ISS (ZARYA)", "1 ...", "2 ...");
        assert_eq!(obj.effective_type(), ObjectType::Unknown);
        assert_eq!(obj.confidence(), None);
    }

    #[test]
    fn test_distance() {
        let t = Utc::now();
        let a = PositionSample::new(t, [0.0, 0.0, 0.0]);
        let b = PositionSample::new(t, [3.0, 4.0, 12.0]);
        assert!((a.distance_km(&b) - 13.0).abs() < 1e-12);
    }
}
