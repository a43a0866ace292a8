///! Object-type classification seam and annotation of tracked objects
use anyhow::{Context, Result};
use orbwatch_common::{Annotation, FeatureVector, ObjectType, TrackedObject};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::palette::DisplayPalette;
use crate::error::ClassifyError;

/// Keeps inverse distances finite for an exact centroid hit
const DISTANCE_EPSILON: f64 = 1e-9;

/// Maps the four-feature vector to a label and a confidence in [0, 1]
pub trait Classifier: Send + Sync {
    fn classify(&self, features: &FeatureVector) -> Result<(ObjectType, f64), ClassifyError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentroidClass {
    pub label: String,
    /// inclination, eccentricity, mean motion, drag term
    pub centroid: [f64; 4],
}

/// Pretrained nearest-centroid model loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentroidClassifier {
    /// Per-feature divisor applied before measuring distance
    pub scale: [f64; 4],
    pub classes: Vec<CentroidClass>,
}

impl CentroidClassifier {
    pub fn from_json(text: &str) -> Result<Self> {
        let model: CentroidClassifier = serde_json::from_str(text).context("Failed to parse classifier model")?;
        if model.classes.is_empty() {
            anyhow::bail!("Classifier model has no classes");
        }
        if model.scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            anyhow::bail!("Classifier scale must be positive and finite: {:?}", model.scale);
        }
        Ok(model)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read classifier model {:?}", path))?;
        let model = Self::from_json(&text)?;
        tracing::info!(
            "Loaded classifier from {:?} with classes: {:?}",
            path,
            model.classes.iter().map(|c| c.label.as_str()).collect::<Vec<_>>()
        );
        Ok(model)
    }

    fn distance(&self, x: &[f64; 4], centroid: &[f64; 4]) -> f64 {
        x.iter()
            .zip(centroid)
            .zip(&self.scale)
            .map(|((v, c), s)| ((v - c) / s).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

impl Classifier for CentroidClassifier {
    fn classify(&self, features: &FeatureVector) -> Result<(ObjectType, f64), ClassifyError> {
        let x = features.as_array();
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ClassifyError::NonFiniteFeatures);
        }

        let distances: Vec<f64> = self.classes.iter().map(|c| self.distance(&x, &c.centroid)).collect();

        let (best, best_distance) = distances
            .iter()
            .copied()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .ok_or_else(|| ClassifyError::Model("no classes".to_string()))?;

        let total: f64 = distances.iter().map(|d| 1.0 / (d + DISTANCE_EPSILON)).sum();
        let confidence = (1.0 / (best_distance + DISTANCE_EPSILON)) / total;

        Ok((ObjectType::from_label(&self.classes[best].label), confidence.clamp(0.0, 1.0)))
    }
}

/// Per-type counts from one annotation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassificationSummary {
    pub counts: BTreeMap<ObjectType, usize>,
    /// Objects that fell back to Unknown because of a feature or model error
    pub degraded: usize,
}

impl ClassificationSummary {
    pub fn count(&self, object_type: ObjectType) -> usize {
        self.counts.get(&object_type).copied().unwrap_or(0)
    }
}

/// Attach a prediction to every object.
///
/// Without a classifier the objects are left unannotated. Feature or
/// classifier failures degrade that object to Unknown / 0.0.
pub fn annotate<'a>(
    objects: impl IntoIterator<Item = &'a mut TrackedObject>,
    classifier: Option<&dyn Classifier>,
    palette: &DisplayPalette,
) -> ClassificationSummary {
    let mut summary = ClassificationSummary::default();

    let Some(classifier) = classifier else {
        tracing::info!("Classifier not available; skipping classification");
        return summary;
    };

    for object in objects {
        let prediction = FeatureVector::from_lines(&object.line1, &object.line2)
            .map_err(|e| e.to_string())
            .and_then(|features| classifier.classify(&features).map_err(|e| e.to_string()));

        let annotation = match prediction {
            Ok((object_type, confidence)) => {
                Annotation::new(object_type, confidence, palette.color_for_type(object_type))
            }
            Err(reason) => {
                tracing::debug!("Classification degraded for {} ({}): {}", object.name, object.object_id, reason);
                summary.degraded += 1;
                Annotation::unknown(palette.color_for_type(ObjectType::Unknown))
            }
        };

        *summary.counts.entry(annotation.predicted_type).or_insert(0) += 1;
        object.annotation = Some(annotation);
    }

    tracing::info!(
        "Classification summary: Payload={} Rocket Body={} Debris={} Unknown={} (degraded {})",
        summary.count(ObjectType::Payload),
        summary.count(ObjectType::RocketBody),
        summary.count(ObjectType::Debris),
        summary.count(ObjectType::Unknown),
        summary.degraded
    );

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISS_L1: &str = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    const ISS_L2: &str = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    const MODEL: &str = r#"{
        "scale": [10.0, 0.01, 1.0, 0.0001],
        "classes": [
            { "label": "Payload", "centroid": [51.6, 0.0007, 15.7, -0.00001] },
            { "label": "R/B", "centroid": [28.0, 0.2, 3.0, 0.0001] },
            { "label": "DEB", "centroid": [74.0, 0.01, 14.3, 0.0003] }
        ]
    }"#;

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn classify(&self, _features: &FeatureVector) -> Result<(ObjectType, f64), ClassifyError> {
            Err(ClassifyError::Model("model unavailable".to_string()))
        }
    }

    #[test]
    fn test_centroid_nearest_class() {
        let model = CentroidClassifier::from_json(MODEL).unwrap();
        let features = FeatureVector::from_lines(ISS_L1, ISS_L2).unwrap();
        let (label, confidence) = model.classify(&features).unwrap();
        assert_eq!(label, ObjectType::Payload);
        assert!(confidence > 0.5 && confidence <= 1.0, "confidence = {}", confidence);
    }

    #[test]
    fn test_model_validation() {
        assert!(CentroidClassifier::from_json(r#"{"scale":[1,1,1,1],"classes":[]}"#).is_err());
        assert!(
            CentroidClassifier::from_json(r#"{"scale":[1,0,1,1],"classes":[{"label":"DEB","centroid":[0,0,0,0]}]}"#)
                .is_err()
        );
        assert!(CentroidClassifier::from_json("not json").is_err());
    }

    #[test]
    fn test_non_finite_features_rejected() {
        let model = CentroidClassifier::from_json(MODEL).unwrap();
        let features = FeatureVector {
            inclination_deg: f64::NAN,
            eccentricity: 0.0,
            mean_motion_rev_per_day: 15.0,
            drag_term: 0.0,
        };
        assert!(matches!(model.classify(&features), Err(ClassifyError::NonFiniteFeatures)));
    }

    #[test]
    fn test_annotate_without_classifier_leaves_unset() {
        let mut objects = vec![TrackedObject::new(25544, "ISS (ZARYA)", ISS_L1, ISS_L2)];
        let summary = annotate(&mut objects, None, &DisplayPalette::default());
        assert!(objects[0].annotation.is_none());
        assert_eq!(summary, ClassificationSummary::default());
    }

    #[test]
    fn test_annotate_degrades_to_unknown() {
        let palette = DisplayPalette::default();
        let mut objects = vec![
            TrackedObject::new(25544, "ISS (ZARYA)", ISS_L1, ISS_L2),
            TrackedObject::new(1, "BROKEN", "1 00001U", "2 00001"),
        ];

        let model = CentroidClassifier::from_json(MODEL).unwrap();
        let summary = annotate(&mut objects, Some(&model), &palette);
        assert_eq!(objects[0].effective_type(), ObjectType::Payload);
        assert_eq!(objects[0].annotation.as_ref().unwrap().predicted_color, "#33e633");
        assert_eq!(objects[1].effective_type(), ObjectType::Unknown);
        assert_eq!(objects[1].confidence(), Some(0.0));
        assert_eq!(summary.count(ObjectType::Payload), 1);
        assert_eq!(summary.count(ObjectType::Unknown), 1);
        assert_eq!(summary.degraded, 1);

        let summary = annotate(&mut objects, Some(&FailingClassifier), &palette);
        assert_eq!(summary.count(ObjectType::Unknown), 2);
        assert_eq!(summary.degraded, 2);
        assert!(objects.iter().all(|o| o.effective_type() == ObjectType::Unknown));
    }
}
