//! Classifier seam
//!
//! The recommendation pipeline only needs `predict` and
//! `predict_confidence`. Two implementations are provided: an ONNX artifact
//! run through tract, and a fallback that applies the labeling policy
//! directly when no artifact is configured.

mod features;
mod inference;
mod manifest;

pub use features::{CategoryEncoder, FeatureEncoder, FEATURE_NAMES, NUM_FEATURES};
pub use inference::{InferenceStats, OnnxClassifier, PolicyClassifier, FALLBACK_CONFIDENCE};
pub use manifest::{sha256_hex, EncoderVocabulary, ModelManifest};

use crate::models::{Prediction, UsageObservation};
use anyhow::Result;
use serde::Serialize;
use std::fmt;

/// Probability assigned to one class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassScore {
    pub label: String,
    pub probability: f32,
}

/// Which implementation is serving predictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    Onnx,
    Policy,
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierKind::Onnx => f.write_str("onnx"),
            ClassifierKind::Policy => f.write_str("policy"),
        }
    }
}

/// Trait for classifier implementations
pub trait Classifier: Send + Sync {
    /// Per-class probabilities for one observation
    fn predict_confidence(&self, observation: &UsageObservation) -> Result<Vec<ClassScore>>;

    /// Most probable label, with its probability as confidence
    fn predict(&self, observation: &UsageObservation) -> Result<Prediction> {
        let scores = self.predict_confidence(observation)?;
        let best = scores
            .into_iter()
            .max_by(|a, b| {
                a.probability
                    .partial_cmp(&b.probability)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .ok_or_else(|| anyhow::anyhow!("classifier returned no class scores"))?;
        Ok(Prediction::new(best.label, f64::from(best.probability.clamp(0.0, 1.0))))
    }

    /// Version string of the loaded model
    fn model_version(&self) -> String;

    fn kind(&self) -> ClassifierKind;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServiceCategory;

    struct FixedScores(Vec<ClassScore>);

    impl Classifier for FixedScores {
        fn predict_confidence(&self, _: &UsageObservation) -> Result<Vec<ClassScore>> {
            Ok(self.0.clone())
        }

        fn model_version(&self) -> String {
            "test".into()
        }

        fn kind(&self) -> ClassifierKind {
            ClassifierKind::Onnx
        }
    }

    fn score(label: &str, probability: f32) -> ClassScore {
        ClassScore {
            label: label.into(),
            probability,
        }
    }

    #[test]
    fn test_predict_picks_most_probable_class() {
        let classifier = FixedScores(vec![
            score("optimal", 0.2),
            score("downsize", 0.7),
            score("terminate", 0.1),
        ]);
        let obs = UsageObservation::new(ServiceCategory::ComputeInstance, "t3.large", "us-east-1", 1.0);
        let prediction = classifier.predict(&obs).unwrap();
        assert_eq!(prediction.label, "downsize");
        assert!((prediction.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_predict_without_scores_fails() {
        let classifier = FixedScores(Vec::new());
        let obs = UsageObservation::new(ServiceCategory::ComputeInstance, "t3.large", "us-east-1", 1.0);
        assert!(classifier.predict(&obs).is_err());
    }
}
