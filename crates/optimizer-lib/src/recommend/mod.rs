//! Recommendation pipeline
//!
//! Turns classified observations into ranked recommendation groups with
//! savings estimates, and composes the classifier with the pipeline for a
//! full analysis.

mod metadata;
mod pipeline;
mod report;

pub use metadata::{MetadataTable, RecommendationMetadata};
pub use pipeline::{
    PipelineOutcome, RecommendationGroup, RecommendationPipeline, UnrecognizedGroup, HIGH_SEVERITY_SHARE,
    SAVINGS_RATE,
};
pub use report::{AnalysisReport, Recommendation, Severity};

use crate::classifier::Classifier;
use crate::error::Result;
use crate::models::{ScoredObservation, UsageObservation};
use crate::observability::ServiceMetrics;
use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;

/// Round half away from zero to `dp` decimal places.
///
/// Negative zero is normalized to `0.0` so it never reaches the wire.
pub fn round_to(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor + 0.0
}

/// Classifier plus pipeline
#[derive(Clone)]
pub struct Analyzer {
    classifier: Arc<dyn Classifier>,
    pipeline: RecommendationPipeline,
    metrics: Option<ServiceMetrics>,
}

impl Analyzer {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier,
            pipeline: RecommendationPipeline::new(),
            metrics: None,
        }
    }

    /// Record per-row inference latency into the given metrics
    pub fn with_metrics(mut self, metrics: ServiceMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn classifier(&self) -> &Arc<dyn Classifier> {
        &self.classifier
    }

    /// Classify every observation; the first failure aborts the batch
    pub fn classify(&self, observations: Vec<UsageObservation>) -> Result<Vec<ScoredObservation>> {
        observations
            .into_iter()
            .enumerate()
            .map(|(i, observation)| -> Result<ScoredObservation> {
                let start = Instant::now();
                let prediction = self
                    .classifier
                    .predict(&observation)
                    .with_context(|| format!("row {}", i + 1))?;
                if let Some(metrics) = &self.metrics {
                    metrics.observe_inference_latency(start.elapsed().as_secs_f64());
                }
                Ok(ScoredObservation {
                    observation,
                    prediction,
                })
            })
            .collect()
    }

    pub fn analyze(&self, observations: Vec<UsageObservation>) -> Result<PipelineOutcome> {
        let scored = self.classify(observations)?;
        Ok(self.pipeline.run(&scored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ClassScore, ClassifierKind, PolicyClassifier};
    use crate::error::OptimizerError;
    use crate::models::ServiceCategory;

    fn ec2(cost: f64, utilization: f64) -> UsageObservation {
        let mut obs = UsageObservation::new(ServiceCategory::ComputeInstance, "m5.large", "us-east-1", cost);
        obs.cpu_utilization = utilization;
        obs.memory_utilization = utilization;
        obs.running_hours = 700;
        obs
    }

    #[test]
    fn test_round_to_half_away_from_zero() {
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(round_to(12.345, 1), 12.3);
        assert_eq!(round_to(100.005, 2), 100.01);
        assert_eq!(round_to(7.0, 2), 7.0);
    }

    #[test]
    fn test_round_to_drops_negative_zero() {
        assert!(round_to(-0.0, 2).is_sign_positive());
        assert!(round_to(-0.001, 2).is_sign_positive());
        assert_eq!(format!("{:.2}", round_to(-0.0, 2)), "0.00");
    }

    #[test]
    fn test_analyzer_with_policy_classifier() {
        let analyzer = Analyzer::new(Arc::new(PolicyClassifier::new()));
        let outcome = analyzer
            .analyze(vec![ec2(60.0, 10.0), ec2(40.0, 90.0), ec2(200.0, 50.0)])
            .unwrap();

        let report = outcome.report;
        assert_eq!(report.total_cost, 300.0);
        assert_eq!(report.total_savings, 30.0);
        assert_eq!(report.savings_percentage, 10.0);
        let summary: Vec<(usize, &str, f64, f64)> = report
            .recommendations
            .iter()
            .map(|r| (r.id, r.kind.as_str(), r.save, r.conf))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, "Right-Size Instances", 18.0, 50.0),
                (2, "Upsize Instances", 12.0, 50.0)
            ]
        );
    }

    struct Failing;

    impl Classifier for Failing {
        fn predict_confidence(&self, _: &UsageObservation) -> anyhow::Result<Vec<ClassScore>> {
            anyhow::bail!("session crashed")
        }

        fn model_version(&self) -> String {
            "broken".into()
        }

        fn kind(&self) -> ClassifierKind {
            ClassifierKind::Onnx
        }
    }

    #[test]
    fn test_classification_failure_aborts_analysis() {
        let analyzer = Analyzer::new(Arc::new(Failing));
        let err = analyzer.analyze(vec![ec2(10.0, 50.0)]).unwrap_err();
        assert!(matches!(err, OptimizerError::Classification(_)));
        assert!(!err.is_client_error());
    }
}
