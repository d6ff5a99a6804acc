//! ONNX inference using tract
//!
//! The artifact is a tree-ensemble classifier exported to ONNX with plain
//! tensor outputs (no zipmap). Its probability output is a `f32[1, classes]`
//! tensor whose columns follow the manifest's class list.

use super::features::{FeatureEncoder, NUM_FEATURES};
use super::manifest::ModelManifest;
use super::{ClassScore, Classifier, ClassifierKind};
use crate::labeling::LabelingPolicy;
use crate::models::UsageObservation;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, info, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

/// Confidence reported by the policy fallback
pub const FALLBACK_CONFIDENCE: f32 = 0.5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Classifier backed by an ONNX artifact and its manifest
pub struct OnnxClassifier {
    model: TractModel,
    manifest: ModelManifest,
    encoder: FeatureEncoder,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
}

impl OnnxClassifier {
    /// Load the artifact and manifest from disk
    pub fn load(model_path: &Path, manifest_path: &Path) -> Result<Self> {
        let model_bytes = std::fs::read(model_path)
            .with_context(|| format!("Failed to read model {}", model_path.display()))?;
        let manifest = ModelManifest::from_path(manifest_path)
            .with_context(|| format!("Failed to read manifest {}", manifest_path.display()))?;
        Self::from_parts(&model_bytes, manifest)
    }

    /// Verify the manifest against the bytes, then build the runnable plan
    pub fn from_parts(model_bytes: &[u8], manifest: ModelManifest) -> Result<Self> {
        manifest.verify(model_bytes)?;
        let model = Self::load_model(model_bytes)?;
        let encoder = FeatureEncoder::from_vocabulary(&manifest.encoders);

        info!(
            version = %manifest.version,
            classes = manifest.classes.len(),
            "ONNX classifier ready"
        );

        Ok(Self {
            model,
            manifest,
            encoder,
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
        })
    }

    /// Load and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8]) -> Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    fn features_to_tensor(&self, observation: &UsageObservation) -> Result<Tensor> {
        let data = self.encoder.encode(observation).to_vec();
        let array = tract_ndarray::Array2::from_shape_vec((1, NUM_FEATURES), data)
            .context("Failed to shape feature tensor")?;
        Ok(array.into())
    }

    pub fn manifest(&self) -> &ModelManifest {
        &self.manifest
    }

    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
        }
    }
}

impl Classifier for OnnxClassifier {
    fn predict_confidence(&self, observation: &UsageObservation) -> Result<Vec<ClassScore>> {
        let start = Instant::now();

        let input = self.features_to_tensor(observation)?;
        let outputs = self.model.run(tvec!(input.into()))?;
        let probabilities = outputs
            .get(self.manifest.probabilities_output)
            .with_context(|| {
                format!(
                    "Model has {} outputs, probabilities expected at index {}",
                    outputs.len(),
                    self.manifest.probabilities_output
                )
            })?;
        let values: Vec<f32> = probabilities.to_array_view::<f32>()?.iter().copied().collect();

        if values.len() != self.manifest.classes.len() {
            anyhow::bail!(
                "Model produced {} probabilities for {} classes",
                values.len(),
                self.manifest.classes.len()
            );
        }

        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(self
            .manifest
            .classes
            .iter()
            .zip(values)
            .map(|(label, probability)| ClassScore {
                label: label.clone(),
                probability,
            })
            .collect())
    }

    fn model_version(&self) -> String {
        self.manifest.version.clone()
    }

    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Onnx
    }
}

/// Inference statistics
#[derive(Debug, Clone)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
}

/// Fallback classifier that applies the labeling policy directly
///
/// Serving-time rows carry no latent signals, so the S3 cold-bucket and EBS
/// unattached rules never fire here.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyClassifier {
    policy: LabelingPolicy,
}

impl PolicyClassifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Classifier for PolicyClassifier {
    fn predict_confidence(&self, observation: &UsageObservation) -> Result<Vec<ClassScore>> {
        let label = self.policy.label(observation);
        Ok(vec![ClassScore {
            label: label.as_str().to_string(),
            probability: FALLBACK_CONFIDENCE,
        }])
    }

    fn model_version(&self) -> String {
        "fallback".to_string()
    }

    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Policy
    }
}
