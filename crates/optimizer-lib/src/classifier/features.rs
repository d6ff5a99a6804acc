//! Feature encoding for classifier inference
//!
//! Categorical columns are label-encoded against the vocabulary seen at
//! training time. Values the model never saw map to index 0 instead of
//! failing the request.

use super::manifest::EncoderVocabulary;
use crate::models::UsageObservation;
use tracing::debug;

/// Number of input features expected by the model
pub const NUM_FEATURES: usize = 9;

/// Feature order the model was trained with
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "Service_Encoded",
    "InstanceType_Encoded",
    "Region_Encoded",
    "Cost",
    "CPUUtilization",
    "MemoryUtilization",
    "NetworkIO",
    "StorageUsed",
    "RunningHours",
];

/// Sorted-vocabulary label encoder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryEncoder {
    classes: Vec<String>,
}

impl CategoryEncoder {
    /// Build from a vocabulary; classes are sorted and deduplicated
    pub fn new(classes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut classes: Vec<String> = classes.into_iter().map(Into::into).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Index of `value`, or 0 when the value was not seen during training
    pub fn encode(&self, value: &str) -> usize {
        match self.classes.binary_search_by(|c| c.as_str().cmp(value)) {
            Ok(idx) => idx,
            Err(_) => {
                debug!(value = %value, "Unseen categorical value, using fallback encoding");
                0
            }
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.classes.binary_search_by(|c| c.as_str().cmp(value)).is_ok()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// Encodes observations into the model's input vector
#[derive(Debug, Clone, Default)]
pub struct FeatureEncoder {
    service: CategoryEncoder,
    instance_type: CategoryEncoder,
    region: CategoryEncoder,
}

impl FeatureEncoder {
    pub fn new(service: CategoryEncoder, instance_type: CategoryEncoder, region: CategoryEncoder) -> Self {
        Self {
            service,
            instance_type,
            region,
        }
    }

    pub fn from_vocabulary(vocabulary: &EncoderVocabulary) -> Self {
        Self::new(
            CategoryEncoder::new(vocabulary.service.iter().cloned()),
            CategoryEncoder::new(vocabulary.instance_type.iter().cloned()),
            CategoryEncoder::new(vocabulary.region.iter().cloned()),
        )
    }

    pub fn encode(&self, observation: &UsageObservation) -> [f32; NUM_FEATURES] {
        [
            self.service.encode(observation.service.as_str()) as f32,
            self.instance_type.encode(&observation.instance_type) as f32,
            self.region.encode(&observation.region) as f32,
            observation.cost as f32,
            observation.cpu_utilization as f32,
            observation.memory_utilization as f32,
            observation.network_io as f32,
            observation.storage_used as f32,
            observation.running_hours as f32,
        ]
    }
}
