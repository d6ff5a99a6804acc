//! Model manifest stored next to the ONNX artifact

use super::features::FEATURE_NAMES;
use crate::error::{OptimizerError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Training-time vocabularies of the categorical features
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncoderVocabulary {
    pub service: Vec<String>,
    pub instance_type: Vec<String>,
    pub region: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: String,
    /// Hex sha256 of the model bytes
    pub sha256: String,
    /// Class labels in the order of the probability output
    pub classes: Vec<String>,
    pub features: Vec<String>,
    pub encoders: EncoderVocabulary,
    /// Index of the probability tensor among the model outputs
    #[serde(default = "default_probabilities_output")]
    pub probabilities_output: usize,
}

fn default_probabilities_output() -> usize {
    1
}

impl ModelManifest {
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Check the artifact bytes and feature layout before the model is parsed
    pub fn verify(&self, model_bytes: &[u8]) -> Result<()> {
        let actual = sha256_hex(model_bytes);
        if !actual.eq_ignore_ascii_case(&self.sha256) {
            return Err(OptimizerError::ModelChecksumMismatch {
                expected: self.sha256.clone(),
                actual,
            });
        }

        if self.features.len() != FEATURE_NAMES.len()
            || self.features.iter().zip(FEATURE_NAMES).any(|(a, b)| a != b)
        {
            return Err(OptimizerError::ManifestMismatch(format!(
                "feature order {:?} does not match expected {:?}",
                self.features, FEATURE_NAMES
            )));
        }

        if self.classes.is_empty() {
            return Err(OptimizerError::ManifestMismatch("manifest lists no classes".into()));
        }
        Ok(())
    }
}

/// Compute SHA256 checksum of data
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn manifest_for(bytes: &[u8]) -> ModelManifest {
        ModelManifest {
            version: "2024.06.1".into(),
            sha256: sha256_hex(bytes),
            classes: vec!["downsize".into(), "optimal".into()],
            features: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            encoders: EncoderVocabulary::default(),
            probabilities_output: 1,
        }
    }

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_verify_accepts_matching_artifact() {
        let bytes = b"model-bytes";
        assert!(manifest_for(bytes).verify(bytes).is_ok());
    }

    #[test]
    fn test_verify_rejects_checksum_mismatch() {
        let manifest = manifest_for(b"model-bytes");
        match manifest.verify(b"tampered") {
            Err(OptimizerError::ModelChecksumMismatch { expected, actual }) => {
                assert_eq!(expected, manifest.sha256);
                assert_eq!(actual, sha256_hex(b"tampered"));
            }
            other => panic!("expected checksum mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_verify_rejects_reordered_features() {
        let bytes = b"model-bytes";
        let mut manifest = manifest_for(bytes);
        manifest.features.swap(3, 4);
        assert!(matches!(manifest.verify(bytes), Err(OptimizerError::ManifestMismatch(_))));

        manifest.features.truncate(8);
        assert!(matches!(manifest.verify(bytes), Err(OptimizerError::ManifestMismatch(_))));
    }

    #[test]
    fn test_from_path_defaults_probability_output() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"version":"v1","sha256":"00","classes":["optimal"],"features":[],
               "encoders":{{"service":["EC2"],"instance_type":[],"region":[]}}}}"#
        )
        .unwrap();

        let manifest = ModelManifest::from_path(file.path()).unwrap();
        assert_eq!(manifest.probabilities_output, 1);
        assert_eq!(manifest.encoders.service, vec!["EC2".to_string()]);
    }
}
