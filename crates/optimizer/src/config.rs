//! Service configuration

use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

/// Config file read when `OPTIMIZER_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "optimizer.toml";

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name attached to every structured log record
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// ONNX classifier artifact; the policy fallback is used when unset
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// Manifest for the artifact, defaults to the model path with a `.json` extension
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    5000
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            bind_address: default_bind_address(),
            api_port: default_api_port(),
            model_path: None,
            manifest_path: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the config file and environment
    pub fn load() -> Result<Self> {
        let path = std::env::var("OPTIMIZER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(&path)
    }

    /// Environment variables (`OPTIMIZER_*`) override the file
    pub fn load_from(path: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("OPTIMIZER").try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.api_port)
    }

    pub fn resolved_manifest_path(&self) -> Option<PathBuf> {
        self.manifest_path
            .clone()
            .or_else(|| self.model_path.as_ref().map(|p| p.with_extension("json")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr(), "0.0.0.0:5000");
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert!(config.model_path.is_none());
        assert!(config.resolved_manifest_path().is_none());
    }

    #[test]
    fn test_missing_file_is_not_required() {
        let config = ServerConfig::load_from("/nonexistent/optimizer.toml").unwrap();
        assert!(config.max_upload_bytes > 0);
    }

    #[test]
    fn test_file_values_and_manifest_default() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "instance_name = \"optimizer-test\"").unwrap();
        writeln!(file, "max_upload_bytes = 2048").unwrap();
        writeln!(file, "model_path = \"/models/classifier.onnx\"").unwrap();

        let config = ServerConfig::load_from(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.instance_name, "optimizer-test");
        assert_eq!(config.max_upload_bytes, 2048);
        assert_eq!(
            config.resolved_manifest_path(),
            Some(PathBuf::from("/models/classifier.json"))
        );
    }
}
