//! Core library for the cloud cost optimizer
//!
//! This crate provides:
//! - The usage data model and the rule-based labeling policy
//! - Synthetic training data generation and dataset I/O
//! - Upload ingestion with fallback column synthesis
//! - The classifier seam (ONNX artifact or policy fallback)
//! - Recommendation aggregation, ranking and Terraform rendering
//! - Metrics and structured logging

pub mod classifier;
pub mod dataset;
pub mod error;
pub mod generator;
pub mod ingest;
pub mod labeling;
pub mod models;
pub mod observability;
pub mod recommend;
pub mod terraform;

pub use error::{OptimizerError, Result};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
