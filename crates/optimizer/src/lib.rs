//! Cost optimizer HTTP service
//!
//! Exposes the analysis and Terraform endpoints over axum, plus health,
//! readiness and Prometheus metrics.

pub mod api;
pub mod config;
