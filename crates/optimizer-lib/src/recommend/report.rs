//! Wire types of the analysis response

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Med,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::High => f.write_str("high"),
            Severity::Med => f.write_str("med"),
        }
    }
}

/// One recommendation group as served to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: usize,
    #[serde(rename = "type")]
    pub kind: String,
    pub desc: String,
    pub action: String,
    pub icon: String,
    /// Estimated monthly savings
    pub save: f64,
    /// Average confidence in percent
    pub conf: f64,
    pub sev: Severity,
    pub count: usize,
    pub current_cost: f64,
}

/// Portfolio-level analysis result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub total_cost: f64,
    pub total_savings: f64,
    pub savings_percentage: f64,
    pub recommendations: Vec<Recommendation>,
    pub total_rows: usize,
    pub services: BTreeMap<String, usize>,
}
