//! Aggregation of scored observations into recommendation groups

use super::metadata::MetadataTable;
use super::report::{AnalysisReport, Recommendation, Severity};
use super::round_to;
use crate::models::{Label, ScoredObservation};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Share of a group's cost assumed recoverable
pub const SAVINGS_RATE: f64 = 0.3;

/// A group is high severity when its savings exceed this share of total cost
pub const HIGH_SEVERITY_SHARE: f64 = 0.1;

/// Aggregate of every observation sharing one predicted label
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationGroup {
    pub label: String,
    pub member_count: usize,
    pub group_cost: f64,
    pub estimated_savings: f64,
    /// Mean confidence in percent
    pub average_confidence: f64,
    pub severity: Severity,
}

/// Group dropped because its label has no metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnrecognizedGroup {
    pub label: String,
    pub member_count: usize,
    pub group_cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub report: AnalysisReport,
    pub unrecognized: Vec<UnrecognizedGroup>,
}

#[derive(Debug, Default)]
struct Partition {
    count: usize,
    cost: f64,
    confidence_sum: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct RecommendationPipeline {
    metadata: &'static MetadataTable,
}

impl Default for RecommendationPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommendationPipeline {
    pub fn new() -> Self {
        Self::with_metadata(MetadataTable::standard())
    }

    pub fn with_metadata(metadata: &'static MetadataTable) -> Self {
        Self { metadata }
    }

    /// Group, score and rank a classified batch
    pub fn run(&self, scored: &[ScoredObservation]) -> PipelineOutcome {
        if scored.is_empty() {
            return PipelineOutcome {
                report: AnalysisReport::default(),
                unrecognized: Vec::new(),
            };
        }

        let total_cost: f64 = scored.iter().map(|s| s.observation.cost).sum();

        let mut services: BTreeMap<String, usize> = BTreeMap::new();
        let mut partitions: BTreeMap<&str, Partition> = BTreeMap::new();
        for item in scored {
            *services
                .entry(item.observation.service.as_str().to_string())
                .or_insert(0) += 1;

            let partition = partitions.entry(item.prediction.label.as_str()).or_default();
            partition.count += 1;
            partition.cost += item.observation.cost;
            partition.confidence_sum += item.prediction.confidence;
        }

        let mut groups = Vec::new();
        let mut unrecognized = Vec::new();
        for (label, partition) in partitions {
            if label == Label::Optimal.as_str() {
                continue;
            }
            if self.metadata.lookup(label).is_none() {
                warn!(
                    label = %label,
                    count = partition.count,
                    "Dropping group with unrecognized label"
                );
                unrecognized.push(UnrecognizedGroup {
                    label: label.to_string(),
                    member_count: partition.count,
                    group_cost: round_to(partition.cost, 2),
                });
                continue;
            }
            groups.push(Self::score_group(label, &partition, total_cost));
        }

        groups.sort_by(|a, b| {
            b.estimated_savings
                .total_cmp(&a.estimated_savings)
                .then_with(|| a.label.cmp(&b.label))
        });

        let recommendations: Vec<Recommendation> = groups
            .iter()
            .enumerate()
            .filter_map(|(i, group)| self.render(i + 1, group))
            .collect();

        let total_savings = recommendations.iter().fold(0.0, |acc, r| acc + r.save);
        let savings_percentage = if total_cost > 0.0 {
            round_to(total_savings / total_cost * 100.0, 0)
        } else {
            0.0
        };

        debug!(
            groups = recommendations.len(),
            unrecognized = unrecognized.len(),
            total_cost = total_cost,
            "Recommendation pipeline finished"
        );

        PipelineOutcome {
            report: AnalysisReport {
                total_cost: round_to(total_cost, 2),
                total_savings: round_to(total_savings, 2),
                savings_percentage,
                recommendations,
                total_rows: scored.len(),
                services,
            },
            unrecognized,
        }
    }

    fn score_group(label: &str, partition: &Partition, total_cost: f64) -> RecommendationGroup {
        let estimated_savings = partition.cost * SAVINGS_RATE;
        let severity = if estimated_savings > total_cost * HIGH_SEVERITY_SHARE {
            Severity::High
        } else {
            Severity::Med
        };

        RecommendationGroup {
            label: label.to_string(),
            member_count: partition.count,
            group_cost: partition.cost,
            estimated_savings,
            average_confidence: partition.confidence_sum / partition.count as f64 * 100.0,
            severity,
        }
    }

    fn render(&self, id: usize, group: &RecommendationGroup) -> Option<Recommendation> {
        let meta = self.metadata.lookup(&group.label)?;
        Some(Recommendation {
            id,
            kind: meta.title.to_string(),
            desc: meta.describe(group.member_count),
            action: meta.action.to_string(),
            icon: meta.icon.to_string(),
            save: round_to(group.estimated_savings, 2),
            conf: round_to(group.average_confidence, 1),
            sev: group.severity,
            count: group.member_count,
            current_cost: round_to(group.group_cost, 2),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Prediction, ServiceCategory, UsageObservation};

    fn scored(service: ServiceCategory, cost: f64, label: &str, confidence: f64) -> ScoredObservation {
        ScoredObservation {
            observation: UsageObservation::new(service, "m5.large", "us-east-1", cost),
            prediction: Prediction::new(label, confidence),
        }
    }

    fn ec2(cost: f64, label: &str) -> ScoredObservation {
        scored(ServiceCategory::ComputeInstance, cost, label, 0.5)
    }

    #[test]
    fn test_end_to_end_portfolio() {
        let batch = vec![ec2(60.0, "downsize"), ec2(40.0, "upsize"), ec2(200.0, "optimal")];
        let outcome = RecommendationPipeline::new().run(&batch);
        let report = outcome.report;

        assert_eq!(report.total_cost, 300.0);
        assert_eq!(report.total_savings, 30.0);
        assert_eq!(report.savings_percentage, 10.0);
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.services["EC2"], 3);
        assert!(outcome.unrecognized.is_empty());

        assert_eq!(report.recommendations.len(), 2);
        let first = &report.recommendations[0];
        assert_eq!(first.id, 1);
        assert_eq!(first.kind, "Right-Size Instances");
        assert_eq!(first.desc, "1 oversized instances detected");
        assert_eq!(first.save, 18.0);
        assert_eq!(first.conf, 50.0);
        assert_eq!(first.sev, Severity::Med);
        assert_eq!(first.current_cost, 60.0);

        let second = &report.recommendations[1];
        assert_eq!(second.id, 2);
        assert_eq!(second.kind, "Upsize Instances");
        assert_eq!(second.save, 12.0);
        assert_eq!(second.sev, Severity::Med);
    }

    #[test]
    fn test_severity_boundary_is_strict() {
        // 100 * 0.3 == 300 * 0.1 exactly
        let batch = vec![ec2(100.0, "downsize"), ec2(200.0, "optimal")];
        let report = RecommendationPipeline::new().run(&batch).report;
        assert_eq!(report.recommendations[0].sev, Severity::Med);

        let batch = vec![ec2(101.0, "downsize"), ec2(199.0, "optimal")];
        let report = RecommendationPipeline::new().run(&batch).report;
        assert_eq!(report.recommendations[0].sev, Severity::High);
    }

    #[test]
    fn test_money_rounds_to_cents() {
        let batch = vec![ec2(100.005, "terminate")];
        let report = RecommendationPipeline::new().run(&batch).report;
        let rec = &report.recommendations[0];
        assert_eq!(rec.current_cost, 100.01);
        assert_eq!(rec.save, 30.0);
        assert_eq!(report.total_cost, 100.01);
        assert_eq!(report.savings_percentage, 30.0);
    }

    #[test]
    fn test_confidence_is_averaged_percent() {
        let batch = vec![
            scored(ServiceCategory::ComputeInstance, 10.0, "downsize", 0.9),
            scored(ServiceCategory::ComputeInstance, 10.0, "downsize", 0.75),
            scored(ServiceCategory::ComputeInstance, 10.0, "downsize", 0.62),
        ];
        let report = RecommendationPipeline::new().run(&batch).report;
        // mean 0.756666... -> 75.7
        assert_eq!(report.recommendations[0].conf, 75.7);
        assert_eq!(report.recommendations[0].count, 3);
    }

    #[test]
    fn test_empty_batch_yields_zero_report() {
        let outcome = RecommendationPipeline::new().run(&[]);
        assert_eq!(outcome.report, AnalysisReport::default());
        assert_eq!(outcome.report.savings_percentage, 0.0);
        assert!(outcome.unrecognized.is_empty());
    }

    #[test]
    fn test_zero_cost_portfolio_has_zero_percentage() {
        let batch = vec![ec2(0.0, "terminate")];
        let report = RecommendationPipeline::new().run(&batch).report;
        assert_eq!(report.total_cost, 0.0);
        assert_eq!(report.savings_percentage, 0.0);
        assert_eq!(report.recommendations.len(), 1);
    }

    #[test]
    fn test_all_optimal_has_no_recommendations() {
        let batch = vec![ec2(10.0, "optimal"), ec2(20.0, "optimal")];
        let report = RecommendationPipeline::new().run(&batch).report;
        assert!(report.recommendations.is_empty());
        assert_eq!(report.total_cost, 30.0);
        assert_eq!(report.total_savings, 0.0);
    }

    #[test]
    fn test_all_optimal_serializes_positive_zero() {
        let batch = vec![ec2(10.0, "optimal")];
        let report = RecommendationPipeline::new().run(&batch).report;
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"total_savings\":0.0"), "{}", json);
        assert!(json.contains("\"savings_percentage\":0.0"), "{}", json);
        assert!(!json.contains("-0.0"), "{}", json);
    }

    #[test]
    fn test_all_unrecognized_serializes_positive_zero() {
        let batch = vec![ec2(40.0, "archive")];
        let outcome = RecommendationPipeline::new().run(&batch);
        assert_eq!(outcome.unrecognized.len(), 1);
        let json = serde_json::to_string(&outcome.report).unwrap();
        assert!(json.contains("\"total_savings\":0.0"), "{}", json);
    }

    #[test]
    fn test_unrecognized_label_is_excluded() {
        let batch = vec![ec2(50.0, "downsize"), ec2(500.0, "archive"), ec2(20.0, "archive")];
        let outcome = RecommendationPipeline::new().run(&batch);

        assert_eq!(outcome.report.recommendations.len(), 1);
        assert_eq!(outcome.report.total_savings, 15.0);
        // Still part of the portfolio
        assert_eq!(outcome.report.total_cost, 570.0);
        assert_eq!(
            outcome.unrecognized,
            vec![UnrecognizedGroup {
                label: "archive".into(),
                member_count: 2,
                group_cost: 520.0,
            }]
        );
    }

    #[test]
    fn test_member_counts_are_conserved() {
        let labels = ["downsize", "terminate", "optimal", "upsize", "optimal", "downsize", "archive"];
        let batch: Vec<ScoredObservation> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| ec2(10.0 + i as f64, label))
            .collect();
        let outcome = RecommendationPipeline::new().run(&batch);

        let grouped: usize = outcome.report.recommendations.iter().map(|r| r.count).sum();
        let dropped: usize = outcome.unrecognized.iter().map(|u| u.member_count).sum();
        let optimal = labels.iter().filter(|l| **l == "optimal").count();
        assert_eq!(grouped + dropped + optimal, batch.len());
    }

    #[test]
    fn test_ordering_and_ids() {
        let batch = vec![
            scored(ServiceCategory::ObjectStorage, 40.0, "move_to_glacier", 0.8),
            scored(ServiceCategory::BlockStorage, 40.0, "delete_unused", 0.8),
            scored(ServiceCategory::ComputeInstance, 90.0, "downsize", 0.8),
            scored(ServiceCategory::ServerlessFunction, 5.0, "reduce_memory", 0.8),
        ];
        let report = RecommendationPipeline::new().run(&batch).report;

        let kinds: Vec<&str> = report.recommendations.iter().map(|r| r.kind.as_str()).collect();
        // Equal savings fall back to label order: delete_unused < move_to_glacier
        assert_eq!(
            kinds,
            vec![
                "Right-Size Instances",
                "Delete Unused Volumes",
                "S3 Storage Optimization",
                "Optimize Lambda Memory"
            ]
        );
        let ids: Vec<usize> = report.recommendations.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert!(report
            .recommendations
            .windows(2)
            .all(|w| w[0].save >= w[1].save));
        assert_eq!(report.services.len(), 4);
    }

    #[test]
    fn test_total_savings_sums_rounded_group_savings() {
        let batch = vec![ec2(10.015, "downsize"), ec2(10.015, "terminate")];
        let report = RecommendationPipeline::new().run(&batch).report;
        let summed: f64 = report.recommendations.iter().map(|r| r.save).sum();
        assert_eq!(report.total_savings, round_to(summed, 2));
    }
}
