//! Rule-based labeling policy
//!
//! Maps one usage observation to exactly one recommendation label. This is
//! the ground truth the classifier is trained on, so it defines the decision
//! boundaries the model has to learn.

mod rules;

pub use rules::{Rule, PROVISIONED_IOPS_TIERS, STANDARD_TIER};

use crate::models::{Label, ServiceCategory, UsageObservation};

/// Outcome of evaluating the policy against one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub label: Label,
    /// Name of the rule that fired, `None` when the observation is optimal
    pub rule: Option<&'static str>,
}

/// Deterministic, total labeling policy
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelingPolicy;

impl LabelingPolicy {
    pub fn new() -> Self {
        Self
    }

    /// Ordered rule table for a service category
    pub fn rules_for(service: ServiceCategory) -> &'static [Rule] {
        match service {
            ServiceCategory::ComputeInstance => rules::COMPUTE_RULES,
            ServiceCategory::ManagedDatabase => rules::DATABASE_RULES,
            ServiceCategory::ObjectStorage => rules::OBJECT_STORAGE_RULES,
            ServiceCategory::ServerlessFunction => rules::FUNCTION_RULES,
            ServiceCategory::BlockStorage => rules::BLOCK_STORAGE_RULES,
        }
    }

    /// Evaluate rules in priority order; first match wins
    pub fn evaluate(&self, observation: &UsageObservation) -> Decision {
        Self::rules_for(observation.service)
            .iter()
            .find(|rule| (rule.matches)(observation))
            .map(|rule| Decision {
                label: rule.label,
                rule: Some(rule.name),
            })
            .unwrap_or(Decision {
                label: Label::Optimal,
                rule: None,
            })
    }

    pub fn label(&self, observation: &UsageObservation) -> Label {
        self.evaluate(observation).label
    }

    /// Labels a service category can ever receive
    pub fn labels_for(service: ServiceCategory) -> Vec<Label> {
        let mut labels: Vec<Label> = Self::rules_for(service).iter().map(|r| r.label).collect();
        labels.push(Label::Optimal);
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LatentSignals;

    fn compute(cpu: f64, mem: f64, cost: f64, hours: u32) -> UsageObservation {
        let mut o = UsageObservation::new(ServiceCategory::ComputeInstance, "m5.large", "us-east-1", cost);
        o.cpu_utilization = cpu;
        o.memory_utilization = mem;
        o.running_hours = hours;
        o
    }

    fn volume(tier: &str, network_io: f64, attached: Option<bool>) -> UsageObservation {
        let mut o = UsageObservation::new(ServiceCategory::BlockStorage, tier, "eu-west-1", 30.0);
        o.network_io = network_io;
        o.storage_used = 300.0;
        o.running_hours = 730;
        o.signals = LatentSignals {
            access_frequency: None,
            attached,
        };
        o
    }

    #[test]
    fn test_compute_low_cpu_high_cost_is_downsize_regardless_of_other_fields() {
        let policy = LabelingPolicy::new();
        for (mem, hours) in [(5.0, 700), (95.0, 50), (50.0, 0)] {
            assert_eq!(policy.label(&compute(29.9, mem, 50.01, hours)), Label::Downsize);
        }
    }

    #[test]
    fn test_compute_rule_priority() {
        let policy = LabelingPolicy::new();
        // Matches both downsize and terminate; downsize is listed first
        let decision = policy.evaluate(&compute(10.0, 10.0, 80.0, 150));
        assert_eq!(decision.label, Label::Downsize);
        assert_eq!(decision.rule, Some("underutilized_and_costly"));

        // Matches both upsize and terminate; upsize is listed first
        assert_eq!(policy.label(&compute(90.0, 90.0, 10.0, 150)), Label::Upsize);

        assert_eq!(policy.label(&compute(50.0, 50.0, 10.0, 150)), Label::Terminate);
    }

    #[test]
    fn test_compute_end_to_end_rows() {
        let policy = LabelingPolicy::new();
        let labels: Vec<Label> = [(60.0, 10.0), (40.0, 90.0), (200.0, 50.0)]
            .into_iter()
            .map(|(cost, util)| policy.label(&compute(util, util, cost, 700)))
            .collect();
        assert_eq!(labels, vec![Label::Downsize, Label::Upsize, Label::Optimal]);
    }

    #[test]
    fn test_compute_thresholds_are_strict() {
        let policy = LabelingPolicy::new();
        assert_eq!(policy.label(&compute(30.0, 50.0, 500.0, 700)), Label::Optimal);
        assert_eq!(policy.label(&compute(10.0, 50.0, 50.0, 700)), Label::Optimal);
        assert_eq!(policy.label(&compute(80.0, 95.0, 10.0, 700)), Label::Optimal);
        assert_eq!(policy.label(&compute(50.0, 50.0, 10.0, 200)), Label::Optimal);
    }

    #[test]
    fn test_database_rules() {
        let policy = LabelingPolicy::new();
        let mut db = UsageObservation::new(ServiceCategory::ManagedDatabase, "db.r5.xlarge", "us-west-2", 300.0);
        db.cpu_utilization = 20.0;
        db.running_hours = 700;
        // Both rules hold; downsize wins
        assert_eq!(policy.label(&db), Label::Downsize);

        db.cpu_utilization = 40.0;
        assert_eq!(policy.label(&db), Label::ReservedInstance);

        db.running_hours = 500;
        assert_eq!(policy.label(&db), Label::Optimal);
    }

    #[test]
    fn test_object_storage_rules() {
        let policy = LabelingPolicy::new();
        let mut bucket = UsageObservation::new(ServiceCategory::ObjectStorage, "Standard", "us-east-1", 150.0);
        bucket.storage_used = 6000.0;
        bucket.running_hours = 730;
        bucket.signals.access_frequency = Some(20);
        assert_eq!(policy.label(&bucket), Label::MoveToGlacier);

        bucket.signals.access_frequency = Some(120);
        assert_eq!(policy.label(&bucket), Label::IntelligentTiering);

        // Without the access signal the glacier rule cannot fire
        bucket.signals.access_frequency = None;
        assert_eq!(policy.label(&bucket), Label::IntelligentTiering);

        bucket.instance_type = "Glacier".into();
        assert_eq!(policy.label(&bucket), Label::Optimal);
    }

    #[test]
    fn test_serverless_rules() {
        let policy = LabelingPolicy::new();
        let mut function = UsageObservation::new(ServiceCategory::ServerlessFunction, "1024MB", "ap-south-1", 0.2);
        function.memory_utilization = 35.0;
        assert_eq!(policy.label(&function), Label::ReduceMemory);

        function.instance_type = "512MB".into();
        assert_eq!(policy.label(&function), Label::Optimal);
    }

    #[test]
    fn test_unattached_volume_beats_gp3_downgrade() {
        let policy = LabelingPolicy::new();
        assert_eq!(policy.label(&volume("io1", 10.0, Some(false))), Label::DeleteUnused);
        assert_eq!(policy.label(&volume("gp2", 500.0, Some(false))), Label::DeleteUnused);
        assert_eq!(policy.label(&volume("io2", 10.0, Some(true))), Label::DowngradeToGp3);
        assert_eq!(policy.label(&volume("io2", 10.0, None)), Label::DowngradeToGp3);
        assert_eq!(policy.label(&volume("gp3", 10.0, None)), Label::Optimal);
    }

    #[test]
    fn test_labels_for_lists_reachable_labels() {
        assert_eq!(
            LabelingPolicy::labels_for(ServiceCategory::ServerlessFunction),
            vec![Label::ReduceMemory, Label::Optimal]
        );
        assert_eq!(LabelingPolicy::labels_for(ServiceCategory::ComputeInstance).len(), 4);
    }
}
