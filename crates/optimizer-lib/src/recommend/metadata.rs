//! Display metadata for each actionable label

use std::collections::HashMap;
use std::sync::OnceLock;

/// Presentation fields attached to a recommendation group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationMetadata {
    pub title: &'static str,
    /// Description template; `{count}` is replaced with the group size
    pub description: &'static str,
    pub action: &'static str,
    pub icon: &'static str,
}

impl RecommendationMetadata {
    pub fn describe(&self, count: usize) -> String {
        self.description.replace("{count}", &count.to_string())
    }
}

/// Immutable label to metadata lookup
#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    entries: HashMap<&'static str, RecommendationMetadata>,
}

static STANDARD_TABLE: OnceLock<MetadataTable> = OnceLock::new();

const STANDARD_ENTRIES: &[(&str, RecommendationMetadata)] = &[
    (
        "downsize",
        RecommendationMetadata {
            title: "Right-Size Instances",
            description: "{count} oversized instances detected",
            action: "Downsize to appropriate instance types",
            icon: "Server",
        },
    ),
    (
        "terminate",
        RecommendationMetadata {
            title: "Terminate Unused Resources",
            description: "{count} barely-used resources found",
            action: "Shut down or delete unused resources",
            icon: "Server",
        },
    ),
    (
        "reserved_instance",
        RecommendationMetadata {
            title: "Reserved Instances",
            description: "{count} stable workloads on on-demand pricing",
            action: "Purchase Reserved Instances",
            icon: "DollarSign",
        },
    ),
    (
        "move_to_glacier",
        RecommendationMetadata {
            title: "S3 Storage Optimization",
            description: "{count} infrequently accessed S3 buckets",
            action: "Move to Glacier storage class",
            icon: "Database",
        },
    ),
    (
        "intelligent_tiering",
        RecommendationMetadata {
            title: "S3 Intelligent Tiering",
            description: "{count} S3 buckets with variable access",
            action: "Enable Intelligent-Tiering",
            icon: "Database",
        },
    ),
    (
        "delete_unused",
        RecommendationMetadata {
            title: "Delete Unused Volumes",
            description: "{count} unattached EBS volumes",
            action: "Delete after backup verification",
            icon: "HardDrive",
        },
    ),
    (
        "downgrade_to_gp3",
        RecommendationMetadata {
            title: "Optimize EBS Storage",
            description: "{count} expensive storage types detected",
            action: "Downgrade to gp3 volumes",
            icon: "HardDrive",
        },
    ),
    (
        "upsize",
        RecommendationMetadata {
            title: "Upsize Instances",
            description: "{count} undersized instances detected",
            action: "Upgrade to higher instance types",
            icon: "Server",
        },
    ),
    (
        "reduce_memory",
        RecommendationMetadata {
            title: "Optimize Lambda Memory",
            description: "{count} Lambda functions with excess memory",
            action: "Reduce memory allocation",
            icon: "Zap",
        },
    ),
];

impl MetadataTable {
    pub fn new(entries: impl IntoIterator<Item = (&'static str, RecommendationMetadata)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Table covering every actionable label, built once per process
    pub fn standard() -> &'static MetadataTable {
        STANDARD_TABLE.get_or_init(|| MetadataTable::new(STANDARD_ENTRIES.iter().cloned()))
    }

    pub fn lookup(&self, label: &str) -> Option<&RecommendationMetadata> {
        self.entries.get(label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Label;

    #[test]
    fn test_standard_table_covers_actionable_labels() {
        let table = MetadataTable::standard();
        for label in Label::ALL.iter().filter(|l| l.is_actionable()) {
            assert!(table.lookup(label.as_str()).is_some(), "no metadata for {}", label);
        }
        assert!(table.lookup("optimal").is_none());
        assert_eq!(table.len(), 9);
    }

    #[test]
    fn test_describe_fills_count() {
        let meta = MetadataTable::standard().lookup("delete_unused").unwrap();
        assert_eq!(meta.describe(4), "4 unattached EBS volumes");
        assert_eq!(meta.icon, "HardDrive");
    }
}
