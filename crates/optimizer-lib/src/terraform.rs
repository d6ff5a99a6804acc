//! Terraform script rendering
//!
//! Template-driven text output, one block per recommendation. The generated
//! configuration is a starting point for review and is not validated.

use crate::recommend::{round_to, Recommendation};
use std::fmt::Write;

/// Template family selected for a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    RightSize,
    ReservedInstance,
    GlacierLifecycle,
    IntelligentTiering,
    Gp3Volume,
    LambdaMemory,
    SnapshotAndRemove,
    ManualReview,
}

impl TemplateKind {
    /// Match on the recommendation title, then its action text
    pub fn classify(recommendation: &Recommendation) -> Self {
        let haystack = format!("{} {}", recommendation.kind, recommendation.action);
        let has = |needle: &str| haystack.contains(needle);

        if has("Right-Size") || has("Downsize") {
            TemplateKind::RightSize
        } else if has("Reserved Instance") {
            TemplateKind::ReservedInstance
        } else if has("S3") && has("Glacier") {
            TemplateKind::GlacierLifecycle
        } else if has("Intelligent") && has("Tiering") {
            TemplateKind::IntelligentTiering
        } else if has("EBS") || has("gp3") {
            TemplateKind::Gp3Volume
        } else if has("Lambda") {
            TemplateKind::LambdaMemory
        } else if has("Terminate") || has("Unused") || has("Delete") {
            TemplateKind::SnapshotAndRemove
        } else {
            TemplateKind::ManualReview
        }
    }
}

const HEADER: &str = r#"# Generated by the cost optimizer. Review before applying.

terraform {
  required_providers {
    aws = {
      source  = "hashicorp/aws"
      version = "~> 5.0"
    }
  }
}

variable "aws_region" {
  description = "AWS region to apply the changes in"
  type        = string
  default     = "us-east-1"
}

provider "aws" {
  region = var.aws_region
}
"#;

/// Render a Terraform script for the given recommendations.
///
/// Templates are chosen from the recommendation `type` followed by its
/// `action` text, not `type` alone, so an action such as "Move to Glacier"
/// selects the lifecycle block for an "S3 Storage Optimization" type.
pub fn render(recommendations: &[Recommendation]) -> String {
    let mut out = String::from(HEADER);

    for rec in recommendations {
        out.push('\n');
        // Writing into a String cannot fail
        let _ = writeln!(out, "# [{}] {}: {}", rec.id, rec.kind, rec.desc);
        let _ = writeln!(out, "# Action: {}", rec.action);
        out.push_str(&render_block(TemplateKind::classify(rec), rec));
    }

    let monthly = round_to(recommendations.iter().fold(0.0, |acc, r| acc + r.save), 2);
    out.push('\n');
    let _ = writeln!(out, "# ---------------------------------------------");
    let _ = writeln!(out, "# Summary");
    let _ = writeln!(out, "# Recommendations: {}", recommendations.len());
    let _ = writeln!(out, "# Estimated monthly savings: ${:.2}", monthly);
    let _ = writeln!(out, "# Estimated annual savings: ${:.2}", round_to(monthly * 12.0, 2));
    let _ = writeln!(out, "# ---------------------------------------------");
    out
}

fn render_block(kind: TemplateKind, rec: &Recommendation) -> String {
    let id = rec.id;
    match kind {
        TemplateKind::RightSize => format!(
            r#"resource "aws_instance" "rightsized_{id}" {{
  # Apply to the {count} flagged instance(s); pick a smaller size from the same family
  instance_type = "t3.medium"

  lifecycle {{
    create_before_destroy = true
  }}

  tags = {{
    CostOptimization = "right-size"
  }}
}}
"#,
            id = id,
            count = rec.count
        ),
        TemplateKind::ReservedInstance => format!(
            r#"resource "aws_rds_reserved_instance" "reserved_{id}" {{
  offering_id    = "REPLACE_WITH_OFFERING_ID"
  instance_count = {count}
  reservation_id = "cost-optimizer-{id}"
}}
"#,
            id = id,
            count = rec.count
        ),
        TemplateKind::GlacierLifecycle => format!(
            r#"resource "aws_s3_bucket_lifecycle_configuration" "glacier_{id}" {{
  bucket = "REPLACE_WITH_BUCKET_NAME"

  rule {{
    id     = "move-to-glacier"
    status = "Enabled"

    filter {{}}

    transition {{
      days          = 30
      storage_class = "GLACIER"
    }}
  }}
}}
"#,
            id = id
        ),
        TemplateKind::IntelligentTiering => format!(
            r#"resource "aws_s3_bucket_intelligent_tiering_configuration" "tiering_{id}" {{
  bucket = "REPLACE_WITH_BUCKET_NAME"
  name   = "EntireBucket"

  tiering {{
    access_tier = "ARCHIVE_ACCESS"
    days        = 90
  }}

  tiering {{
    access_tier = "DEEP_ARCHIVE_ACCESS"
    days        = 180
  }}
}}
"#,
            id = id
        ),
        TemplateKind::Gp3Volume => format!(
            r#"resource "aws_ebs_volume" "gp3_{id}" {{
  availability_zone = "${{var.aws_region}}a"
  size              = 100
  type              = "gp3"
  iops              = 3000
  throughput        = 125

  tags = {{
    CostOptimization = "gp3-migration"
  }}
}}
"#,
            id = id
        ),
        TemplateKind::LambdaMemory => format!(
            r#"resource "aws_lambda_function" "right_sized_{id}" {{
  function_name = "REPLACE_WITH_FUNCTION_NAME"
  role          = "REPLACE_WITH_ROLE_ARN"
  handler       = "index.handler"
  runtime       = "nodejs20.x"
  filename      = "function.zip"

  # Reduced from the over-provisioned allocation
  memory_size = 512
}}
"#,
            id = id
        ),
        TemplateKind::SnapshotAndRemove => format!(
            r#"resource "aws_ebs_snapshot" "pre_delete_{id}" {{
  volume_id   = "REPLACE_WITH_VOLUME_ID"
  description = "Backup before removing unused resource"
}}

# After verifying the snapshot, remove the {count} resource(s) from state:
#   terraform state rm <resource_address>
# then delete them with `terraform destroy -target=<resource_address>`.
"#,
            id = id,
            count = rec.count
        ),
        TemplateKind::ManualReview => format!(
            "# No template for \"{}\" ({} resource(s)); review manually.\n",
            rec.kind, rec.count
        ),
    }
}
