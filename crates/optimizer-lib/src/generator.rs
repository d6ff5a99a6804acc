//! Synthetic usage data generation
//!
//! Produces realistic-looking telemetry for the five service categories and
//! labels every row with the [`LabelingPolicy`]. Latent signals (bucket
//! access frequency, volume attachment) drive the labels but are not part of
//! the persisted training schema.

use crate::labeling::LabelingPolicy;
use crate::models::{Label, LatentSignals, ServiceCategory, UsageObservation};
use crate::recommend::round_to;
use anyhow::{anyhow, Result};
use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Distribution, Gamma, Normal, Poisson};

/// Default number of generated rows
pub const DEFAULT_ROWS: usize = 25_000;

/// Default RNG seed
pub const DEFAULT_SEED: u64 = 42;

/// Probability that a generated EBS volume is attached
const ATTACHED_PROBABILITY: f64 = 0.85;

/// Cost noise band applied after labeling
const COST_NOISE: std::ops::Range<f64> = 0.95..1.05;

pub const REGIONS: [&str; 6] = [
    "us-east-1",
    "us-west-2",
    "eu-west-1",
    "eu-central-1",
    "ap-south-1",
    "ap-southeast-1",
];

/// EC2 on-demand hourly rates
const EC2_HOURLY: &[(&str, f64)] = &[
    ("t3.micro", 0.0104),
    ("t3.small", 0.0208),
    ("t3.medium", 0.0416),
    ("t3.large", 0.0832),
    ("t3.xlarge", 0.1664),
    ("t3.2xlarge", 0.3328),
    ("m5.large", 0.096),
    ("m5.xlarge", 0.192),
    ("m5.2xlarge", 0.384),
    ("c5.large", 0.085),
    ("c5.xlarge", 0.17),
];

/// RDS on-demand hourly rates
const RDS_HOURLY: &[(&str, f64)] = &[
    ("db.t3.micro", 0.017),
    ("db.t3.small", 0.034),
    ("db.t3.medium", 0.068),
    ("db.r5.large", 0.24),
    ("db.r5.xlarge", 0.48),
];

/// S3 monthly per-GB rates by storage class
const S3_PER_GB: &[(&str, f64)] = &[
    ("Standard", 0.023),
    ("Intelligent-Tiering", 0.0125),
    ("Glacier", 0.004),
];

const LAMBDA_SIZES: &[(&str, f64)] = &[
    ("128MB", 128.0),
    ("256MB", 256.0),
    ("512MB", 512.0),
    ("1024MB", 1024.0),
];

/// EBS monthly per-GB rates by volume type
const EBS_PER_GB: &[(&str, f64)] = &[
    ("gp2", 0.10),
    ("gp3", 0.08),
    ("io1", 0.125),
    ("io2", 0.125),
];

const LAMBDA_REQUEST_PRICE: f64 = 0.000_000_2;
const LAMBDA_MB_PRICE: f64 = 0.000_000_016_7;

/// Instance vocabulary a service draws from
pub fn instance_types(service: ServiceCategory) -> Vec<&'static str> {
    price_table(service).iter().map(|(name, _)| *name).collect()
}

fn price_table(service: ServiceCategory) -> &'static [(&'static str, f64)] {
    match service {
        ServiceCategory::ComputeInstance => EC2_HOURLY,
        ServiceCategory::ManagedDatabase => RDS_HOURLY,
        ServiceCategory::ObjectStorage => S3_PER_GB,
        ServiceCategory::ServerlessFunction => LAMBDA_SIZES,
        ServiceCategory::BlockStorage => EBS_PER_GB,
    }
}

/// Generator settings
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub rows: usize,
    pub seed: u64,
    /// First day of the sampled date range
    pub start_date: NaiveDate,
    /// Number of days after `start_date` dates are drawn from (inclusive)
    pub date_span_days: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            seed: DEFAULT_SEED,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            date_span_days: 365,
        }
    }
}

/// A generated observation with its ground-truth label
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedRow {
    pub observation: UsageObservation,
    pub label: Label,
}

struct Distributions {
    ec2_cpu: Beta<f64>,
    ec2_mem_noise: Normal<f64>,
    ec2_network: Gamma<f64>,
    ec2_storage: Gamma<f64>,
    rds_util: Beta<f64>,
    rds_network: Gamma<f64>,
    rds_storage: Gamma<f64>,
    s3_storage: Gamma<f64>,
    s3_network: Gamma<f64>,
    s3_access: Poisson<f64>,
    lambda_util: Beta<f64>,
    lambda_invocations: Poisson<f64>,
    lambda_network: Gamma<f64>,
    ebs_storage: Gamma<f64>,
    ebs_network: Gamma<f64>,
}

impl Distributions {
    fn new() -> Result<Self> {
        let beta = |a: f64, b: f64| Beta::new(a, b).map_err(|e| anyhow!("invalid beta({}, {}): {}", a, b, e));
        let gamma =
            |k: f64, theta: f64| Gamma::new(k, theta).map_err(|e| anyhow!("invalid gamma({}, {}): {}", k, theta, e));
        let poisson = |lambda: f64| Poisson::new(lambda).map_err(|e| anyhow!("invalid poisson({}): {}", lambda, e));

        Ok(Self {
            ec2_cpu: beta(2.0, 5.0)?,
            ec2_mem_noise: Normal::new(0.0, 10.0).map_err(|e| anyhow!("invalid normal: {}", e))?,
            ec2_network: gamma(2.0, 50.0)?,
            ec2_storage: gamma(3.0, 30.0)?,
            rds_util: beta(3.0, 4.0)?,
            rds_network: gamma(1.5, 30.0)?,
            rds_storage: gamma(5.0, 100.0)?,
            s3_storage: gamma(4.0, 1000.0)?,
            s3_network: gamma(1.0, 50.0)?,
            s3_access: poisson(100.0)?,
            lambda_util: beta(2.0, 3.0)?,
            lambda_invocations: poisson(10_000.0)?,
            lambda_network: gamma(0.5, 5.0)?,
            ebs_storage: gamma(3.0, 100.0)?,
            ebs_network: gamma(2.0, 20.0)?,
        })
    }
}

/// Seeded generator of labeled usage rows
pub struct SyntheticGenerator {
    config: GeneratorConfig,
    rng: StdRng,
    dists: Distributions,
    policy: LabelingPolicy,
}

impl SyntheticGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            dists: Distributions::new()?,
            policy: LabelingPolicy::new(),
            config,
        })
    }

    /// Generate the configured number of rows
    pub fn generate(&mut self) -> Vec<GeneratedRow> {
        (0..self.config.rows).map(|_| self.next_row()).collect()
    }

    /// Generate a single labeled row
    pub fn next_row(&mut self) -> GeneratedRow {
        let days = self.rng.random_range(0..=self.config.date_span_days);
        let date = self.config.start_date.checked_add_days(Days::new(days));

        let service = *ServiceCategory::ALL
            .choose(&mut self.rng)
            .unwrap_or(&ServiceCategory::ComputeInstance);
        let (instance_type, rate) = *price_table(service)
            .choose(&mut self.rng)
            .unwrap_or(&("unknown", 0.1));
        let region = *REGIONS.choose(&mut self.rng).unwrap_or(&REGIONS[0]);

        let mut obs = UsageObservation::new(service, instance_type, region, 0.0);
        obs.date = date;
        self.fill_metrics(&mut obs, rate);

        let label = self.policy.label(&obs);

        let noise = self.rng.random_range(COST_NOISE);
        obs.cost = round_to(obs.cost * noise, 2);
        obs.cpu_utilization = round_to(obs.cpu_utilization, 2);
        obs.memory_utilization = round_to(obs.memory_utilization, 2);
        obs.network_io = round_to(obs.network_io, 2);
        obs.storage_used = round_to(obs.storage_used, 2);

        GeneratedRow {
            observation: obs,
            label,
        }
    }

    fn fill_metrics(&mut self, obs: &mut UsageObservation, rate: f64) {
        let rng = &mut self.rng;
        let d = &self.dists;

        match obs.service {
            ServiceCategory::ComputeInstance => {
                // Skewed towards low utilization so oversized instances are common
                obs.cpu_utilization = d.ec2_cpu.sample(rng) * 100.0;
                obs.memory_utilization =
                    (obs.cpu_utilization + d.ec2_mem_noise.sample(rng)).clamp(5.0, 95.0);
                obs.running_hours = rng.random_range(100..=730);
                obs.cost = rate * obs.running_hours as f64;
                obs.network_io = d.ec2_network.sample(rng);
                obs.storage_used = d.ec2_storage.sample(rng);
            }
            ServiceCategory::ManagedDatabase => {
                obs.cpu_utilization = d.rds_util.sample(rng) * 100.0;
                obs.memory_utilization = d.rds_util.sample(rng) * 100.0;
                obs.running_hours = rng.random_range(400..=730);
                obs.cost = rate * obs.running_hours as f64;
                obs.network_io = d.rds_network.sample(rng);
                obs.storage_used = d.rds_storage.sample(rng);
            }
            ServiceCategory::ObjectStorage => {
                obs.storage_used = d.s3_storage.sample(rng);
                obs.cost = obs.storage_used * rate;
                obs.running_hours = 730;
                obs.network_io = d.s3_network.sample(rng);
                let accesses: f64 = d.s3_access.sample(rng);
                obs.signals = LatentSignals {
                    access_frequency: Some(accesses as u32),
                    attached: None,
                };
            }
            ServiceCategory::ServerlessFunction => {
                obs.cpu_utilization = d.lambda_util.sample(rng) * 100.0;
                obs.memory_utilization = d.lambda_util.sample(rng) * 100.0;
                let invocations: f64 = d.lambda_invocations.sample(rng);
                // rate holds the allocated memory in MB for functions
                obs.cost = invocations * LAMBDA_REQUEST_PRICE + invocations * rate * LAMBDA_MB_PRICE;
                obs.running_hours = 0;
                obs.network_io = d.lambda_network.sample(rng);
            }
            ServiceCategory::BlockStorage => {
                obs.storage_used = d.ebs_storage.sample(rng);
                obs.cost = obs.storage_used * rate;
                obs.running_hours = 730;
                obs.network_io = d.ebs_network.sample(rng);
                obs.signals = LatentSignals {
                    access_frequency: None,
                    attached: Some(rng.random_bool(ATTACHED_PROBABILITY)),
                };
            }
        }
    }
}
