use crate::application::orchestrator::WorkflowOptions;
use crate::application::retry::RetryPolicy;
use crate::application::seeding::SeedOptions;
use crate::application::validation::ValidationProbes;
use crate::domain::entities::{ConnectionDescriptor, DatabasePair};
use crate::domain::errors::{BackupError, Result};
use crate::domain::foreign_link::RewriteMode;
use crate::infrastructure::postgres::postgres_cli_adapter::PgTools;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub source: DatabasePair,
    pub destination: DatabasePair,
    #[serde(default = "default_dump_dir")]
    pub dump_dir: String,
    #[serde(default = "default_admin_database")]
    pub admin_database: String,
    #[serde(default)]
    pub restore: RestoreConfig,
    #[serde(default)]
    pub probes: ProbeConfig,
    #[serde(default)]
    pub seed: SeedConfig,
    #[serde(default)]
    pub tools: PgTools,
}

fn default_dump_dir() -> String {
    "./dump".to_string()
}

fn default_admin_database() -> String {
    "postgres".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RestoreConfig {
    pub parallel_jobs: Option<usize>,
    pub max_attempts: Option<u32>,
    pub backoff_unit_ms: Option<u64>,
    pub rewrite_mode: Option<RewriteMode>,
}

/// Queries used for logging and validation. An explicit `null` disables one.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProbeConfig {
    pub reference: Option<String>,
    pub tenant: Option<String>,
    pub foreign_link: Option<String>,
    pub reference_local: Option<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            reference: Some("SELECT COUNT(*) FROM companies;".to_string()),
            tenant: Some("SELECT COUNT(*) FROM customer_transactions;".to_string()),
            foreign_link: Some(
                "SELECT name, rating FROM companies_foreign ORDER BY id;".to_string(),
            ),
            reference_local: Some("SELECT name, rating FROM companies ORDER BY id;".to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SeedConfig {
    pub rows: u64,
    pub batch_size: u64,
}

impl Default for SeedConfig {
    fn default() -> Self {
        let defaults = SeedOptions::default();
        Self {
            rows: defaults.rows,
            batch_size: defaults.batch_size,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long, global = true, default_value = "config.yaml")]
    pub config: String,

    // Overrides for ad-hoc runs
    #[arg(long, global = true)]
    pub dump_dir: Option<String>,
    /// Parallel restore workers
    #[arg(short, long, global = true)]
    pub jobs: Option<usize>,
    /// literal | option_aware
    #[arg(long, global = true)]
    pub rewrite_mode: Option<RewriteMode>,

    /// Write a JSON summary of the dump/restore runs to this path
    #[arg(long, global = true)]
    pub report: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Dump both source databases, section by section
    Dump,
    /// Restore the dump into the destination databases
    Restore,
    /// Compare the destination with the source
    Validate,
    /// Drop source and destination databases
    Cleanup,
    /// Create and populate the source databases
    Seed {
        #[arg(long)]
        rows: Option<u64>,
    },
    /// cleanup, seed, dump, restore, validate
    Run {
        #[arg(long)]
        rows: Option<u64>,
    },
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| BackupError::ConfigError(format!("cannot open {}: {}", path, e)))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: AppConfig = if path.ends_with(".json") {
            serde_json::from_str(&contents)
                .map_err(|e| BackupError::ConfigError(format!("{}: {}", path, e)))?
        } else {
            serde_yaml::from_str(&contents)
                .map_err(|e| BackupError::ConfigError(format!("{}: {}", path, e)))?
        };

        Ok(config)
    }

    pub fn merge_cli(&mut self, args: &CliArgs) {
        if let Some(d) = &args.dump_dir {
            self.dump_dir = d.clone();
        }
        if let Some(j) = args.jobs {
            self.restore.parallel_jobs = Some(j);
        }
        if let Some(m) = args.rewrite_mode {
            self.restore.rewrite_mode = Some(m);
        }
        match &args.command {
            Command::Seed { rows: Some(r) } | Command::Run { rows: Some(r) } => {
                self.seed.rows = *r;
            }
            _ => {}
        }
    }

    /// Descriptors without a password take `env_password` (normally `PGPASSWORD`).
    pub fn fill_missing_passwords(&mut self, env_password: Option<&str>) {
        let Some(password) = env_password else { return };
        for descriptor in [
            &mut self.source.reference,
            &mut self.source.tenant,
            &mut self.destination.reference,
            &mut self.destination.tenant,
        ] {
            if descriptor.password.is_none() {
                descriptor.password = Some(password.to_string());
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let labelled = [
            ("source.reference", &self.source.reference),
            ("source.tenant", &self.source.tenant),
            ("destination.reference", &self.destination.reference),
            ("destination.tenant", &self.destination.tenant),
        ];
        for (label, d) in labelled {
            if d.host.trim().is_empty() {
                return Err(BackupError::ConfigError(format!(
                    "{}.host must not be empty",
                    label
                )));
            }
            if d.dbname.trim().is_empty() {
                return Err(BackupError::ConfigError(format!(
                    "{}.dbname must not be empty",
                    label
                )));
            }
        }

        for (label, src, dest) in [
            ("reference", &self.source.reference, &self.destination.reference),
            ("tenant", &self.source.tenant, &self.destination.tenant),
        ] {
            if same_database(src, dest) {
                return Err(BackupError::ConfigError(format!(
                    "destination {} is the source database {}",
                    label, src
                )));
            }
        }

        if self.restore.max_attempts == Some(0) {
            return Err(BackupError::ConfigError(
                "restore.max_attempts must be at least 1".into(),
            ));
        }
        if self.dump_dir.trim().is_empty() {
            return Err(BackupError::ConfigError("dump_dir must not be empty".into()));
        }
        Ok(())
    }

    pub fn workflow_options(&self) -> WorkflowOptions {
        let defaults = WorkflowOptions::default();
        let retry_defaults = RetryPolicy::default();
        WorkflowOptions {
            jobs: self.restore.parallel_jobs.unwrap_or(defaults.jobs),
            retry: RetryPolicy {
                max_attempts: self.restore.max_attempts.unwrap_or(retry_defaults.max_attempts),
                backoff_unit: self
                    .restore
                    .backoff_unit_ms
                    .map(Duration::from_millis)
                    .unwrap_or(retry_defaults.backoff_unit),
            },
            rewrite_mode: self.restore.rewrite_mode.unwrap_or_default(),
            reference_row_probe: self.probes.reference.clone(),
            tenant_row_probe: self.probes.tenant.clone(),
        }
    }

    pub fn validation_probes(&self) -> Result<ValidationProbes> {
        let tenant_row_count = self.probes.tenant.clone().ok_or_else(|| {
            BackupError::ConfigError("probes.tenant is required for validation".into())
        })?;
        Ok(ValidationProbes {
            tenant_row_count,
            foreign_link: self.probes.foreign_link.clone(),
            reference_local: self.probes.reference_local.clone(),
        })
    }

    pub fn seed_options(&self) -> SeedOptions {
        SeedOptions {
            rows: self.seed.rows,
            batch_size: self.seed.batch_size,
        }
    }
}

fn same_database(a: &ConnectionDescriptor, b: &ConnectionDescriptor) -> bool {
    a.host == b.host && a.port == b.port && a.dbname == b.dbname
}
