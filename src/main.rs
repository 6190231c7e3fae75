//! # pg-fdw-backup
//!
//! Command-line entry point. Wires the `psql`/`pg_dump`/`pg_restore` adapter
//! and the local filesystem into the orchestrator and runs one command.

use clap::Parser;
use log::{error, info};
use pg_fdw_backup::application::lifecycle::delete_databases;
use pg_fdw_backup::application::orchestrator::Orchestrator;
use pg_fdw_backup::application::retry::ThreadSleeper;
use pg_fdw_backup::application::seeding::setup_source_databases;
use pg_fdw_backup::application::validation::validate_database_content;
use pg_fdw_backup::config::{AppConfig, CliArgs, Command};
use pg_fdw_backup::domain::errors::Result;
use pg_fdw_backup::domain::workflow::{WorkflowKind, WorkflowRun};
use pg_fdw_backup::infrastructure::local_storage::local_artifact_adapter::LocalArtifactAdapter;
use pg_fdw_backup::infrastructure::postgres::postgres_cli_adapter::PostgresCliAdapter;
use pg_fdw_backup::infrastructure::process::system_command_runner::SystemCommandRunner;
use pg_fdw_backup::ports::database_port::DatabasePort;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

fn main() {
    // 1. Initialize Logging
    env_logger::init();

    // 2. Parse Arguments
    let args = CliArgs::parse();

    // 3. Load Config
    let mut config = match AppConfig::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            process::exit(1);
        }
    };

    // Merge CLI overrides
    config.merge_cli(&args);
    config.fill_missing_passwords(std::env::var("PGPASSWORD").ok().as_deref());

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        process::exit(1);
    }

    // 4. Initialize Hexagonal Components
    let runner = Arc::new(SystemCommandRunner::new());
    let database: Arc<dyn DatabasePort> = Arc::new(PostgresCliAdapter::new(
        runner,
        config.tools.clone(),
        config.admin_database.clone(),
    ));
    let orchestrator = Orchestrator::new(
        database.clone(),
        Arc::new(LocalArtifactAdapter::new()),
        Arc::new(ThreadSleeper),
        config.workflow_options(),
    );
    info!(
        "Restores use {} parallel workers, {} rewrite",
        orchestrator.options().jobs,
        orchestrator.options().rewrite_mode
    );

    // 5. Run Command
    let app = App {
        config: &config,
        database: database.as_ref(),
        orchestrator: &orchestrator,
    };
    let mut runs = Vec::new();
    let result = app.execute(&args.command, &mut runs);

    if let Some(path) = &args.report {
        match serde_json::to_string_pretty(&runs) {
            Ok(json) => match std::fs::write(path, json) {
                Ok(()) => info!("Run summary written to {}", path),
                Err(e) => error!("Failed to write run summary {}: {}", path, e),
            },
            Err(e) => error!("Failed to serialize run summary: {}", e),
        }
    }

    match result {
        Ok(()) => info!("{:?} finished successfully.", args.command),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}

struct App<'a> {
    config: &'a AppConfig,
    database: &'a dyn DatabasePort,
    orchestrator: &'a Orchestrator,
}

impl App<'_> {
    fn execute(&self, command: &Command, runs: &mut Vec<WorkflowRun>) -> Result<()> {
        match command {
            Command::Dump => self.dump(runs),
            Command::Restore => self.restore(runs),
            Command::Validate => self.validate(),
            Command::Cleanup => self.cleanup(),
            Command::Seed { .. } => self.seed(),
            Command::Run { .. } => {
                self.cleanup()?;
                self.seed()?;
                self.dump(runs)?;
                self.restore(runs)?;
                self.validate()
            }
        }
    }

    fn dump_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.dump_dir)
    }

    fn dump(&self, runs: &mut Vec<WorkflowRun>) -> Result<()> {
        let mut run = WorkflowRun::new(WorkflowKind::Dump);
        let result = self
            .orchestrator
            .dump_workflow(&mut run, &self.config.source, &self.dump_dir());
        runs.push(run);
        result
    }

    fn restore(&self, runs: &mut Vec<WorkflowRun>) -> Result<()> {
        let mut run = WorkflowRun::new(WorkflowKind::Restore);
        let result = self.orchestrator.restore_workflow(
            &mut run,
            &self.config.source,
            &self.config.destination,
            &self.dump_dir(),
        );
        runs.push(run);
        result
    }

    fn validate(&self) -> Result<()> {
        let probes = self.config.validation_probes()?;
        validate_database_content(
            self.database,
            &self.config.source,
            &self.config.destination,
            &probes,
        )?;
        info!("Validation passed.");
        Ok(())
    }

    fn cleanup(&self) -> Result<()> {
        let c = self.config;
        // Tenants first: their foreign servers reference the reference databases.
        delete_databases(
            self.database,
            &[
                &c.destination.tenant,
                &c.destination.reference,
                &c.source.tenant,
                &c.source.reference,
            ],
        )
    }

    fn seed(&self) -> Result<()> {
        setup_source_databases(self.database, &self.config.source, self.config.seed_options())
    }
}
