// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The core application logic that sequences the full backup and the full
//! restore of a reference/tenant pair.
//!
//! Steps run strictly one after another. Ordering is the whole point:
//! - the reference database is restored completely before anything of the
//!   tenant, because the tenant's pre-data defines a foreign server pointing
//!   at it;
//! - the tenant's pre-data artifact is repointed to the destination
//!   reference before it is replayed.
//!
//! The first failing step aborts the workflow. Nothing is rolled back.

use crate::application::foreign_link::rewrite_foreign_link_config;
use crate::application::retry::{Retrier, RetryPolicy, Sleeper};
use crate::application::section_dumper::SectionDumper;
use crate::application::section_restorer::SectionRestorer;
use crate::domain::entities::{
    artifact_path, artifact_stem, ConnectionDescriptor, DatabasePair, DatabaseRole, Section,
};
use crate::domain::errors::Result;
use crate::domain::foreign_link::RewriteMode;
use crate::domain::workflow::{StepId, WorkflowRun};
use crate::ports::artifact_port::ArtifactPort;
use crate::ports::database_port::DatabasePort;
use log::info;
use std::path::Path;
use std::sync::Arc;

/// Knobs of the restore side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOptions {
    /// Worker count for parallel-capable restores.
    pub jobs: usize,
    pub retry: RetryPolicy,
    pub rewrite_mode: RewriteMode,
    /// Logged after the reference data section is restored.
    pub reference_row_probe: Option<String>,
    /// Logged after the tenant data section is restored.
    pub tenant_row_probe: Option<String>,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            jobs: num_cpus::get(),
            retry: RetryPolicy::default(),
            rewrite_mode: RewriteMode::default(),
            reference_row_probe: None,
            tenant_row_probe: None,
        }
    }
}

/// Orchestrates dump and restore of a reference/tenant pair.
pub struct Orchestrator {
    database: Arc<dyn DatabasePort>,
    artifacts: Arc<dyn ArtifactPort>,
    dumper: SectionDumper,
    restorer: SectionRestorer,
    options: WorkflowOptions,
}

impl Orchestrator {
    /// Creates a new Orchestrator with the provided components.
    pub fn new(
        database: Arc<dyn DatabasePort>,
        artifacts: Arc<dyn ArtifactPort>,
        sleeper: Arc<dyn Sleeper>,
        options: WorkflowOptions,
    ) -> Self {
        let retrier = Retrier::new(options.retry, sleeper);
        Self {
            dumper: SectionDumper::new(database.clone()),
            restorer: SectionRestorer::new(
                database.clone(),
                artifacts.clone(),
                retrier,
                options.jobs,
            ),
            database,
            artifacts,
            options,
        }
    }

    pub fn options(&self) -> &WorkflowOptions {
        &self.options
    }

    /// Dumps all three sections of both databases into `output_dir`.
    ///
    /// The reference goes first, then the tenant; within each database the
    /// sections go pre-data, data, post-data. Artifacts already written stay
    /// on disk if a later section fails.
    pub fn dump_workflow(
        &self,
        run: &mut WorkflowRun,
        source: &DatabasePair,
        output_dir: &Path,
    ) -> Result<()> {
        self.artifacts
            .ensure_dir(output_dir)
            .map_err(|e| e.in_step("create output directory"))?;

        for role in DatabaseRole::ALL {
            let descriptor = source.get(role);
            for section in Section::ALL {
                let stem = artifact_stem(output_dir, role, section);
                run.step(StepId::dump(role, section), || {
                    self.dumper.dump_section(descriptor, &stem, section)
                })?;
            }
        }

        info!(
            "Dump of {} and {} completed in {:.1}s",
            source.reference.dbname,
            source.tenant.dbname,
            run.elapsed_secs()
        );
        Ok(())
    }

    /// Restores the artifacts in `input_dir` into the `destination` pair.
    ///
    /// 1. create the destination reference, then the destination tenant;
    /// 2. restore the reference's three sections;
    /// 3. repoint the tenant pre-data from `source.reference` to
    ///    `destination.reference`, in place;
    /// 4. restore the tenant's three sections.
    pub fn restore_workflow(
        &self,
        run: &mut WorkflowRun,
        source: &DatabasePair,
        destination: &DatabasePair,
        input_dir: &Path,
    ) -> Result<()> {
        info!(
            "Restoring {} -> {} and {} -> {} from {}",
            source.reference.dbname,
            destination.reference.dbname,
            source.tenant.dbname,
            destination.tenant.dbname,
            input_dir.display()
        );

        for role in DatabaseRole::ALL {
            run.step(StepId::create(role), || {
                self.database.create_database(destination.get(role))
            })?;
        }

        self.restore_database(run, DatabaseRole::Reference, &destination.reference, input_dir)?;

        let tenant_pre_data = artifact_path(input_dir, DatabaseRole::Tenant, Section::PreData);
        run.step(StepId::rewrite(DatabaseRole::Tenant), || {
            rewrite_foreign_link_config(
                self.artifacts.as_ref(),
                &tenant_pre_data,
                &source.reference,
                &destination.reference,
                self.options.rewrite_mode,
            )
        })?;

        self.restore_database(run, DatabaseRole::Tenant, &destination.tenant, input_dir)?;

        info!(
            "Restore into {} and {} completed in {:.1}s",
            destination.reference.dbname,
            destination.tenant.dbname,
            run.elapsed_secs()
        );
        Ok(())
    }

    fn restore_database(
        &self,
        run: &mut WorkflowRun,
        role: DatabaseRole,
        target: &ConnectionDescriptor,
        input_dir: &Path,
    ) -> Result<()> {
        let probe = match role {
            DatabaseRole::Reference => self.options.reference_row_probe.as_deref(),
            DatabaseRole::Tenant => self.options.tenant_row_probe.as_deref(),
        };

        for section in Section::ALL {
            let input = artifact_path(input_dir, role, section);
            run.step(StepId::restore(role, section), || {
                self.restorer.restore_section(target, &input, section, probe)
            })?;
        }
        Ok(())
    }
}
