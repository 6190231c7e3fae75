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

//! # Section Restorer
//!
//! Loads one section's artifact into a target database. Plain-text pre-data
//! is replayed through the SQL client; custom-format sections go through the
//! parallel restorer with a configurable worker count.
//!
//! Restores are the expensive half of the workflow, so every invocation runs
//! inside the [`Retrier`]. A missing artifact is not retried.

use crate::application::progress::ProgressMonitor;
use crate::application::retry::Retrier;
use crate::domain::entities::{ConnectionDescriptor, DumpFormat, Section};
use crate::domain::errors::{BackupError, Result};
use crate::ports::artifact_port::ArtifactPort;
use crate::ports::database_port::DatabasePort;
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

pub struct SectionRestorer {
    database: Arc<dyn DatabasePort>,
    artifacts: Arc<dyn ArtifactPort>,
    retrier: Retrier,
    /// Worker count for `pg_restore -j`.
    jobs: usize,
}

impl SectionRestorer {
    pub fn new(
        database: Arc<dyn DatabasePort>,
        artifacts: Arc<dyn ArtifactPort>,
        retrier: Retrier,
        jobs: usize,
    ) -> Self {
        Self {
            database,
            artifacts,
            retrier,
            jobs: jobs.max(1),
        }
    }

    #[cfg(test)]
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Restores `section` from `input` into `target`.
    ///
    /// After a data section, `row_count_probe` (if any) is run and its result
    /// logged. The probe never affects the outcome.
    pub fn restore_section(
        &self,
        target: &ConnectionDescriptor,
        input: &Path,
        section: Section,
        row_count_probe: Option<&str>,
    ) -> Result<()> {
        if !self.artifacts.exists(input) {
            return Err(BackupError::ArtifactError {
                path: input.to_path_buf(),
                reason: "artifact not found".to_string(),
            });
        }

        let file_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| input.display().to_string());
        let mut monitor = ProgressMonitor::new(format!("Restore {}", file_name));
        monitor.update("Starting restore...");
        let start_time = Instant::now();

        self.retrier.run(&format!("restore {}", file_name), || {
            if section.dump_format() == DumpFormat::Custom {
                monitor.update(&format!("Using {} parallel workers", self.jobs));
            }
            self.database.restore_section(target, input, section, self.jobs)?;
            monitor.update("Restore completed successfully");
            Ok(())
        })?;

        let duration = start_time.elapsed();
        match (section, row_count_probe) {
            (Section::Data, Some(probe)) => match self.database.query(target, probe) {
                Ok(count) => info!(
                    "Restore completed in {:?}. Records restored: {}",
                    duration, count
                ),
                Err(e) => warn!(
                    "Restore completed in {:?}. Could not get record count: {}",
                    duration, e
                ),
            },
            _ => info!("Restore completed in {:?}", duration),
        }

        Ok(())
    }
}
