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

//! # Workflow Run
//!
//! The in-memory record of one dump or restore: which (role, section) steps
//! ran, in what order, how long each took and how it ended.
//!
//! A run is never persisted and never resumed. If a step fails, the run
//! stops there and the caller starts over from scratch. The record exists so
//! the caller can report what happened.

use crate::domain::entities::{DatabaseRole, Section};
use crate::domain::errors::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Instant;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowKind {
    Dump,
    Restore,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    CreateDatabase,
    Dump,
    RewriteForeignLink,
    Restore,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Succeeded,
    Failed,
}

/// Identifies a step: what is done, to which database, for which section.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StepId {
    pub action: StepAction,
    pub role: DatabaseRole,
    pub section: Option<Section>,
}

impl StepId {
    pub fn create(role: DatabaseRole) -> Self {
        Self {
            action: StepAction::CreateDatabase,
            role,
            section: None,
        }
    }

    pub fn dump(role: DatabaseRole, section: Section) -> Self {
        Self {
            action: StepAction::Dump,
            role,
            section: Some(section),
        }
    }

    pub fn rewrite(role: DatabaseRole) -> Self {
        Self {
            action: StepAction::RewriteForeignLink,
            role,
            section: Some(Section::PreData),
        }
    }

    pub fn restore(role: DatabaseRole, section: Section) -> Self {
        Self {
            action: StepAction::Restore,
            role,
            section: Some(section),
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let section = self.section.map(|s| s.as_str()).unwrap_or_default();
        match self.action {
            StepAction::CreateDatabase => write!(f, "create {} database", self.role),
            StepAction::Dump => write!(f, "dump {} {}", self.role, section),
            StepAction::RewriteForeignLink => {
                write!(f, "rewrite {} {} foreign link", self.role, section)
            }
            StepAction::Restore => write!(f, "restore {} {}", self.role, section),
        }
    }
}

/// One finished step.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    #[serde(flatten)]
    pub id: StepId,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRun {
    pub kind: WorkflowKind,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<StepRecord>,
    #[serde(skip)]
    clock: Instant,
}

impl WorkflowRun {
    pub fn new(kind: WorkflowKind) -> Self {
        Self {
            kind,
            started_at: Utc::now(),
            steps: Vec::new(),
            clock: Instant::now(),
        }
    }

    /// Runs one step, records its outcome and, on failure, wraps the error
    /// with the step's name.
    pub fn step<T, F>(&mut self, id: StepId, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let started_at = Utc::now();
        let started = Instant::now();
        let outcome = f();
        let duration_secs = started.elapsed().as_secs_f64();

        match outcome {
            Ok(value) => {
                self.steps.push(StepRecord {
                    id,
                    status: StepStatus::Succeeded,
                    started_at,
                    duration_secs,
                    error: None,
                });
                Ok(value)
            }
            Err(e) => {
                self.steps.push(StepRecord {
                    id,
                    status: StepStatus::Failed,
                    started_at,
                    duration_secs,
                    error: Some(e.to_string()),
                });
                Err(e.in_step(id.to_string()))
            }
        }
    }

    /// Step identifiers in the order they ran.
    pub fn step_ids(&self) -> Vec<StepId> {
        self.steps.iter().map(|s| s.id).collect()
    }

    pub fn failed_step(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }

    pub fn succeeded(&self) -> bool {
        self.failed_step().is_none()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.clock.elapsed().as_secs_f64()
    }
}
