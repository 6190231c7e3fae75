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

//! Core error definitions for the backup/restore workflows.
//!
//! This module provides a centralized `BackupError` enum and a `Result` type
//! used throughout the application to handle process, filesystem, validation
//! and configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Error types encountered while dumping, rewriting or restoring databases.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An external program exited with a non-zero status.
    #[error("{program} exited with {status}\nOutput: {output}")]
    ProcessError {
        program: String,
        status: String,
        output: String,
    },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Artifact {path:?} unusable: {reason}")]
    ArtifactError { path: PathBuf, reason: String },

    /// Post-restore validation found differing probe results.
    #[error("content mismatch for `{probe}`: source has {source_value}, destination has {destination_value}")]
    ContentMismatch {
        probe: String,
        source_value: String,
        destination_value: String,
    },

    #[error("operation {operation} failed after {attempts} attempts: {source}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<BackupError>,
    },

    /// Wraps the failure of one workflow step with the step's name.
    #[error("failed to {step}: {source}")]
    Step {
        step: String,
        #[source]
        source: Box<BackupError>,
    },
}

impl BackupError {
    /// Wraps `self` with the name of the workflow step that produced it.
    pub fn in_step(self, step: impl Into<String>) -> Self {
        BackupError::Step {
            step: step.into(),
            source: Box::new(self),
        }
    }

    /// Returns the name of the outermost failing step, if any.
    pub fn step(&self) -> Option<&str> {
        match self {
            BackupError::Step { step, .. } => Some(step),
            _ => None,
        }
    }
}

/// A specialized Result type for the backup tool.
pub type Result<T> = std::result::Result<T, BackupError>;
