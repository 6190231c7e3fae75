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

//! # Database Port
//!
//! In Hexagonal Architecture, a **Port** is like a "Slot" or a "Contract".
//!
//! This Port defines what the workflows need from a database server: create
//! and drop databases, dump one section, restore one section, and run an
//! ad-hoc statement. The orchestrator never knows whether the other side is
//! `psql`/`pg_dump`/`pg_restore` or a mock used by the tests.

use crate::domain::entities::{ConnectionDescriptor, Section};
use crate::domain::errors::Result;
use std::path::Path;

/// `DatabasePort` is shared between the workflow steps, hence `Send + Sync`.
///
/// Each method is exactly one external invocation; retries are layered on
/// top by the application.
pub trait DatabasePort: Send + Sync {
    /// Runs `CREATE DATABASE` against the endpoint's administrative database.
    /// Fails if the database already exists.
    fn create_database(&self, target: &ConnectionDescriptor) -> Result<()>;

    /// Runs `DROP DATABASE IF EXISTS`; a missing database is not an error.
    fn drop_database(&self, target: &ConnectionDescriptor) -> Result<()>;

    /// Writes exactly one section of `source` to `output`, in the format the
    /// section dictates.
    fn dump_section(
        &self,
        source: &ConnectionDescriptor,
        output: &Path,
        section: Section,
    ) -> Result<()>;

    /// Loads one section's artifact into `target`. `jobs` is the worker count
    /// for the parallel-capable format and ignored for plain text.
    fn restore_section(
        &self,
        target: &ConnectionDescriptor,
        input: &Path,
        section: Section,
        jobs: usize,
    ) -> Result<()>;

    /// Executes `sql` and returns the tuples-only, unaligned output.
    fn query(&self, target: &ConnectionDescriptor, sql: &str) -> Result<String>;

    /// Executes `sql` (one or more statements) for its side effects. Scripts
    /// may carry credentials, so implementations must keep `sql` off the
    /// command line and out of the logs.
    fn execute(&self, target: &ConnectionDescriptor, sql: &str) -> Result<()>;
}
