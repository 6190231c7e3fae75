//! Hand-written port doubles shared by the unit tests.

use crate::application::retry::Sleeper;
use crate::domain::entities::{ConnectionDescriptor, Section};
use crate::domain::errors::{BackupError, Result};
use crate::ports::database_port::DatabasePort;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// One recorded `DatabasePort` call. Paths are reduced to their file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(String),
    Drop(String),
    Dump(String, Section, String),
    Restore(String, Section, String),
    Query(String, String),
    Execute(String, String),
}

/// Records every call in order; individual calls can be made to fail a
/// number of times before they start succeeding.
#[derive(Default)]
pub struct MockDatabase {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<Vec<(Call, u32)>>,
    query_results: Mutex<HashMap<(String, String), String>>,
    jobs_seen: Mutex<Vec<usize>>,
}

impl MockDatabase {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn jobs_seen(&self) -> Vec<usize> {
        self.jobs_seen.lock().unwrap().clone()
    }

    /// Makes `call` fail its next `times` invocations.
    pub fn fail_on(&self, call: Call, times: u32) {
        self.failures.lock().unwrap().push((call, times));
    }

    pub fn set_query_result(&self, dbname: &str, sql: &str, value: &str) {
        self.query_results
            .lock()
            .unwrap()
            .insert((dbname.to_string(), sql.to_string()), value.to_string());
    }

    fn record(&self, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push(call.clone());
        let mut failures = self.failures.lock().unwrap();
        if let Some((_, remaining)) = failures.iter_mut().find(|(c, n)| *c == call && *n > 0) {
            *remaining -= 1;
            return Err(BackupError::ProcessError {
                program: "mock".into(),
                status: "exit status: 1".into(),
                output: format!("injected failure for {:?}", call),
            });
        }
        Ok(())
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl DatabasePort for MockDatabase {
    fn create_database(&self, target: &ConnectionDescriptor) -> Result<()> {
        self.record(Call::Create(target.dbname.clone()))
    }

    fn drop_database(&self, target: &ConnectionDescriptor) -> Result<()> {
        self.record(Call::Drop(target.dbname.clone()))
    }

    fn dump_section(
        &self,
        source: &ConnectionDescriptor,
        output: &Path,
        section: Section,
    ) -> Result<()> {
        self.record(Call::Dump(source.dbname.clone(), section, file_name(output)))?;
        std::fs::write(output, format!("-- {} {}\n", source.dbname, section))?;
        Ok(())
    }

    fn restore_section(
        &self,
        target: &ConnectionDescriptor,
        input: &Path,
        section: Section,
        jobs: usize,
    ) -> Result<()> {
        self.jobs_seen.lock().unwrap().push(jobs);
        self.record(Call::Restore(target.dbname.clone(), section, file_name(input)))
    }

    fn query(&self, target: &ConnectionDescriptor, sql: &str) -> Result<String> {
        self.record(Call::Query(target.dbname.clone(), sql.to_string()))?;
        Ok(self
            .query_results
            .lock()
            .unwrap()
            .get(&(target.dbname.clone(), sql.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn execute(&self, target: &ConnectionDescriptor, sql: &str) -> Result<()> {
        self.record(Call::Execute(target.dbname.clone(), sql.to_string()))
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    pub sleeps: Mutex<Vec<Duration>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}
