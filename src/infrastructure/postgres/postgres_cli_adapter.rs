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

//! Infrastructure adapter that drives PostgreSQL through its client binaries.

use crate::domain::entities::{ConnectionDescriptor, DumpFormat, Section};
use crate::domain::errors::Result;
use crate::ports::command_port::{CommandInvocation, CommandRunner};
use crate::ports::database_port::DatabasePort;
use log::info;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Where to find the three client programs.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PgTools {
    pub psql: String,
    pub pg_dump: String,
    pub pg_restore: String,
}

impl Default for PgTools {
    fn default() -> Self {
        Self {
            psql: "psql".to_string(),
            pg_dump: "pg_dump".to_string(),
            pg_restore: "pg_restore".to_string(),
        }
    }
}

/// Concrete implementation of `DatabasePort` using `psql`, `pg_dump` and
/// `pg_restore`.
///
/// Connection parameters go on the command line; the password only ever
/// travels in the child's `PGPASSWORD`.
pub struct PostgresCliAdapter {
    runner: Arc<dyn CommandRunner>,
    tools: PgTools,
    admin_database: String,
}

impl PostgresCliAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>, tools: PgTools, admin_database: String) -> Self {
        Self {
            runner,
            tools,
            admin_database,
        }
    }

    /// `program -h host -p port -U user` with the credential in the environment.
    fn base_command(&self, program: &str, desc: &ConnectionDescriptor) -> CommandInvocation {
        let inv = CommandInvocation::new(program)
            .arg("-h")
            .arg(desc.host.as_str())
            .arg("-p")
            .arg(desc.port.to_string())
            .arg("-U")
            .arg(desc.user.as_str());
        match &desc.password {
            Some(password) => inv.env("PGPASSWORD", password),
            None => inv,
        }
    }

    fn psql(&self, desc: &ConnectionDescriptor, database: &str) -> CommandInvocation {
        self.base_command(&self.tools.psql, desc)
            .arg("-d")
            .arg(database)
    }

    pub fn create_database_command(&self, target: &ConnectionDescriptor) -> CommandInvocation {
        self.psql(target, &self.admin_database)
            .arg("-c")
            .arg(format!("CREATE DATABASE {};", quote_ident(&target.dbname)))
    }

    pub fn drop_database_command(&self, target: &ConnectionDescriptor) -> CommandInvocation {
        self.psql(target, &self.admin_database)
            .arg("-c")
            .arg(format!("DROP DATABASE IF EXISTS {};", quote_ident(&target.dbname)))
    }

    pub fn dump_command(
        &self,
        source: &ConnectionDescriptor,
        output: &Path,
        section: Section,
    ) -> CommandInvocation {
        self.base_command(&self.tools.pg_dump, source)
            .args(["--no-owner", "--no-privileges"])
            .arg(format!("-F{}", section.dump_format().pg_dump_flag()))
            .arg(format!("--section={}", section.as_str()))
            .arg("-f")
            .arg(output.to_string_lossy())
            .arg(source.dbname.as_str())
    }

    pub fn restore_command(
        &self,
        target: &ConnectionDescriptor,
        input: &Path,
        section: Section,
        jobs: usize,
    ) -> CommandInvocation {
        match section.dump_format() {
            DumpFormat::Plain => self
                .psql(target, &target.dbname)
                .arg("-f")
                .arg(input.to_string_lossy()),
            DumpFormat::Custom => self
                .base_command(&self.tools.pg_restore, target)
                .arg("-d")
                .arg(target.dbname.as_str())
                .args(["--no-owner", "--no-privileges"])
                .arg("-j")
                .arg(jobs.max(1).to_string())
                .arg(input.to_string_lossy()),
        }
    }

    /// Runs a script read from stdin. Scripts can carry credentials (user
    /// mappings), so they stay out of argv and out of the command log.
    pub fn execute_command(&self, target: &ConnectionDescriptor, sql: &str) -> CommandInvocation {
        self.psql(target, &target.dbname)
            .args(["-X", "-v", "ON_ERROR_STOP=1", "-f", "-"])
            .stdin(sql)
    }

    pub fn query_command(&self, target: &ConnectionDescriptor, sql: &str) -> CommandInvocation {
        self.psql(target, &target.dbname)
            .args(["-X", "-t", "-A", "-c"])
            .arg(sql)
    }
}

impl DatabasePort for PostgresCliAdapter {
    fn create_database(&self, target: &ConnectionDescriptor) -> Result<()> {
        info!("Creating database: {}", target.dbname);
        self.runner.run(&self.create_database_command(target))?;
        info!("Database {} created successfully", target.dbname);
        Ok(())
    }

    fn drop_database(&self, target: &ConnectionDescriptor) -> Result<()> {
        info!("Dropping database if it exists: {}", target.dbname);
        self.runner.run(&self.drop_database_command(target))?;
        Ok(())
    }

    fn dump_section(
        &self,
        source: &ConnectionDescriptor,
        output: &Path,
        section: Section,
    ) -> Result<()> {
        self.runner.run(&self.dump_command(source, output, section))?;
        Ok(())
    }

    fn restore_section(
        &self,
        target: &ConnectionDescriptor,
        input: &Path,
        section: Section,
        jobs: usize,
    ) -> Result<()> {
        self.runner.run(&self.restore_command(target, input, section, jobs))?;
        Ok(())
    }

    fn query(&self, target: &ConnectionDescriptor, sql: &str) -> Result<String> {
        let output = self.runner.run(&self.query_command(target, sql))?;
        Ok(output.stdout.trim().to_string())
    }

    fn execute(&self, target: &ConnectionDescriptor, sql: &str) -> Result<()> {
        self.runner.run(&self.execute_command(target, sql))?;
        Ok(())
    }
}

/// Double-quotes an identifier so mixed-case names survive.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::seeding::{setup_source_databases, SeedOptions};
    use crate::domain::entities::DatabasePair;
    use crate::domain::errors::BackupError;
    use crate::ports::command_port::CommandOutput;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<CommandInvocation>>,
        stdout: String,
        fail: bool,
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, invocation: &CommandInvocation) -> Result<CommandOutput> {
            self.calls.lock().unwrap().push(invocation.clone());
            if self.fail {
                return Err(BackupError::ProcessError {
                    program: invocation.program.clone(),
                    status: "exit status: 1".into(),
                    output: "database \"tenant\" already exists".into(),
                });
            }
            Ok(CommandOutput {
                stdout: self.stdout.clone(),
                combined: self.stdout.clone(),
            })
        }
    }

    fn desc() -> ConnectionDescriptor {
        ConnectionDescriptor::new("db1", 5433, "postgres", Some("pw"), "tenant")
    }

    fn adapter(runner: Arc<RecordingRunner>) -> PostgresCliAdapter {
        PostgresCliAdapter::new(runner, PgTools::default(), "postgres".into())
    }

    #[test]
    fn test_create_database_targets_admin_db() {
        let runner = Arc::new(RecordingRunner::default());
        adapter(runner.clone()).create_database(&desc()).unwrap();

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let inv = &calls[0];
        assert_eq!(inv.program, "psql");
        assert!(inv.has_arg_pair("-d", "postgres"));
        assert!(inv.has_arg_pair("-c", "CREATE DATABASE \"tenant\";"));
        assert!(inv.has_arg_pair("-p", "5433"));
        assert_eq!(inv.env, vec![("PGPASSWORD".to_string(), "pw".to_string())]);
    }

    #[test]
    fn test_create_database_failure_propagates() {
        let runner = Arc::new(RecordingRunner {
            fail: true,
            ..Default::default()
        });
        let err = adapter(runner).create_database(&desc()).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_drop_database_is_if_exists() {
        let runner = Arc::new(RecordingRunner::default());
        adapter(runner.clone()).drop_database(&desc()).unwrap();
        let calls = runner.calls.lock().unwrap();
        assert!(calls[0].has_arg_pair("-c", "DROP DATABASE IF EXISTS \"tenant\";"));
    }

    #[test]
    fn test_dump_command_per_section() {
        let a = adapter(Arc::new(RecordingRunner::default()));
        let pre = a.dump_command(&desc(), Path::new("out/tenant_pre-data.sql"), Section::PreData);
        assert_eq!(pre.program, "pg_dump");
        assert!(pre.args.contains(&"-Fp".to_string()));
        assert!(pre.args.contains(&"--section=pre-data".to_string()));
        assert!(pre.args.contains(&"--no-owner".to_string()));
        assert!(pre.has_arg_pair("-f", "out/tenant_pre-data.sql"));
        assert_eq!(pre.args.last().map(String::as_str), Some("tenant"));

        let data = a.dump_command(&desc(), Path::new("out/tenant_data.dump"), Section::Data);
        assert!(data.args.contains(&"-Fc".to_string()));
        assert!(data.args.contains(&"--section=data".to_string()));
    }

    #[test]
    fn test_restore_command_selects_client() {
        let a = adapter(Arc::new(RecordingRunner::default()));
        let pre_path = PathBuf::from("d/tenant_pre-data.sql");
        let pre = a.restore_command(&desc(), &pre_path, Section::PreData, 8);
        assert_eq!(pre.program, "psql");
        assert!(pre.has_arg_pair("-d", "tenant"));
        assert!(pre.has_arg_pair("-f", "d/tenant_pre-data.sql"));
        assert!(!pre.args.contains(&"-j".to_string()));

        let post_path = PathBuf::from("d/tenant_post-data.dump");
        let post = a.restore_command(&desc(), &post_path, Section::PostData, 8);
        assert_eq!(post.program, "pg_restore");
        assert!(post.has_arg_pair("-j", "8"));
        assert!(post.has_arg_pair("-d", "tenant"));
        assert_eq!(post.args.last().map(String::as_str), Some("d/tenant_post-data.dump"));

        let zero = a.restore_command(&desc(), &PathBuf::from("x.dump"), Section::Data, 0);
        assert!(zero.has_arg_pair("-j", "1"));
    }

    #[test]
    fn test_query_trims_tuples_only_output() {
        let runner = Arc::new(RecordingRunner {
            stdout: "  100\n\n".into(),
            ..Default::default()
        });
        let out = adapter(runner.clone())
            .query(&desc(), "SELECT COUNT(*) FROM customer_transactions;")
            .unwrap();
        assert_eq!(out, "100");
        let calls = runner.calls.lock().unwrap();
        assert!(calls[0].args.contains(&"-t".to_string()));
        assert!(calls[0].args.contains(&"-A".to_string()));
    }

    #[test]
    fn test_no_password_means_no_env() {
        let a = adapter(Arc::new(RecordingRunner::default()));
        let mut d = desc();
        d.password = None;
        assert!(a.create_database_command(&d).env.is_empty());
    }

    #[test]
    fn test_execute_sends_script_on_stdin() {
        let runner = Arc::new(RecordingRunner::default());
        adapter(runner.clone())
            .execute(&desc(), "CREATE TABLE t (id int);")
            .unwrap();
        let calls = runner.calls.lock().unwrap();
        assert!(calls[0].has_arg_pair("-f", "-"));
        assert!(calls[0].has_arg_pair("-v", "ON_ERROR_STOP=1"));
        assert_eq!(calls[0].stdin.as_deref(), Some("CREATE TABLE t (id int);"));
        assert!(!calls[0].to_string().contains("CREATE TABLE"));
    }

    #[test]
    fn test_seeding_keeps_reference_password_out_of_command_lines() {
        let runner = Arc::new(RecordingRunner::default());
        let database = adapter(runner.clone());
        let reference = ConnectionDescriptor::new(
            "localhost",
            5432,
            "postgres",
            Some("TopS3cret"),
            "reference",
        );
        let source = DatabasePair::new(reference.clone(), reference.with_dbname("tenant"));

        setup_source_databases(
            &database,
            &source,
            SeedOptions {
                rows: 10,
                batch_size: 10,
            },
        )
        .unwrap();

        let calls = runner.calls.lock().unwrap();
        for inv in calls.iter() {
            let logged = format!("Executing: {}", inv);
            assert!(!logged.contains("TopS3cret"), "leaked: {}", logged);
            assert!(!format!("{:?}", inv).contains("TopS3cret"));
        }
        // The user mapping still receives it, through stdin.
        assert!(calls
            .iter()
            .any(|inv| inv.stdin.as_deref().map_or(false, |sql| sql.contains("'TopS3cret'"))));
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("Tenant"), "\"Tenant\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
