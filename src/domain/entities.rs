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

//! # Domain Entities
//!
//! The "Nouns" of the backup tool: database endpoints, dump sections, the
//! on-disk format of each section and the role a database plays in the
//! reference/tenant pair.
//!
//! We use `serde` so descriptors can be read straight out of the YAML/JSON
//! configuration file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// `ConnectionDescriptor` identifies one logical database endpoint.
///
/// Two descriptors with the same `dbname` but a different host or credential
/// are two different environments (for example source and destination).
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Handed to child processes through `PGPASSWORD`, never on the command line.
    #[serde(default)]
    pub password: Option<String>,
    pub dbname: String,
}

impl ConnectionDescriptor {
    pub fn new(host: &str, port: u16, user: &str, password: Option<&str>, dbname: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            user: user.to_string(),
            password: password.map(str::to_string),
            dbname: dbname.to_string(),
        }
    }

    /// Same endpoint and credential, different database.
    pub fn with_dbname(&self, dbname: &str) -> Self {
        Self {
            dbname: dbname.to_string(),
            ..self.clone()
        }
    }

    pub fn password_or_empty(&self) -> &str {
        self.password.as_deref().unwrap_or("")
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "******"))
            .field("dbname", &self.dbname)
            .finish()
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}/{}", self.user, self.host, self.port, self.dbname)
    }
}

/// `DumpFormat` defines how a section is stored on disk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DumpFormat {
    /// Line-oriented SQL text that can be edited before it is replayed.
    Plain,
    /// Compressed archive that `pg_restore` can apply with several workers.
    Custom,
}

impl DumpFormat {
    /// The single-letter value passed to `pg_dump -F`.
    pub fn pg_dump_flag(&self) -> &'static str {
        match self {
            DumpFormat::Plain => "p",
            DumpFormat::Custom => "c",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DumpFormat::Plain => ".sql",
            DumpFormat::Custom => ".dump",
        }
    }
}

/// `Section` is one ordered partition of a logical dump.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Section {
    /// Tables, foreign servers and user mappings.
    #[serde(rename = "pre-data")]
    PreData,
    /// Row contents.
    #[serde(rename = "data")]
    Data,
    /// Constraints, indexes and triggers applied after the rows are loaded.
    #[serde(rename = "post-data")]
    PostData,
}

impl Section {
    /// Dependency order inside a single database.
    pub const ALL: [Section; 3] = [Section::PreData, Section::Data, Section::PostData];

    /// Name understood by `pg_dump --section`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::PreData => "pre-data",
            Section::Data => "data",
            Section::PostData => "post-data",
        }
    }

    /// The pre-data section must stay editable text; the rest restore in parallel.
    pub fn dump_format(&self) -> DumpFormat {
        match self {
            Section::PreData => DumpFormat::Plain,
            Section::Data | Section::PostData => DumpFormat::Custom,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the foreign-data link a database is on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseRole {
    /// The database the foreign server points at.
    Reference,
    /// The database that owns the foreign server and user mapping.
    Tenant,
}

impl DatabaseRole {
    /// Dump order: the reference side always goes first.
    pub const ALL: [DatabaseRole; 2] = [DatabaseRole::Reference, DatabaseRole::Tenant];

    pub fn prefix(&self) -> &'static str {
        match self {
            DatabaseRole::Reference => "reference",
            DatabaseRole::Tenant => "tenant",
        }
    }
}

impl fmt::Display for DatabaseRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// The reference/tenant pair of one environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabasePair {
    pub reference: ConnectionDescriptor,
    pub tenant: ConnectionDescriptor,
}

impl DatabasePair {
    pub fn new(reference: ConnectionDescriptor, tenant: ConnectionDescriptor) -> Self {
        Self { reference, tenant }
    }

    pub fn get(&self, role: DatabaseRole) -> &ConnectionDescriptor {
        match role {
            DatabaseRole::Reference => &self.reference,
            DatabaseRole::Tenant => &self.tenant,
        }
    }
}

/// Path stem (no extension) of the artifact for a (role, section) pair.
pub fn artifact_stem(dir: &Path, role: DatabaseRole, section: Section) -> PathBuf {
    dir.join(format!("{}_{}", role.prefix(), section.as_str()))
}

/// Full artifact path for a (role, section) pair, e.g. `dir/tenant_pre-data.sql`.
pub fn artifact_path(dir: &Path, role: DatabaseRole, section: Section) -> PathBuf {
    with_section_extension(&artifact_stem(dir, role, section), section)
}

/// Appends the extension dictated by the section's format to `stem`.
pub fn with_section_extension(stem: &Path, section: Section) -> PathBuf {
    let mut name = stem.as_os_str().to_os_string();
    name.push(section.dump_format().extension());
    PathBuf::from(name)
}
