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

//! # Section Dumper
//!
//! Extracts one section of one database per call. The artifact's format, and
//! therefore its extension, follows from the section alone: pre-data is plain
//! SQL so the foreign link can be edited later, data and post-data use the
//! custom archive format so they restore in parallel.
//!
//! Dumps are not retried. A failed dump is cheap to re-run from the top.

use crate::domain::entities::{with_section_extension, ConnectionDescriptor, Section};
use crate::domain::errors::Result;
use crate::ports::database_port::DatabasePort;
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct SectionDumper {
    database: Arc<dyn DatabasePort>,
}

impl SectionDumper {
    pub fn new(database: Arc<dyn DatabasePort>) -> Self {
        Self { database }
    }

    /// Dumps `section` of `source` next to `stem` and returns the artifact path.
    pub fn dump_section(
        &self,
        source: &ConnectionDescriptor,
        stem: &Path,
        section: Section,
    ) -> Result<PathBuf> {
        let output = with_section_extension(stem, section);
        info!(
            "Dumping {} section of database {} to {}",
            section,
            source.dbname,
            output.display()
        );

        self.database.dump_section(source, &output, section)?;

        info!(
            "Successfully dumped {} section of {} to {}",
            section,
            source.dbname,
            output.display()
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Call, MockDatabase};

    #[test]
    fn test_extension_follows_section() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db = Arc::new(MockDatabase::default());
        let dumper = SectionDumper::new(db.clone());
        let source = ConnectionDescriptor::new("h", 5432, "u", None, "tenant");
        let stem = temp_dir.path().join("tenant_pre-data");

        let path = dumper.dump_section(&source, &stem, Section::PreData).unwrap();
        assert_eq!(path, temp_dir.path().join("tenant_pre-data.sql"));

        let stem = temp_dir.path().join("tenant_data");
        let path = dumper.dump_section(&source, &stem, Section::Data).unwrap();
        assert_eq!(path, temp_dir.path().join("tenant_data.dump"));
        assert!(path.exists());

        assert_eq!(
            db.calls(),
            vec![
                Call::Dump("tenant".into(), Section::PreData, "tenant_pre-data.sql".into()),
                Call::Dump("tenant".into(), Section::Data, "tenant_data.dump".into()),
            ]
        );
    }

    #[test]
    fn test_failure_is_not_retried() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db = Arc::new(MockDatabase::default());
        db.fail_on(
            Call::Dump("tenant".into(), Section::PostData, "tenant_post-data.dump".into()),
            1,
        );
        let dumper = SectionDumper::new(db.clone());
        let source = ConnectionDescriptor::new("h", 5432, "u", None, "tenant");

        let err = dumper
            .dump_section(&source, &temp_dir.path().join("tenant_post-data"), Section::PostData)
            .unwrap_err();
        assert!(err.to_string().contains("injected failure"));
        assert_eq!(db.calls().len(), 1);
    }
}
