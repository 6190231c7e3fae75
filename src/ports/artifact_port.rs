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

use crate::domain::errors::Result;
use std::path::Path;

/// Port for the dump directory and the artifacts inside it.
///
/// Artifacts are never deleted through this port; cleanup is the caller's.
pub trait ArtifactPort: Send + Sync {
    /// Creates the directory and any missing parents.
    fn ensure_dir(&self, dir: &Path) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Reads a whole text artifact.
    fn read_text(&self, path: &Path) -> Result<String>;

    /// Overwrites a whole text artifact in place.
    fn write_text(&self, path: &Path, content: &str) -> Result<()>;
}
