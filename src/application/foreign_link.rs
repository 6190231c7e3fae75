//! In-place rewrite of the foreign-link options in a pre-data artifact.

use crate::domain::entities::ConnectionDescriptor;
use crate::domain::errors::Result;
use crate::domain::foreign_link::{rewrite_foreign_link, RewriteMode, RewriteSummary};
use crate::ports::artifact_port::ArtifactPort;
use log::{debug, info, warn};
use std::path::Path;

/// Reads the whole artifact, repoints the link from `old_reference` to
/// `new_reference`, and writes the whole artifact back over the original.
///
/// There is no backup copy of the previous contents. Re-running with the same
/// pair leaves the file byte-identical.
pub fn rewrite_foreign_link_config(
    artifacts: &dyn ArtifactPort,
    path: &Path,
    old_reference: &ConnectionDescriptor,
    new_reference: &ConnectionDescriptor,
    mode: RewriteMode,
) -> Result<RewriteSummary> {
    let content = artifacts.read_text(path)?;
    debug!(
        "Original pre-data file content:\n{}",
        mask_passwords(&content, &[old_reference, new_reference])
    );

    let (modified, summary) = rewrite_foreign_link(&content, old_reference, new_reference, mode);

    debug!(
        "Modified pre-data file content:\n{}",
        mask_passwords(&modified, &[old_reference, new_reference])
    );

    if summary.total() == 0 {
        warn!(
            "No foreign-link options referencing {} found in {} ({} mode)",
            old_reference,
            path.display(),
            mode
        );
    } else {
        info!(
            "Repointed foreign link in {} from {} to {}: {:?}",
            path.display(),
            old_reference,
            new_reference,
            summary.replacements
        );
    }

    artifacts.write_text(path, &modified)?;
    Ok(summary)
}

/// Replaces the descriptors' passwords with asterisks for logging.
fn mask_passwords(content: &str, descriptors: &[&ConnectionDescriptor]) -> String {
    descriptors
        .iter()
        .filter_map(|d| d.password.as_deref())
        .filter(|p| !p.is_empty())
        .fold(content.to_string(), |acc, password| {
            acc.replace(password, "******")
        })
}
