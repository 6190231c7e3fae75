//! # Validation Module
//!
//! Compares a source environment with its restored copy after a run.
//!
//! ## Checks
//! 1. **Row Count**: the tenant row-count probe must print the same thing on
//!    the source tenant and on the destination tenant.
//! 2. **Foreign Link**: querying the foreign table through the destination
//!    tenant's (rewritten) link must return what the destination reference
//!    holds locally.

use crate::domain::entities::{ConnectionDescriptor, DatabasePair};
use crate::domain::errors::{BackupError, Result};
use crate::ports::database_port::DatabasePort;
use log::info;

/// Queries used by the checks. `None` skips the foreign-link check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationProbes {
    pub tenant_row_count: String,
    pub foreign_link: Option<String>,
    pub reference_local: Option<String>,
}

/// Runs `probe` on both databases and fails if the outputs differ.
/// Returns the (shared) output.
pub fn compare_probe(
    database: &dyn DatabasePort,
    source: &ConnectionDescriptor,
    destination: &ConnectionDescriptor,
    probe: &str,
) -> Result<String> {
    let source_value = database
        .query(source, probe)
        .map_err(|e| e.in_step(format!("query source {}", source.dbname)))?;
    let destination_value = database
        .query(destination, probe)
        .map_err(|e| e.in_step(format!("query destination {}", destination.dbname)))?;

    if source_value != destination_value {
        return Err(BackupError::ContentMismatch {
            probe: probe.to_string(),
            source_value,
            destination_value,
        });
    }
    Ok(source_value)
}

/// Checks that the foreign table seen from `tenant` matches `reference`'s own rows.
pub fn verify_foreign_link(
    database: &dyn DatabasePort,
    reference: &ConnectionDescriptor,
    tenant: &ConnectionDescriptor,
    foreign_query: &str,
    local_query: &str,
) -> Result<()> {
    let local = database
        .query(reference, local_query)
        .map_err(|e| e.in_step(format!("query reference {}", reference.dbname)))?;
    let remote = database
        .query(tenant, foreign_query)
        .map_err(|e| e.in_step(format!("query foreign table through {}", tenant.dbname)))?;

    if local != remote {
        return Err(BackupError::ContentMismatch {
            probe: foreign_query.to_string(),
            source_value: local,
            destination_value: remote,
        });
    }
    info!(
        "Foreign link from {} returns the {} row(s) held by {}",
        tenant.dbname,
        local.lines().count(),
        reference.dbname
    );
    Ok(())
}

/// Runs every configured check of `destination` against `source`.
pub fn validate_database_content(
    database: &dyn DatabasePort,
    source: &DatabasePair,
    destination: &DatabasePair,
    probes: &ValidationProbes,
) -> Result<()> {
    let count = compare_probe(
        database,
        &source.tenant,
        &destination.tenant,
        &probes.tenant_row_count,
    )?;
    info!(
        "Row counts match between {} and {}: {}",
        source.tenant.dbname, destination.tenant.dbname, count
    );

    if let (Some(foreign), Some(local)) = (&probes.foreign_link, &probes.reference_local) {
        verify_foreign_link(
            database,
            &destination.reference,
            &destination.tenant,
            foreign,
            local,
        )?;
    }
    Ok(())
}
