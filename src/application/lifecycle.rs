//! Database lifecycle helpers built on the `DatabasePort`.

use crate::domain::entities::ConnectionDescriptor;
use crate::domain::errors::Result;
use crate::ports::database_port::DatabasePort;
use log::info;

/// Drops each database if it exists, in the given order.
///
/// Stops at the first failure; databases already dropped stay dropped.
pub fn delete_databases(
    database: &dyn DatabasePort,
    targets: &[&ConnectionDescriptor],
) -> Result<()> {
    for target in targets {
        database
            .drop_database(target)
            .map_err(|e| e.in_step(format!("drop database {}", target.dbname)))?;
    }
    info!("Dropped {} database(s) if present", targets.len());
    Ok(())
}
