//! # pg-fdw-backup
//!
//! Backup and cross-environment restore of a PostgreSQL reference database
//! and a tenant database that reads from it through a `postgres_fdw` link.
//!
//! The crate follows the **Hexagonal Architecture** (Ports and Adapters):
//! `domain` holds the pure types and the foreign-link text transform,
//! `ports` the traits the workflow depends on, `infrastructure` the
//! `psql`/`pg_dump`/`pg_restore` and filesystem adapters, and `application`
//! the dump and restore workflows.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;

#[cfg(test)]
mod test_support;
