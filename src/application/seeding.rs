//! Bootstrap of a sample source pair: a reference database with a small
//! `companies` table, and a tenant database that reads it through
//! `postgres_fdw` and holds a generated `customer_transactions` table.
//!
//! Used by the `seed` and `run` commands and by the end-to-end test.

use crate::domain::entities::{ConnectionDescriptor, DatabasePair};
use crate::domain::errors::Result;
use crate::domain::foreign_link::quote_literal;
use crate::infrastructure::postgres::postgres_cli_adapter::quote_ident;
use crate::ports::database_port::DatabasePort;
use log::info;
use std::time::Instant;

pub const SAMPLE_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS companies (
    id SERIAL PRIMARY KEY,
    name VARCHAR(100),
    rating VARCHAR(10),
    last_updated TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

INSERT INTO companies (name, rating) VALUES
('Apple Inc.', 'AAA'),
('Microsoft', 'AA+'),
('Google', 'AA');
";

pub const TRANSACTIONS_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS customer_transactions (
    id SERIAL PRIMARY KEY,
    customer_id INTEGER,
    transaction_date TIMESTAMP,
    amount DECIMAL(10,2),
    description TEXT
);
";

pub const TRANSACTIONS_INDEX_SQL: &str = "
CREATE INDEX IF NOT EXISTS idx_customer_transactions_customer_id ON customer_transactions(customer_id);
CREATE INDEX IF NOT EXISTS idx_customer_transactions_transaction_date ON customer_transactions(transaction_date);
CREATE INDEX IF NOT EXISTS idx_customer_transactions_amount ON customer_transactions(amount);
";

/// Name of the foreign server created in the tenant.
pub const FOREIGN_SERVER: &str = "reference_server";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedOptions {
    pub rows: u64,
    pub batch_size: u64,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            rows: 100,
            batch_size: 1_000_000,
        }
    }
}

/// The FDW setup run inside the tenant, pointing at `reference`.
pub fn foreign_link_sql(tenant: &ConnectionDescriptor, reference: &ConnectionDescriptor) -> String {
    format!(
        "
CREATE EXTENSION IF NOT EXISTS postgres_fdw;

CREATE SERVER IF NOT EXISTS {server}
FOREIGN DATA WRAPPER postgres_fdw
OPTIONS (host {host}, port {port}, dbname {dbname});

CREATE USER MAPPING IF NOT EXISTS FOR {local_user}
SERVER {server}
OPTIONS (user {user}, password {password});

CREATE FOREIGN TABLE companies_foreign (
    id INTEGER,
    name VARCHAR(100),
    rating VARCHAR(10),
    last_updated TIMESTAMP
)
SERVER {server}
OPTIONS (schema_name 'public', table_name 'companies');
",
        server = FOREIGN_SERVER,
        host = quote_literal(&reference.host),
        port = quote_literal(&reference.port.to_string()),
        dbname = quote_literal(&reference.dbname),
        local_user = quote_ident(&tenant.user),
        user = quote_literal(&reference.user),
        password = quote_literal(reference.password_or_empty()),
    )
}

/// One batch of generated transactions.
pub fn insert_batch_sql(count: u64) -> String {
    format!(
        "
INSERT INTO customer_transactions (customer_id, transaction_date, amount, description)
SELECT
    floor(random() * 10000000)::int,
    now() - (random() * interval '3650 days'),
    round((random() * 1000000)::numeric, 2),
    'Transaction ' || generate_series || ' - ' ||
    CASE floor(random() * 5)::int
        WHEN 0 THEN 'Purchase'
        WHEN 1 THEN 'Payment'
        WHEN 2 THEN 'Refund'
        WHEN 3 THEN 'Subscription'
        ELSE 'Service'
    END
FROM generate_series(1, {});
",
        count
    )
}

/// Creates and fills both source databases.
pub fn setup_source_databases(
    database: &dyn DatabasePort,
    source: &DatabasePair,
    options: SeedOptions,
) -> Result<()> {
    let reference = &source.reference;
    let tenant = &source.tenant;

    database
        .create_database(reference)
        .map_err(|e| e.in_step("create source reference database"))?;
    database
        .execute(reference, SAMPLE_TABLE_SQL)
        .map_err(|e| e.in_step("create sample table in reference"))?;
    info!("Sample table created successfully in {}", reference.dbname);

    database
        .create_database(tenant)
        .map_err(|e| e.in_step("create source tenant database"))?;
    database
        .execute(tenant, &foreign_link_sql(tenant, reference))
        .map_err(|e| e.in_step("set up foreign link"))?;
    info!(
        "FDW setup completed successfully between {} and {}",
        tenant.dbname, reference.dbname
    );

    populate_test_data(database, tenant, options).map_err(|e| e.in_step("populate test data"))
}

/// Creates `customer_transactions` in `tenant` and inserts `options.rows` rows.
pub fn populate_test_data(
    database: &dyn DatabasePort,
    tenant: &ConnectionDescriptor,
    options: SeedOptions,
) -> Result<()> {
    let start_time = Instant::now();
    info!(
        "Populating database {} with {} test records",
        tenant.dbname, options.rows
    );
    database.execute(tenant, TRANSACTIONS_TABLE_SQL)?;

    let batch_size = options.batch_size.max(1);
    let mut inserted = 0u64;
    while inserted < options.rows {
        let batch = batch_size.min(options.rows - inserted);
        database.execute(tenant, &insert_batch_sql(batch))?;
        inserted += batch;

        let elapsed = start_time.elapsed().as_secs_f64();
        info!(
            "Progress: {}/{} records ({:.1}%). Rate: {:.0} records/sec",
            inserted,
            options.rows,
            inserted as f64 / options.rows as f64 * 100.0,
            if elapsed > 0.0 { inserted as f64 / elapsed } else { 0.0 }
        );
    }

    database.execute(tenant, TRANSACTIONS_INDEX_SQL)?;
    info!(
        "Successfully populated {} with {} records in {:.1}s",
        tenant.dbname,
        options.rows,
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Call, MockDatabase};

    fn source() -> DatabasePair {
        let r = ConnectionDescriptor::new("localhost", 5432, "postgres", Some("it's"), "reference");
        DatabasePair::new(r.clone(), r.with_dbname("tenant"))
    }

    #[test]
    fn test_foreign_link_sql_quotes_values() {
        let src = source();
        let sql = foreign_link_sql(&src.tenant, &src.reference);
        assert!(sql.contains("OPTIONS (host 'localhost', port '5432', dbname 'reference')"));
        assert!(sql.contains("OPTIONS (user 'postgres', password 'it''s')"));
        assert!(sql.contains("FOR \"postgres\""));
    }

    #[test]
    fn test_rows_are_inserted_in_batches() {
        let db = MockDatabase::default();
        let tenant = source().tenant;
        populate_test_data(
            &db,
            &tenant,
            SeedOptions {
                rows: 250,
                batch_size: 100,
            },
        )
        .unwrap();

        let calls = db.calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[0], Call::Execute("tenant".into(), TRANSACTIONS_TABLE_SQL.into()));
        assert_eq!(calls[1], Call::Execute("tenant".into(), insert_batch_sql(100)));
        assert_eq!(calls[2], Call::Execute("tenant".into(), insert_batch_sql(100)));
        assert_eq!(calls[3], Call::Execute("tenant".into(), insert_batch_sql(50)));
        assert_eq!(calls[4], Call::Execute("tenant".into(), TRANSACTIONS_INDEX_SQL.into()));
    }

    #[test]
    fn test_setup_order() {
        let db = MockDatabase::default();
        setup_source_databases(&db, &source(), SeedOptions::default()).unwrap();

        let calls = db.calls();
        assert_eq!(calls[0], Call::Create("reference".into()));
        assert_eq!(calls[1], Call::Execute("reference".into(), SAMPLE_TABLE_SQL.into()));
        assert_eq!(calls[2], Call::Create("tenant".into()));
        assert!(matches!(
            &calls[3],
            Call::Execute(db, sql) if db == "tenant" && sql.contains("postgres_fdw")
        ));
    }

    #[test]
    fn test_setup_failure_is_named() {
        let db = MockDatabase::default();
        db.fail_on(Call::Create("tenant".into()), 1);
        let err = setup_source_databases(&db, &source(), SeedOptions::default()).unwrap_err();
        assert_eq!(err.step(), Some("create source tenant database"));
    }
}
