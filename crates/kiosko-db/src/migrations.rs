//! # Database Migrations
//!
//! Embedded SQL migrations for Kiosko POS.
//!
//! ```text
//! migrations/sqlite/
//! ├── 001_reference_data.sql        warehouses, channels, catalog, stock,
//! │                                 payment methods, customers, locations,
//! │                                 shipping rates
//! └── 002_sessions_and_orders.sql   cash_sessions (one OPEN per channel),
//!                                   orders (unique submission token),
//!                                   lines, payments, shipping
//! ```
//!
//! ## Adding New Migrations
//!
//! 1. Add `NNN_description.sql` to `migrations/sqlite/` with the next number
//! 2. **NEVER** modify an applied migration; add a new one

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Migrations embedded at compile time from `migrations/sqlite`.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending migrations, each in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}
