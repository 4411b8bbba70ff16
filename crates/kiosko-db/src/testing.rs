//! Shared fixtures for this crate's unit tests.

use crate::pool::{Database, DbConfig};
use crate::seed::seed_demo_data;

/// A migrated in-memory database holding the demo dataset.
pub(crate) async fn seeded_database() -> Database {
    let db = Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database");
    seed_demo_data(&db).await.expect("demo data");
    db
}
