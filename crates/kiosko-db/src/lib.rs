//! # kiosko-db: Database Layer for Kiosko POS
//!
//! SQLite persistence for the register, and the [`SqliteStore`]
//! implementation of [`kiosko_core::PosStore`].
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kiosko POS Data Flow                             │
//! │                                                                         │
//! │  Register (submit_order, search_products, open_session, ...)           │
//! │       │  Arc<dyn PosStore>                                              │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    kiosko-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  SqliteStore  │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │  (store.rs)   │───►│ Catalog       │    │  (embedded)  │  │   │
//! │  │   │               │    │ Reference     │    │              │  │   │
//! │  │   │  Database     │    │ Session       │    │ 001_ref.sql  │  │   │
//! │  │   │  (pool.rs)    │    │ Order         │    │ 002_ord.sql  │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file shared by every register of the store                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kiosko_db::{Database, DbConfig, SqliteStore};
//!
//! let db = Database::new(DbConfig::new("kiosko.db")).await?;
//! let store = SqliteStore::new(db);
//! let lists = store.price_lists().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod seed;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use store::SqliteStore;

pub use repository::catalog::CatalogRepository;
pub use repository::order::{CommitResult, OrderRepository};
pub use repository::reference::ReferenceRepository;
pub use repository::session::SessionRepository;
