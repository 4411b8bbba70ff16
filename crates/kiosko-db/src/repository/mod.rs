//! # Repository Module
//!
//! Database repositories for Kiosko POS.
//!
//! ```text
//! Register (through SqliteStore)
//!      │
//!      ├── CatalogRepository    variations, prices, stock, search
//!      ├── ReferenceRepository  channels, methods, customers, locations, rates
//!      ├── SessionRepository    cash sessions
//!      └── OrderRepository      atomic commit, read-back
//!      │
//!      ▼
//! SQLite
//! ```
//!
//! Each repository holds a clone of the pool; create them freely through
//! [`crate::Database`].

pub mod catalog;
pub mod order;
pub mod reference;
pub mod session;
