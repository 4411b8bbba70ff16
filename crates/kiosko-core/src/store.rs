//! # Store Trait
//!
//! The persistence collaborator the register talks to. This crate defines
//! the trait only; `kiosko-db` implements it over SQLite.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          PosStore                                       │
//! │                                                                         │
//! │  Reference reads     channel, warehouse, price lists, stock types,      │
//! │                      payment methods, document types, locations,        │
//! │                      shipping methods and rates                         │
//! │                                                                         │
//! │  Catalog reads       sale_product, search_products, live_stock          │
//! │                                                                         │
//! │  Cash sessions       insert (one OPEN per channel), record sale, close  │
//! │                                                                         │
//! │  Orders              commit_order: ONE transaction                      │
//! │                        ├── token already used? → AlreadyCommitted       │
//! │                        ├── per line: stock >= qty? else InsufficientStock│
//! │                        ├── order + lines + payments + shipping          │
//! │                        ├── stock decrement                              │
//! │                        └── session recorded_sales_total += total        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::customer::CustomerData;
use crate::money::Money;
use crate::order::Order;
use crate::session::CashSession;
use crate::types::{
    Channel, DocumentType, Location, LocationLevel, PaymentMethod, PriceList, SaleProduct,
    ShippingMethod, ShippingRate, StockType, Warehouse,
};

// =============================================================================
// Store Error
// =============================================================================

/// Failures reported by a store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The channel already has an OPEN cash session.
    #[error("Channel {channel_id} already has an open cash session")]
    SessionAlreadyOpen { channel_id: String },

    /// Live stock no longer covers a line.
    #[error("Insufficient stock for {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        variation_id: String,
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Some other conflicting write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The store could not be reached or failed mid-operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(entity: &str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity: entity.to_string(),
            id: id.into(),
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of `commit_order`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The order was written now.
    Committed { order_id: String },
    /// An order with the same submission token already exists.
    AlreadyCommitted { order_id: String },
}

impl CommitOutcome {
    pub fn order_id(&self) -> &str {
        match self {
            CommitOutcome::Committed { order_id } | CommitOutcome::AlreadyCommitted { order_id } => {
                order_id
            }
        }
    }
}

// =============================================================================
// Store Trait
// =============================================================================

#[async_trait]
pub trait PosStore: Send + Sync {
    // --- reference data ------------------------------------------------------

    async fn channel(&self, id: &str) -> StoreResult<Channel>;

    async fn warehouse(&self, id: &str) -> StoreResult<Warehouse>;

    /// Active price lists.
    async fn price_lists(&self) -> StoreResult<Vec<PriceList>>;

    async fn price_list(&self, id: &str) -> StoreResult<PriceList>;

    async fn stock_types(&self) -> StoreResult<Vec<StockType>>;

    /// Active payment methods, with their cash capability resolved.
    async fn payment_methods(&self) -> StoreResult<Vec<PaymentMethod>>;

    async fn document_types(&self) -> StoreResult<Vec<DocumentType>>;

    /// Children of `parent_id` at `level` (countries when `parent_id` is `None`).
    async fn locations(
        &self,
        level: LocationLevel,
        parent_id: Option<&str>,
    ) -> StoreResult<Vec<Location>>;

    async fn shipping_methods(&self) -> StoreResult<Vec<ShippingMethod>>;

    /// Every rate row of one method.
    async fn shipping_rates(&self, shipping_method_id: &str) -> StoreResult<Vec<ShippingRate>>;

    // --- catalog --------------------------------------------------------------

    /// A variation priced against `price_list_id` with its live stock.
    async fn sale_product(
        &self,
        variation_id: &str,
        price_list_id: &str,
        warehouse_id: &str,
        stock_type_id: &str,
    ) -> StoreResult<SaleProduct>;

    /// Name or SKU search within one price list and warehouse.
    async fn search_products(
        &self,
        query: &str,
        price_list_id: &str,
        warehouse_id: &str,
        stock_type_id: &str,
        limit: u32,
    ) -> StoreResult<Vec<SaleProduct>>;

    async fn live_stock(
        &self,
        variation_id: &str,
        warehouse_id: &str,
        stock_type_id: &str,
    ) -> StoreResult<i64>;

    // --- customers ------------------------------------------------------------

    async fn find_customer(
        &self,
        document_type_id: &str,
        document_number: &str,
    ) -> StoreResult<Option<CustomerData>>;

    // --- cash sessions --------------------------------------------------------

    async fn open_session_for_channel(&self, channel_id: &str) -> StoreResult<Option<CashSession>>;

    async fn session(&self, id: &str) -> StoreResult<CashSession>;

    /// Persists a new OPEN session. `SessionAlreadyOpen` if the channel has one.
    async fn insert_session(&self, session: &CashSession) -> StoreResult<()>;

    /// Adds `amount` to an OPEN session's sales and returns the updated row.
    async fn record_session_sale(&self, session_id: &str, amount: Money) -> StoreResult<CashSession>;

    /// Persists a session closed in memory and sets the channel's registered
    /// balance to the counted amount.
    async fn close_session(&self, session: &CashSession) -> StoreResult<()>;

    // --- orders ---------------------------------------------------------------

    /// Id of the order committed under `token`, if any.
    async fn find_order_by_token(&self, token: &str) -> StoreResult<Option<String>>;

    async fn order(&self, id: &str) -> StoreResult<Order>;

    /// Writes the order atomically; see the module docs.
    async fn commit_order(&self, order: &Order) -> StoreResult<CommitOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(StoreError::Unavailable("timeout".into()).is_retryable());
        assert!(!StoreError::SessionAlreadyOpen {
            channel_id: "ch-1".into()
        }
        .is_retryable());
        assert!(!StoreError::not_found("Channel", "ch-9").is_retryable());
    }

    #[test]
    fn test_commit_outcome_order_id() {
        let outcome = CommitOutcome::AlreadyCommitted {
            order_id: "order-1".into(),
        };
        assert_eq!(outcome.order_id(), "order-1");
    }

    #[test]
    fn test_insufficient_stock_message() {
        let err = StoreError::InsufficientStock {
            variation_id: "v1".into(),
            sku: "TSHIRT-M".into(),
            available: 1,
            requested: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for TSHIRT-M: requested 2, available 1"
        );
    }
}
