//! # SQLite Store
//!
//! [`PosStore`] over the repositories. Besides delegation, this is where
//! constraint failures become the outcomes the register reasons about:
//!
//! ```text
//! UNIQUE cash_sessions.channel_id     → StoreError::SessionAlreadyOpen
//! UNIQUE orders.submission_token      → CommitOutcome::AlreadyCommitted
//! everything else                     → From<DbError> for StoreError
//! ```

use async_trait::async_trait;
use kiosko_core::{
    CashSession, Channel, CommitOutcome, CustomerData, DocumentType, Location, LocationLevel,
    Money, Order, PaymentMethod, PosStore, PriceList, SaleProduct, ShippingMethod, ShippingRate,
    StockType, StoreError, StoreResult, Warehouse,
};
use tracing::warn;

use crate::pool::Database;
use crate::repository::order::CommitResult;

/// The register's store backed by a [`Database`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        SqliteStore { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl PosStore for SqliteStore {
    async fn channel(&self, id: &str) -> StoreResult<Channel> {
        Ok(self.db.reference().channel(id).await?)
    }

    async fn warehouse(&self, id: &str) -> StoreResult<Warehouse> {
        Ok(self.db.reference().warehouse(id).await?)
    }

    async fn price_lists(&self) -> StoreResult<Vec<PriceList>> {
        Ok(self.db.reference().price_lists().await?)
    }

    async fn price_list(&self, id: &str) -> StoreResult<PriceList> {
        Ok(self.db.reference().price_list(id).await?)
    }

    async fn stock_types(&self) -> StoreResult<Vec<StockType>> {
        Ok(self.db.reference().stock_types().await?)
    }

    async fn payment_methods(&self) -> StoreResult<Vec<PaymentMethod>> {
        Ok(self.db.reference().payment_methods().await?)
    }

    async fn document_types(&self) -> StoreResult<Vec<DocumentType>> {
        Ok(self.db.reference().document_types().await?)
    }

    async fn locations(
        &self,
        level: LocationLevel,
        parent_id: Option<&str>,
    ) -> StoreResult<Vec<Location>> {
        Ok(self.db.reference().locations(level, parent_id).await?)
    }

    async fn shipping_methods(&self) -> StoreResult<Vec<ShippingMethod>> {
        Ok(self.db.reference().shipping_methods().await?)
    }

    async fn shipping_rates(&self, shipping_method_id: &str) -> StoreResult<Vec<ShippingRate>> {
        Ok(self.db.reference().shipping_rates(shipping_method_id).await?)
    }

    async fn sale_product(
        &self,
        variation_id: &str,
        price_list_id: &str,
        warehouse_id: &str,
        stock_type_id: &str,
    ) -> StoreResult<SaleProduct> {
        Ok(self
            .db
            .catalog()
            .sale_product(variation_id, price_list_id, warehouse_id, stock_type_id)
            .await?)
    }

    async fn search_products(
        &self,
        query: &str,
        price_list_id: &str,
        warehouse_id: &str,
        stock_type_id: &str,
        limit: u32,
    ) -> StoreResult<Vec<SaleProduct>> {
        Ok(self
            .db
            .catalog()
            .search(query, price_list_id, warehouse_id, stock_type_id, limit)
            .await?)
    }

    async fn live_stock(
        &self,
        variation_id: &str,
        warehouse_id: &str,
        stock_type_id: &str,
    ) -> StoreResult<i64> {
        Ok(self
            .db
            .catalog()
            .live_stock(variation_id, warehouse_id, stock_type_id)
            .await?)
    }

    async fn find_customer(
        &self,
        document_type_id: &str,
        document_number: &str,
    ) -> StoreResult<Option<CustomerData>> {
        Ok(self
            .db
            .reference()
            .find_customer(document_type_id, document_number)
            .await?)
    }

    async fn open_session_for_channel(&self, channel_id: &str) -> StoreResult<Option<CashSession>> {
        Ok(self.db.sessions().find_open_for_channel(channel_id).await?)
    }

    async fn session(&self, id: &str) -> StoreResult<CashSession> {
        Ok(self.db.sessions().get(id).await?)
    }

    async fn insert_session(&self, session: &CashSession) -> StoreResult<()> {
        match self.db.sessions().insert(session).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_unique_violation_on("cash_sessions.channel_id") => {
                Err(StoreError::SessionAlreadyOpen {
                    channel_id: session.channel_id.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn record_session_sale(&self, session_id: &str, amount: Money) -> StoreResult<CashSession> {
        Ok(self.db.sessions().record_sale(session_id, amount).await?)
    }

    async fn close_session(&self, session: &CashSession) -> StoreResult<()> {
        Ok(self.db.sessions().close(session).await?)
    }

    async fn find_order_by_token(&self, token: &str) -> StoreResult<Option<String>> {
        Ok(self.db.orders().find_by_token(token).await?)
    }

    async fn order(&self, id: &str) -> StoreResult<Order> {
        Ok(self.db.orders().get(id).await?)
    }

    async fn commit_order(&self, order: &Order) -> StoreResult<CommitOutcome> {
        let orders = self.db.orders();

        match orders.commit(order).await {
            Ok(CommitResult::Inserted) => Ok(CommitOutcome::Committed {
                order_id: order.id.clone(),
            }),
            Ok(CommitResult::Duplicate(order_id)) => Ok(CommitOutcome::AlreadyCommitted { order_id }),
            Err(e) if e.is_unique_violation_on("orders.submission_token") => {
                warn!(token = %order.submission_token, "Lost a commit race on the submission token");
                let order_id = orders
                    .find_by_token(&order.submission_token)
                    .await?
                    .ok_or_else(|| StoreError::from(e))?;
                Ok(CommitOutcome::AlreadyCommitted { order_id })
            }
            Err(e) => Err(e.into()),
        }
    }
}
