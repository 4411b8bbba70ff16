//! Shared setup for register integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use kiosko_core::{
    CashSession, Channel, CommitOutcome, CustomerData, DocumentType, Location, LocationLevel,
    Money, Order, PaymentMethod, PosStore, PriceList, SaleProduct, ShippingMethod, ShippingRate,
    StockType, StoreError, StoreResult, Warehouse, WizardStep,
};
use kiosko_db::seed::seed_demo_data;
use kiosko_db::{Database, DbConfig, SqliteStore};
use kiosko_register::{Register, RegisterConfig, SaleSnapshot};

pub const TSHIRT: &str = "var-tshirt-m";

pub async fn seeded_db() -> Database {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    seed_demo_data(&db).await.unwrap();
    db
}

pub async fn register_over(db: &Database) -> Register {
    Register::new(Arc::new(SqliteStore::new(db.clone())), RegisterConfig::default())
}

/// Opens a session with 100.00 and builds a sale of two T-shirts at 25.00
/// for the known customer, stopping at Payment.
pub async fn sale_at_payment(register: &Register) -> SaleSnapshot {
    if register.current_session().await.unwrap().is_none() {
        register
            .open_session(Money::from_cents(10000), None)
            .await
            .unwrap();
    }
    register.start_sale().await.unwrap();
    register.go_to_step(2).await.unwrap();
    register.add_to_cart(TSHIRT).await.unwrap();
    register.update_cart_item(0, 2, None).await.unwrap();
    register.go_to_step(3).await.unwrap();

    let customer = register
        .search_client("dt-dni", "45123987")
        .await
        .unwrap()
        .expect("seeded customer");
    register.update_customer(customer).await.unwrap();

    let sale = register.go_to_step(5).await.unwrap();
    assert_eq!(sale.step, WizardStep::Payment);
    sale
}

pub fn walk_in(requires_shipping: bool) -> CustomerData {
    CustomerData {
        document_type_id: Some("dt-dni".into()),
        document_number: "70112233".into(),
        first_name: "Rosa".into(),
        last_name: "Quispe".into(),
        requires_shipping,
        ..Default::default()
    }
}

// =============================================================================
// Scripted Store
// =============================================================================

/// Wraps a real store and misbehaves on `commit_order` and `close_session`
/// as told.
pub struct ScriptedStore {
    inner: SqliteStore,
    /// Sleep before committing, in milliseconds.
    commit_delay_ms: AtomicU64,
    /// Commit for real, then report Unavailable this many times.
    lose_acks: AtomicUsize,
    pub commit_calls: AtomicUsize,
    /// Sale recorded on the session right before the next close, in cents.
    sale_before_close: AtomicI64,
}

impl ScriptedStore {
    pub fn new(db: &Database) -> Self {
        ScriptedStore {
            inner: SqliteStore::new(db.clone()),
            commit_delay_ms: AtomicU64::new(0),
            lose_acks: AtomicUsize::new(0),
            commit_calls: AtomicUsize::new(0),
            sale_before_close: AtomicI64::new(0),
        }
    }

    pub fn delay_commits(&self, delay: Duration) {
        self.commit_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn lose_next_acks(&self, count: usize) {
        self.lose_acks.store(count, Ordering::SeqCst);
    }

    /// Has another register record `amount` on the session between the
    /// close's read and its write.
    pub fn sell_during_next_close(&self, amount: Money) {
        self.sale_before_close.store(amount.cents(), Ordering::SeqCst);
    }
}

#[async_trait]
impl PosStore for ScriptedStore {
    async fn channel(&self, id: &str) -> StoreResult<Channel> {
        self.inner.channel(id).await
    }

    async fn warehouse(&self, id: &str) -> StoreResult<Warehouse> {
        self.inner.warehouse(id).await
    }

    async fn price_lists(&self) -> StoreResult<Vec<PriceList>> {
        self.inner.price_lists().await
    }

    async fn price_list(&self, id: &str) -> StoreResult<PriceList> {
        self.inner.price_list(id).await
    }

    async fn stock_types(&self) -> StoreResult<Vec<StockType>> {
        self.inner.stock_types().await
    }

    async fn payment_methods(&self) -> StoreResult<Vec<PaymentMethod>> {
        self.inner.payment_methods().await
    }

    async fn document_types(&self) -> StoreResult<Vec<DocumentType>> {
        self.inner.document_types().await
    }

    async fn locations(
        &self,
        level: LocationLevel,
        parent_id: Option<&str>,
    ) -> StoreResult<Vec<Location>> {
        self.inner.locations(level, parent_id).await
    }

    async fn shipping_methods(&self) -> StoreResult<Vec<ShippingMethod>> {
        self.inner.shipping_methods().await
    }

    async fn shipping_rates(&self, shipping_method_id: &str) -> StoreResult<Vec<ShippingRate>> {
        self.inner.shipping_rates(shipping_method_id).await
    }

    async fn sale_product(
        &self,
        variation_id: &str,
        price_list_id: &str,
        warehouse_id: &str,
        stock_type_id: &str,
    ) -> StoreResult<SaleProduct> {
        self.inner
            .sale_product(variation_id, price_list_id, warehouse_id, stock_type_id)
            .await
    }

    async fn search_products(
        &self,
        query: &str,
        price_list_id: &str,
        warehouse_id: &str,
        stock_type_id: &str,
        limit: u32,
    ) -> StoreResult<Vec<SaleProduct>> {
        self.inner
            .search_products(query, price_list_id, warehouse_id, stock_type_id, limit)
            .await
    }

    async fn live_stock(
        &self,
        variation_id: &str,
        warehouse_id: &str,
        stock_type_id: &str,
    ) -> StoreResult<i64> {
        self.inner
            .live_stock(variation_id, warehouse_id, stock_type_id)
            .await
    }

    async fn find_customer(
        &self,
        document_type_id: &str,
        document_number: &str,
    ) -> StoreResult<Option<CustomerData>> {
        self.inner
            .find_customer(document_type_id, document_number)
            .await
    }

    async fn open_session_for_channel(&self, channel_id: &str) -> StoreResult<Option<CashSession>> {
        self.inner.open_session_for_channel(channel_id).await
    }

    async fn session(&self, id: &str) -> StoreResult<CashSession> {
        self.inner.session(id).await
    }

    async fn insert_session(&self, session: &CashSession) -> StoreResult<()> {
        self.inner.insert_session(session).await
    }

    async fn record_session_sale(&self, session_id: &str, amount: Money) -> StoreResult<CashSession> {
        self.inner.record_session_sale(session_id, amount).await
    }

    async fn close_session(&self, session: &CashSession) -> StoreResult<()> {
        let cents = self.sale_before_close.swap(0, Ordering::SeqCst);
        if cents > 0 {
            self.inner
                .record_session_sale(&session.id, Money::from_cents(cents))
                .await?;
        }
        self.inner.close_session(session).await
    }

    async fn find_order_by_token(&self, token: &str) -> StoreResult<Option<String>> {
        self.inner.find_order_by_token(token).await
    }

    async fn order(&self, id: &str) -> StoreResult<Order> {
        self.inner.order(id).await
    }

    async fn commit_order(&self, order: &Order) -> StoreResult<CommitOutcome> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.commit_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let outcome = self.inner.commit_order(order).await?;

        let lose = self
            .lose_acks
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lose {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        Ok(outcome)
    }
}
