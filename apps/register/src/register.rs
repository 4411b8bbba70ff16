//! # Register
//!
//! The host surface of one register: every operation a UI (or the console)
//! performs goes through here.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              Register                                   │
//! │                                                                         │
//! │  open_session / close_session ───────► CashSessionManager               │
//! │                                                                         │
//! │  start_sale                                                             │
//! │  configure_sale / go_to_step                                            │
//! │  search_products / add_to_cart ...  ──► WizardSlot (Mutex) ──► core     │
//! │  update_customer / update_shipping       │                              │
//! │  add_payment / remove_payment            │ reference data pulled from   │
//! │                                          │ the store at step entry      │
//! │  submit_order ─────────────────────────► OrderFinalizer                 │
//! │                                                                         │
//! │  every edit returns a SaleSnapshot                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The wizard lock is held for the whole operation, store reads and the
//! commit included, so two calls on the same register never interleave.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use kiosko_core::shipping::resolve_rate;
use kiosko_core::validation::{validate_document_number, validate_search_query};
use kiosko_core::{
    CartAdd, CashSession, ClosedSession, CoreError, CustomerData, DocumentType, Location,
    LocationLevel, Money, Order, PaymentMethod, PosStore, PriceList, SaleConfiguration,
    SaleProduct, ShippingMethod, ShippingUpdate, StockType, WizardState, WizardStep,
};

use crate::config::RegisterConfig;
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::finalizer::OrderFinalizer;
use crate::session_manager::CashSessionManager;
use crate::snapshot::SaleSnapshot;
use crate::state::{active, WizardSlot};

/// Result of `add_to_cart`: what happened, plus the sale after it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartUpdate {
    pub outcome: CartAdd,
    pub sale: SaleSnapshot,
}

/// Result of `submit_order`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    pub order_id: String,
    pub sale: SaleSnapshot,
}

#[derive(Clone)]
pub struct Register {
    store: Arc<dyn PosStore>,
    config: RegisterConfig,
    sessions: CashSessionManager,
    finalizer: OrderFinalizer,
    wizard: WizardSlot,
}

impl Register {
    pub fn new(store: Arc<dyn PosStore>, config: RegisterConfig) -> Self {
        let sessions = CashSessionManager::new(store.clone());
        let finalizer = OrderFinalizer::new(
            store.clone(),
            config.checkout.commit_timeout(),
            config.checkout.vat_rate(),
        );
        Register {
            store,
            config,
            sessions,
            finalizer,
            wizard: WizardSlot::new(),
        }
    }

    pub fn config(&self) -> &RegisterConfig {
        &self.config
    }

    fn channel_id(&self) -> &str {
        &self.config.register.channel_id
    }

    fn snapshot_of(&self, state: &WizardState) -> SaleSnapshot {
        SaleSnapshot::capture(state, self.config.checkout.vat_rate())
    }

    // =========================================================================
    // Cash Session
    // =========================================================================

    pub async fn open_session(&self, opening_amount: Money, notes: Option<&str>) -> ApiResult<CashSession> {
        self.sessions
            .open_session(self.channel_id(), opening_amount, notes)
            .await
    }

    /// Closes this channel's open session. A sale in progress is discarded.
    pub async fn close_session(&self, counted_amount: Money, notes: Option<&str>) -> ApiResult<ClosedSession> {
        let session = self.require_open_session().await?;
        let mut slot = self.wizard.lock().await;

        let closed = self
            .sessions
            .close_session(&session.id, counted_amount, notes)
            .await?;

        if slot.take().is_some() {
            debug!(session_id = %session.id, "Sale in progress discarded on close");
        }
        Ok(closed)
    }

    pub async fn current_session(&self) -> ApiResult<Option<CashSession>> {
        self.sessions.current_session(self.channel_id()).await
    }

    async fn require_open_session(&self) -> ApiResult<CashSession> {
        self.current_session()
            .await?
            .ok_or_else(|| ApiError::not_found("Open cash session", self.channel_id()))
    }

    // =========================================================================
    // Step 1: Configuration
    // =========================================================================

    /// Starts a fresh sale on the open session, preselecting the channel's
    /// warehouse and default price list. Any previous sale is discarded.
    pub async fn start_sale(&self) -> ApiResult<SaleSnapshot> {
        let session = self.require_open_session().await?;
        let channel = self.store.channel(self.channel_id()).await?;

        let state = WizardState::new(
            session.id.clone(),
            SaleConfiguration {
                channel_id: channel.id.clone(),
                price_list_id: channel.default_price_list_id.clone(),
                warehouse_id: Some(channel.warehouse_id.clone()),
                stock_type_id: self.config.checkout.default_stock_type_id.clone(),
            },
        );

        info!(session_id = %session.id, token = %state.submission_token, "Sale started");
        let snapshot = self.snapshot_of(&state);
        self.wizard.replace(state).await;
        Ok(snapshot)
    }

    /// Selects price list, warehouse and stock type after checking each
    /// exists. `stock_type_id` defaults to the configured one.
    pub async fn configure_sale(
        &self,
        price_list_id: &str,
        warehouse_id: &str,
        stock_type_id: Option<&str>,
    ) -> ApiResult<SaleSnapshot> {
        let mut slot = self.wizard.lock().await;
        let state = active(&mut slot)?;

        let price_list = self.store.price_list(price_list_id).await?;
        if !price_list.is_active {
            return Err(ApiError::validation(format!(
                "Price list {} is inactive",
                price_list.name
            )));
        }
        let warehouse = self.store.warehouse(warehouse_id).await?;

        let stock_type_id = stock_type_id
            .unwrap_or(self.config.checkout.default_stock_type_id.as_str())
            .to_string();
        let stock_types = self.store.stock_types().await?;
        if !stock_types.iter().any(|t| t.id == stock_type_id) {
            return Err(ApiError::not_found("Stock type", &stock_type_id));
        }

        state.configure(Some(price_list.id), Some(warehouse.id), stock_type_id)?;
        debug!(
            price_list_id = %price_list_id,
            warehouse_id = %warehouse_id,
            "Sale configured"
        );
        Ok(self.snapshot_of(state))
    }

    /// Navigates to the step with operator number `number` (1-5).
    pub async fn go_to_step(&self, number: u8) -> ApiResult<SaleSnapshot> {
        let step = WizardStep::from_number(number)
            .ok_or_else(|| ApiError::validation(format!("Unknown step {}", number)))?;

        let mut slot = self.wizard.lock().await;
        let state = active(&mut slot)?;
        state.go_to_step(step)?;
        debug!(step = %step, "Wizard step changed");
        Ok(self.snapshot_of(state))
    }

    // =========================================================================
    // Step 2: Products
    // =========================================================================

    /// Searches the configured price list and warehouse.
    pub async fn search_products(&self, query: &str) -> ApiResult<Vec<SaleProduct>> {
        let query = validate_search_query(query)?;

        let mut slot = self.wizard.lock().await;
        let state = active(&mut slot)?;
        let (price_list_id, warehouse_id) = configured_scope(state)?;

        let products = self
            .store
            .search_products(
                &query,
                &price_list_id,
                &warehouse_id,
                &state.configuration.stock_type_id,
                self.config.checkout.search_limit,
            )
            .await?;

        debug!(query = %query, results = products.len(), "Product search");
        Ok(products)
    }

    /// Adds one unit of a variation, priced and stocked at the current
    /// configuration.
    pub async fn add_to_cart(&self, variation_id: &str) -> ApiResult<CartUpdate> {
        let mut slot = self.wizard.lock().await;
        let state = active(&mut slot)?;
        let (price_list_id, warehouse_id) = configured_scope(state)?;

        let product = self
            .store
            .sale_product(
                variation_id,
                &price_list_id,
                &warehouse_id,
                &state.configuration.stock_type_id,
            )
            .await?;

        let outcome = state.add_to_cart(&product)?;
        debug!(variation_id = %variation_id, ?outcome, "Add to cart");
        Ok(CartUpdate {
            outcome,
            sale: self.snapshot_of(state),
        })
    }

    pub async fn update_cart_item(
        &self,
        index: usize,
        quantity: i64,
        discount: Option<Money>,
    ) -> ApiResult<SaleSnapshot> {
        let mut slot = self.wizard.lock().await;
        let state = active(&mut slot)?;
        state.update_cart_item(index, quantity, discount)?;
        debug!(index, quantity, "Cart line updated");
        Ok(self.snapshot_of(state))
    }

    pub async fn remove_from_cart(&self, index: usize) -> ApiResult<SaleSnapshot> {
        let mut slot = self.wizard.lock().await;
        let state = active(&mut slot)?;
        state.remove_from_cart(index)?;
        debug!(index, "Cart line removed");
        Ok(self.snapshot_of(state))
    }

    // =========================================================================
    // Step 3: Customer
    // =========================================================================

    /// Looks up a known customer by document. `None` means "enter manually".
    pub async fn search_client(
        &self,
        document_type_id: &str,
        document_number: &str,
    ) -> ApiResult<Option<CustomerData>> {
        validate_document_number(document_number)?;
        Ok(self
            .store
            .find_customer(document_type_id, document_number)
            .await?)
    }

    pub async fn update_customer(&self, customer: CustomerData) -> ApiResult<SaleSnapshot> {
        let mut slot = self.wizard.lock().await;
        let state = active(&mut slot)?;

        if let Some(doc_type) = &customer.document_type_id {
            let types = self.store.document_types().await?;
            if !types.iter().any(|t| &t.id == doc_type) {
                return Err(ApiError::not_found("Document type", doc_type));
            }
        }

        state.update_customer(customer)?;
        debug!(
            requires_shipping = state.customer.requires_shipping,
            complete = state.customer.is_complete(),
            "Customer updated"
        );
        Ok(self.snapshot_of(state))
    }

    // =========================================================================
    // Step 4: Shipping
    // =========================================================================

    pub async fn locations(
        &self,
        level: LocationLevel,
        parent_id: Option<&str>,
    ) -> ApiResult<Vec<Location>> {
        Ok(self.store.locations(level, parent_id).await?)
    }

    /// Applies the shipping details, checking every chosen location hangs
    /// from its parent, and resolves the cost from the rate table.
    pub async fn update_shipping(&self, update: ShippingUpdate) -> ApiResult<SaleSnapshot> {
        let mut slot = self.wizard.lock().await;
        let state = active(&mut slot)?;
        ensure_reachable(state, WizardStep::Shipping)?;

        let mut preview = state.shipping.clone();
        preview.apply(update.clone())?;

        let mut parent: Option<&str> = None;
        for (level, location_id) in preview.chain() {
            let children = self.store.locations(level, parent).await?;
            if !children.iter().any(|l| l.id == location_id) {
                return Err(ApiError::not_found("Location", location_id));
            }
            parent = Some(location_id);
        }

        let mut cost = None;
        if let Some(method_id) = &preview.shipping_method_id {
            let methods = self.store.shipping_methods().await?;
            if !methods.iter().any(|m| &m.id == method_id) {
                return Err(ApiError::not_found("Shipping method", method_id));
            }
            if preview.has_full_chain() {
                let rates = self.store.shipping_rates(method_id).await?;
                cost = resolve_rate(&rates, method_id, &preview);
                if cost.is_none() {
                    debug!(method_id = %method_id, "No shipping rate for the selected location");
                }
            }
        }

        state.update_shipping(update, cost)?;
        debug!(cost = ?state.shipping.cost, "Shipping updated");
        Ok(self.snapshot_of(state))
    }

    // =========================================================================
    // Step 5: Payment
    // =========================================================================

    pub async fn add_payment(
        &self,
        method_id: &str,
        amount: Money,
        confirmation_code: Option<String>,
        voucher_ref: Option<String>,
    ) -> ApiResult<SaleSnapshot> {
        let mut slot = self.wizard.lock().await;
        let state = active(&mut slot)?;

        let methods = self.store.payment_methods().await?;
        let method = methods
            .iter()
            .find(|m| m.id == method_id)
            .ok_or_else(|| ApiError::not_found("Payment method", method_id))?;

        let payment = state.add_payment(
            method,
            amount,
            confirmation_code,
            voucher_ref,
            self.config.checkout.require_confirmation_code,
        )?;
        debug!(
            local_id = payment.local_id,
            method = %payment.method_name,
            amount = %payment.amount,
            "Payment added"
        );
        Ok(self.snapshot_of(state))
    }

    pub async fn remove_payment(&self, local_id: u64) -> ApiResult<SaleSnapshot> {
        let mut slot = self.wizard.lock().await;
        let state = active(&mut slot)?;
        state.remove_payment(local_id)?;
        debug!(local_id, "Payment removed");
        Ok(self.snapshot_of(state))
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Commits the sale. Safe to call again after a failure: the same
    /// submission token is sent.
    pub async fn submit_order(&self) -> ApiResult<SubmitResult> {
        let mut slot = self.wizard.lock().await;
        let state = active(&mut slot)?;
        let order_id = self.finalizer.submit(state).await?;
        Ok(SubmitResult {
            order_id,
            sale: self.snapshot_of(state),
        })
    }

    /// Starts the sale over on the same session and configuration.
    pub async fn reset_all(&self) -> ApiResult<SaleSnapshot> {
        let mut slot = self.wizard.lock().await;
        let state = active(&mut slot)?;
        state.reset_all();
        debug!(token = %state.submission_token, "Sale reset");
        Ok(self.snapshot_of(state))
    }

    pub async fn snapshot(&self) -> ApiResult<SaleSnapshot> {
        let mut slot = self.wizard.lock().await;
        let state = active(&mut slot)?;
        Ok(self.snapshot_of(state))
    }

    // =========================================================================
    // Orders & Reference Data
    // =========================================================================

    pub async fn order(&self, order_id: &str) -> ApiResult<Order> {
        Ok(self.store.order(order_id).await?)
    }

    pub async fn receipt(&self, order_id: &str) -> ApiResult<String> {
        let order = self.order(order_id).await?;
        Ok(order.render_receipt(
            &self.config.store.name,
            &self.config.store.currency_symbol,
            self.config.checkout.vat_rate(),
        ))
    }

    pub async fn price_lists(&self) -> ApiResult<Vec<PriceList>> {
        Ok(self.store.price_lists().await?)
    }

    pub async fn stock_types(&self) -> ApiResult<Vec<StockType>> {
        Ok(self.store.stock_types().await?)
    }

    pub async fn payment_methods(&self) -> ApiResult<Vec<PaymentMethod>> {
        Ok(self.store.payment_methods().await?)
    }

    pub async fn document_types(&self) -> ApiResult<Vec<DocumentType>> {
        Ok(self.store.document_types().await?)
    }

    pub async fn shipping_methods(&self) -> ApiResult<Vec<ShippingMethod>> {
        Ok(self.store.shipping_methods().await?)
    }
}

/// Price list and warehouse of a configured sale.
fn configured_scope(state: &WizardState) -> ApiResult<(String, String)> {
    match (
        &state.configuration.price_list_id,
        &state.configuration.warehouse_id,
    ) {
        (Some(price_list_id), Some(warehouse_id)) => {
            Ok((price_list_id.clone(), warehouse_id.clone()))
        }
        _ => Err(ApiError::new(
            ErrorCode::StepBlocked,
            "Select a price list and a warehouse first",
        )),
    }
}

/// Same gate the wizard applies to edits, checked before any store reads.
fn ensure_reachable(state: &WizardState, step: WizardStep) -> ApiResult<()> {
    if let Some(order_id) = &state.completed_order_id {
        return Err(CoreError::SaleCompleted {
            order_id: order_id.clone(),
        }
        .into());
    }
    if !state.is_offered(step) {
        return Err(CoreError::StepNotOffered(step).into());
    }
    if let Some(blocked_by) = state.blocking_step(step) {
        return Err(CoreError::StepBlocked {
            requested: step,
            blocked_by,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosko_db::seed::seed_demo_data;
    use kiosko_db::{Database, DbConfig, SqliteStore};

    async fn register() -> Register {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_demo_data(&db).await.unwrap();
        Register::new(Arc::new(SqliteStore::new(db)), RegisterConfig::default())
    }

    #[tokio::test]
    async fn test_start_sale_requires_open_session() {
        let register = register().await;
        let err = register.start_sale().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_edits_without_sale_are_rejected() {
        let register = register().await;
        let err = register.go_to_step(2).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NoActiveSale);
    }

    #[tokio::test]
    async fn test_start_sale_preselects_channel_defaults() {
        let register = register().await;
        register.open_session(Money::from_cents(10000), None).await.unwrap();

        let sale = register.start_sale().await.unwrap();

        assert_eq!(sale.step, WizardStep::Configuration);
        assert_eq!(sale.configuration.price_list_id.as_deref(), Some("pl-retail"));
        assert_eq!(sale.configuration.warehouse_id.as_deref(), Some("wh-main"));
        assert!(sale.steps[1].can_proceed);
    }

    #[tokio::test]
    async fn test_configure_rejects_unknown_price_list() {
        let register = register().await;
        register.open_session(Money::from_cents(10000), None).await.unwrap();
        register.start_sale().await.unwrap();

        let err = register
            .configure_sale("pl-missing", "wh-main", None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_unknown_step_number() {
        let register = register().await;
        register.open_session(Money::from_cents(10000), None).await.unwrap();
        register.start_sale().await.unwrap();

        let err = register.go_to_step(9).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_search_uses_configured_price_list() {
        let register = register().await;
        register.open_session(Money::from_cents(10000), None).await.unwrap();
        register.start_sale().await.unwrap();

        let results = register.search_products("shirt").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].unit_price(), Money::from_cents(2500));

        register
            .configure_sale("pl-wholesale", "wh-main", None)
            .await
            .unwrap();
        let results = register.search_products("shirt").await.unwrap();
        assert_eq!(results[0].unit_price(), Money::from_cents(2000));
    }

    #[tokio::test]
    async fn test_close_session_discards_sale() {
        let register = register().await;
        register.open_session(Money::from_cents(10000), None).await.unwrap();
        register.start_sale().await.unwrap();

        register
            .close_session(Money::from_cents(10000), None)
            .await
            .unwrap();

        let err = register.snapshot().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NoActiveSale);
    }
}
