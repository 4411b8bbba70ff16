//! # Sale Wizard
//!
//! One `WizardState` aggregate holds everything about the sale in progress
//! and decides which step the register may show.
//!
//! ## Step Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Configuration(1) ─► Products(2) ─► CustomerData(3) ─┬─► Shipping(4) ─┐ │
//! │  price list +        cart not       doc type, doc #, │   full chain + │ │
//! │  warehouse           empty          name             │   method, cost │ │
//! │                                                      │                ▼ │
//! │                               requires_shipping=false└──────► Payment(5)│
//! │                                                                paid ≥   │
//! │                                                                total    │
//! │                                                                  │      │
//! │                                               submit (commit ok) ▼      │
//! │                                                              Completed  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Navigation
//! - Backward moves are always allowed
//! - Forward moves need every earlier step in the sequence complete
//! - Completed is entered only by a successful commit
//! - After each edit the current step falls back to the furthest step whose
//!   guard still holds (emptying the cart at Payment lands on Products)
//!
//! ## Editing
//! Each piece of state can be edited once its step is reachable. Once the
//! sale is Completed, only `reset_all` is accepted.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::cart::{Cart, CartAdd};
use crate::customer::CustomerData;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::payment::{PaymentCollector, TenderedPayment};
use crate::shipping::{ShippingSelection, ShippingUpdate};
use crate::types::{PaymentMethod, SaleProduct, TaxRate};

// =============================================================================
// Wizard Step
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Configuration,
    Products,
    CustomerData,
    Shipping,
    Payment,
    Completed,
}

impl WizardStep {
    /// Steps a sale can be navigated to, in order.
    pub const NAVIGABLE: [WizardStep; 5] = [
        WizardStep::Configuration,
        WizardStep::Products,
        WizardStep::CustomerData,
        WizardStep::Shipping,
        WizardStep::Payment,
    ];

    /// Step number shown to the operator. Completed has none.
    pub fn number(&self) -> Option<u8> {
        match self {
            WizardStep::Configuration => Some(1),
            WizardStep::Products => Some(2),
            WizardStep::CustomerData => Some(3),
            WizardStep::Shipping => Some(4),
            WizardStep::Payment => Some(5),
            WizardStep::Completed => None,
        }
    }

    pub fn from_number(n: u8) -> Option<WizardStep> {
        WizardStep::NAVIGABLE
            .iter()
            .copied()
            .find(|s| s.number() == Some(n))
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WizardStep::Configuration => "configuration",
            WizardStep::Products => "products",
            WizardStep::CustomerData => "customer data",
            WizardStep::Shipping => "shipping",
            WizardStep::Payment => "payment",
            WizardStep::Completed => "completed",
        })
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Step 1 selection: where prices and stock come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleConfiguration {
    pub channel_id: String,
    pub price_list_id: Option<String>,
    pub warehouse_id: Option<String>,
    pub stock_type_id: String,
}

impl SaleConfiguration {
    pub fn is_complete(&self) -> bool {
        self.price_list_id.is_some() && self.warehouse_id.is_some()
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Read-only figures derived from the wizard state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WizardTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub total_paid: Money,
    pub change_amount: Money,
    pub pending_amount: Money,
    pub can_finalize: bool,
    /// VAT-exclusive portion of `total`.
    pub vat_base: Money,
    /// VAT contained in `total`.
    pub vat_amount: Money,
}

// =============================================================================
// Wizard State
// =============================================================================

/// The sale in progress for one register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WizardState {
    /// Cash session the sale will be recorded against.
    pub session_id: String,
    pub configuration: SaleConfiguration,
    pub cart: Cart,
    pub customer: CustomerData,
    pub shipping: ShippingSelection,
    pub payments: PaymentCollector,
    pub step: WizardStep,
    /// Idempotency key for the commit; one per sale.
    pub submission_token: String,
    pub completed_order_id: Option<String>,
    /// Message of the last failed commit, cleared by the next edit.
    pub last_error: Option<String>,
}

impl WizardState {
    /// Starts a sale at Configuration.
    pub fn new(session_id: String, configuration: SaleConfiguration) -> Self {
        WizardState {
            session_id,
            configuration,
            cart: Cart::new(),
            customer: CustomerData::default(),
            shipping: ShippingSelection::default(),
            payments: PaymentCollector::new(),
            step: WizardStep::Configuration,
            submission_token: new_submission_token(),
            completed_order_id: None,
            last_error: None,
        }
    }

    // -------------------------------------------------------------------------
    // Sequencing
    // -------------------------------------------------------------------------

    /// Steps offered for this sale. Shipping only when the customer needs it.
    pub fn sequence(&self) -> Vec<WizardStep> {
        WizardStep::NAVIGABLE
            .iter()
            .copied()
            .filter(|s| self.is_offered(*s))
            .collect()
    }

    pub fn is_offered(&self, step: WizardStep) -> bool {
        match step {
            WizardStep::Shipping => self.customer.requires_shipping,
            _ => true,
        }
    }

    /// Whether the data collected at `step` is complete.
    pub fn step_complete(&self, step: WizardStep) -> bool {
        match step {
            WizardStep::Configuration => self.configuration.is_complete(),
            WizardStep::Products => !self.cart.is_empty(),
            WizardStep::CustomerData => self.customer.is_complete(),
            WizardStep::Shipping => !self.customer.requires_shipping || self.shipping.is_complete(),
            WizardStep::Payment => self.payments.can_finalize(self.total()),
            WizardStep::Completed => self.completed_order_id.is_some(),
        }
    }

    /// First incomplete step that stands before `step`, if any.
    pub fn blocking_step(&self, step: WizardStep) -> Option<WizardStep> {
        self.sequence()
            .into_iter()
            .take_while(|s| *s < step)
            .find(|s| !self.step_complete(*s))
    }

    /// `step` is offered and every earlier step in the sequence is complete.
    ///
    /// For `Completed` this is the finalize gate: every step including
    /// Payment is complete.
    pub fn can_proceed_to(&self, step: WizardStep) -> bool {
        (step == WizardStep::Completed || self.is_offered(step)) && self.blocking_step(step).is_none()
    }

    /// Moves to `step`, backward freely, forward only through complete steps.
    pub fn go_to_step(&mut self, step: WizardStep) -> CoreResult<WizardStep> {
        self.ensure_editable()?;

        if step == WizardStep::Completed {
            return Err(CoreError::NotReadyToSubmit {
                reason: "a sale is completed only by submitting it".to_string(),
            });
        }
        if !self.is_offered(step) {
            return Err(CoreError::StepNotOffered(step));
        }
        if step > self.step {
            if let Some(blocked_by) = self.blocking_step(step) {
                return Err(CoreError::StepBlocked {
                    requested: step,
                    blocked_by,
                });
            }
        }

        self.step = step;
        Ok(self.step)
    }

    /// Falls back to the furthest reachable step at or before the current one.
    fn settle_step(&mut self) {
        if self.step == WizardStep::Completed {
            return;
        }
        if self.is_offered(self.step) && self.can_proceed_to(self.step) {
            return;
        }
        let current = self.step;
        self.step = self
            .sequence()
            .into_iter()
            .filter(|s| *s <= current && self.can_proceed_to(*s))
            .last()
            .unwrap_or(WizardStep::Configuration);
    }

    fn ensure_editable(&self) -> CoreResult<()> {
        match &self.completed_order_id {
            Some(order_id) => Err(CoreError::SaleCompleted {
                order_id: order_id.clone(),
            }),
            None => Ok(()),
        }
    }

    fn ensure_reachable(&self, step: WizardStep) -> CoreResult<()> {
        self.ensure_editable()?;
        if !self.is_offered(step) {
            return Err(CoreError::StepNotOffered(step));
        }
        if let Some(blocked_by) = self.blocking_step(step) {
            return Err(CoreError::StepBlocked {
                requested: step,
                blocked_by,
            });
        }
        Ok(())
    }

    fn after_edit(&mut self) {
        self.last_error = None;
        self.settle_step();
    }

    // -------------------------------------------------------------------------
    // Step 1: Configuration
    // -------------------------------------------------------------------------

    /// Sets price list, warehouse and stock type.
    ///
    /// Cart prices and stock snapshots belong to the previous selection, so
    /// changing price list, warehouse or stock type empties the cart and the
    /// payments.
    pub fn configure(
        &mut self,
        price_list_id: Option<String>,
        warehouse_id: Option<String>,
        stock_type_id: String,
    ) -> CoreResult<()> {
        self.ensure_editable()?;

        let changed = self.configuration.price_list_id != price_list_id
            || self.configuration.warehouse_id != warehouse_id
            || self.configuration.stock_type_id != stock_type_id;
        if changed {
            self.cart.clear();
            self.payments.clear();
        }

        self.configuration.price_list_id = price_list_id;
        self.configuration.warehouse_id = warehouse_id;
        self.configuration.stock_type_id = stock_type_id;
        self.after_edit();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Step 2: Products
    // -------------------------------------------------------------------------

    pub fn add_to_cart(&mut self, product: &SaleProduct) -> CoreResult<CartAdd> {
        self.ensure_reachable(WizardStep::Products)?;
        let stock_type_id = self.configuration.stock_type_id.clone();
        let outcome = self.cart.add(product, &stock_type_id)?;
        self.after_edit();
        Ok(outcome)
    }

    /// Sets quantity (clamped) and optionally the line discount (clamped).
    pub fn update_cart_item(
        &mut self,
        index: usize,
        quantity: i64,
        discount: Option<Money>,
    ) -> CoreResult<()> {
        self.ensure_reachable(WizardStep::Products)?;
        self.cart.update_quantity(index, quantity)?;
        if let Some(discount) = discount {
            self.cart.update_discount(index, discount)?;
        }
        self.after_edit();
        Ok(())
    }

    pub fn remove_from_cart(&mut self, index: usize) -> CoreResult<()> {
        self.ensure_reachable(WizardStep::Products)?;
        self.cart.remove(index)?;
        self.after_edit();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Step 3: Customer
    // -------------------------------------------------------------------------

    /// Replaces the customer data. Turning shipping off discards the
    /// shipping selection.
    pub fn update_customer(&mut self, customer: CustomerData) -> CoreResult<()> {
        self.ensure_reachable(WizardStep::CustomerData)?;
        if !customer.requires_shipping {
            self.shipping = ShippingSelection::default();
        }
        self.customer = customer;
        self.after_edit();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Step 4: Shipping
    // -------------------------------------------------------------------------

    /// Applies a shipping update and stores the cost the caller resolved
    /// for it (`None` when no rate matches).
    pub fn update_shipping(&mut self, update: ShippingUpdate, cost: Option<Money>) -> CoreResult<()> {
        self.ensure_reachable(WizardStep::Shipping)?;
        self.shipping.apply(update)?;
        if self.shipping.has_full_chain() && self.shipping.shipping_method_id.is_some() {
            self.shipping.cost = cost;
        }
        self.after_edit();
        Ok(())
    }

    /// Shipping cost counted in the total: zero unless shipping applies.
    pub fn shipping_cost(&self) -> Money {
        if self.customer.requires_shipping {
            self.shipping.cost.unwrap_or_default()
        } else {
            Money::zero()
        }
    }

    // -------------------------------------------------------------------------
    // Step 5: Payment
    // -------------------------------------------------------------------------

    pub fn add_payment(
        &mut self,
        method: &PaymentMethod,
        amount: Money,
        confirmation_code: Option<String>,
        voucher_ref: Option<String>,
        require_code: bool,
    ) -> CoreResult<TenderedPayment> {
        self.ensure_reachable(WizardStep::Payment)?;
        let payment = self
            .payments
            .add(method, amount, confirmation_code, voucher_ref, require_code)?;
        self.after_edit();
        Ok(payment)
    }

    pub fn remove_payment(&mut self, local_id: u64) -> CoreResult<TenderedPayment> {
        self.ensure_reachable(WizardStep::Payment)?;
        let payment = self.payments.remove(local_id)?;
        self.after_edit();
        Ok(payment)
    }

    // -------------------------------------------------------------------------
    // Totals
    // -------------------------------------------------------------------------

    /// `subtotal − discount + shipping_cost`
    pub fn total(&self) -> Money {
        self.cart.total(self.shipping_cost())
    }

    pub fn totals(&self, vat: TaxRate) -> WizardTotals {
        let total = self.total();
        let (vat_base, vat_amount) = total.split_inclusive_tax(vat);
        WizardTotals {
            item_count: self.cart.len(),
            total_quantity: self.cart.total_quantity(),
            subtotal: self.cart.subtotal(),
            discount_amount: self.cart.discount(),
            shipping_cost: self.shipping_cost(),
            total,
            total_paid: self.payments.total_paid(),
            change_amount: self.payments.change(total),
            pending_amount: self.payments.pending(total),
            can_finalize: self.payments.can_finalize(total),
            vat_base,
            vat_amount,
        }
    }

    // -------------------------------------------------------------------------
    // Submission
    // -------------------------------------------------------------------------

    /// Checks every precondition of a commit.
    pub fn ensure_submittable(&self) -> CoreResult<()> {
        self.ensure_editable()?;

        let not_ready = |reason: &str| {
            Err(CoreError::NotReadyToSubmit {
                reason: reason.to_string(),
            })
        };

        if self.step != WizardStep::Payment {
            return not_ready("the sale is not at the payment step");
        }
        if !self.configuration.is_complete() {
            return not_ready("price list and warehouse must be selected");
        }
        if self.cart.is_empty() {
            return not_ready("the cart is empty");
        }
        self.customer.validate()?;
        if self.customer.requires_shipping && !self.shipping.is_complete() {
            return not_ready("shipping details are incomplete");
        }
        if !self.payments.can_finalize(self.total()) {
            return not_ready("payments do not cover the total");
        }
        Ok(())
    }

    /// Records a commit failure; the sale stays at Payment.
    pub fn mark_failed(&mut self, message: String) {
        self.last_error = Some(message);
    }

    /// Records an acknowledged commit.
    pub fn mark_completed(&mut self, order_id: String) {
        self.completed_order_id = Some(order_id);
        self.last_error = None;
        self.step = WizardStep::Completed;
    }

    pub fn is_completed(&self) -> bool {
        self.step == WizardStep::Completed
    }

    /// Discards cart, customer, shipping and payments and starts over at
    /// Configuration with a fresh submission token. The configuration and
    /// the cash session are kept.
    pub fn reset_all(&mut self) {
        *self = WizardState::new(self.session_id.clone(), self.configuration.clone());
    }
}

fn new_submission_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
