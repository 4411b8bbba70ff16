//! # Order
//!
//! The immutable record of a committed sale, built from a wizard state that
//! passed every submission check.
//!
//! ```text
//! WizardState ──ensure_submittable()──► Order::from_wizard()
//!                                          │
//!                                          ├── lines     (cart snapshot)
//!                                          ├── payments  (tender snapshot)
//!                                          ├── shipping  (only if required)
//!                                          └── totals + VAT breakdown
//!                                          │
//!                                          ▼
//!                               PosStore::commit_order() (one transaction)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use ts_rs::TS;

use crate::customer::CustomerData;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::TaxRate;
use crate::wizard::WizardState;

/// One sold line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLine {
    pub variation_id: String,
    pub stock_type_id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: Money,
    /// `quantity × unit_price − discount`
    pub line_total: Money,
}

/// One tender as recorded with the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderPayment {
    pub method_id: String,
    pub method_name: String,
    pub is_cash: bool,
    pub amount: Money,
    pub confirmation_code: Option<String>,
    pub voucher_ref: Option<String>,
}

/// Delivery details of an order that ships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderShipping {
    pub country_id: String,
    pub state_id: String,
    pub city_id: String,
    pub neighborhood_id: String,
    pub shipping_method_id: String,
    pub cost: Money,
    pub address: Option<String>,
    pub reference: Option<String>,
}

/// A committed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Idempotency key carried over from the wizard.
    pub submission_token: String,
    pub session_id: String,
    pub channel_id: String,
    pub warehouse_id: String,
    pub price_list_id: String,
    pub customer: CustomerData,
    pub lines: Vec<OrderLine>,
    pub payments: Vec<OrderPayment>,
    pub shipping: Option<OrderShipping>,
    pub subtotal: Money,
    pub discount: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub total_paid: Money,
    pub change: Money,
    pub vat_base: Money,
    pub vat_amount: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Snapshots a submittable wizard into an order.
    ///
    /// Fails with the first unmet submission precondition.
    pub fn from_wizard(
        state: &WizardState,
        id: String,
        vat: TaxRate,
        now: DateTime<Utc>,
    ) -> CoreResult<Order> {
        state.ensure_submittable()?;

        let not_ready = |reason: &str| CoreError::NotReadyToSubmit {
            reason: reason.to_string(),
        };
        let price_list_id = state
            .configuration
            .price_list_id
            .clone()
            .ok_or_else(|| not_ready("no price list selected"))?;
        let warehouse_id = state
            .configuration
            .warehouse_id
            .clone()
            .ok_or_else(|| not_ready("no warehouse selected"))?;

        let shipping = if state.customer.requires_shipping {
            Some(snapshot_shipping(state).ok_or_else(|| not_ready("shipping details are incomplete"))?)
        } else {
            None
        };

        let lines = state
            .cart
            .lines()
            .iter()
            .map(|l| OrderLine {
                variation_id: l.variation_id.clone(),
                stock_type_id: l.stock_type_id.clone(),
                sku: l.sku.clone(),
                name: l.name.clone(),
                quantity: l.quantity,
                unit_price: l.unit_price,
                discount: l.discount,
                line_total: l.total(),
            })
            .collect();

        let payments = state
            .payments
            .payments()
            .iter()
            .map(|p| OrderPayment {
                method_id: p.method_id.clone(),
                method_name: p.method_name.clone(),
                is_cash: p.is_cash,
                amount: p.amount,
                confirmation_code: p.confirmation_code.clone(),
                voucher_ref: p.voucher_ref.clone(),
            })
            .collect();

        let totals = state.totals(vat);

        Ok(Order {
            id,
            submission_token: state.submission_token.clone(),
            session_id: state.session_id.clone(),
            channel_id: state.configuration.channel_id.clone(),
            warehouse_id,
            price_list_id,
            customer: state.customer.clone(),
            lines,
            payments,
            shipping,
            subtotal: totals.subtotal,
            discount: totals.discount_amount,
            shipping_cost: totals.shipping_cost,
            total: totals.total,
            total_paid: totals.total_paid,
            change: totals.change_amount,
            vat_base: totals.vat_base,
            vat_amount: totals.vat_amount,
            created_at: now,
        })
    }

    /// Plain-text receipt, 40 columns wide. `vat` is the rate the order's
    /// breakdown was computed with.
    pub fn render_receipt(&self, store_name: &str, currency_symbol: &str, vat: TaxRate) -> String {
        const WIDTH: usize = 40;
        let rule = "-".repeat(WIDTH);
        let amount = |m: Money| format!("{}{}", currency_symbol, m);
        let row = |label: &str, value: String| {
            let pad = WIDTH.saturating_sub(label.chars().count() + value.chars().count());
            format!("{}{}{}\n", label, " ".repeat(pad), value)
        };

        let mut out = String::new();
        let _ = writeln!(out, "{:^width$}", store_name, width = WIDTH);
        let _ = writeln!(out, "Order {}", self.id);
        let _ = writeln!(out, "{}", self.created_at.format("%Y-%m-%d %H:%M"));
        let _ = writeln!(out, "Customer: {}", self.customer.display_name());
        let _ = writeln!(out, "{}", rule);

        for line in &self.lines {
            let _ = writeln!(out, "{}", line.name);
            out.push_str(&row(
                &format!("  {} x {}", line.quantity, amount(line.unit_price)),
                amount(line.line_total),
            ));
            if line.discount.is_positive() {
                out.push_str(&row("  discount", format!("-{}", amount(line.discount))));
            }
        }

        let _ = writeln!(out, "{}", rule);
        out.push_str(&row("Subtotal", amount(self.subtotal)));
        if self.discount.is_positive() {
            out.push_str(&row("Discount", format!("-{}", amount(self.discount))));
        }
        if self.shipping.is_some() {
            out.push_str(&row("Shipping", amount(self.shipping_cost)));
        }
        out.push_str(&row("TOTAL", amount(self.total)));
        out.push_str(&row("  taxable base", amount(self.vat_base)));
        out.push_str(&row(&format!("  VAT {}%", vat.percentage()), amount(self.vat_amount)));
        let _ = writeln!(out, "{}", rule);

        for payment in &self.payments {
            out.push_str(&row(&payment.method_name, amount(payment.amount)));
        }
        out.push_str(&row("Change", amount(self.change)));
        out
    }
}

fn snapshot_shipping(state: &WizardState) -> Option<OrderShipping> {
    let s = &state.shipping;
    Some(OrderShipping {
        country_id: s.country_id.clone()?,
        state_id: s.state_id.clone()?,
        city_id: s.city_id.clone()?,
        neighborhood_id: s.neighborhood_id.clone()?,
        shipping_method_id: s.shipping_method_id.clone()?,
        cost: s.cost?,
        address: s.address.clone(),
        reference: s.reference.clone(),
    })
}
