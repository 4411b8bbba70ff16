//! # Payment Collector
//!
//! The ordered list of tenders for the sale in progress.
//!
//! ```text
//!   total 50.00
//!     │
//!     ├── cash    30.00  (#1)
//!     ├── card    30.00  (#2, code 8841)
//!     │
//!     ▼
//!   paid 60.00 ─► change 10.00, pending 0.00, can_finalize
//! ```
//!
//! Payments are appended or removed, never edited in place. Each gets a
//! client-local id from a counter owned by the collector, so ids restart
//! with every new sale and are never reused within one.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::PaymentMethod;
use crate::validation::MAX_AMOUNT_CENTS;

/// A tender added at the Payment step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TenderedPayment {
    /// Client-local id, unique within one sale.
    pub local_id: u64,
    pub method_id: String,
    pub method_name: String,
    pub is_cash: bool,
    pub amount: Money,
    /// Authorization code from the card terminal or transfer slip.
    pub confirmation_code: Option<String>,
    /// Voucher or receipt number.
    pub voucher_ref: Option<String>,
}

/// Tendered payments plus the counter that mints their ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentCollector {
    payments: Vec<TenderedPayment>,
    next_local_id: u64,
}

impl Default for PaymentCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentCollector {
    pub fn new() -> Self {
        PaymentCollector {
            payments: Vec::new(),
            next_local_id: 1,
        }
    }

    /// Appends a payment.
    ///
    /// ## Rules
    /// - `amount` must be positive
    /// - neither `amount` nor the running paid total may exceed
    ///   [`MAX_AMOUNT_CENTS`]
    /// - when `require_code` is set, a non-cash method needs a confirmation code
    /// - blank codes and voucher refs are stored as `None`
    pub fn add(
        &mut self,
        method: &PaymentMethod,
        amount: Money,
        confirmation_code: Option<String>,
        voucher_ref: Option<String>,
        require_code: bool,
    ) -> CoreResult<TenderedPayment> {
        if !amount.is_positive() {
            return Err(CoreError::InvalidPaymentAmount {
                reason: "amount must be greater than zero".to_string(),
            });
        }
        let paid_after = self
            .total_paid()
            .checked_add(amount)
            .filter(|paid| paid.cents() <= MAX_AMOUNT_CENTS);
        if amount.cents() > MAX_AMOUNT_CENTS || paid_after.is_none() {
            return Err(CoreError::InvalidPaymentAmount {
                reason: format!(
                    "total tendered may not exceed {}",
                    Money::from_cents(MAX_AMOUNT_CENTS)
                ),
            });
        }

        let confirmation_code = non_blank(confirmation_code);
        if require_code && !method.is_cash && confirmation_code.is_none() {
            return Err(CoreError::ConfirmationCodeRequired {
                method: method.name.clone(),
            });
        }

        let payment = TenderedPayment {
            local_id: self.next_local_id,
            method_id: method.id.clone(),
            method_name: method.name.clone(),
            is_cash: method.is_cash,
            amount,
            confirmation_code,
            voucher_ref: non_blank(voucher_ref),
        };
        self.next_local_id += 1;
        self.payments.push(payment.clone());
        Ok(payment)
    }

    /// Removes the payment with the given client-local id.
    pub fn remove(&mut self, local_id: u64) -> CoreResult<TenderedPayment> {
        let index = self
            .payments
            .iter()
            .position(|p| p.local_id == local_id)
            .ok_or(CoreError::PaymentNotFound(local_id))?;
        Ok(self.payments.remove(index))
    }

    /// Drops every payment. The id counter keeps counting.
    pub fn clear(&mut self) {
        self.payments.clear();
    }

    pub fn payments(&self) -> &[TenderedPayment] {
        &self.payments
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }

    pub fn total_paid(&self) -> Money {
        self.payments.iter().map(|p| p.amount).sum()
    }

    /// Portion of the cash tendered: change is only ever handed back in cash.
    pub fn cash_paid(&self) -> Money {
        self.payments
            .iter()
            .filter(|p| p.is_cash)
            .map(|p| p.amount)
            .sum()
    }

    /// `max(0, paid − total)`
    pub fn change(&self, total: Money) -> Money {
        self.total_paid().saturating_sub(total)
    }

    /// `max(0, total − paid)`
    pub fn pending(&self, total: Money) -> Money {
        total.saturating_sub(self.total_paid())
    }

    /// `paid ≥ total`
    pub fn can_finalize(&self, total: Money) -> bool {
        self.total_paid() >= total
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cash() -> PaymentMethod {
        PaymentMethod {
            id: "pm-cash".to_string(),
            name: "Efectivo".to_string(),
            is_cash: true,
            is_active: true,
        }
    }

    fn card() -> PaymentMethod {
        PaymentMethod {
            id: "pm-card".to_string(),
            name: "Tarjeta".to_string(),
            is_cash: false,
            is_active: true,
        }
    }

    #[test]
    fn test_exact_cash_payment() {
        let mut payments = PaymentCollector::new();
        let total = Money::from_cents(5000);

        payments
            .add(&cash(), Money::from_cents(5000), None, None, false)
            .unwrap();

        assert_eq!(payments.total_paid().cents(), 5000);
        assert_eq!(payments.change(total), Money::zero());
        assert_eq!(payments.pending(total), Money::zero());
        assert!(payments.can_finalize(total));
    }

    #[test]
    fn test_overpayment_gives_change() {
        let mut payments = PaymentCollector::new();
        let total = Money::from_cents(5000);

        payments
            .add(&cash(), Money::from_cents(6000), None, None, false)
            .unwrap();

        assert_eq!(payments.change(total).cents(), 1000);
        assert!(payments.can_finalize(total));
    }

    #[test]
    fn test_split_payment_pending() {
        let mut payments = PaymentCollector::new();
        let total = Money::from_cents(5000);

        payments
            .add(&cash(), Money::from_cents(2000), None, None, false)
            .unwrap();
        assert_eq!(payments.pending(total).cents(), 3000);
        assert!(!payments.can_finalize(total));

        payments
            .add(&card(), Money::from_cents(3000), Some("8841".into()), None, false)
            .unwrap();
        assert_eq!(payments.pending(total), Money::zero());
        assert_eq!(payments.cash_paid().cents(), 2000);
        assert!(payments.can_finalize(total));
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        let mut payments = PaymentCollector::new();
        assert!(payments
            .add(&cash(), Money::zero(), None, None, false)
            .is_err());
        assert!(payments
            .add(&cash(), Money::from_cents(-100), None, None, false)
            .is_err());
        assert!(payments.is_empty());
    }

    #[test]
    fn test_tendered_total_is_capped() {
        let mut payments = PaymentCollector::new();
        let huge: Money = "92233720368547758.00".parse().unwrap();

        let err = payments.add(&cash(), huge, None, None, false).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPaymentAmount { .. }));

        let limit = Money::from_cents(MAX_AMOUNT_CENTS);
        payments.add(&cash(), limit, None, None, false).unwrap();
        let err = payments
            .add(&cash(), Money::from_cents(1), None, None, false)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidPaymentAmount { .. }));

        assert_eq!(payments.payments().len(), 1);
        assert_eq!(payments.total_paid(), limit);
        assert_eq!(payments.change(Money::from_cents(5000)), limit - Money::from_cents(5000));
    }

    #[test]
    fn test_confirmation_code_enforcement() {
        let mut payments = PaymentCollector::new();

        let err = payments
            .add(&card(), Money::from_cents(100), Some("  ".into()), None, true)
            .unwrap_err();
        assert!(matches!(err, CoreError::ConfirmationCodeRequired { .. }));

        // Cash never needs one; relaxed mode accepts a missing code.
        assert!(payments
            .add(&cash(), Money::from_cents(100), None, None, true)
            .is_ok());
        assert!(payments
            .add(&card(), Money::from_cents(100), None, None, false)
            .is_ok());
    }

    #[test]
    fn test_local_ids_are_not_reused() {
        let mut payments = PaymentCollector::new();
        let first = payments
            .add(&cash(), Money::from_cents(100), None, None, false)
            .unwrap();
        let second = payments
            .add(&cash(), Money::from_cents(200), None, None, false)
            .unwrap();
        assert_eq!((first.local_id, second.local_id), (1, 2));

        payments.remove(second.local_id).unwrap();
        let third = payments
            .add(&cash(), Money::from_cents(300), None, None, false)
            .unwrap();
        assert_eq!(third.local_id, 3);

        assert!(matches!(
            payments.remove(99),
            Err(CoreError::PaymentNotFound(99))
        ));
        assert_eq!(payments.total_paid().cents(), 400);
    }
}
