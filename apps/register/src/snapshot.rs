//! # Sale Snapshot
//!
//! Read-only view of the sale in progress, returned after every edit so the
//! host can redraw the wizard without asking for each piece separately.

use serde::Serialize;

use kiosko_core::{
    CartLine, CustomerData, SaleConfiguration, ShippingSelection, TaxRate, TenderedPayment,
    WizardState, WizardStep, WizardTotals,
};

/// Gate state of one offered step.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepStatus {
    pub step: WizardStep,
    pub number: Option<u8>,
    /// The data collected at this step is complete.
    pub complete: bool,
    /// Navigation to this step would be accepted.
    pub can_proceed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleSnapshot {
    pub session_id: String,
    pub step: WizardStep,
    pub steps: Vec<StepStatus>,
    pub configuration: SaleConfiguration,
    pub lines: Vec<CartLine>,
    pub customer: CustomerData,
    pub shipping: Option<ShippingSelection>,
    pub payments: Vec<TenderedPayment>,
    pub totals: WizardTotals,
    /// Finalize gate: every step including Payment is complete.
    pub can_finalize: bool,
    pub submission_token: String,
    pub completed_order_id: Option<String>,
    pub last_error: Option<String>,
}

impl SaleSnapshot {
    pub fn capture(state: &WizardState, vat: TaxRate) -> Self {
        let steps = state
            .sequence()
            .into_iter()
            .map(|step| StepStatus {
                step,
                number: step.number(),
                complete: state.step_complete(step),
                can_proceed: step <= state.step || state.can_proceed_to(step),
            })
            .collect();

        SaleSnapshot {
            session_id: state.session_id.clone(),
            step: state.step,
            steps,
            configuration: state.configuration.clone(),
            lines: state.cart.lines().to_vec(),
            customer: state.customer.clone(),
            shipping: state
                .customer
                .requires_shipping
                .then(|| state.shipping.clone()),
            payments: state.payments.payments().to_vec(),
            totals: state.totals(vat),
            can_finalize: state.can_proceed_to(WizardStep::Completed),
            submission_token: state.submission_token.clone(),
            completed_order_id: state.completed_order_id.clone(),
            last_error: state.last_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> WizardState {
        WizardState::new(
            "s-1".into(),
            SaleConfiguration {
                channel_id: "ch-01".into(),
                stock_type_id: "sellable".into(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_fresh_sale_only_allows_configuration() {
        let snapshot = SaleSnapshot::capture(&fresh(), TaxRate::default());

        assert_eq!(snapshot.step, WizardStep::Configuration);
        assert_eq!(snapshot.steps.len(), 4);
        assert!(snapshot.steps[0].can_proceed);
        assert!(!snapshot.steps[1].can_proceed);
        assert!(!snapshot.can_finalize);
        assert!(snapshot.shipping.is_none());
    }

    #[test]
    fn test_shipping_step_listed_when_required() {
        let mut state = fresh();
        state.customer.requires_shipping = true;

        let snapshot = SaleSnapshot::capture(&state, TaxRate::default());

        assert!(snapshot.steps.iter().any(|s| s.step == WizardStep::Shipping));
        assert!(snapshot.shipping.is_some());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(SaleSnapshot::capture(&fresh(), TaxRate::default())).unwrap();
        assert_eq!(json["step"], "configuration");
        assert!(json["submissionToken"].is_string());
        assert_eq!(json["steps"][0]["number"], 1);
    }
}
