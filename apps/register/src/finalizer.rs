//! # Order Finalizer
//!
//! Turns a sale at the Payment step into a committed order.
//!
//! ## Submit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  submit()                                                               │
//! │    │                                                                    │
//! │    ├── already Completed?  ──────────► return the order id              │
//! │    ├── ensure_submittable() ─────────► ValidationError / StepBlocked    │
//! │    ├── session still OPEN? ──────────► NotFound                         │
//! │    ├── Order::from_wizard(token)                                        │
//! │    ├── timeout(commit_order) ────────► EXTERNAL on timeout              │
//! │    │        │                                                           │
//! │    │        ├── Committed / AlreadyCommitted ─► mark_completed          │
//! │    │        └── error ──────────────────────► mark_failed, stay at      │
//! │    │                                          Payment                   │
//! │    ▼                                                                    │
//! │  order id                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The submission token travels with the order, so a retry after a timeout
//! or a lost acknowledgement finds the first commit instead of writing a
//! second order.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use kiosko_core::{CommitOutcome, Order, PosStore, StoreError, TaxRate, WizardState};

use crate::error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct OrderFinalizer {
    store: Arc<dyn PosStore>,
    commit_timeout: Duration,
    vat_rate: TaxRate,
}

impl OrderFinalizer {
    pub fn new(store: Arc<dyn PosStore>, commit_timeout: Duration, vat_rate: TaxRate) -> Self {
        OrderFinalizer {
            store,
            commit_timeout,
            vat_rate,
        }
    }

    /// Commits the sale in `wizard` and moves it to Completed.
    ///
    /// On any failure the wizard stays at Payment with `last_error` set and
    /// the same submission token, so calling again is safe.
    pub async fn submit(&self, wizard: &mut WizardState) -> ApiResult<String> {
        if let Some(order_id) = &wizard.completed_order_id {
            return Ok(order_id.clone());
        }

        wizard.ensure_submittable()?;

        let session = self.store.session(&wizard.session_id).await?;
        if !session.is_open() {
            return Err(ApiError::not_found("Open cash session", &wizard.session_id));
        }

        let order = Order::from_wizard(
            wizard,
            Uuid::new_v4().to_string(),
            self.vat_rate,
            Utc::now(),
        )?;

        info!(
            token = %order.submission_token,
            lines = order.lines.len(),
            total = %order.total,
            "Submitting order"
        );

        let committed = tokio::time::timeout(self.commit_timeout, self.store.commit_order(&order)).await;

        match committed {
            Ok(Ok(outcome)) => {
                if let CommitOutcome::AlreadyCommitted { order_id } = &outcome {
                    info!(order_id = %order_id, "Submission token already committed");
                }
                let order_id = outcome.order_id().to_string();
                wizard.mark_completed(order_id.clone());
                info!(order_id = %order_id, total = %order.total, "Sale completed");
                Ok(order_id)
            }
            Ok(Err(e)) => {
                match &e {
                    StoreError::InsufficientStock { sku, .. } => {
                        warn!(sku = %sku, "Commit rejected: insufficient stock")
                    }
                    StoreError::Unavailable(_) => error!(error = %e, "Commit failed"),
                    _ => warn!(error = %e, "Commit rejected"),
                }
                let err = ApiError::from(e);
                wizard.mark_failed(err.message.clone());
                Err(err)
            }
            Err(_) => {
                error!(
                    timeout_ms = self.commit_timeout.as_millis() as u64,
                    token = %order.submission_token,
                    "Commit timed out"
                );
                let err = ApiError::external(format!(
                    "The order commit timed out after {} ms; submit again to retry",
                    self.commit_timeout.as_millis()
                ));
                wizard.mark_failed(err.message.clone());
                Err(err)
            }
        }
    }
}
