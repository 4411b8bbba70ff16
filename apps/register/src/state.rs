//! # Wizard State Slot
//!
//! The register's sale in progress.
//!
//! ## Thread Safety
//! The wizard is wrapped in `Arc<Mutex<T>>` because:
//! 1. Several host calls may arrive concurrently
//! 2. Only one of them may edit the sale at a time
//! 3. Store I/O (a product lookup, the commit) happens while the lock is
//!    held, so a tokio mutex is used and no edit interleaves with a commit
//!
//! ```text
//! Host call ──► lock().await ──► Option<WizardState>
//!                                  None            no sale started
//!                                  Some(state)     edit, then release
//! ```

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use kiosko_core::WizardState;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Default)]
pub struct WizardSlot {
    inner: Arc<Mutex<Option<WizardState>>>,
}

impl WizardSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self) -> MutexGuard<'_, Option<WizardState>> {
        self.inner.lock().await
    }

    /// Replaces whatever sale is in the slot.
    pub async fn replace(&self, state: WizardState) {
        *self.inner.lock().await = Some(state);
    }

    /// Drops the current sale, if any.
    pub async fn clear(&self) {
        *self.inner.lock().await = None;
    }

    pub async fn is_active(&self) -> bool {
        self.inner.lock().await.is_some()
    }
}

/// The sale inside a locked slot, or `NO_ACTIVE_SALE`.
pub fn active(slot: &mut Option<WizardState>) -> ApiResult<&mut WizardState> {
    slot.as_mut().ok_or_else(ApiError::no_active_sale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use kiosko_core::SaleConfiguration;

    #[tokio::test]
    async fn test_empty_slot_has_no_active_sale() {
        let slot = WizardSlot::new();
        let mut guard = slot.lock().await;
        let err = active(&mut guard).unwrap_err();
        assert_eq!(err.code, ErrorCode::NoActiveSale);
    }

    #[tokio::test]
    async fn test_replace_and_clear() {
        let slot = WizardSlot::new();
        let config = SaleConfiguration {
            channel_id: "ch-01".into(),
            price_list_id: None,
            warehouse_id: None,
            stock_type_id: "sellable".into(),
        };
        slot.replace(WizardState::new("s-1".into(), config)).await;
        assert!(slot.is_active().await);

        let clone = slot.clone();
        clone.clear().await;
        assert!(!slot.is_active().await);
    }
}
