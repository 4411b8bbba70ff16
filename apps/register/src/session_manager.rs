//! # Cash Session Manager
//!
//! Opens, tracks and closes the cash session of a channel.
//!
//! ```text
//!        open_session(amount)             close_session(counted)
//! (none) ────────────────────► OPEN ─────────────────────────────► CLOSED
//!                               │  ▲
//!                               └──┘ record_sale(total)   (every commit)
//! ```
//!
//! At most one OPEN session per channel: checked here first and enforced by
//! the store's unique index, so two registers racing on the same channel
//! still end with one session.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use kiosko_core::validation::{validate_drawer_amount, validate_notes, validate_payment_amount};
use kiosko_core::{CashSession, ClosedSession, Money, PosStore, StoreError};

use crate::error::{ApiError, ApiResult, ErrorCode};

/// Reads of the session before a close gives up on concurrent sales.
const CLOSE_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct CashSessionManager {
    store: Arc<dyn PosStore>,
}

impl CashSessionManager {
    pub fn new(store: Arc<dyn PosStore>) -> Self {
        CashSessionManager { store }
    }

    /// Opens a session for `channel_id` with the counted opening cash.
    ///
    /// The channel's registered balance becomes the session's expected
    /// amount; a mismatch is recorded, never rejected.
    pub async fn open_session(
        &self,
        channel_id: &str,
        opening_amount: Money,
        notes: Option<&str>,
    ) -> ApiResult<CashSession> {
        validate_drawer_amount("opening amount", opening_amount)?;
        let notes = validate_notes(notes)?;

        let channel = self.store.channel(channel_id).await?;
        if !channel.is_active {
            return Err(ApiError::new(
                ErrorCode::BusinessLogic,
                format!("Channel {} is inactive", channel.id),
            ));
        }

        if let Some(open) = self.store.open_session_for_channel(channel_id).await? {
            warn!(channel_id = %channel_id, session_id = %open.id, "Session already open");
            return Err(ApiError::new(
                ErrorCode::SessionAlreadyOpen,
                format!(
                    "Channel {} already has an open cash session ({})",
                    channel_id, open.id
                ),
            ));
        }

        let session = CashSession::open(
            Uuid::new_v4().to_string(),
            &channel,
            opening_amount,
            notes,
            Utc::now(),
        )?;
        self.store.insert_session(&session).await?;

        info!(
            session_id = %session.id,
            channel_id = %channel_id,
            opening = %session.opening_amount,
            expected = %session.expected_amount,
            difference = %session.opening_difference,
            "Cash session opened"
        );
        Ok(session)
    }

    /// Adds a committed sale's total to an OPEN session.
    pub async fn record_sale(&self, session_id: &str, amount: Money) -> ApiResult<CashSession> {
        validate_payment_amount(amount)?;
        let session = self.store.record_session_sale(session_id, amount).await?;
        info!(session_id = %session_id, amount = %amount, "Sale recorded on session");
        Ok(session)
    }

    /// Closes an OPEN session against the counted drawer.
    ///
    /// A sale recorded by another register between the read and the write
    /// makes the store refuse the close; the figures are then recomputed
    /// from a fresh read.
    pub async fn close_session(
        &self,
        session_id: &str,
        counted_amount: Money,
        notes: Option<&str>,
    ) -> ApiResult<ClosedSession> {
        let notes = validate_notes(notes)?;

        let mut attempt = 1;
        let closed = loop {
            let mut session = self.store.session(session_id).await?;
            let closed = session.close(counted_amount, notes.clone(), Utc::now())?;
            match self.store.close_session(&session).await {
                Ok(()) => break closed,
                Err(StoreError::Conflict(reason)) if attempt < CLOSE_ATTEMPTS => {
                    warn!(session_id = %session_id, attempt, %reason, "Recomputing close");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        info!(
            session_id = %session_id,
            expected = %closed.expected,
            counted = %closed.counted,
            difference = %closed.difference,
            "Cash session closed"
        );
        Ok(closed)
    }

    /// The channel's OPEN session, if any.
    pub async fn current_session(&self, channel_id: &str) -> ApiResult<Option<CashSession>> {
        Ok(self.store.open_session_for_channel(channel_id).await?)
    }
}
