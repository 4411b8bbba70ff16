//! # Cash Session
//!
//! The open/close-bounded working period of one register.
//!
//! ## Lifecycle
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                                                                          │
//! │   open(opening_amount)                                                   │
//! │     expected_amount    = channel.registered_balance                      │
//! │     opening_difference = opening_amount − expected_amount  (info only)   │
//! │        │                                                                 │
//! │        ▼                                                                 │
//! │   ┌─────────┐  record_sale(total)  ┌─────────┐                           │
//! │   │  OPEN   │ ───────────────────► │  OPEN   │  recorded_sales_total += │
//! │   └────┬────┘ ◄─────────────────── └─────────┘                           │
//! │        │ close(counted)                                                  │
//! │        │   expected   = opening_amount + recorded_sales_total            │
//! │        │   difference = counted − expected                               │
//! │        ▼                                                                 │
//! │   ┌─────────┐                                                            │
//! │   │ CLOSED  │  terminal: every further mutation is rejected              │
//! │   └─────────┘                                                            │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Timestamps and ids are passed in; this module never reads a clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::Channel;
use crate::validation::validate_drawer_amount;

// =============================================================================
// Session Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(SessionStatus::Open),
            "closed" => Ok(SessionStatus::Closed),
            other => Err(ValidationError::InvalidFormat {
                field: "session status".to_string(),
                reason: format!("unknown status '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Cash Session
// =============================================================================

/// A register's cash session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashSession {
    pub id: String,
    pub channel_id: String,
    /// Cash the operator counted into the drawer at open.
    pub opening_amount: Money,
    /// The channel's registered balance at open.
    pub expected_amount: Money,
    /// `opening_amount − expected_amount`. Informational, never blocks.
    pub opening_difference: Money,
    /// Sum of order totals committed during this session.
    pub recorded_sales_total: Money,
    /// `opening_amount + recorded_sales_total`, fixed at close.
    pub closing_expected: Option<Money>,
    /// Cash counted at close.
    pub closing_amount: Option<Money>,
    /// `closing_amount − closing_expected`.
    pub difference: Option<Money>,
    pub status: SessionStatus,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    pub opening_notes: Option<String>,
    pub closing_notes: Option<String>,
}

/// Reconciliation figures produced by closing a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClosedSession {
    pub session_id: String,
    pub channel_id: String,
    pub opening_amount: Money,
    pub recorded_sales_total: Money,
    pub expected: Money,
    pub counted: Money,
    pub difference: Money,
    #[ts(as = "String")]
    pub closed_at: DateTime<Utc>,
}

impl CashSession {
    /// Opens a session for `channel`.
    ///
    /// The opening amount may differ from the channel's balance; the gap is
    /// kept in `opening_difference`.
    pub fn open(
        id: String,
        channel: &Channel,
        opening_amount: Money,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        validate_drawer_amount("opening amount", opening_amount)?;

        Ok(CashSession {
            id,
            channel_id: channel.id.clone(),
            opening_amount,
            expected_amount: channel.registered_balance,
            opening_difference: opening_amount - channel.registered_balance,
            recorded_sales_total: Money::zero(),
            closing_expected: None,
            closing_amount: None,
            difference: None,
            status: SessionStatus::Open,
            opened_at: now,
            closed_at: None,
            opening_notes: notes,
            closing_notes: None,
        })
    }

    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// What the drawer should hold right now.
    pub fn expected_now(&self) -> Money {
        self.opening_amount + self.recorded_sales_total
    }

    /// Adds a committed order total to the session.
    pub fn record_sale(&mut self, amount: Money) -> CoreResult<()> {
        self.ensure_open()?;
        self.recorded_sales_total += amount;
        Ok(())
    }

    /// Closes the session against the counted drawer amount.
    ///
    /// ```rust
    /// use chrono::Utc;
    /// use kiosko_core::{CashSession, Channel, Money};
    ///
    /// let channel = Channel {
    ///     id: "ch-1".into(),
    ///     name: "Caja 1".into(),
    ///     warehouse_id: "wh-1".into(),
    ///     default_price_list_id: None,
    ///     registered_balance: Money::from_cents(10000),
    ///     is_active: true,
    /// };
    /// let mut session =
    ///     CashSession::open("s-1".into(), &channel, Money::from_cents(10000), None, Utc::now()).unwrap();
    /// session.record_sale(Money::from_cents(5000)).unwrap();
    ///
    /// let closed = session.close(Money::from_cents(9500), None, Utc::now()).unwrap();
    /// assert_eq!(closed.expected.cents(), 15000);
    /// assert_eq!(closed.difference.cents(), -5500);
    /// ```
    pub fn close(
        &mut self,
        counted: Money,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<ClosedSession> {
        self.ensure_open()?;
        validate_drawer_amount("counted amount", counted)?;

        let expected = self.expected_now();
        let difference = counted - expected;

        self.closing_expected = Some(expected);
        self.closing_amount = Some(counted);
        self.difference = Some(difference);
        self.status = SessionStatus::Closed;
        self.closed_at = Some(now);
        self.closing_notes = notes;

        Ok(ClosedSession {
            session_id: self.id.clone(),
            channel_id: self.channel_id.clone(),
            opening_amount: self.opening_amount,
            recorded_sales_total: self.recorded_sales_total,
            expected,
            counted,
            difference,
            closed_at: now,
        })
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if !self.is_open() {
            return Err(CoreError::InvalidSessionStatus {
                session_id: self.id.clone(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(balance_cents: i64) -> Channel {
        Channel {
            id: "ch-1".to_string(),
            name: "Caja 1".to_string(),
            warehouse_id: "wh-1".to_string(),
            default_price_list_id: None,
            registered_balance: Money::from_cents(balance_cents),
            is_active: true,
        }
    }

    fn open(opening_cents: i64, balance_cents: i64) -> CashSession {
        CashSession::open(
            "s-1".to_string(),
            &channel(balance_cents),
            Money::from_cents(opening_cents),
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_open_close_without_sales_balances() {
        let mut session = open(10000, 10000);
        let closed = session
            .close(Money::from_cents(10000), None, Utc::now())
            .unwrap();

        assert_eq!(closed.difference, Money::zero());
        assert_eq!(session.status, SessionStatus::Closed);
    }

    #[test]
    fn test_close_with_sales_and_shortfall() {
        let mut session = open(10000, 10000);
        session.record_sale(Money::from_cents(3000)).unwrap();
        session.record_sale(Money::from_cents(2000)).unwrap();

        let closed = session
            .close(Money::from_cents(9500), Some("short".into()), Utc::now())
            .unwrap();

        assert_eq!(closed.expected.cents(), 15000);
        assert_eq!(closed.difference.cents(), -5500);
        assert_eq!(session.closing_expected, Some(Money::from_cents(15000)));
        assert_eq!(session.difference, Some(Money::from_cents(-5500)));
        assert_eq!(session.closing_notes.as_deref(), Some("short"));
    }

    #[test]
    fn test_opening_difference_is_informational() {
        let session = open(12000, 10000);
        assert_eq!(session.expected_amount.cents(), 10000);
        assert_eq!(session.opening_difference.cents(), 2000);
        assert!(session.is_open());
    }

    #[test]
    fn test_closed_session_rejects_mutation() {
        let mut session = open(10000, 0);
        session.close(Money::from_cents(10000), None, Utc::now()).unwrap();

        assert!(matches!(
            session.record_sale(Money::from_cents(100)),
            Err(CoreError::InvalidSessionStatus { .. })
        ));
        assert!(session
            .close(Money::from_cents(10000), None, Utc::now())
            .is_err());
        assert_eq!(session.recorded_sales_total, Money::zero());
    }

    #[test]
    fn test_negative_amounts_rejected() {
        assert!(CashSession::open(
            "s-2".to_string(),
            &channel(0),
            Money::from_cents(-1),
            None,
            Utc::now()
        )
        .is_err());

        let mut session = open(0, 0);
        assert!(session.close(Money::from_cents(-1), None, Utc::now()).is_err());
        assert!(session.is_open());
    }

    #[test]
    fn test_status_round_trip() {
        assert_eq!("open".parse::<SessionStatus>().unwrap(), SessionStatus::Open);
        assert!("paused".parse::<SessionStatus>().is_err());
    }
}
