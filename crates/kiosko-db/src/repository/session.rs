//! # Cash Session Repository
//!
//! Persistence for register cash sessions.
//!
//! ## Lifecycle
//! ```text
//! insert (status = open)
//!    │   UNIQUE (channel_id) WHERE status = 'open'
//!    ▼
//! record_sale × N   ← recorded_sales_cents += order total
//!    │
//!    ▼
//! close (status = closed) + channels.registered_balance_cents = counted
//! ```

use chrono::{DateTime, Utc};
use kiosko_core::{CashSession, Money, SessionStatus};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

#[derive(Debug, sqlx::FromRow)]
struct CashSessionRow {
    id: String,
    channel_id: String,
    opening_amount_cents: i64,
    expected_amount_cents: i64,
    opening_difference_cents: i64,
    recorded_sales_cents: i64,
    closing_expected_cents: Option<i64>,
    closing_amount_cents: Option<i64>,
    difference_cents: Option<i64>,
    status: String,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    opening_notes: Option<String>,
    closing_notes: Option<String>,
}

impl TryFrom<CashSessionRow> for CashSession {
    type Error = DbError;

    fn try_from(row: CashSessionRow) -> Result<Self, Self::Error> {
        let status: SessionStatus = row
            .status
            .parse()
            .map_err(|e: kiosko_core::ValidationError| DbError::InvalidData(e.to_string()))?;

        Ok(CashSession {
            id: row.id,
            channel_id: row.channel_id,
            opening_amount: Money::from_cents(row.opening_amount_cents),
            expected_amount: Money::from_cents(row.expected_amount_cents),
            opening_difference: Money::from_cents(row.opening_difference_cents),
            recorded_sales_total: Money::from_cents(row.recorded_sales_cents),
            closing_expected: row.closing_expected_cents.map(Money::from_cents),
            closing_amount: row.closing_amount_cents.map(Money::from_cents),
            difference: row.difference_cents.map(Money::from_cents),
            status,
            opened_at: row.opened_at,
            closed_at: row.closed_at,
            opening_notes: row.opening_notes,
            closing_notes: row.closing_notes,
        })
    }
}

const SESSION_SELECT: &str = r#"
    SELECT id, channel_id, opening_amount_cents, expected_amount_cents,
           opening_difference_cents, recorded_sales_cents, closing_expected_cents,
           closing_amount_cents, difference_cents, status, opened_at, closed_at,
           opening_notes, closing_notes
    FROM cash_sessions
"#;

/// Repository for cash session operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// The channel's OPEN session, if any.
    pub async fn find_open_for_channel(&self, channel_id: &str) -> DbResult<Option<CashSession>> {
        let sql = format!("{} WHERE channel_id = ?1 AND status = 'open'", SESSION_SELECT);

        sqlx::query_as::<_, CashSessionRow>(&sql)
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await?
            .map(CashSession::try_from)
            .transpose()
    }

    pub async fn get(&self, id: &str) -> DbResult<CashSession> {
        let sql = format!("{} WHERE id = ?1", SESSION_SELECT);

        sqlx::query_as::<_, CashSessionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Cash session", id))?
            .try_into()
    }

    /// Inserts a new session row.
    ///
    /// A second OPEN session for the same channel fails with
    /// `UniqueViolation` on `cash_sessions.channel_id`.
    pub async fn insert(&self, session: &CashSession) -> DbResult<()> {
        debug!(session_id = %session.id, channel_id = %session.channel_id, "Inserting cash session");

        sqlx::query(
            r#"
            INSERT INTO cash_sessions (
                id, channel_id, opening_amount_cents, expected_amount_cents,
                opening_difference_cents, recorded_sales_cents, status,
                opened_at, opening_notes
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&session.id)
        .bind(&session.channel_id)
        .bind(session.opening_amount.cents())
        .bind(session.expected_amount.cents())
        .bind(session.opening_difference.cents())
        .bind(session.recorded_sales_total.cents())
        .bind(session.status.as_str())
        .bind(session.opened_at)
        .bind(&session.opening_notes)
        .execute(&self.pool)
        .await?;

        info!(session_id = %session.id, "Cash session opened");
        Ok(())
    }

    /// Adds `amount` to an OPEN session's recorded sales.
    pub async fn record_sale(&self, session_id: &str, amount: Money) -> DbResult<CashSession> {
        let result = sqlx::query(
            r#"
            UPDATE cash_sessions
            SET recorded_sales_cents = recorded_sales_cents + ?1
            WHERE id = ?2 AND status = 'open'
            "#,
        )
        .bind(amount.cents())
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Open cash session", session_id));
        }

        self.get(session_id).await
    }

    /// Writes closing figures and moves the channel balance to the counted
    /// amount, in one transaction.
    ///
    /// The figures were computed from `session.recorded_sales_total`; if a
    /// sale was recorded since that read, nothing is written and the call
    /// fails with `Conflict` so the caller can re-read and recompute.
    pub async fn close(&self, session: &CashSession) -> DbResult<()> {
        let counted = session.closing_amount.ok_or_else(|| {
            DbError::InvalidData(format!("session {} has no counted amount", session.id))
        })?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE cash_sessions
            SET status = 'closed',
                closing_expected_cents = ?1,
                closing_amount_cents = ?2,
                difference_cents = ?3,
                closed_at = ?4,
                closing_notes = ?5
            WHERE id = ?6 AND status = 'open' AND recorded_sales_cents = ?7
            "#,
        )
        .bind(session.closing_expected.map(|m| m.cents()))
        .bind(counted.cents())
        .bind(session.difference.map(|m| m.cents()))
        .bind(session.closed_at)
        .bind(&session.closing_notes)
        .bind(&session.id)
        .bind(session.recorded_sales_total.cents())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let still_open: Option<i64> = sqlx::query_scalar(
                "SELECT recorded_sales_cents FROM cash_sessions WHERE id = ?1 AND status = 'open'",
            )
            .bind(&session.id)
            .fetch_optional(&mut *tx)
            .await?;

            return Err(match still_open {
                Some(recorded) => {
                    debug!(
                        session_id = %session.id,
                        read = session.recorded_sales_total.cents(),
                        stored = recorded,
                        "Sales recorded since the close was computed"
                    );
                    DbError::Conflict(format!(
                        "cash session {} recorded new sales while closing",
                        session.id
                    ))
                }
                None => DbError::not_found("Open cash session", session.id.as_str()),
            });
        }

        sqlx::query("UPDATE channels SET registered_balance_cents = ?1 WHERE id = ?2")
            .bind(counted.cents())
            .bind(&session.channel_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            session_id = %session.id,
            counted = %counted,
            "Cash session closed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seeded_database;

    async fn open_session(db: &crate::Database, id: &str, cents: i64) -> CashSession {
        let channel = db.reference().channel("ch-01").await.unwrap();
        let session = CashSession::open(
            id.to_string(),
            &channel,
            Money::from_cents(cents),
            None,
            Utc::now(),
        )
        .unwrap();
        db.sessions().insert(&session).await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_insert_and_find_open() {
        let db = seeded_database().await;
        let opened = open_session(&db, "s-1", 9000).await;

        let found = db
            .sessions()
            .find_open_for_channel("ch-01")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, opened.id);
        assert_eq!(found.opening_difference.cents(), -1000);
        assert!(found.is_open());
    }

    #[tokio::test]
    async fn test_second_open_session_is_unique_violation() {
        let db = seeded_database().await;
        open_session(&db, "s-1", 10000).await;

        let channel = db.reference().channel("ch-01").await.unwrap();
        let second =
            CashSession::open("s-2".into(), &channel, Money::zero(), None, Utc::now()).unwrap();
        let err = db.sessions().insert(&second).await.unwrap_err();

        assert!(err.is_unique_violation_on("cash_sessions.channel_id"));
    }

    #[tokio::test]
    async fn test_record_sale_accumulates() {
        let db = seeded_database().await;
        open_session(&db, "s-1", 10000).await;

        db.sessions()
            .record_sale("s-1", Money::from_cents(2500))
            .await
            .unwrap();
        let session = db
            .sessions()
            .record_sale("s-1", Money::from_cents(1000))
            .await
            .unwrap();

        assert_eq!(session.recorded_sales_total.cents(), 3500);
    }

    #[tokio::test]
    async fn test_close_updates_channel_balance() {
        let db = seeded_database().await;
        let mut session = open_session(&db, "s-1", 10000).await;

        session.close(Money::from_cents(12000), None, Utc::now()).unwrap();
        db.sessions().close(&session).await.unwrap();

        let stored = db.sessions().get("s-1").await.unwrap();
        assert_eq!(stored.status, SessionStatus::Closed);
        assert_eq!(stored.difference, Some(Money::from_cents(2000)));

        let channel = db.reference().channel("ch-01").await.unwrap();
        assert_eq!(channel.registered_balance.cents(), 12000);

        assert!(db
            .sessions()
            .find_open_for_channel("ch-01")
            .await
            .unwrap()
            .is_none());
        assert!(matches!(
            db.sessions().record_sale("s-1", Money::from_cents(1)).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_close_computed_before_a_sale_is_rejected() {
        let db = seeded_database().await;
        let mut stale = open_session(&db, "s-1", 10000).await;
        stale.close(Money::from_cents(15000), None, Utc::now()).unwrap();

        // Another register commits on the same session after the read.
        db.sessions()
            .record_sale("s-1", Money::from_cents(5000))
            .await
            .unwrap();

        let err = db.sessions().close(&stale).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));

        let stored = db.sessions().get("s-1").await.unwrap();
        assert!(stored.is_open());
        assert_eq!(stored.recorded_sales_total.cents(), 5000);
        let channel = db.reference().channel("ch-01").await.unwrap();
        assert_eq!(channel.registered_balance.cents(), 10000);

        let mut fresh = stored;
        fresh.close(Money::from_cents(15000), None, Utc::now()).unwrap();
        db.sessions().close(&fresh).await.unwrap();

        let closed = db.sessions().get("s-1").await.unwrap();
        assert_eq!(
            closed.closing_expected,
            Some(closed.opening_amount + closed.recorded_sales_total)
        );
        assert_eq!(closed.closing_expected, Some(Money::from_cents(15000)));
        assert_eq!(closed.difference, Some(Money::zero()));
    }
}
