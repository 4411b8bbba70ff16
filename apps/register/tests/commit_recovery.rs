//! Commit failures: stale stock, lost acknowledgements and timeouts.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use kiosko_core::{Money, WizardStep};
use kiosko_register::{ErrorCode, Register, RegisterConfig};

use common::{register_over, sale_at_payment, seeded_db, ScriptedStore, TSHIRT};

#[tokio::test]
async fn test_stock_drop_before_commit_rejects_order() {
    let db = seeded_db().await;
    let register = register_over(&db).await;
    let sale = sale_at_payment(&register).await;
    register
        .add_payment("pm-cash", Money::from_cents(5000), None, None)
        .await
        .unwrap();

    // Another register sells most of the stock meanwhile.
    db.catalog()
        .set_stock(TSHIRT, "wh-main", "sellable", 1)
        .await
        .unwrap();

    let err = register.submit_order().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InsufficientStock);

    let after = register.snapshot().await.unwrap();
    assert_eq!(after.step, WizardStep::Payment);
    assert!(after.last_error.is_some());
    assert_eq!(after.submission_token, sale.submission_token);

    assert!(db
        .orders()
        .find_by_token(&sale.submission_token)
        .await
        .unwrap()
        .is_none());
    let stock = db
        .catalog()
        .live_stock(TSHIRT, "wh-main", "sellable")
        .await
        .unwrap();
    assert_eq!(stock, 1);
    let session = register.current_session().await.unwrap().unwrap();
    assert_eq!(session.recorded_sales_total, Money::zero());
}

#[tokio::test]
async fn test_retry_after_lost_ack_returns_same_order() {
    let db = seeded_db().await;
    let store = Arc::new(ScriptedStore::new(&db));
    let register = Register::new(store.clone(), RegisterConfig::default());

    sale_at_payment(&register).await;
    register
        .add_payment("pm-cash", Money::from_cents(5000), None, None)
        .await
        .unwrap();

    store.lose_next_acks(1);
    let err = register.submit_order().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::External);
    assert!(err.is_retryable());
    assert_eq!(register.snapshot().await.unwrap().step, WizardStep::Payment);

    let result = register.submit_order().await.unwrap();
    assert_eq!(result.sale.step, WizardStep::Completed);
    assert_eq!(store.commit_calls.load(Ordering::SeqCst), 2);

    let token_order = db
        .orders()
        .find_by_token(&result.sale.submission_token)
        .await
        .unwrap();
    assert_eq!(token_order.as_deref(), Some(result.order_id.as_str()));

    let stock = db
        .catalog()
        .live_stock(TSHIRT, "wh-main", "sellable")
        .await
        .unwrap();
    assert_eq!(stock, 8);
    let session = register.current_session().await.unwrap().unwrap();
    assert_eq!(session.recorded_sales_total, Money::from_cents(5000));
}

#[tokio::test]
async fn test_commit_timeout_keeps_sale_at_payment() {
    let db = seeded_db().await;
    let store = Arc::new(ScriptedStore::new(&db));
    let mut config = RegisterConfig::default();
    config.checkout.commit_timeout_ms = 200;
    let register = Register::new(store.clone(), config);

    sale_at_payment(&register).await;
    register
        .add_payment("pm-cash", Money::from_cents(5000), None, None)
        .await
        .unwrap();

    store.delay_commits(Duration::from_secs(2));
    let err = register.submit_order().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::External);

    let sale = register.snapshot().await.unwrap();
    assert_eq!(sale.step, WizardStep::Payment);
    assert!(sale.last_error.unwrap().contains("timed out"));

    store.delay_commits(Duration::ZERO);
    let result = register.submit_order().await.unwrap();
    assert_eq!(result.sale.step, WizardStep::Completed);
    assert!(result.sale.last_error.is_none());
}

#[tokio::test]
async fn test_submit_twice_is_idempotent() {
    let db = seeded_db().await;
    let store = Arc::new(ScriptedStore::new(&db));
    let register = Register::new(store.clone(), RegisterConfig::default());

    sale_at_payment(&register).await;
    register
        .add_payment("pm-cash", Money::from_cents(5000), None, None)
        .await
        .unwrap();

    let first = register.submit_order().await.unwrap();
    let second = register.submit_order().await.unwrap();

    assert_eq!(first.order_id, second.order_id);
    assert_eq!(store.commit_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_underpaid_sale_cannot_submit() {
    let db = seeded_db().await;
    let register = register_over(&db).await;
    sale_at_payment(&register).await;
    register
        .add_payment("pm-cash", Money::from_cents(4000), None, None)
        .await
        .unwrap();

    let err = register.submit_order().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(register.snapshot().await.unwrap().step, WizardStep::Payment);
}

#[tokio::test]
async fn test_confirmation_code_required_when_configured() {
    let db = seeded_db().await;
    let mut config = RegisterConfig::default();
    config.checkout.require_confirmation_code = true;
    let register = Register::new(Arc::new(kiosko_db::SqliteStore::new(db.clone())), config);
    sale_at_payment(&register).await;

    let err = register
        .add_payment("pm-card", Money::from_cents(5000), None, None)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::PaymentError);

    let sale = register
        .add_payment("pm-card", Money::from_cents(5000), Some("AUTH-991".into()), None)
        .await
        .unwrap();
    assert!(sale.totals.can_finalize);
}
