//! # Order Repository
//!
//! Atomic order commit and read-back.
//!
//! ## Commit Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   1. token already used?            ──yes──► ROLLBACK, AlreadyCommitted │
//! │   2. per line: conditional decrement                                   │
//! │        UPDATE stock_levels SET quantity = quantity - n                  │
//! │        WHERE ... AND quantity >= n  ──0 rows──► ROLLBACK,               │
//! │                                                InsufficientStock        │
//! │   3. INSERT orders, order_lines, order_payments, order_shipping         │
//! │   4. cash_sessions.recorded_sales += total (must be OPEN)               │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Either every write lands or none does. A concurrent commit of the same
//! token loses on the UNIQUE index and surfaces as `UniqueViolation` on
//! `orders.submission_token`.

use chrono::{DateTime, Utc};
use kiosko_core::{CustomerData, Money, Order, OrderLine, OrderPayment, OrderShipping};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};

/// Result of [`OrderRepository::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitResult {
    Inserted,
    /// The token was already committed under this order id.
    Duplicate(String),
}

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    submission_token: String,
    session_id: String,
    channel_id: String,
    warehouse_id: String,
    price_list_id: String,
    customer_id: Option<String>,
    customer_document_type_id: Option<String>,
    customer_document_number: String,
    customer_first_name: String,
    customer_last_name: String,
    customer_business_name: String,
    customer_email: Option<String>,
    customer_phone: Option<String>,
    customer_address: Option<String>,
    requires_shipping: bool,
    subtotal_cents: i64,
    discount_cents: i64,
    shipping_cost_cents: i64,
    total_cents: i64,
    total_paid_cents: i64,
    change_cents: i64,
    vat_base_cents: i64,
    vat_cents: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    variation_id: String,
    stock_type_id: String,
    sku: String,
    name: String,
    quantity: i64,
    unit_price_cents: i64,
    discount_cents: i64,
    line_total_cents: i64,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        OrderLine {
            variation_id: row.variation_id,
            stock_type_id: row.stock_type_id,
            sku: row.sku,
            name: row.name,
            quantity: row.quantity,
            unit_price: Money::from_cents(row.unit_price_cents),
            discount: Money::from_cents(row.discount_cents),
            line_total: Money::from_cents(row.line_total_cents),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderPaymentRow {
    method_id: String,
    method_name: String,
    is_cash: bool,
    amount_cents: i64,
    confirmation_code: Option<String>,
    voucher_ref: Option<String>,
}

impl From<OrderPaymentRow> for OrderPayment {
    fn from(row: OrderPaymentRow) -> Self {
        OrderPayment {
            method_id: row.method_id,
            method_name: row.method_name,
            is_cash: row.is_cash,
            amount: Money::from_cents(row.amount_cents),
            confirmation_code: row.confirmation_code,
            voucher_ref: row.voucher_ref,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderShippingRow {
    country_id: String,
    state_id: String,
    city_id: String,
    neighborhood_id: String,
    shipping_method_id: String,
    cost_cents: i64,
    address: Option<String>,
    reference: Option<String>,
}

impl From<OrderShippingRow> for OrderShipping {
    fn from(row: OrderShippingRow) -> Self {
        OrderShipping {
            country_id: row.country_id,
            state_id: row.state_id,
            city_id: row.city_id,
            neighborhood_id: row.neighborhood_id,
            shipping_method_id: row.shipping_method_id,
            cost: Money::from_cents(row.cost_cents),
            address: row.address,
            reference: row.reference,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Id of the order committed under `token`, if any.
    pub async fn find_by_token(&self, token: &str) -> DbResult<Option<String>> {
        let id: Option<String> =
            sqlx::query_scalar("SELECT id FROM orders WHERE submission_token = ?1")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        Ok(id)
    }

    /// Loads an order with its lines, payments and shipping.
    pub async fn get(&self, id: &str) -> DbResult<Order> {
        let header = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, submission_token, session_id, channel_id, warehouse_id, price_list_id,
                   customer_id, customer_document_type_id, customer_document_number,
                   customer_first_name, customer_last_name, customer_business_name,
                   customer_email, customer_phone, customer_address, requires_shipping,
                   subtotal_cents, discount_cents, shipping_cost_cents, total_cents,
                   total_paid_cents, change_cents, vat_base_cents, vat_cents, created_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Order", id))?;

        let lines = sqlx::query_as::<_, OrderLineRow>(
            r#"
            SELECT variation_id, stock_type_id, sku, name, quantity,
                   unit_price_cents, discount_cents, line_total_cents
            FROM order_lines
            WHERE order_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let payments = sqlx::query_as::<_, OrderPaymentRow>(
            r#"
            SELECT method_id, method_name, is_cash, amount_cents, confirmation_code, voucher_ref
            FROM order_payments
            WHERE order_id = ?1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let shipping = sqlx::query_as::<_, OrderShippingRow>(
            r#"
            SELECT country_id, state_id, city_id, neighborhood_id, shipping_method_id,
                   cost_cents, address, reference
            FROM order_shipping
            WHERE order_id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(Order {
            id: header.id,
            submission_token: header.submission_token,
            session_id: header.session_id,
            channel_id: header.channel_id,
            warehouse_id: header.warehouse_id,
            price_list_id: header.price_list_id,
            customer: CustomerData {
                customer_id: header.customer_id,
                document_type_id: header.customer_document_type_id,
                document_number: header.customer_document_number,
                first_name: header.customer_first_name,
                last_name: header.customer_last_name,
                business_name: header.customer_business_name,
                email: header.customer_email,
                phone: header.customer_phone,
                address: header.customer_address,
                requires_shipping: header.requires_shipping,
            },
            lines: lines.into_iter().map(OrderLine::from).collect(),
            payments: payments.into_iter().map(OrderPayment::from).collect(),
            shipping: shipping.map(OrderShipping::from),
            subtotal: Money::from_cents(header.subtotal_cents),
            discount: Money::from_cents(header.discount_cents),
            shipping_cost: Money::from_cents(header.shipping_cost_cents),
            total: Money::from_cents(header.total_cents),
            total_paid: Money::from_cents(header.total_paid_cents),
            change: Money::from_cents(header.change_cents),
            vat_base: Money::from_cents(header.vat_base_cents),
            vat_amount: Money::from_cents(header.vat_cents),
            created_at: header.created_at,
        })
    }

    /// Commits `order` atomically: stock decrements, order rows and the
    /// session's sales total.
    ///
    /// ## Errors
    /// - `InsufficientStock` when any line exceeds live stock
    /// - `NotFound("Open cash session")` when the session is gone or closed
    /// - `UniqueViolation` on `orders.submission_token` when a concurrent
    ///   commit of the same token won the race
    pub async fn commit(&self, order: &Order) -> DbResult<CommitResult> {
        debug!(
            order_id = %order.id,
            token = %order.submission_token,
            lines = order.lines.len(),
            "Committing order"
        );

        let mut tx = self.pool.begin().await?;

        let existing: Option<String> =
            sqlx::query_scalar("SELECT id FROM orders WHERE submission_token = ?1")
                .bind(&order.submission_token)
                .fetch_optional(&mut *tx)
                .await?;
        if let Some(existing) = existing {
            tx.rollback().await?;
            info!(order_id = %existing, "Submission token already committed");
            return Ok(CommitResult::Duplicate(existing));
        }

        let now = Utc::now();
        for line in &order.lines {
            decrement_stock(&mut tx, &order.warehouse_id, line, now).await?;
        }

        insert_header(&mut tx, order).await?;

        for (line_no, line) in order.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_lines (
                    order_id, line_no, variation_id, stock_type_id, sku, name,
                    quantity, unit_price_cents, discount_cents, line_total_cents
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(&order.id)
            .bind(line_no as i64)
            .bind(&line.variation_id)
            .bind(&line.stock_type_id)
            .bind(&line.sku)
            .bind(&line.name)
            .bind(line.quantity)
            .bind(line.unit_price.cents())
            .bind(line.discount.cents())
            .bind(line.line_total.cents())
            .execute(&mut *tx)
            .await?;
        }

        for (position, payment) in order.payments.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_payments (
                    order_id, position, method_id, method_name, is_cash,
                    amount_cents, confirmation_code, voucher_ref
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&order.id)
            .bind(position as i64)
            .bind(&payment.method_id)
            .bind(&payment.method_name)
            .bind(payment.is_cash)
            .bind(payment.amount.cents())
            .bind(&payment.confirmation_code)
            .bind(&payment.voucher_ref)
            .execute(&mut *tx)
            .await?;
        }

        if let Some(shipping) = &order.shipping {
            sqlx::query(
                r#"
                INSERT INTO order_shipping (
                    order_id, country_id, state_id, city_id, neighborhood_id,
                    shipping_method_id, cost_cents, address, reference
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&order.id)
            .bind(&shipping.country_id)
            .bind(&shipping.state_id)
            .bind(&shipping.city_id)
            .bind(&shipping.neighborhood_id)
            .bind(&shipping.shipping_method_id)
            .bind(shipping.cost.cents())
            .bind(&shipping.address)
            .bind(&shipping.reference)
            .execute(&mut *tx)
            .await?;
        }

        let updated = sqlx::query(
            r#"
            UPDATE cash_sessions
            SET recorded_sales_cents = recorded_sales_cents + ?1
            WHERE id = ?2 AND status = 'open'
            "#,
        )
        .bind(order.total.cents())
        .bind(&order.session_id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(DbError::not_found(
                "Open cash session",
                order.session_id.as_str(),
            ));
        }

        tx.commit().await?;

        info!(
            order_id = %order.id,
            total = %order.total,
            "Order committed"
        );
        Ok(CommitResult::Inserted)
    }
}

/// Decrements one line's stock only if enough remains.
async fn decrement_stock(
    tx: &mut Transaction<'_, Sqlite>,
    warehouse_id: &str,
    line: &OrderLine,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE stock_levels
        SET quantity = quantity - ?4, updated_at = ?5
        WHERE variation_id = ?1 AND warehouse_id = ?2 AND stock_type_id = ?3
          AND quantity >= ?4
        "#,
    )
    .bind(&line.variation_id)
    .bind(warehouse_id)
    .bind(&line.stock_type_id)
    .bind(line.quantity)
    .bind(now)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        let available: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT quantity FROM stock_levels
            WHERE variation_id = ?1 AND warehouse_id = ?2 AND stock_type_id = ?3
            "#,
        )
        .bind(&line.variation_id)
        .bind(warehouse_id)
        .bind(&line.stock_type_id)
        .fetch_optional(&mut **tx)
        .await?;

        let available = available.unwrap_or(0);
        warn!(
            sku = %line.sku,
            requested = line.quantity,
            available,
            "Stock check failed at commit"
        );
        return Err(DbError::InsufficientStock {
            variation_id: line.variation_id.clone(),
            sku: line.sku.clone(),
            available,
            requested: line.quantity,
        });
    }

    Ok(())
}

async fn insert_header(tx: &mut Transaction<'_, Sqlite>, order: &Order) -> DbResult<()> {
    let customer = &order.customer;

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, submission_token, session_id, channel_id, warehouse_id, price_list_id,
            customer_id, customer_document_type_id, customer_document_number,
            customer_first_name, customer_last_name, customer_business_name,
            customer_email, customer_phone, customer_address, requires_shipping,
            subtotal_cents, discount_cents, shipping_cost_cents, total_cents,
            total_paid_cents, change_cents, vat_base_cents, vat_cents, created_at
        )
        VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6,
            ?7, ?8, ?9,
            ?10, ?11, ?12,
            ?13, ?14, ?15, ?16,
            ?17, ?18, ?19, ?20,
            ?21, ?22, ?23, ?24, ?25
        )
        "#,
    )
    .bind(&order.id)
    .bind(&order.submission_token)
    .bind(&order.session_id)
    .bind(&order.channel_id)
    .bind(&order.warehouse_id)
    .bind(&order.price_list_id)
    .bind(&customer.customer_id)
    .bind(&customer.document_type_id)
    .bind(&customer.document_number)
    .bind(&customer.first_name)
    .bind(&customer.last_name)
    .bind(&customer.business_name)
    .bind(&customer.email)
    .bind(&customer.phone)
    .bind(&customer.address)
    .bind(customer.requires_shipping)
    .bind(order.subtotal.cents())
    .bind(order.discount.cents())
    .bind(order.shipping_cost.cents())
    .bind(order.total.cents())
    .bind(order.total_paid.cents())
    .bind(order.change.cents())
    .bind(order.vat_base.cents())
    .bind(order.vat_amount.cents())
    .bind(order.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
