//! # Catalog Repository
//!
//! Variations as the register sells them: identity, prices from one price
//! list, and live stock in one `(warehouse, stock type)` bucket.
//!
//! ## Price Resolution
//! ```text
//! variations ──LEFT JOIN── price_list_items (price_list_id = ?)
//!     │                       price_cents, sale_price_cents
//!     └──LEFT JOIN── stock_levels (warehouse_id = ?, stock_type_id = ?)
//!                             quantity (missing row = 0)
//! ```
//! A variation missing from the price list is still sellable at its base
//! price.

use chrono::Utc;
use kiosko_core::{Money, SaleProduct};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};

/// A variation row with its price-list prices and stock.
#[derive(Debug, sqlx::FromRow)]
struct SaleProductRow {
    variation_id: String,
    product_id: String,
    sku: String,
    name: String,
    base_price_cents: i64,
    list_price_cents: Option<i64>,
    sale_price_cents: Option<i64>,
    stock: i64,
}

impl From<SaleProductRow> for SaleProduct {
    fn from(row: SaleProductRow) -> Self {
        SaleProduct {
            variation_id: row.variation_id,
            product_id: row.product_id,
            sku: row.sku,
            name: row.name,
            base_price: Money::from_cents(row.base_price_cents),
            list_price: row.list_price_cents.map(Money::from_cents),
            sale_price: row.sale_price_cents.map(Money::from_cents),
            stock: row.stock,
        }
    }
}

const SALE_PRODUCT_SELECT: &str = r#"
    SELECT
        v.id                        AS variation_id,
        v.product_id                AS product_id,
        v.sku                       AS sku,
        v.name                      AS name,
        v.base_price_cents          AS base_price_cents,
        pli.price_cents             AS list_price_cents,
        pli.sale_price_cents        AS sale_price_cents,
        COALESCE(sl.quantity, 0)    AS stock
    FROM variations v
    JOIN products p ON p.id = v.product_id
    LEFT JOIN price_list_items pli
        ON pli.variation_id = v.id AND pli.price_list_id = ?1
    LEFT JOIN stock_levels sl
        ON sl.variation_id = v.id AND sl.warehouse_id = ?2 AND sl.stock_type_id = ?3
    WHERE v.is_active = 1 AND p.is_active = 1
"#;

/// Repository for catalog reads and stock writes.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// One variation priced against `price_list_id`.
    pub async fn sale_product(
        &self,
        variation_id: &str,
        price_list_id: &str,
        warehouse_id: &str,
        stock_type_id: &str,
    ) -> DbResult<SaleProduct> {
        let sql = format!("{} AND v.id = ?4", SALE_PRODUCT_SELECT);

        let row = sqlx::query_as::<_, SaleProductRow>(&sql)
            .bind(price_list_id)
            .bind(warehouse_id)
            .bind(stock_type_id)
            .bind(variation_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Variation", variation_id))?;

        Ok(row.into())
    }

    /// Case-insensitive substring search over SKU, variation and product name.
    ///
    /// An empty query lists variations alphabetically.
    pub async fn search(
        &self,
        query: &str,
        price_list_id: &str,
        warehouse_id: &str,
        stock_type_id: &str,
        limit: u32,
    ) -> DbResult<Vec<SaleProduct>> {
        let query = query.trim();
        debug!(query = %query, limit = %limit, "Searching products");

        let pattern = format!("%{}%", escape_like(query));
        let sql = format!(
            "{} AND (v.sku LIKE ?4 ESCAPE '\\' OR v.name LIKE ?4 ESCAPE '\\' OR p.name LIKE ?4 ESCAPE '\\') \
             ORDER BY v.name LIMIT ?5",
            SALE_PRODUCT_SELECT
        );

        let rows = sqlx::query_as::<_, SaleProductRow>(&sql)
            .bind(price_list_id)
            .bind(warehouse_id)
            .bind(stock_type_id)
            .bind(pattern)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(SaleProduct::from).collect())
    }

    /// Current stock; a missing stock row is zero.
    pub async fn live_stock(
        &self,
        variation_id: &str,
        warehouse_id: &str,
        stock_type_id: &str,
    ) -> DbResult<i64> {
        let quantity: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT quantity FROM stock_levels
            WHERE variation_id = ?1 AND warehouse_id = ?2 AND stock_type_id = ?3
            "#,
        )
        .bind(variation_id)
        .bind(warehouse_id)
        .bind(stock_type_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quantity.unwrap_or(0))
    }

    /// Sets stock to an absolute quantity (receiving, counts, seeding).
    pub async fn set_stock(
        &self,
        variation_id: &str,
        warehouse_id: &str,
        stock_type_id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        debug!(variation_id = %variation_id, quantity, "Setting stock");

        sqlx::query(
            r#"
            INSERT INTO stock_levels (variation_id, warehouse_id, stock_type_id, quantity, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (variation_id, warehouse_id, stock_type_id)
            DO UPDATE SET quantity = excluded.quantity, updated_at = excluded.updated_at
            "#,
        )
        .bind(variation_id)
        .bind(warehouse_id)
        .bind(stock_type_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Escapes `%`, `_` and the escape character itself for a LIKE pattern.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seeded_database;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("cap"), "cap");
    }

    #[tokio::test]
    async fn test_sale_product_uses_price_list() {
        let db = seeded_database().await;

        let product = db
            .catalog()
            .sale_product("var-tshirt-m", "pl-retail", "wh-main", "sellable")
            .await
            .unwrap();

        assert_eq!(product.sku, "TSHIRT-M");
        assert_eq!(product.unit_price().cents(), 2500);
        assert_eq!(product.stock, 10);
    }

    #[tokio::test]
    async fn test_unlisted_variation_falls_back_to_base_price() {
        let db = seeded_database().await;

        let product = db
            .catalog()
            .sale_product("var-cap", "pl-retail", "wh-main", "sellable")
            .await
            .unwrap();

        assert_eq!(product.list_price, None);
        assert_eq!(product.unit_price().cents(), 1500);
    }

    #[tokio::test]
    async fn test_unknown_variation_not_found() {
        let db = seeded_database().await;
        let result = db
            .catalog()
            .sale_product("nope", "pl-retail", "wh-main", "sellable")
            .await;
        assert!(matches!(result, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_search_by_sku_and_name() {
        let db = seeded_database().await;
        let catalog = db.catalog();

        let by_sku = catalog
            .search("tshirt", "pl-retail", "wh-main", "sellable", 20)
            .await
            .unwrap();
        assert_eq!(by_sku.len(), 1);

        let all = catalog
            .search("", "pl-retail", "wh-main", "sellable", 20)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let none = catalog
            .search("%", "pl-retail", "wh-main", "sellable", 20)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_set_and_read_stock() {
        let db = seeded_database().await;
        let catalog = db.catalog();

        catalog
            .set_stock("var-tshirt-m", "wh-main", "sellable", 1)
            .await
            .unwrap();
        assert_eq!(
            catalog
                .live_stock("var-tshirt-m", "wh-main", "sellable")
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            catalog
                .live_stock("var-tshirt-m", "wh-main", "defective")
                .await
                .unwrap(),
            0
        );
    }
}
