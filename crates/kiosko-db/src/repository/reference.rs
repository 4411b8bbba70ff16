//! # Reference Data Repository
//!
//! Read-mostly tables the wizard pulls when a step is entered: channels,
//! warehouses, price lists, stock types, payment methods, document types,
//! customers, locations and the shipping rate table.

use kiosko_core::{
    Channel, CustomerData, DocumentType, Location, LocationLevel, Money, PaymentMethod, PriceList,
    ShippingMethod, ShippingRate, StockType, Warehouse,
};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ChannelRow {
    id: String,
    name: String,
    warehouse_id: String,
    default_price_list_id: Option<String>,
    registered_balance_cents: i64,
    is_active: bool,
}

impl From<ChannelRow> for Channel {
    fn from(row: ChannelRow) -> Self {
        Channel {
            id: row.id,
            name: row.name,
            warehouse_id: row.warehouse_id,
            default_price_list_id: row.default_price_list_id,
            registered_balance: Money::from_cents(row.registered_balance_cents),
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    document_type_id: String,
    document_number: String,
    first_name: String,
    last_name: String,
    business_name: String,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
}

impl From<CustomerRow> for CustomerData {
    fn from(row: CustomerRow) -> Self {
        CustomerData {
            customer_id: Some(row.id),
            document_type_id: Some(row.document_type_id),
            document_number: row.document_number,
            first_name: row.first_name,
            last_name: row.last_name,
            business_name: row.business_name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            requires_shipping: false,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LocationRow {
    id: String,
    name: String,
    level: String,
    parent_id: Option<String>,
}

impl TryFrom<LocationRow> for Location {
    type Error = DbError;

    fn try_from(row: LocationRow) -> Result<Self, Self::Error> {
        Ok(Location {
            level: parse_level(&row.level)?,
            id: row.id,
            name: row.name,
            parent_id: row.parent_id,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ShippingRateRow {
    shipping_method_id: String,
    location_id: String,
    level: String,
    cost_cents: i64,
}

impl TryFrom<ShippingRateRow> for ShippingRate {
    type Error = DbError;

    fn try_from(row: ShippingRateRow) -> Result<Self, Self::Error> {
        Ok(ShippingRate {
            level: parse_level(&row.level)?,
            shipping_method_id: row.shipping_method_id,
            location_id: row.location_id,
            cost: Money::from_cents(row.cost_cents),
        })
    }
}

fn parse_level(raw: &str) -> DbResult<LocationLevel> {
    raw.parse()
        .map_err(|e: kiosko_core::ValidationError| DbError::InvalidData(e.to_string()))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for reference data.
#[derive(Debug, Clone)]
pub struct ReferenceRepository {
    pool: SqlitePool,
}

impl ReferenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReferenceRepository { pool }
    }

    pub async fn channel(&self, id: &str) -> DbResult<Channel> {
        let row = sqlx::query_as::<_, ChannelRow>(
            r#"
            SELECT id, name, warehouse_id, default_price_list_id,
                   registered_balance_cents, is_active
            FROM channels
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Channel", id))?;

        Ok(row.into())
    }

    pub async fn warehouse(&self, id: &str) -> DbResult<Warehouse> {
        let (id, name): (String, String) =
            sqlx::query_as("SELECT id, name FROM warehouses WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| DbError::not_found("Warehouse", id))?;

        Ok(Warehouse { id, name })
    }

    /// Active price lists, by name.
    pub async fn price_lists(&self) -> DbResult<Vec<PriceList>> {
        let rows: Vec<(String, String, bool)> = sqlx::query_as(
            "SELECT id, name, is_active FROM price_lists WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, is_active)| PriceList {
                id,
                name,
                is_active,
            })
            .collect())
    }

    /// A price list by id, active or not.
    pub async fn price_list(&self, id: &str) -> DbResult<PriceList> {
        let (id, name, is_active): (String, String, bool) =
            sqlx::query_as("SELECT id, name, is_active FROM price_lists WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| DbError::not_found("Price list", id))?;

        Ok(PriceList {
            id,
            name,
            is_active,
        })
    }

    pub async fn stock_types(&self) -> DbResult<Vec<StockType>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, name FROM stock_types ORDER BY name")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| StockType { id, name })
            .collect())
    }

    /// Active payment methods in display order.
    pub async fn payment_methods(&self) -> DbResult<Vec<PaymentMethod>> {
        let rows: Vec<(String, String, bool, bool)> = sqlx::query_as(
            r#"
            SELECT id, name, is_cash, is_active
            FROM payment_methods
            WHERE is_active = 1
            ORDER BY sort_order, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, is_cash, is_active)| PaymentMethod {
                id,
                name,
                is_cash,
                is_active,
            })
            .collect())
    }

    pub async fn document_types(&self) -> DbResult<Vec<DocumentType>> {
        let rows: Vec<(String, String, String)> =
            sqlx::query_as("SELECT id, code, name FROM document_types ORDER BY code")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, code, name)| DocumentType { id, code, name })
            .collect())
    }

    /// Stored customer for a document, if any.
    pub async fn find_customer(
        &self,
        document_type_id: &str,
        document_number: &str,
    ) -> DbResult<Option<CustomerData>> {
        debug!(document_type_id = %document_type_id, "Looking up customer by document");

        let row = sqlx::query_as::<_, CustomerRow>(
            r#"
            SELECT id, document_type_id, document_number, first_name, last_name,
                   business_name, email, phone, address
            FROM customers
            WHERE document_type_id = ?1 AND document_number = ?2
            "#,
        )
        .bind(document_type_id)
        .bind(document_number.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CustomerData::from))
    }

    /// Locations at `level` under `parent_id` (top level when `None`).
    pub async fn locations(
        &self,
        level: LocationLevel,
        parent_id: Option<&str>,
    ) -> DbResult<Vec<Location>> {
        let rows = sqlx::query_as::<_, LocationRow>(
            r#"
            SELECT id, name, level, parent_id
            FROM locations
            WHERE level = ?1 AND parent_id IS ?2
            ORDER BY name
            "#,
        )
        .bind(level.as_str())
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Location::try_from).collect()
    }

    pub async fn shipping_methods(&self) -> DbResult<Vec<ShippingMethod>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT id, name FROM shipping_methods WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| ShippingMethod { id, name })
            .collect())
    }

    pub async fn shipping_rates(&self, shipping_method_id: &str) -> DbResult<Vec<ShippingRate>> {
        let rows = sqlx::query_as::<_, ShippingRateRow>(
            r#"
            SELECT shipping_method_id, location_id, level, cost_cents
            FROM shipping_rates
            WHERE shipping_method_id = ?1
            "#,
        )
        .bind(shipping_method_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ShippingRate::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::seeded_database;

    #[tokio::test]
    async fn test_channel_lookup() {
        let db = seeded_database().await;
        let reference = db.reference();

        let channel = reference.channel("ch-01").await.unwrap();
        assert_eq!(channel.warehouse_id, "wh-main");
        assert_eq!(channel.registered_balance.cents(), 10000);

        assert!(matches!(
            reference.channel("ch-99").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_payment_methods_carry_cash_flag() {
        let db = seeded_database().await;
        let methods = db.reference().payment_methods().await.unwrap();

        let cash: Vec<_> = methods.iter().filter(|m| m.is_cash).collect();
        assert_eq!(cash.len(), 1);
        assert_eq!(cash[0].id, "pm-cash");
        assert!(methods.len() > 1);
    }

    #[tokio::test]
    async fn test_location_hierarchy() {
        let db = seeded_database().await;
        let reference = db.reference();

        let countries = reference
            .locations(LocationLevel::Country, None)
            .await
            .unwrap();
        assert_eq!(countries.len(), 1);
        assert_eq!(countries[0].id, "pe");

        let neighborhoods = reference
            .locations(LocationLevel::Neighborhood, Some("lima"))
            .await
            .unwrap();
        assert!(neighborhoods.iter().any(|l| l.id == "mira"));
        assert!(neighborhoods
            .iter()
            .all(|l| l.level == LocationLevel::Neighborhood));
    }

    #[tokio::test]
    async fn test_find_customer_by_document() {
        let db = seeded_database().await;
        let reference = db.reference();

        let customer = reference
            .find_customer("dt-dni", "45123987")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(customer.customer_id.as_deref(), Some("cust-001"));
        assert!(customer.is_complete());

        assert!(reference
            .find_customer("dt-dni", "00000000")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_shipping_rates() {
        let db = seeded_database().await;
        let rates = db.reference().shipping_rates("sm-courier").await.unwrap();
        assert!(rates.iter().any(|r| r.level == LocationLevel::Neighborhood));
    }
}
