//! # Reference Types
//!
//! Reference data the register reads from the store: channels, warehouses,
//! price lists, sellable variations, payment methods, document types,
//! locations and shipping rates.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Reference Data                                   │
//! │                                                                         │
//! │  Channel ──────► Warehouse          PriceList ──► SaleProduct           │
//! │  (register)      (stock scope)      (prices)      (variation + price    │
//! │    │                                               + live stock)        │
//! │    └─ registered_balance ─► CashSession.expected_amount                 │
//! │                                                                         │
//! │  Location (Country ► State ► City ► Neighborhood) ──► ShippingRate      │
//! │                                                                         │
//! │  PaymentMethod { is_cash }          DocumentType                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has a string `id` used for relations, and where it exists a
//! human-readable business key (sku, document code).

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1800 bps = 18%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::from_bps(crate::DEFAULT_VAT_RATE_BPS)
    }
}

// =============================================================================
// Channel & Warehouse
// =============================================================================

/// A sales channel: one physical register linked to a cash account and a warehouse.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Channel {
    pub id: String,
    pub name: String,
    /// Warehouse the register sells from by default.
    pub warehouse_id: String,
    /// Price list preselected for new sales.
    pub default_price_list_id: Option<String>,
    /// Balance of the linked cash account as last recorded.
    pub registered_balance: Money,
    pub is_active: bool,
}

/// A stock location.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Warehouse {
    pub id: String,
    pub name: String,
}

/// A classification of inventory (sellable, defective, ...).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockType {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Price List & Sale Product
// =============================================================================

/// A named table of per-variation prices.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceList {
    pub id: String,
    pub name: String,
    pub is_active: bool,
}

/// A variation as seen by the register: identity, resolved prices and the
/// live stock for one (warehouse, stock type) pair.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleProduct {
    pub variation_id: String,
    pub product_id: String,
    pub sku: String,
    pub name: String,
    /// Price on the variation itself.
    pub base_price: Money,
    /// Regular price from the active price list, if the variation is listed.
    pub list_price: Option<Money>,
    /// Promotional price from the active price list, if any.
    pub sale_price: Option<Money>,
    /// Live stock at read time.
    pub stock: i64,
}

impl SaleProduct {
    /// Price used for a new cart line.
    ///
    /// Sale price if present, else the list price, else the base price.
    ///
    /// ```rust
    /// use kiosko_core::{Money, SaleProduct};
    ///
    /// let mut p = SaleProduct {
    ///     variation_id: "v1".into(),
    ///     product_id: "p1".into(),
    ///     sku: "TSHIRT-M".into(),
    ///     name: "T-Shirt M".into(),
    ///     base_price: Money::from_cents(3000),
    ///     list_price: Some(Money::from_cents(2800)),
    ///     sale_price: Some(Money::from_cents(2500)),
    ///     stock: 4,
    /// };
    /// assert_eq!(p.unit_price().cents(), 2500);
    /// p.sale_price = None;
    /// assert_eq!(p.unit_price().cents(), 2800);
    /// ```
    pub fn unit_price(&self) -> Money {
        self.sale_price
            .or(self.list_price)
            .unwrap_or(self.base_price)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// A tender type configured in the back office.
///
/// `is_cash` is resolved once when methods are loaded; nothing downstream
/// inspects the display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentMethod {
    pub id: String,
    pub name: String,
    pub is_cash: bool,
    pub is_active: bool,
}

// =============================================================================
// Customer Reference Data
// =============================================================================

/// Identity document type (national id, tax id, passport, ...).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentType {
    pub id: String,
    pub code: String,
    pub name: String,
}

// =============================================================================
// Locations & Shipping
// =============================================================================

/// Level in the location hierarchy, from broadest to most specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LocationLevel {
    Country,
    State,
    City,
    Neighborhood,
}

impl LocationLevel {
    /// All levels, broadest first.
    pub const ALL: [LocationLevel; 4] = [
        LocationLevel::Country,
        LocationLevel::State,
        LocationLevel::City,
        LocationLevel::Neighborhood,
    ];

    /// The level a location at this level must hang from.
    pub fn parent(&self) -> Option<LocationLevel> {
        match self {
            LocationLevel::Country => None,
            LocationLevel::State => Some(LocationLevel::Country),
            LocationLevel::City => Some(LocationLevel::State),
            LocationLevel::Neighborhood => Some(LocationLevel::City),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LocationLevel::Country => "country",
            LocationLevel::State => "state",
            LocationLevel::City => "city",
            LocationLevel::Neighborhood => "neighborhood",
        }
    }
}

impl fmt::Display for LocationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LocationLevel {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "country" => Ok(LocationLevel::Country),
            "state" => Ok(LocationLevel::State),
            "city" => Ok(LocationLevel::City),
            "neighborhood" => Ok(LocationLevel::Neighborhood),
            other => Err(crate::error::ValidationError::InvalidFormat {
                field: "location level".to_string(),
                reason: format!("unknown level '{}'", other),
            }),
        }
    }
}

/// One node of the location hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub level: LocationLevel,
    pub parent_id: Option<String>,
}

/// A delivery option (courier, own fleet, pickup point, ...).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingMethod {
    pub id: String,
    pub name: String,
}

/// One row of the shipping-cost table.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingRate {
    pub shipping_method_id: String,
    pub location_id: String,
    pub level: LocationLevel,
    pub cost: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_default_is_vat() {
        let rate = TaxRate::default();
        assert_eq!(rate.bps(), 1800);
        assert!((rate.percentage() - 18.0).abs() < 0.001);
    }

    #[test]
    fn test_location_level_parents() {
        assert_eq!(LocationLevel::Country.parent(), None);
        assert_eq!(
            LocationLevel::Neighborhood.parent(),
            Some(LocationLevel::City)
        );
        assert_eq!(
            "City".parse::<LocationLevel>().unwrap(),
            LocationLevel::City
        );
        assert!("planet".parse::<LocationLevel>().is_err());
    }

    #[test]
    fn test_unit_price_falls_back_to_base() {
        let product = SaleProduct {
            variation_id: "v1".to_string(),
            product_id: "p1".to_string(),
            sku: "CAP-01".to_string(),
            name: "Cap".to_string(),
            base_price: Money::from_cents(1500),
            list_price: None,
            sale_price: None,
            stock: 1,
        };
        assert_eq!(product.unit_price().cents(), 1500);
    }
}
