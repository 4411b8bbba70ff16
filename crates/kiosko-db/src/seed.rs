//! # Demo Data
//!
//! A small, fixed reference dataset for development and tests, plus a bulk
//! catalog generator for exercising search on a realistic table size.
//!
//! ```text
//! ch-01 "Caja 1" ─┬ wh-main ── pl-retail (default) / pl-wholesale
//! ch-02 "Caja 2" ─┘
//!
//! var-tshirt-m  TSHIRT-M  retail 28.00, on sale 25.00   stock 10 sellable
//! var-cap       CAP-01    base 15.00 (not on pl-retail)  stock 5 sellable
//!
//! pe ─ lim ─ lima ─ mira / surco        courier: country 20.00,
//!    └ cus ─ cusco ─ sanblas                     city lima 10.00,
//!                                                mira 7.00
//! ```
//! Every insert is `INSERT OR IGNORE`, so seeding twice is harmless.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::DbResult;
use crate::pool::Database;

pub const DEMO_CHANNEL_ID: &str = "ch-01";
pub const DEMO_WAREHOUSE_ID: &str = "wh-main";
pub const DEMO_PRICE_LIST_ID: &str = "pl-retail";
pub const DEMO_STOCK_TYPE_ID: &str = "sellable";

const WAREHOUSES: &[(&str, &str)] = &[("wh-main", "Almacén Central")];

const CHANNELS: &[(&str, &str, i64)] = &[
    (DEMO_CHANNEL_ID, "Caja 1", 10000),
    ("ch-02", "Caja 2", 5000),
];

const STOCK_TYPES: &[(&str, &str)] = &[("sellable", "Vendible"), ("defective", "Defectuoso")];

const PRICE_LISTS: &[(&str, &str)] = &[
    ("pl-retail", "Lista Minorista"),
    ("pl-wholesale", "Lista Mayorista"),
];

/// `(id, product_id, product name, sku, variation name, base cents)`
const VARIATIONS: &[(&str, &str, &str, &str, &str, i64)] = &[
    ("var-tshirt-m", "prod-tshirt", "T-Shirt", "TSHIRT-M", "T-Shirt M", 3000),
    ("var-cap", "prod-cap", "Cap", "CAP-01", "Cap", 1500),
];

/// `(price list, variation, price cents, sale price cents)`
const PRICES: &[(&str, &str, i64, Option<i64>)] = &[
    ("pl-retail", "var-tshirt-m", 2800, Some(2500)),
    ("pl-wholesale", "var-tshirt-m", 2000, None),
    ("pl-wholesale", "var-cap", 1100, None),
];

/// `(variation, stock type, quantity)` in the demo warehouse.
const STOCK: &[(&str, &str, i64)] = &[
    ("var-tshirt-m", "sellable", 10),
    ("var-cap", "sellable", 5),
    ("var-cap", "defective", 2),
];

/// `(id, name, is_cash, sort order)`
const PAYMENT_METHODS: &[(&str, &str, bool, i64)] = &[
    ("pm-cash", "Efectivo", true, 1),
    ("pm-card", "Tarjeta", false, 2),
    ("pm-transfer", "Transferencia", false, 3),
    ("pm-wallet", "Billetera digital", false, 4),
];

const DOCUMENT_TYPES: &[(&str, &str, &str)] = &[
    ("dt-dni", "DNI", "Documento Nacional de Identidad"),
    ("dt-ruc", "RUC", "Registro Único de Contribuyentes"),
    ("dt-ce", "CE", "Carné de Extranjería"),
];

/// `(id, name, level, parent)`
const LOCATIONS: &[(&str, &str, &str, Option<&str>)] = &[
    ("pe", "Perú", "country", None),
    ("lim", "Lima", "state", Some("pe")),
    ("cus", "Cusco", "state", Some("pe")),
    ("lima", "Lima", "city", Some("lim")),
    ("cusco", "Cusco", "city", Some("cus")),
    ("mira", "Miraflores", "neighborhood", Some("lima")),
    ("surco", "Santiago de Surco", "neighborhood", Some("lima")),
    ("sanblas", "San Blas", "neighborhood", Some("cusco")),
];

const SHIPPING_METHODS: &[(&str, &str)] = &[("sm-courier", "Courier"), ("sm-moto", "Motorizado")];

/// `(method, location, level, cost cents)`
const SHIPPING_RATES: &[(&str, &str, &str, i64)] = &[
    ("sm-courier", "pe", "country", 2000),
    ("sm-courier", "lima", "city", 1000),
    ("sm-courier", "mira", "neighborhood", 700),
    ("sm-moto", "lima", "city", 800),
];

/// Inserts the fixed demo dataset.
pub async fn seed_demo_data(db: &Database) -> DbResult<()> {
    let mut tx = db.pool().begin().await?;
    let now = Utc::now();

    for (id, name) in WAREHOUSES {
        sqlx::query("INSERT OR IGNORE INTO warehouses (id, name) VALUES (?1, ?2)")
            .bind(id)
            .bind(name)
            .execute(&mut *tx)
            .await?;
    }

    for (id, name) in STOCK_TYPES {
        sqlx::query("INSERT OR IGNORE INTO stock_types (id, name) VALUES (?1, ?2)")
            .bind(id)
            .bind(name)
            .execute(&mut *tx)
            .await?;
    }

    for (id, name) in PRICE_LISTS {
        sqlx::query("INSERT OR IGNORE INTO price_lists (id, name) VALUES (?1, ?2)")
            .bind(id)
            .bind(name)
            .execute(&mut *tx)
            .await?;
    }

    for (id, name, balance_cents) in CHANNELS {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO channels
                (id, name, warehouse_id, default_price_list_id, registered_balance_cents)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(DEMO_WAREHOUSE_ID)
        .bind(DEMO_PRICE_LIST_ID)
        .bind(balance_cents)
        .execute(&mut *tx)
        .await?;
    }

    for (id, product_id, product_name, sku, name, base) in VARIATIONS {
        sqlx::query("INSERT OR IGNORE INTO products (id, name) VALUES (?1, ?2)")
            .bind(product_id)
            .bind(product_name)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO variations (id, product_id, sku, name, base_price_cents)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(id)
        .bind(product_id)
        .bind(sku)
        .bind(name)
        .bind(base)
        .execute(&mut *tx)
        .await?;
    }

    for (price_list_id, variation_id, price, sale_price) in PRICES {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO price_list_items
                (price_list_id, variation_id, price_cents, sale_price_cents)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(price_list_id)
        .bind(variation_id)
        .bind(price)
        .bind(sale_price)
        .execute(&mut *tx)
        .await?;
    }

    for (variation_id, stock_type_id, quantity) in STOCK {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO stock_levels
                (variation_id, warehouse_id, stock_type_id, quantity, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(variation_id)
        .bind(DEMO_WAREHOUSE_ID)
        .bind(stock_type_id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    for (id, name, is_cash, sort_order) in PAYMENT_METHODS {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO payment_methods (id, name, is_cash, sort_order)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(is_cash)
        .bind(sort_order)
        .execute(&mut *tx)
        .await?;
    }

    for (id, code, name) in DOCUMENT_TYPES {
        sqlx::query("INSERT OR IGNORE INTO document_types (id, code, name) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(code)
            .bind(name)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO customers
            (id, document_type_id, document_number, first_name, last_name, email, phone)
        VALUES ('cust-001', 'dt-dni', '45123987', 'Lucía', 'Paredes',
                'lucia.paredes@example.com', '987654321')
        "#,
    )
    .execute(&mut *tx)
    .await?;

    for (id, name, level, parent_id) in LOCATIONS {
        sqlx::query(
            "INSERT OR IGNORE INTO locations (id, name, level, parent_id) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(id)
        .bind(name)
        .bind(level)
        .bind(parent_id)
        .execute(&mut *tx)
        .await?;
    }

    for (id, name) in SHIPPING_METHODS {
        sqlx::query("INSERT OR IGNORE INTO shipping_methods (id, name) VALUES (?1, ?2)")
            .bind(id)
            .bind(name)
            .execute(&mut *tx)
            .await?;
    }

    for (method_id, location_id, level, cost) in SHIPPING_RATES {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO shipping_rates
                (shipping_method_id, location_id, level, cost_cents)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(method_id)
        .bind(location_id)
        .bind(level)
        .bind(cost)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!("Demo reference data seeded");
    Ok(())
}

// =============================================================================
// Bulk Catalog
// =============================================================================

const CATEGORIES: &[(&str, &[&str])] = &[
    ("POL", &["Polo Básico", "Polo Piqué", "Polo Manga Larga", "Polo Estampado"]),
    ("PAN", &["Jean Clásico", "Jogger", "Short Drill", "Pantalón Cargo"]),
    ("CAS", &["Casaca Denim", "Casaca Rompevientos", "Polera Capucha"]),
    ("ACC", &["Gorra", "Correa", "Medias Pack", "Mochila"]),
];

const SIZES: &[(&str, i64)] = &[("S", 0), ("M", 0), ("L", 300), ("XL", 500)];

/// Generates up to `count` variations priced on the demo retail list with
/// stock in the demo warehouse. Returns how many were inserted.
pub async fn seed_bulk_catalog(db: &Database, count: usize) -> DbResult<usize> {
    let mut tx = db.pool().begin().await?;
    let now = Utc::now();
    let mut generated = 0;

    'outer: for (category_idx, (code, products)) in CATEGORIES.iter().enumerate() {
        for (product_idx, product_name) in products.iter().enumerate() {
            if generated >= count {
                break 'outer;
            }
            let product_id = Uuid::new_v4().to_string();
            sqlx::query("INSERT INTO products (id, name) VALUES (?1, ?2)")
                .bind(&product_id)
                .bind(product_name)
                .execute(&mut *tx)
                .await?;

            for (size_idx, (size, addon)) in SIZES.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = category_idx * 1000 + product_idx * 20 + size_idx;
                let variation_id = Uuid::new_v4().to_string();
                let sku = format!("{}-{:04}-{}", code, seed, size);
                let base = 1990 + ((seed * 37) % 6000) as i64 + addon;

                sqlx::query(
                    r#"
                    INSERT OR IGNORE INTO variations (id, product_id, sku, name, base_price_cents)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                )
                .bind(&variation_id)
                .bind(&product_id)
                .bind(&sku)
                .bind(format!("{} {}", product_name, size))
                .bind(base)
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    r#"
                    INSERT OR IGNORE INTO price_list_items
                        (price_list_id, variation_id, price_cents)
                    VALUES (?1, ?2, ?3)
                    "#,
                )
                .bind(DEMO_PRICE_LIST_ID)
                .bind(&variation_id)
                .bind(base)
                .execute(&mut *tx)
                .await?;

                sqlx::query(
                    r#"
                    INSERT OR IGNORE INTO stock_levels
                        (variation_id, warehouse_id, stock_type_id, quantity, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                )
                .bind(&variation_id)
                .bind(DEMO_WAREHOUSE_ID)
                .bind(DEMO_STOCK_TYPE_ID)
                .bind((seed % 41) as i64)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                generated += 1;
            }
        }
    }

    tx.commit().await?;
    info!(generated, "Bulk catalog seeded");
    Ok(generated)
}
