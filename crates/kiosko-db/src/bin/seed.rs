//! # Seed Data Generator
//!
//! Populates a database with the demo register, catalog and reference data.
//!
//! ## Usage
//! ```bash
//! # Demo data only
//! cargo run -p kiosko-db --bin seed
//!
//! # Demo data plus 60 generated variations
//! cargo run -p kiosko-db --bin seed -- --count 60
//!
//! # Specify database path
//! cargo run -p kiosko-db --bin seed -- --db ./data/kiosko.db
//! ```

use std::env;

use kiosko_db::seed::{
    seed_bulk_catalog, seed_demo_data, DEMO_PRICE_LIST_ID, DEMO_STOCK_TYPE_ID, DEMO_WAREHOUSE_ID,
};
use kiosko_db::{Database, DbConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 0;
    let mut db_path = String::from("./kiosko_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(0);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kiosko POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Extra variations to generate (default: 0)");
                println!("  -d, --db <PATH>    Database file path (default: ./kiosko_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Kiosko POS Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    seed_demo_data(&db).await?;
    println!("✓ Demo register, catalog and reference data");

    if count > 0 {
        let start = std::time::Instant::now();
        let generated = seed_bulk_catalog(&db, count).await?;
        println!("✓ Generated {} variations in {:?}", generated, start.elapsed());
    }

    let hits = db
        .catalog()
        .search("", DEMO_PRICE_LIST_ID, DEMO_WAREHOUSE_ID, DEMO_STOCK_TYPE_ID, 1000)
        .await?;
    println!("  Sellable variations on the retail list: {}", hits.len());

    db.close().await;
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
