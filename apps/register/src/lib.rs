//! # Kiosko Register Library
//!
//! The register engine of Kiosko POS: cash sessions, the five-step sale
//! wizard and the order commit, exposed through [`Register`].
//!
//! ## Module Organization
//! ```text
//! kiosko_register/
//! ├── lib.rs              ◄─── You are here (startup & run)
//! ├── config.rs           ◄─── register.toml + KIOSKO_* overrides
//! ├── error.rs            ◄─── ApiError returned by every operation
//! ├── state.rs            ◄─── WizardSlot (the sale behind a mutex)
//! ├── session_manager.rs  ◄─── CashSessionManager
//! ├── finalizer.rs        ◄─── OrderFinalizer (timeout + submission token)
//! ├── snapshot.rs         ◄─── SaleSnapshot returned after each edit
//! ├── register.rs         ◄─── Register (host surface)
//! └── console.rs          ◄─── Line console over Register
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Parse arguments (--config, --seed)                                  │
//! │  2. Load RegisterConfig: defaults ► register.toml ► KIOSKO_* env        │
//! │  3. Initialize tracing (RUST_LOG wins over logging.filter)              │
//! │  4. Open the SQLite database, run migrations                            │
//! │  5. Optionally seed demo data                                           │
//! │  6. Build Register over SqliteStore and run the console                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod console;
pub mod error;
pub mod finalizer;
pub mod register;
pub mod session_manager;
pub mod snapshot;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use kiosko_db::seed::seed_demo_data;
use kiosko_db::{Database, DbConfig, SqliteStore};

pub use config::RegisterConfig;
pub use console::Console;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use register::Register;
pub use snapshot::SaleSnapshot;

const USAGE: &str = "\
Usage: kiosko-register [--config <path>] [--seed]

  --config <path>   register.toml to load (default: platform config dir)
  --seed            insert demo reference data before starting";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    seed: bool,
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Option<Args>, String> {
    let mut parsed = Args::default();
    let mut args = args;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("--config needs a path")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--seed" => parsed.seed = true,
            "--help" | "-h" => return Ok(None),
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }
    Ok(Some(parsed))
}

/// Runs the register console until stdin closes.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let Some(args) = parse_args(std::env::args().skip(1))? else {
        println!("{}", USAGE);
        return Ok(());
    };

    let config = RegisterConfig::load(args.config)?;
    init_tracing(&config.logging.filter);

    info!(
        channel_id = %config.register.channel_id,
        store = %config.store.name,
        "Starting Kiosko register"
    );

    let db_path = config.database_path()?;
    info!(?db_path, "Database path determined");
    let db = Database::new(
        DbConfig::new(db_path).max_connections(config.database.max_connections),
    )
    .await?;
    info!("Database connected and migrations applied");

    if args.seed {
        seed_demo_data(&db).await?;
        info!("Demo data seeded");
    }

    let register = Register::new(Arc::new(SqliteStore::new(db.clone())), config);
    Console::new(register).run().await?;

    db.close().await;
    info!("Register stopped");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// `RUST_LOG` takes precedence over the configured filter. Logs go to
/// stderr so they do not interleave with console replies.
fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_parse_args() {
        let parsed = parse_args(args(&["--config", "/tmp/r.toml", "--seed"]))
            .unwrap()
            .unwrap();
        assert_eq!(parsed.config, Some(PathBuf::from("/tmp/r.toml")));
        assert!(parsed.seed);

        assert!(parse_args(args(&["--help"])).unwrap().is_none());
        assert!(parse_args(args(&["--config"])).is_err());
        assert!(parse_args(args(&["--bogus"])).is_err());
    }
}
