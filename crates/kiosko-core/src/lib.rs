//! # kiosko-core: Pure Register Logic for Kiosko POS
//!
//! This crate is the **heart** of Kiosko POS. It holds the sale wizard, the
//! cart, payment collection and cash-session reconciliation as pure state
//! machines with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kiosko POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Host (console, UI, service)                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ Register API                           │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        kiosko-register: CashSessionManager, OrderFinalizer      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kiosko-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  wizard  │ │   cart   │ │ payment  │ │ session  │          │   │
//! │  │   │  steps   │ │ clamping │ │  change  │ │ expected │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │ customer │ │ shipping │ │  order   │ │  store   │          │   │
//! │  │   │          │ │  chain   │ │ snapshot │ │  trait   │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          kiosko-db: SqliteStore implements PosStore             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`types`] - Reference data (Channel, SaleProduct, PaymentMethod, ...)
//! - [`cart`] - Cart lines with quantity and stock clamping
//! - [`payment`] - Tendered payments, change and pending amounts
//! - [`customer`] - Customer data captured in the wizard
//! - [`shipping`] - Location chain and shipping rate resolution
//! - [`session`] - Cash session lifecycle and reconciliation
//! - [`wizard`] - The sale wizard aggregate and its step gates
//! - [`order`] - The immutable order built at commit time
//! - [`store`] - The persistence collaborator trait
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use kiosko_core::money::Money;
//! use kiosko_core::types::TaxRate;
//!
//! // Prices are VAT-inclusive; split a total into base and VAT
//! let total = Money::from_cents(11800); // 118.00
//! let (base, vat) = total.split_inclusive_tax(TaxRate::from_bps(1800));
//!
//! assert_eq!(base.cents(), 10000);
//! assert_eq!(vat.cents(), 1800);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod customer;
pub mod error;
pub mod money;
pub mod order;
pub mod payment;
pub mod session;
pub mod shipping;
pub mod store;
pub mod types;
pub mod validation;
pub mod wizard;

// =============================================================================
// Re-exports
// =============================================================================

pub use cart::{Cart, CartAdd, CartLine};
pub use customer::CustomerData;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use order::{Order, OrderLine, OrderPayment, OrderShipping};
pub use payment::{PaymentCollector, TenderedPayment};
pub use session::{CashSession, ClosedSession, SessionStatus};
pub use shipping::{ShippingSelection, ShippingUpdate};
pub use store::{CommitOutcome, PosStore, StoreError, StoreResult};
pub use types::*;
pub use wizard::{SaleConfiguration, WizardState, WizardStep, WizardTotals};

// =============================================================================
// Constants
// =============================================================================

/// Value-added tax rate applied to order totals, in basis points (18%).
pub const DEFAULT_VAT_RATE_BPS: u32 = 1800;

/// Maximum distinct lines in one cart.
pub const MAX_CART_LINES: usize = 100;

/// Ceiling for a single line's quantity, regardless of stock.
pub const MAX_ITEM_QUANTITY: i64 = 999;
