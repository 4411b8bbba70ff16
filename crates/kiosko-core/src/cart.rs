//! # Cart Engine
//!
//! Cart lines for the sale in progress, with quantity and stock clamping.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Register Action           Cart Method             Effect               │
//! │  ───────────────           ───────────             ──────               │
//! │                                                                         │
//! │  Pick product ───────────► add() ─────────────────► new line @ qty 1    │
//! │                                 │                   or qty + 1          │
//! │                                 └─ at max_stock ──► silent no-op        │
//! │                                                                         │
//! │  Change quantity ────────► update_quantity() ─────► clamp [1, cap]      │
//! │                                                                         │
//! │  Line discount ──────────► update_discount() ─────► clamp [0, subtotal] │
//! │                                                                         │
//! │  Remove ─────────────────► remove() ──────────────► lines.remove(i)     │
//! │                                                                         │
//! │  NOTE: Clamping never fails. Only a bad index or a cart that would      │
//! │        exceed MAX_CART_LINES returns an error.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by `(variation_id, stock_type_id)`
//! - `1 <= quantity <= min(max_stock, MAX_ITEM_QUANTITY)` after every mutation
//! - `0 <= discount <= quantity × unit_price`, so a line total is never negative

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::SaleProduct;
use crate::{MAX_CART_LINES, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Line
// =============================================================================

/// One line of the cart.
///
/// Price and stock are frozen when the line is created: `unit_price` comes
/// from the price list active at that moment and `max_stock` is the live
/// stock read then. The commit re-checks stock against the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub variation_id: String,
    pub stock_type_id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    /// Absolute line discount.
    pub discount: Money,
    /// Stock snapshot taken when the line was created.
    pub max_stock: i64,
}

impl CartLine {
    fn from_product(product: &SaleProduct, stock_type_id: &str) -> Self {
        CartLine {
            variation_id: product.variation_id.clone(),
            stock_type_id: stock_type_id.to_string(),
            sku: product.sku.clone(),
            name: product.name.clone(),
            quantity: 1,
            unit_price: product.unit_price(),
            discount: Money::zero(),
            max_stock: product.stock,
        }
    }

    /// Highest quantity this line accepts.
    pub fn quantity_cap(&self) -> i64 {
        self.max_stock.min(MAX_ITEM_QUANTITY).max(1)
    }

    /// `quantity × unit_price`, before discount.
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// Subtotal less the line discount.
    pub fn total(&self) -> Money {
        self.subtotal() - self.discount
    }

    fn matches(&self, variation_id: &str, stock_type_id: &str) -> bool {
        self.variation_id == variation_id && self.stock_type_id == stock_type_id
    }

    fn clamp_discount(&mut self) {
        self.discount = self.discount.clamp_between(Money::zero(), self.subtotal());
    }
}

// =============================================================================
// Add Outcome
// =============================================================================

/// What `Cart::add` did. None of these is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CartAdd {
    /// A new line at quantity 1.
    Added { index: usize },
    /// An existing line went up by one.
    Incremented { index: usize, quantity: i64 },
    /// The existing line is already at its cap; nothing changed.
    AtStockLimit { index: usize },
    /// The product has no live stock; nothing changed.
    OutOfStock,
}

impl CartAdd {
    /// True if the cart changed.
    pub fn changed(&self) -> bool {
        matches!(self, CartAdd::Added { .. } | CartAdd::Incremented { .. })
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The cart of the sale in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    /// Adds one unit of `product` under `stock_type_id`.
    ///
    /// ## Behavior
    /// - Same `(variation, stock type)` already present: quantity + 1, or a
    ///   no-op if the line is at its cap
    /// - Otherwise a new line at quantity 1, unless the product is out of stock
    ///
    /// ```rust
    /// use kiosko_core::cart::{Cart, CartAdd};
    /// use kiosko_core::{Money, SaleProduct};
    ///
    /// let product = SaleProduct {
    ///     variation_id: "v1".into(),
    ///     product_id: "p1".into(),
    ///     sku: "MUG".into(),
    ///     name: "Mug".into(),
    ///     base_price: Money::from_cents(1200),
    ///     list_price: None,
    ///     sale_price: None,
    ///     stock: 1,
    /// };
    ///
    /// let mut cart = Cart::new();
    /// assert_eq!(cart.add(&product, "sellable").unwrap(), CartAdd::Added { index: 0 });
    /// assert_eq!(cart.add(&product, "sellable").unwrap(), CartAdd::AtStockLimit { index: 0 });
    /// assert_eq!(cart.lines()[0].quantity, 1);
    /// ```
    pub fn add(&mut self, product: &SaleProduct, stock_type_id: &str) -> CoreResult<CartAdd> {
        if let Some(index) = self
            .lines
            .iter()
            .position(|l| l.matches(&product.variation_id, stock_type_id))
        {
            let line = &mut self.lines[index];
            if line.quantity >= line.quantity_cap() {
                return Ok(CartAdd::AtStockLimit { index });
            }
            line.quantity += 1;
            return Ok(CartAdd::Incremented {
                index,
                quantity: line.quantity,
            });
        }

        if product.stock <= 0 {
            return Ok(CartAdd::OutOfStock);
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }

        self.lines.push(CartLine::from_product(product, stock_type_id));
        Ok(CartAdd::Added {
            index: self.lines.len() - 1,
        })
    }

    /// Sets a line's quantity, clamped to `[1, quantity_cap]`.
    ///
    /// Returns the quantity actually stored. The discount is re-clamped in
    /// case the line subtotal shrank.
    pub fn update_quantity(&mut self, index: usize, quantity: i64) -> CoreResult<i64> {
        let line = self.line_mut(index)?;
        line.quantity = quantity.clamp(1, line.quantity_cap());
        line.clamp_discount();
        Ok(line.quantity)
    }

    /// Sets a line's discount, clamped to `[0, line subtotal]`.
    pub fn update_discount(&mut self, index: usize, discount: Money) -> CoreResult<Money> {
        let line = self.line_mut(index)?;
        line.discount = discount;
        line.clamp_discount();
        Ok(line.discount)
    }

    /// Removes and returns the line at `index`.
    pub fn remove(&mut self, index: usize) -> CoreResult<CartLine> {
        if index >= self.lines.len() {
            return Err(CoreError::CartLineNotFound(index));
        }
        Ok(self.lines.remove(index))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// `Σ quantity × unit_price`
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// `Σ line discount`
    pub fn discount(&self) -> Money {
        self.lines.iter().map(|l| l.discount).sum()
    }

    /// `subtotal − discount + shipping_cost`
    pub fn total(&self, shipping_cost: Money) -> Money {
        self.subtotal() - self.discount() + shipping_cost
    }

    fn line_mut(&mut self, index: usize) -> CoreResult<&mut CartLine> {
        self.lines
            .get_mut(index)
            .ok_or(CoreError::CartLineNotFound(index))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, price_cents: i64, stock: i64) -> SaleProduct {
        SaleProduct {
            variation_id: id.to_string(),
            product_id: format!("p-{}", id),
            sku: format!("SKU-{}", id),
            name: format!("Product {}", id),
            base_price: Money::from_cents(price_cents),
            list_price: None,
            sale_price: None,
            stock,
        }
    }

    fn assert_quantity_bounds(cart: &Cart) {
        for line in cart.lines() {
            assert!(line.quantity >= 1);
            assert!(line.quantity <= line.max_stock);
        }
    }

    #[test]
    fn test_add_same_variation_increments() {
        let mut cart = Cart::new();
        let p = product("1", 2500, 5);

        assert_eq!(cart.add(&p, "sellable").unwrap(), CartAdd::Added { index: 0 });
        assert_eq!(
            cart.add(&p, "sellable").unwrap(),
            CartAdd::Incremented {
                index: 0,
                quantity: 2
            }
        );

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.subtotal().cents(), 5000);
        assert_eq!(cart.total(Money::zero()).cents(), 5000);
    }

    #[test]
    fn test_same_variation_other_stock_type_is_new_line() {
        let mut cart = Cart::new();
        let p = product("1", 1000, 5);

        cart.add(&p, "sellable").unwrap();
        cart.add(&p, "defective").unwrap();

        assert_eq!(cart.len(), 2);
    }

    #[test]
    fn test_add_out_of_stock_is_noop() {
        let mut cart = Cart::new();
        let outcome = cart.add(&product("1", 1000, 0), "sellable").unwrap();

        assert_eq!(outcome, CartAdd::OutOfStock);
        assert!(!outcome.changed());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_clamps_at_max_stock() {
        let mut cart = Cart::new();
        let p = product("1", 1000, 2);

        for _ in 0..5 {
            cart.add(&p, "sellable").unwrap();
            assert_quantity_bounds(&cart);
        }

        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn test_update_quantity_clamps() {
        let mut cart = Cart::new();
        cart.add(&product("1", 1000, 3), "sellable").unwrap();

        assert_eq!(cart.update_quantity(0, 10).unwrap(), 3);
        assert_eq!(cart.update_quantity(0, 0).unwrap(), 1);
        assert_eq!(cart.update_quantity(0, -4).unwrap(), 1);
        assert_quantity_bounds(&cart);
    }

    #[test]
    fn test_update_quantity_respects_global_ceiling() {
        let mut cart = Cart::new();
        cart.add(&product("1", 100, 5000), "sellable").unwrap();

        assert_eq!(cart.update_quantity(0, 2000).unwrap(), MAX_ITEM_QUANTITY);
    }

    #[test]
    fn test_update_quantity_is_idempotent() {
        let mut cart = Cart::new();
        cart.add(&product("1", 1000, 10), "sellable").unwrap();

        cart.update_quantity(0, 4).unwrap();
        let once = cart.clone();
        cart.update_quantity(0, 4).unwrap();

        assert_eq!(cart, once);
    }

    #[test]
    fn test_update_quantity_bad_index() {
        let mut cart = Cart::new();
        assert!(matches!(
            cart.update_quantity(3, 1),
            Err(CoreError::CartLineNotFound(3))
        ));
    }

    #[test]
    fn test_discount_clamped_to_line_subtotal() {
        let mut cart = Cart::new();
        cart.add(&product("1", 1000, 10), "sellable").unwrap();
        cart.update_quantity(0, 3).unwrap();

        assert_eq!(
            cart.update_discount(0, Money::from_cents(5000)).unwrap().cents(),
            3000
        );
        assert_eq!(
            cart.update_discount(0, Money::from_cents(-10)).unwrap(),
            Money::zero()
        );

        cart.update_discount(0, Money::from_cents(2500)).unwrap();
        // Shrinking the line pulls the discount down with it.
        cart.update_quantity(0, 2).unwrap();
        assert_eq!(cart.discount().cents(), 2000);
        assert_eq!(cart.total(Money::zero()), Money::zero());
    }

    #[test]
    fn test_total_includes_shipping() {
        let mut cart = Cart::new();
        cart.add(&product("1", 2500, 10), "sellable").unwrap();
        cart.update_discount(0, Money::from_cents(500)).unwrap();

        let total = cart.total(Money::from_cents(1000));
        assert_eq!(total.cents(), 2500 - 500 + 1000);
        assert_eq!(total, cart.subtotal() - cart.discount() + Money::from_cents(1000));
    }

    #[test]
    fn test_remove_line() {
        let mut cart = Cart::new();
        cart.add(&product("1", 1000, 10), "sellable").unwrap();
        cart.add(&product("2", 2000, 10), "sellable").unwrap();

        let removed = cart.remove(0).unwrap();
        assert_eq!(removed.variation_id, "1");
        assert_eq!(cart.lines()[0].variation_id, "2");
        assert!(cart.remove(5).is_err());
    }

    #[test]
    fn test_cart_line_limit() {
        let mut cart = Cart::new();
        for i in 0..MAX_CART_LINES {
            cart.add(&product(&i.to_string(), 100, 1), "sellable").unwrap();
        }

        let result = cart.add(&product("overflow", 100, 1), "sellable");
        assert!(matches!(result, Err(CoreError::CartTooLarge { .. })));
        assert_eq!(cart.len(), MAX_CART_LINES);
    }
}
