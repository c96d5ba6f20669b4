//! # Cart
//!
//! The in-memory, not-yet-committed collection of sale-item candidates.
//!
//! ## Price Freezing
//! A line freezes the product's name and price at the moment it is
//! added. Catalog edits between cart-build and commit do not change
//! what the customer is charged; stock, on the other hand, is only
//! looked at again at commit time (and clamped there).
//!
//! ## Operations Flow
//! ```text
//!   Scan / click product ──► add_product()      merges by product id
//!   Change quantity ───────► update_quantity()  0 removes the line
//!   Remove line ───────────► remove_line()
//!   Import customer order ─► Cart::from_order() quantities verbatim
//!   Checkout ──────────────► to_sale_items()    commit-time snapshots
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{Order, Product, SaleItem};
use crate::validation::validate_quantity;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

/// A line in the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,

    /// Product name at time of adding (frozen).
    pub name: String,

    /// Unit price at time of adding (frozen).
    pub price: Money,

    pub quantity: Quantity,

    /// Set when a claimed order's line no longer has sufficient stock.
    /// A visual warning for staff; the line itself is kept untouched.
    pub stock_flagged: bool,
}

impl CartLine {
    /// Creates a line from a product, freezing name and price.
    pub fn from_product(product: &Product, quantity: Quantity) -> Self {
        CartLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            quantity,
            stock_flagged: false,
        }
    }

    /// Extended line total at the frozen price.
    #[inline]
    pub fn total(&self) -> Money {
        self.price.extend(self.quantity)
    }
}

/// The cart.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product merges)
/// - Quantities are positive (updating to zero removes the line)
/// - At most [`MAX_CART_LINES`] lines, [`MAX_LINE_QUANTITY`] per line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    pub lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    /// Seeds a cart from a customer order, copying the requested lines
    /// verbatim — original quantities, original frozen prices. Stock is
    /// not consulted here; the intake layer flags stale lines after
    /// re-validating against current stock.
    pub fn from_order(order: &Order) -> Self {
        Cart {
            lines: order
                .items
                .iter()
                .map(|item| CartLine {
                    product_id: item.product_id.clone(),
                    name: item.name.clone(),
                    price: item.price,
                    quantity: item.quantity,
                    stock_flagged: false,
                })
                .collect(),
        }
    }

    /// Adds a product, merging into an existing line when present.
    pub fn add_product(&mut self, product: &Product, quantity: Quantity) -> Result<(), CoreError> {
        validate_quantity(quantity)?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            let new_qty = line.quantity + quantity;
            if new_qty > MAX_LINE_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty.to_string(),
                    max: MAX_LINE_QUANTITY.to_string(),
                });
            }
            line.quantity = new_qty;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge { max: MAX_CART_LINES });
        }

        self.lines.push(CartLine::from_product(product, quantity));
        Ok(())
    }

    /// Updates a line's quantity. Zero removes the line.
    pub fn update_quantity(&mut self, product_id: &str, quantity: Quantity) -> Result<(), CoreError> {
        if quantity.is_zero() {
            return self.remove_line(product_id);
        }
        validate_quantity(quantity)?;

        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => {
                line.quantity = quantity;
                Ok(())
            }
            None => Err(CoreError::ProductNotFound(product_id.to_string())),
        }
    }

    /// Removes a line by product id.
    pub fn remove_line(&mut self, product_id: &str) -> Result<(), CoreError> {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);

        if self.lines.len() == before {
            Err(CoreError::ProductNotFound(product_id.to_string()))
        } else {
            Ok(())
        }
    }

    /// Marks a line as no longer backed by sufficient stock.
    pub fn flag_line(&mut self, product_id: &str) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.stock_flagged = true;
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Cart total at the frozen prices.
    pub fn total(&self) -> Money {
        self.lines.iter().map(|l| l.total()).sum()
    }

    /// Converts the cart into commit-time sale-item snapshots.
    pub fn to_sale_items(&self) -> Vec<SaleItem> {
        self.lines
            .iter()
            .map(|l| SaleItem::snapshot(&l.product_id, &l.name, l.price, l.quantity))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnitOfMeasure;
    use chrono::Utc;

    fn test_product(id: &str, price_cents: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            category: "Geral".to_string(),
            price: Money::from_cents(price_cents),
            cost_price: Money::zero(),
            stock: Quantity::from_units(10),
            min_stock: Quantity::from_units(2),
            unit: UnitOfMeasure::Unit,
            barcodes: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_product() {
        let mut cart = Cart::new();
        cart.add_product(&test_product("1", 999), Quantity::from_units(2)).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total().cents(), 1998);
    }

    #[test]
    fn test_add_same_product_merges() {
        let mut cart = Cart::new();
        let product = test_product("1", 999);

        cart.add_product(&product, Quantity::from_units(2)).unwrap();
        cart.add_product(&product, Quantity::from_units(3)).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.lines[0].quantity, Quantity::from_units(5));
    }

    #[test]
    fn test_price_frozen_at_add_time() {
        let mut cart = Cart::new();
        let mut product = test_product("1", 999);
        cart.add_product(&product, Quantity::from_units(1)).unwrap();

        // Catalog edit after the line was added
        product.price = Money::from_cents(1299);

        assert_eq!(cart.lines[0].price.cents(), 999);
        assert_eq!(cart.total().cents(), 999);
    }

    #[test]
    fn test_update_quantity_zero_removes() {
        let mut cart = Cart::new();
        cart.add_product(&test_product("1", 999), Quantity::from_units(2)).unwrap();

        cart.update_quantity("1", Quantity::zero()).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_quantity_cap() {
        let mut cart = Cart::new();
        let product = test_product("1", 100);

        assert!(cart.add_product(&product, Quantity::from_units(999)).is_ok());
        assert!(matches!(
            cart.add_product(&product, Quantity::from_units(1)),
            Err(CoreError::QuantityTooLarge { .. })
        ));
    }

    #[test]
    fn test_to_sale_items_snapshots() {
        let mut cart = Cart::new();
        cart.add_product(&test_product("1", 1000), Quantity::from_units(2)).unwrap();

        let items = cart.to_sale_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].total.cents(), 2000);
        assert!(items[0].is_consistent());
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let mut cart = Cart::new();
        let product = test_product("1", 1000);

        // A negative quantity must never enter the cart: downstream it
        // would turn a stock decrement into an increment
        assert!(matches!(
            cart.add_product(&product, Quantity::from_units(-5)),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            cart.add_product(&product, Quantity::zero()),
            Err(CoreError::Validation(_))
        ));
        assert!(cart.is_empty());

        cart.add_product(&product, Quantity::from_units(2)).unwrap();
        assert!(matches!(
            cart.update_quantity("1", Quantity::from_units(-1)),
            Err(CoreError::Validation(_))
        ));
        assert_eq!(cart.lines[0].quantity, Quantity::from_units(2));
    }

    #[test]
    fn test_flag_line_keeps_quantity() {
        let mut cart = Cart::new();
        cart.add_product(&test_product("1", 1000), Quantity::from_units(4)).unwrap();

        cart.flag_line("1");
        assert!(cart.lines[0].stock_flagged);
        assert_eq!(cart.lines[0].quantity, Quantity::from_units(4));
    }
}
