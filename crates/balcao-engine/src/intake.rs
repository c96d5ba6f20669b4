//! # Order Intake
//!
//! The customer-facing order queue: submission with payment-method
//! validation, staff claiming with stock re-validation, and push
//! notification of new orders.
//!
//! ## Queue Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Customer                      Staff                            │
//! │                                                                 │
//! │  submit_order() ──► Pending ──► claim_order() ──► Processing    │
//! │       │                              │                          │
//! │       │ broadcast                    │ Cart::from_order +       │
//! │       ▼ OrderEvent::Submitted        │ stock re-validation      │
//! │  subscribers notified                ▼ (flags, never removes)   │
//! │                               checkout (coordinator)            │
//! │                                      │                          │
//! │                                      ▼                          │
//! │                                  Finished (terminal)            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Notification is a `tokio::sync::broadcast` channel: staff screens
//! subscribe instead of polling, and a send with no subscribers is a
//! no-op, not an error. `pending_count()` remains for anything that
//! still polls.
//!
//! Requested quantities are copied into the cart verbatim at claim
//! time. Stock problems produce [`StaleStockWarning`]s; the staff
//! operator, not the system, decides what to drop.

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use balcao_core::validation::{validate_name, validate_quantity};
use balcao_core::{
    checked_cart_total, Cart, CoreError, Money, Order, OrderStatus, PaymentMethod, Quantity,
    SaleItem, ValidationError,
};
use balcao_db::Database;

use crate::error::EngineResult;

/// Buffered events per subscriber before lagging kicks in.
const EVENT_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// Events & Requests
// =============================================================================

/// Pushed to subscribers when the queue changes.
#[derive(Debug, Clone, Serialize)]
pub enum OrderEvent {
    Submitted { order_id: String },
    Claimed { order_id: String },
}

/// A customer order submission.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// Free text, not linked to a registered customer.
    pub customer_name: String,
    pub items: Vec<SaleItem>,
    pub payment_method: PaymentMethod,
    /// Transfer receipt image or similar. Required for InstantTransfer
    /// and Credit.
    pub payment_proof: Option<Vec<u8>>,
    /// For cash orders: the amount the customer will tender.
    pub cash_tendered: Option<Money>,
}

/// A line whose requested quantity is no longer backed by stock at
/// claim time. Data for the operator, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct StaleStockWarning {
    pub product_id: String,
    pub name: String,
    pub requested: Quantity,
    pub available: Quantity,
}

/// Result of claiming an order: the order itself, a live cart seeded
/// from it, and stock warnings for lines that went stale since
/// submission.
#[derive(Debug)]
pub struct ClaimedOrder {
    pub order: Order,
    pub cart: Cart,
    pub warnings: Vec<StaleStockWarning>,
}

// =============================================================================
// Intake
// =============================================================================

/// The order intake queue.
#[derive(Debug, Clone)]
pub struct OrderIntake {
    db: Database,
    events: broadcast::Sender<OrderEvent>,
}

impl OrderIntake {
    pub fn new(db: Database) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        OrderIntake { db, events }
    }

    /// Subscribes to queue events. Each subscriber gets every event
    /// broadcast after the call.
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.events.subscribe()
    }

    /// Validates and enqueues a customer order as Pending.
    ///
    /// ## Payment-method rules
    /// - InstantTransfer / Credit: a payment proof must be attached
    /// - Cash: tendered amount must cover the total; change is computed
    ///   and stored with the order
    pub async fn submit_order(&self, request: OrderRequest) -> EngineResult<Order> {
        validate_name("customer name", &request.customer_name)?;
        if request.items.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        // Self-service input: a non-positive quantity must never reach
        // the queue, where checkout would invert its stock decrement
        for item in &request.items {
            validate_quantity(item.quantity)?;
        }
        let total = checked_cart_total(&request.items)?;

        if request.payment_method.requires_payment_proof() && request.payment_proof.is_none() {
            return Err(ValidationError::PaymentProofRequired.into());
        }

        let (cash_tendered, change) = match request.payment_method {
            PaymentMethod::Cash => {
                let tendered = request.cash_tendered.ok_or(ValidationError::Required {
                    field: "tendered amount".to_string(),
                })?;
                if tendered < total {
                    return Err(ValidationError::InsufficientTender {
                        tendered: tendered.to_string(),
                        total: total.to_string(),
                    }
                    .into());
                }
                (Some(tendered), Some(tendered - total))
            }
            _ => (None, None),
        };

        let order = Order {
            id: Uuid::new_v4().to_string(),
            customer_name: request.customer_name.trim().to_string(),
            items: request.items,
            total,
            payment_method: request.payment_method,
            payment_proof: request.payment_proof,
            cash_tendered,
            change,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };

        self.db.orders().insert(&order).await?;

        // No subscribers is fine; the queue itself is the source of truth
        let _ = self.events.send(OrderEvent::Submitted {
            order_id: order.id.clone(),
        });

        info!(
            order_id = %order.id,
            customer = %order.customer_name,
            total = %order.total,
            "Order submitted"
        );
        Ok(order)
    }

    /// Claims an order for processing and seeds a cart from it.
    ///
    /// Pending orders transition to Processing; an order already in
    /// Processing may be re-claimed (an abandoned claim is recovered by
    /// claiming again, never by moving backward). Claiming a Finished
    /// order is an error.
    ///
    /// Every requested line is re-validated against current stock;
    /// lines with insufficient stock are flagged in the cart and
    /// reported as warnings, with quantities kept verbatim.
    pub async fn claim_order(&self, order_id: &str) -> EngineResult<ClaimedOrder> {
        let order = self.db.orders().get_by_id(order_id).await?;

        match order.status {
            OrderStatus::Pending => {
                let won = self
                    .db
                    .orders()
                    .transition(order_id, OrderStatus::Pending, OrderStatus::Processing)
                    .await?;
                if !won {
                    // Lost the claim race; re-read and fall through only
                    // if the winner left it claimable
                    let current = self.db.orders().get_by_id(order_id).await?;
                    if current.status != OrderStatus::Processing {
                        return Err(CoreError::InvalidOrderTransition {
                            from: current.status,
                            to: OrderStatus::Processing,
                        }
                        .into());
                    }
                }
            }
            OrderStatus::Processing => {
                debug!(order_id = %order_id, "Re-claiming order already in processing");
            }
            OrderStatus::Finished => {
                return Err(CoreError::InvalidOrderTransition {
                    from: OrderStatus::Finished,
                    to: OrderStatus::Processing,
                }
                .into());
            }
        }

        let mut cart = Cart::from_order(&order);
        let mut warnings = Vec::new();

        for item in &order.items {
            let available = match self.db.products().get_by_id(&item.product_id).await {
                Ok(product) => product.stock,
                // Product removed since submission: nothing available
                Err(_) => Quantity::zero(),
            };

            if available < item.quantity {
                cart.flag_line(&item.product_id);
                warnings.push(StaleStockWarning {
                    product_id: item.product_id.clone(),
                    name: item.name.clone(),
                    requested: item.quantity,
                    available,
                });
            }
        }

        let _ = self.events.send(OrderEvent::Claimed {
            order_id: order.id.clone(),
        });

        info!(
            order_id = %order.id,
            lines = cart.line_count(),
            stale = warnings.len(),
            "Order claimed"
        );

        let order = self.db.orders().get_by_id(order_id).await?;
        Ok(ClaimedOrder {
            order,
            cart,
            warnings,
        })
    }

    /// Orders not yet finished, oldest first.
    pub async fn list_open(&self) -> EngineResult<Vec<Order>> {
        Ok(self.db.orders().list_open().await?)
    }

    /// How many orders await a claim. Kept for operators that poll.
    pub async fn pending_count(&self) -> EngineResult<i64> {
        Ok(self.db.orders().count_pending().await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use balcao_core::{Product, UnitOfMeasure};
    use balcao_db::DbConfig;

    async fn setup() -> (Database, OrderIntake) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let intake = OrderIntake::new(db.clone());
        (db, intake)
    }

    async fn seed_product(db: &Database, name: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            category: "Geral".to_string(),
            price: Money::from_cents(price_cents),
            cost_price: Money::zero(),
            stock: Quantity::from_units(stock),
            min_stock: Quantity::from_units(1),
            unit: UnitOfMeasure::Unit,
            barcodes: vec![],
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();
        product
    }

    fn line(product: &Product, quantity: i64) -> SaleItem {
        SaleItem::snapshot(
            &product.id,
            &product.name,
            product.price,
            Quantity::from_units(quantity),
        )
    }

    fn cash_request(product: &Product, quantity: i64, tendered_cents: i64) -> OrderRequest {
        OrderRequest {
            customer_name: "Cliente".to_string(),
            items: vec![line(product, quantity)],
            payment_method: PaymentMethod::Cash,
            payment_proof: None,
            cash_tendered: Some(Money::from_cents(tendered_cents)),
        }
    }

    #[tokio::test]
    async fn test_submit_computes_change_and_notifies() {
        let (db, intake) = setup().await;
        let product = seed_product(&db, "Refrigerante", 999, 10).await;
        let mut events = intake.subscribe();

        let order = intake.submit_order(cash_request(&product, 2, 5000)).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total.cents(), 1998);
        assert_eq!(order.change.unwrap().cents(), 3002);
        assert_eq!(intake.pending_count().await.unwrap(), 1);

        match events.try_recv().unwrap() {
            OrderEvent::Submitted { order_id } => assert_eq!(order_id, order.id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_submit_cash_insufficient_tender_rejected() {
        let (db, intake) = setup().await;
        let product = seed_product(&db, "Cerveja", 449, 10).await;

        let result = intake.submit_order(cash_request(&product, 6, 2000)).await;
        assert!(matches!(
            result,
            Err(crate::error::EngineError::Core(CoreError::Validation(
                ValidationError::InsufficientTender { .. }
            )))
        ));
        assert_eq!(intake.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_submit_non_positive_quantity_rejected() {
        let (db, intake) = setup().await;
        let product = seed_product(&db, "Refrigerante", 999, 10).await;

        // Customer-facing channel: a crafted negative line must be
        // rejected at submission, never enqueued
        for bad_units in [-5, 0] {
            let result = intake.submit_order(cash_request(&product, bad_units, 5000)).await;
            assert!(matches!(
                result,
                Err(crate::error::EngineError::Core(CoreError::Validation(
                    ValidationError::MustBePositive { .. }
                )))
            ));
        }
        assert_eq!(intake.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_submit_transfer_requires_proof() {
        let (db, intake) = setup().await;
        let product = seed_product(&db, "Água", 349, 10).await;

        let without_proof = intake
            .submit_order(OrderRequest {
                customer_name: "Cliente".to_string(),
                items: vec![line(&product, 1)],
                payment_method: PaymentMethod::InstantTransfer,
                payment_proof: None,
                cash_tendered: None,
            })
            .await;
        assert!(without_proof.is_err());

        let with_proof = intake
            .submit_order(OrderRequest {
                customer_name: "Cliente".to_string(),
                items: vec![line(&product, 1)],
                payment_method: PaymentMethod::InstantTransfer,
                payment_proof: Some(vec![0xFF, 0xD8, 0xFF]),
                cash_tendered: None,
            })
            .await;
        assert!(with_proof.is_ok());
    }

    #[tokio::test]
    async fn test_claim_moves_to_processing_and_seeds_cart() {
        let (db, intake) = setup().await;
        let product = seed_product(&db, "Arroz", 2499, 10).await;

        let order = intake.submit_order(cash_request(&product, 2, 5000)).await.unwrap();
        let claimed = intake.claim_order(&order.id).await.unwrap();

        assert_eq!(claimed.order.status, OrderStatus::Processing);
        assert_eq!(claimed.cart.line_count(), 1);
        assert_eq!(claimed.cart.total().cents(), 4998);
        assert!(claimed.warnings.is_empty());
        assert_eq!(intake.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_claim_flags_zero_stock_line_but_keeps_it() {
        let (db, intake) = setup().await;
        let in_stock = seed_product(&db, "Feijão", 899, 10).await;
        let sold_out = seed_product(&db, "Café", 1599, 0).await;

        let order = intake
            .submit_order(OrderRequest {
                customer_name: "Cliente".to_string(),
                items: vec![line(&in_stock, 1), line(&sold_out, 2)],
                payment_method: PaymentMethod::Cash,
                payment_proof: None,
                cash_tendered: Some(Money::from_cents(10000)),
            })
            .await
            .unwrap();

        let claimed = intake.claim_order(&order.id).await.unwrap();

        // The stale line is flagged, not removed; quantity kept verbatim
        assert_eq!(claimed.cart.line_count(), 2);
        let stale = claimed
            .cart
            .lines
            .iter()
            .find(|l| l.product_id == sold_out.id)
            .unwrap();
        assert!(stale.stock_flagged);
        assert_eq!(stale.quantity, Quantity::from_units(2));

        assert_eq!(claimed.warnings.len(), 1);
        assert_eq!(claimed.warnings[0].available, Quantity::zero());
    }

    #[tokio::test]
    async fn test_reclaim_processing_order_allowed() {
        let (db, intake) = setup().await;
        let product = seed_product(&db, "Leite", 599, 10).await;

        let order = intake.submit_order(cash_request(&product, 1, 1000)).await.unwrap();
        intake.claim_order(&order.id).await.unwrap();

        // Abandoned claim: claiming again works, status stays Processing
        let again = intake.claim_order(&order.id).await.unwrap();
        assert_eq!(again.order.status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn test_claim_finished_order_rejected() {
        let (db, intake) = setup().await;
        let product = seed_product(&db, "Óleo", 749, 10).await;

        let order = intake.submit_order(cash_request(&product, 1, 1000)).await.unwrap();
        intake.claim_order(&order.id).await.unwrap();
        db.orders()
            .transition(&order.id, OrderStatus::Processing, OrderStatus::Finished)
            .await
            .unwrap();

        let result = intake.claim_order(&order.id).await;
        assert!(matches!(
            result,
            Err(crate::error::EngineError::Core(
                CoreError::InvalidOrderTransition { .. }
            ))
        ));
    }
}
