//! End-to-end flow: customer submits an order, staff claims it, the
//! claimed cart is checked out, and the order finishes as part of the
//! commit.

use chrono::Utc;
use uuid::Uuid;

use balcao_core::{
    CoreError, Money, OrderStatus, PaymentMethod, Product, Quantity, SaleItem, UnitOfMeasure,
};
use balcao_db::{Database, DbConfig};
use balcao_engine::{
    CheckoutRequest, EngineError, OrderIntake, OrderRequest, ReadModelCache, Reconciler,
    TransactionCoordinator,
};

async fn setup() -> (Database, TransactionCoordinator, OrderIntake, ReadModelCache) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let cache = ReadModelCache::new(db.clone());
    let coordinator = TransactionCoordinator::new(db.clone(), cache.clone());
    let intake = OrderIntake::new(db.clone());
    (db, coordinator, intake, cache)
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

#[tokio::test]
async fn order_lifecycle_submit_claim_checkout() {
    let (db, coordinator, intake, cache) = setup().await;
    let product = seed_product(&db, "Refrigerante 2L", 999, 20).await;

    // Customer submits a cash order for 3 bottles
    let order = intake
        .submit_order(OrderRequest {
            customer_name: "Cliente da Esquina".to_string(),
            items: vec![SaleItem::snapshot(
                &product.id,
                &product.name,
                product.price,
                Quantity::from_units(3),
            )],
            payment_method: PaymentMethod::Cash,
            payment_proof: None,
            cash_tendered: Some(Money::from_cents(5000)),
        })
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);

    // Staff claims it; the cart mirrors the request
    let claimed = intake.claim_order(&order.id).await.unwrap();
    assert_eq!(claimed.order.status, OrderStatus::Processing);
    assert!(claimed.warnings.is_empty());
    assert_eq!(claimed.cart.total().cents(), 2997);

    // Checkout finishes the order as part of the commit
    let sale = coordinator
        .complete_sale(CheckoutRequest {
            items: claimed.cart.to_sale_items(),
            payment_method: order.payment_method,
            customer_id: None,
            order_id: Some(order.id.clone()),
        })
        .await
        .unwrap();
    assert_eq!(sale.total.cents(), 2997);

    let finished = db.orders().get_by_id(&order.id).await.unwrap();
    assert_eq!(finished.status, OrderStatus::Finished);

    // Stock moved, queue drained, read model current
    let stored = db.products().get_by_id(&product.id).await.unwrap();
    assert_eq!(stored.stock, Quantity::from_units(17));
    assert!(intake.list_open().await.unwrap().is_empty());
    assert_eq!(cache.snapshot().await.sales.len(), 1);
}

#[tokio::test]
async fn finished_order_cannot_be_checked_out_again() {
    let (db, coordinator, intake, _cache) = setup().await;
    let product = seed_product(&db, "Água 1.5L", 349, 10).await;

    let order = intake
        .submit_order(OrderRequest {
            customer_name: "Cliente".to_string(),
            items: vec![SaleItem::snapshot(
                &product.id,
                &product.name,
                product.price,
                Quantity::from_units(1),
            )],
            payment_method: PaymentMethod::Cash,
            payment_proof: None,
            cash_tendered: Some(Money::from_cents(1000)),
        })
        .await
        .unwrap();

    let claimed = intake.claim_order(&order.id).await.unwrap();
    let request = CheckoutRequest {
        items: claimed.cart.to_sale_items(),
        payment_method: PaymentMethod::Cash,
        customer_id: None,
        order_id: Some(order.id.clone()),
    };

    coordinator.complete_sale(request.clone()).await.unwrap();

    // Second checkout against the same (now finished) order fails at
    // the order-finish step; the lifecycle never moves backward
    let result = coordinator.complete_sale(request).await;
    assert!(matches!(
        result,
        Err(EngineError::Core(CoreError::InvalidOrderTransition {
            from: OrderStatus::Finished,
            ..
        }))
    ));
}

#[tokio::test]
async fn startup_reconcile_on_clean_database_is_empty() {
    let (db, _coordinator, _intake, _cache) = setup().await;
    let reports = Reconciler::new(db).reconcile().await.unwrap();
    assert!(reports.is_empty());
}
