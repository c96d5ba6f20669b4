//! # Seed Data Generator
//!
//! Populates the database with corner-store test data for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default dev database
//! cargo run -p balcao-db --bin seed
//!
//! # Specify database path
//! cargo run -p balcao-db --bin seed -- --db ./data/balcao.db
//! ```
//!
//! Creates a small realistic catalog (groceries, drinks, cleaning,
//! a couple of weighted items) plus a few credit customers with empty
//! ledgers.

use chrono::Utc;
use std::env;
use uuid::Uuid;

use balcao_core::{Customer, Money, Product, Quantity, UnitOfMeasure};
use balcao_db::{Database, DbConfig};

/// (name, category, price cents, cost cents, stock units, min units, unit, barcode)
const PRODUCTS: &[(&str, &str, i64, i64, i64, i64, UnitOfMeasure, &str)] = &[
    ("Arroz Tipo 1 5kg", "Mercearia", 2499, 1850, 30, 5, UnitOfMeasure::Unit, "7896006711131"),
    ("Feijão Carioca 1kg", "Mercearia", 899, 620, 40, 8, UnitOfMeasure::Unit, "7896006722415"),
    ("Açúcar Cristal 2kg", "Mercearia", 1099, 780, 25, 5, UnitOfMeasure::Unit, "7896032717019"),
    ("Café Torrado 500g", "Mercearia", 1599, 1100, 20, 4, UnitOfMeasure::Unit, "7891000053508"),
    ("Óleo de Soja 900ml", "Mercearia", 749, 540, 35, 6, UnitOfMeasure::Unit, "7891107101621"),
    ("Macarrão Espaguete 500g", "Mercearia", 449, 290, 50, 10, UnitOfMeasure::Unit, "7896022200015"),
    ("Leite Integral 1L", "Laticínios", 599, 430, 48, 12, UnitOfMeasure::Unit, "7891000100103"),
    ("Manteiga 200g", "Laticínios", 1299, 950, 15, 3, UnitOfMeasure::Unit, "7891025106005"),
    ("Refrigerante Cola 2L", "Bebidas", 999, 700, 36, 6, UnitOfMeasure::Unit, "7894900011517"),
    ("Água Mineral 1.5L", "Bebidas", 349, 180, 60, 12, UnitOfMeasure::Unit, "7891910000197"),
    ("Cerveja Lata 350ml", "Bebidas", 449, 320, 96, 24, UnitOfMeasure::Unit, "7891149200801"),
    ("Sabão em Pó 1kg", "Limpeza", 1399, 980, 18, 4, UnitOfMeasure::Unit, "7891150009004"),
    ("Detergente 500ml", "Limpeza", 299, 190, 42, 8, UnitOfMeasure::Unit, "7891024131008"),
    ("Papel Higiênico 4un", "Higiene", 699, 480, 30, 6, UnitOfMeasure::Unit, "7896061300202"),
    ("Queijo Mussarela", "Frios", 3999, 3100, 8, 2, UnitOfMeasure::Weight, "2000000000017"),
    ("Presunto Cozido", "Frios", 2899, 2200, 6, 2, UnitOfMeasure::Weight, "2000000000024"),
    ("Banana Prata", "Hortifruti", 599, 350, 20, 5, UnitOfMeasure::Weight, "2000000000031"),
];

/// (name, phone)
const CUSTOMERS: &[(&str, &str)] = &[
    ("Maria das Graças", "11 98765-4321"),
    ("Seu Antônio", "11 91234-5678"),
    ("Dona Lurdes", ""),
    ("João da Esquina", "11 99876-1234"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./balcao_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Balcão POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./balcao_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Balcão POS Seed Data Generator");
    println!("=================================");
    println!("Database: {}", db_path);
    println!();

    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Seeding catalog...");

    let now = Utc::now();
    for (name, category, price, cost, stock, min_stock, unit, barcode) in PRODUCTS {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            category: category.to_string(),
            price: Money::from_cents(*price),
            cost_price: Money::from_cents(*cost),
            stock: Quantity::from_units(*stock),
            min_stock: Quantity::from_units(*min_stock),
            unit: *unit,
            barcodes: vec![barcode.to_string()],
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert {}: {}", product.name, e);
        }
    }

    println!("✓ Seeded {} products", PRODUCTS.len());

    println!();
    println!("Seeding customers...");

    for (name, phone) in CUSTOMERS {
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            phone: phone.to_string(),
            debt: Money::zero(),
            history: Vec::new(),
            created_at: now,
        };

        if let Err(e) = db.customers().insert(&customer).await {
            eprintln!("Failed to insert {}: {}", customer.name, e);
        }
    }

    println!("✓ Seeded {} customers", CUSTOMERS.len());

    // Verify scan lookup
    println!();
    println!("Verifying barcode lookup...");
    let hit = db.products().get_by_scan_code("7891000100103").await?;
    match hit {
        Some(p) => println!("  Scan 7891000100103 → {}", p.name),
        None => println!("  Scan 7891000100103 → no match (unexpected)"),
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
