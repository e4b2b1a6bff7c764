use pos_catalog::config::CatalogConfig;
use pos_catalog::domain::product::Product;
use pos_catalog::repository::database::init_database;
use pos_catalog::repository::SqliteGateway;
use std::sync::Arc;

// name, category, price, stock, description
const MENU: &[(&str, &str, f64, i32, &str)] = &[
    ("Espresso", "Coffee", 15000.0, 100, "Classic espresso with a strong body"),
    ("Americano", "Coffee", 18000.0, 100, "Espresso topped with hot water"),
    ("Cappuccino", "Coffee", 22000.0, 100, "Espresso with steamed milk and foam"),
    ("Latte", "Coffee", 25000.0, 100, "Espresso with steamed milk, creamy finish"),
    ("Mocha", "Coffee", 28000.0, 100, "Espresso with chocolate and steamed milk"),
    ("Croissant", "Food", 18000.0, 20, "Flaky butter croissant"),
    ("Club Sandwich", "Food", 35000.0, 15, "Chicken, vegetables and house sauce"),
    ("Fried Rice Special", "Food", 28000.0, 20, "Fried rice with egg and chicken"),
    ("Glazed Donut", "Food", 12000.0, 25, "Donut with sweet glaze"),
    ("Iced Tea", "Beverage", 10000.0, 50, "Fresh brewed black tea over ice"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let db_path = match std::env::args().nth(1) {
        Some(path) => path,
        None => CatalogConfig::load()?.sqlite_path,
    };
    println!("Populating catalog at {}...", db_path);

    let pool = init_database(&db_path).await?;
    let gateway = SqliteGateway::new(Arc::new(pool));

    let mut created = 0;
    for (name, category, price, stock, description) in MENU {
        let product = Product::new("", *name, *category)
            .with_description(*description)
            .with_price(*price)
            .with_stock(*stock);

        match gateway.insert_product(&product).await {
            Ok(stored) => {
                created += 1;
                println!("  {} -> {}", stored.name, stored.id);
            }
            Err(e) => {
                eprintln!("Failed to create {}: {}", name, e);
            }
        }
    }

    println!("Populated catalog with {} products.", created);
    Ok(())
}
