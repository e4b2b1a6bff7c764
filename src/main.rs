use anyhow::Result;
use pos_catalog::config::CatalogConfig;
use pos_catalog::domain::filter::{FilterState, ProductQuery};
use pos_catalog::repository::ProductRepository;
use pos_catalog::services::{CatalogController, LoadPhase};
use tracing_subscriber::EnvFilter;

/// Usage: pos-catalog [query] [category]
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let mut args = std::env::args().skip(1);
    let query = args.next().unwrap_or_default();
    let category = args.next();

    let config = CatalogConfig::load()?;
    let gateway = config.build_gateway().await?;
    let controller = CatalogController::new(ProductRepository::new(gateway), config.controller_options());

    let mut state_rx = controller.subscribe();
    if ProductQuery::new(&query, category.clone()).is_unfiltered() {
        controller.load_products().await;
    } else {
        controller.set_filter(FilterState {
            search_query: query,
            selected_category: category,
        });
    }

    let state = state_rx
        .wait_for(|s| !s.is_loading && matches!(s.phase, LoadPhase::Loaded | LoadPhase::Failed))
        .await?
        .clone();

    if !state.error.is_empty() {
        eprintln!("{}", state.error);
    }
    if !state.categories.is_empty() {
        println!("Categories: {}", state.categories.join(", "));
    }
    for product in &state.products {
        let stock = if product.is_in_stock() {
            product.stock.to_string()
        } else {
            "sold out".to_string()
        };
        println!(
            "{:<38} {:<24} {:<12} {:>10.2} {:>8}",
            product.id, product.name, product.category, product.price, stock
        );
    }
    println!("{} product(s)", state.products.len());

    Ok(())
}
