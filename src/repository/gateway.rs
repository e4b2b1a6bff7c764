use async_trait::async_trait;
use mockall::automock;
use std::sync::Arc;

use crate::domain::filter::ProductQuery;
use crate::domain::product::Product;
use crate::services::error_handling::CatalogResult;

pub type DynCatalogGateway = Arc<dyn CatalogGateway>;

/// Remote product table. Implementations own transport and auth; the
/// repository only ever sees typed rows or a `CatalogError`.
#[automock]
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Filtered select: case-insensitive substring on name OR description,
    /// category equality, capped at `query.limit`, ordered by name ascending.
    async fn select_products(&self, query: &ProductQuery) -> CatalogResult<Vec<Product>>;

    /// The category column of every row, duplicates included.
    async fn select_categories(&self) -> CatalogResult<Vec<String>>;

    /// Every row in store order.
    async fn select_all(&self) -> CatalogResult<Vec<Product>>;

    async fn select_by_id(&self, id: &str) -> CatalogResult<Option<Product>>;

    /// Partial update of `stock` on the row whose id matches.
    async fn update_stock(&self, id: &str, stock: i32) -> CatalogResult<()>;
}
