use futures::stream::{self, BoxStream, StreamExt};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

use super::gateway::DynCatalogGateway;
use crate::domain::filter::ProductQuery;
use crate::domain::product::Product;
use crate::domain::product_validation::ProductValidator;
use crate::services::error_handling::{CatalogResult, LogHelper};

/// Stateless translation layer between typed catalog requests and the gateway.
///
/// Every operation returns the gateway's cause on failure, after logging it.
/// Callers that only want a usable value can fall back to the type's empty
/// sentinel (see [`ProductRepository::search_products_stream`]).
#[derive(Clone)]
pub struct ProductRepository {
    gateway: DynCatalogGateway,
}

impl ProductRepository {
    pub fn new(gateway: DynCatalogGateway) -> Self {
        Self { gateway }
    }

    #[instrument(skip(self), fields(text = ?query.text, category = ?query.category, limit = query.limit))]
    pub async fn search_products(&self, query: &ProductQuery) -> CatalogResult<Vec<Product>> {
        let mut products = self
            .gateway
            .select_products(query)
            .await
            .inspect_err(|e| LogHelper::log_gateway_failure("search_products", e))?;

        // The gateway already orders and caps; hold the contract regardless of backend.
        products.sort_by(|a, b| a.name.cmp(&b.name));
        products.truncate(query.limit);

        debug!(count = products.len(), "Search completed");
        Ok(products)
    }

    /// One-shot stream yielding exactly one product list. Failures yield an
    /// empty list; call again to refresh.
    pub fn search_products_stream(
        &self,
        query: &str,
        category: Option<String>,
        limit: usize,
    ) -> BoxStream<'static, Vec<Product>> {
        let repository = self.clone();
        let query = ProductQuery::new(query, category).with_limit(limit);
        stream::once(async move { repository.search_products(&query).await.unwrap_or_default() }).boxed()
    }

    /// Distinct categories, sorted ascending.
    #[instrument(skip(self))]
    pub async fn get_categories(&self) -> CatalogResult<Vec<String>> {
        let categories = self
            .gateway
            .select_categories()
            .await
            .inspect_err(|e| LogHelper::log_gateway_failure("get_categories", e))?;

        Ok(categories.into_iter().collect::<BTreeSet<_>>().into_iter().collect())
    }

    #[instrument(skip(self))]
    pub async fn get_all_products(&self) -> CatalogResult<Vec<Product>> {
        self.gateway
            .select_all()
            .await
            .inspect_err(|e| LogHelper::log_gateway_failure("get_all_products", e))
    }

    #[instrument(skip(self))]
    pub async fn get_product_by_id(&self, id: &str) -> CatalogResult<Option<Product>> {
        self.gateway
            .select_by_id(id)
            .await
            .inspect_err(|e| LogHelper::log_gateway_failure("get_product_by_id", e))
    }

    /// Write `stock` on one row. Nothing is echoed back; re-read to observe it.
    #[instrument(skip(self))]
    pub async fn update_product_stock(&self, id: &str, new_stock: i32) -> CatalogResult<()> {
        if let Err(e) = ProductValidator::validate_stock_update(id, new_stock) {
            LogHelper::log_validation_failure(e.field(), new_stock, &e.to_string());
            return Err(e.into());
        }

        self.gateway
            .update_stock(id, new_stock)
            .await
            .inspect_err(|e| LogHelper::log_gateway_failure("update_product_stock", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::gateway::MockCatalogGateway;
    use crate::services::error_handling::CatalogError;
    use std::sync::Arc;

    fn repository(mock: MockCatalogGateway) -> ProductRepository {
        ProductRepository::new(Arc::new(mock))
    }

    #[tokio::test]
    async fn test_search_sorts_and_caps_gateway_output() {
        let mut mock = MockCatalogGateway::new();
        mock.expect_select_products().returning(|_| {
            Ok(vec![
                Product::new("3", "Mocha", "Coffee"),
                Product::new("1", "Americano", "Coffee"),
                Product::new("2", "Latte", "Coffee"),
            ])
        });

        let query = ProductQuery::new("", None).with_limit(2);
        let products = repository(mock).search_products(&query).await.unwrap();

        let names: Vec<_> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Americano", "Latte"]);
    }

    #[tokio::test]
    async fn test_search_failure_carries_cause() {
        let mut mock = MockCatalogGateway::new();
        mock.expect_select_products()
            .returning(|_| Err(CatalogError::Http { status: 503, body: "down".to_string() }));

        let err = repository(mock)
            .search_products(&ProductQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Http { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_stream_emits_once_and_empty_on_failure() {
        let mut mock = MockCatalogGateway::new();
        mock.expect_select_products()
            .times(1)
            .returning(|_| Err(CatalogError::Decode("garbage".to_string())));

        let emissions: Vec<Vec<Product>> = repository(mock)
            .search_products_stream("lat", None, 20)
            .collect()
            .await;
        assert_eq!(emissions, vec![Vec::<Product>::new()]);
    }

    #[tokio::test]
    async fn test_stream_passes_normalized_query() {
        let mut mock = MockCatalogGateway::new();
        mock.expect_select_products()
            .withf(|q| q.text.is_none() && q.category.as_deref() == Some("Bakery") && q.limit == 7)
            .times(1)
            .returning(|_| Ok(vec![Product::new("2", "Muffin", "Bakery")]));

        let emissions: Vec<Vec<Product>> = repository(mock)
            .search_products_stream("  ", Some("Bakery".to_string()), 7)
            .collect()
            .await;
        assert_eq!(emissions.len(), 1);
        assert_eq!(emissions[0][0].id, "2");
    }

    #[tokio::test]
    async fn test_categories_are_deduplicated_and_sorted() {
        let mut mock = MockCatalogGateway::new();
        mock.expect_select_categories().returning(|| {
            Ok(vec![
                "Coffee".to_string(),
                "Bakery".to_string(),
                "Coffee".to_string(),
                "Beans".to_string(),
            ])
        });

        let categories = repository(mock).get_categories().await.unwrap();
        assert_eq!(categories, vec!["Bakery", "Beans", "Coffee"]);
    }

    #[tokio::test]
    async fn test_invalid_stock_never_reaches_gateway() {
        let mut mock = MockCatalogGateway::new();
        mock.expect_update_stock().never();

        let err = repository(mock).update_product_stock("1", -5).await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_update_forwards_to_gateway() {
        let mut mock = MockCatalogGateway::new();
        mock.expect_update_stock()
            .withf(|id, stock| id == "2" && *stock == 10)
            .times(1)
            .returning(|_, _| Ok(()));

        repository(mock).update_product_stock("2", 10).await.unwrap();
    }
}
