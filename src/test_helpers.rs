// Fake gateways for controller and repository tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};

use crate::domain::filter::ProductQuery;
use crate::domain::product::Product;
use crate::repository::CatalogGateway;
use crate::services::error_handling::{CatalogError, CatalogResult};

/// Vector-backed gateway with switchable failure.
#[derive(Default)]
pub struct InMemoryGateway {
    products: Mutex<Vec<Product>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl InMemoryGateway {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: Mutex::new(products),
            ..Default::default()
        }
    }

    /// The two-product coffee shop used across tests.
    pub fn seeded() -> Self {
        Self::new(vec![
            Product::new("1", "Latte", "Coffee").with_price(25000.0).with_stock(5),
            Product::new("2", "Muffin", "Bakery").with_price(12000.0).with_stock(0),
        ])
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> CatalogResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CatalogError::Http {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogGateway for InMemoryGateway {
    async fn select_products(&self, query: &ProductQuery) -> CatalogResult<Vec<Product>> {
        self.enter()?;
        let mut matched: Vec<Product> = self
            .products
            .lock()
            .iter()
            .filter(|p| p.matches(query))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.name.cmp(&b.name));
        matched.truncate(query.limit);
        Ok(matched)
    }

    async fn select_categories(&self) -> CatalogResult<Vec<String>> {
        self.enter()?;
        Ok(self.products.lock().iter().map(|p| p.category.clone()).collect())
    }

    async fn select_all(&self) -> CatalogResult<Vec<Product>> {
        self.enter()?;
        Ok(self.products.lock().clone())
    }

    async fn select_by_id(&self, id: &str) -> CatalogResult<Option<Product>> {
        self.enter()?;
        Ok(self.products.lock().iter().find(|p| p.id == id).cloned())
    }

    async fn update_stock(&self, id: &str, stock: i32) -> CatalogResult<()> {
        self.enter()?;
        let mut products = self.products.lock();
        match products.iter_mut().find(|p| p.id == id) {
            Some(product) => {
                product.stock = stock;
                Ok(())
            }
            None => Err(CatalogError::NotFound { id: id.to_string() }),
        }
    }
}

/// Holds every search until the test releases it, keyed by query text
/// (empty string for no text). Other operations pass straight through.
pub struct GatedGateway {
    inner: InMemoryGateway,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    started: Mutex<Vec<String>>,
    completed: Mutex<Vec<String>>,
    progress: Notify,
}

impl GatedGateway {
    pub fn new(inner: InMemoryGateway) -> Self {
        Self {
            inner,
            gates: Mutex::new(HashMap::new()),
            started: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
            progress: Notify::new(),
        }
    }

    fn gate(&self, text: &str) -> Arc<Semaphore> {
        Arc::clone(
            self.gates
                .lock()
                .entry(text.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(0))),
        )
    }

    /// Let one pending (or future) search for `text` proceed.
    pub fn release(&self, text: &str) {
        self.gate(text).add_permits(1);
    }

    pub async fn wait_started(&self, text: &str) {
        self.wait_until(|| self.started.lock().iter().any(|t| t == text)).await;
    }

    pub async fn wait_completed(&self, text: &str) {
        self.wait_until(|| self.completed.lock().iter().any(|t| t == text)).await;
    }

    async fn wait_until(&self, done: impl Fn() -> bool) {
        loop {
            let notified = self.progress.notified();
            if done() {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl CatalogGateway for GatedGateway {
    async fn select_products(&self, query: &ProductQuery) -> CatalogResult<Vec<Product>> {
        let key = query.text.clone().unwrap_or_default();
        let gate = self.gate(&key);

        self.started.lock().push(key.clone());
        self.progress.notify_waiters();

        if let Ok(permit) = gate.acquire().await {
            permit.forget();
        }
        let result = self.inner.select_products(query).await;

        self.completed.lock().push(key);
        self.progress.notify_waiters();
        result
    }

    async fn select_categories(&self) -> CatalogResult<Vec<String>> {
        self.inner.select_categories().await
    }

    async fn select_all(&self) -> CatalogResult<Vec<Product>> {
        self.inner.select_all().await
    }

    async fn select_by_id(&self, id: &str) -> CatalogResult<Option<Product>> {
        self.inner.select_by_id(id).await
    }

    async fn update_stock(&self, id: &str, stock: i32) -> CatalogResult<()> {
        self.inner.update_stock(id, stock).await
    }
}
