use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error_handling::{CatalogError, CatalogResult, LogHelper, UserErrorFormatter};
use super::loading_guard::{FetchKind, LoadingGuard};
use crate::domain::filter::{FilterState, DEFAULT_SEARCH_LIMIT};
use crate::domain::product::Product;
use crate::repository::ProductRepository;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// Everything a catalog screen renders. Replaced wholesale on each completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogState {
    pub products: Vec<Product>,
    pub categories: Vec<String>,
    pub is_loading: bool,
    pub error: String, // Empty means no error
    pub phase: LoadPhase,
    pub(crate) in_flight: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    pub search_limit: usize,
    pub request_timeout: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            search_limit: DEFAULT_SEARCH_LIMIT,
            request_timeout: Duration::from_secs(30),
        }
    }
}

struct Inner {
    repository: ProductRepository,
    state: Arc<watch::Sender<CatalogState>>,
    filter: watch::Sender<FilterState>,
    generation: AtomicU64,
    options: ControllerOptions,
}

/// Owns the observable catalog state and the search pipeline.
///
/// A single task watches the combined (query, category) filter. Every change
/// starts a fetch tagged with a fresh generation; a fetch only publishes its
/// result if no newer generation has started since. Superseded fetches run to
/// completion but their results are dropped.
///
/// Must be constructed inside a tokio runtime.
pub struct CatalogController {
    inner: Arc<Inner>,
    pipeline: JoinHandle<()>,
}

impl CatalogController {
    pub fn new(repository: ProductRepository, options: ControllerOptions) -> Self {
        let (state, _) = watch::channel(CatalogState::default());
        let (filter, filter_rx) = watch::channel(FilterState::default());

        let inner = Arc::new(Inner {
            repository,
            state: Arc::new(state),
            filter,
            generation: AtomicU64::new(0),
            options,
        });

        Inner::spawn_category_load(&inner);
        let pipeline = tokio::spawn(Inner::run_pipeline(Arc::clone(&inner), filter_rx));

        info!(
            search_limit = options.search_limit,
            timeout_secs = options.request_timeout.as_secs(),
            "Catalog controller started"
        );
        Self { inner, pipeline }
    }

    pub fn set_search_query(&self, text: impl Into<String>) {
        let text = text.into();
        self.inner.filter.send_if_modified(|f| {
            if f.search_query == text {
                return false;
            }
            f.search_query = text;
            true
        });
    }

    pub fn set_selected_category(&self, category: Option<String>) {
        self.inner.filter.send_if_modified(|f| {
            if f.selected_category == category {
                return false;
            }
            f.selected_category = category;
            true
        });
    }

    /// Replace both inputs at once; triggers a single fetch.
    pub fn set_filter(&self, filter: FilterState) {
        self.inner.filter.send_if_modified(|f| {
            if *f == filter {
                return false;
            }
            *f = filter;
            true
        });
    }

    /// Re-run the current filter, e.g. after a stock write.
    pub fn refresh(&self) {
        let filter = self.inner.filter.borrow().clone();
        Inner::trigger_search(&self.inner, filter);
    }

    /// Unfiltered load. Publishes unconditionally, outside the generation guard.
    pub async fn load_products(&self) {
        let _guard = LoadingGuard::acquire(&self.inner.state, FetchKind::Products);
        let result = self
            .inner
            .bounded(self.inner.repository.get_all_products())
            .await;

        self.inner.state.send_modify(|s| match result {
            Ok(products) => {
                s.products = products;
                s.error.clear();
                s.phase = LoadPhase::Loaded;
            }
            Err(e) => {
                s.products.clear();
                s.error = format!("Error loading products: {}", UserErrorFormatter::format_for_ui(&e));
                s.phase = LoadPhase::Failed;
            }
        });
    }

    /// Looks up one product without touching the visible list.
    /// `None` covers both "no such id" and a failed fetch; see `error`.
    pub async fn get_product_by_id(&self, id: &str) -> Option<Product> {
        match self.try_get_product_by_id(id).await {
            Ok(product) => {
                self.inner.state.send_modify(|s| s.error.clear());
                product
            }
            Err(e) => {
                self.inner.publish_error(format!(
                    "Error loading product: {}",
                    UserErrorFormatter::format_for_ui(&e)
                ));
                None
            }
        }
    }

    pub async fn try_get_product_by_id(&self, id: &str) -> CatalogResult<Option<Product>> {
        let _guard = LoadingGuard::acquire(&self.inner.state, FetchKind::Lookup);
        self.inner
            .bounded(self.inner.repository.get_product_by_id(id))
            .await
    }

    /// Writes the stock count. The visible list is not updated; call
    /// [`CatalogController::refresh`] to observe the change.
    pub async fn update_product_stock(&self, id: &str, new_stock: i32) -> bool {
        match self.try_update_product_stock(id, new_stock).await {
            Ok(()) => true,
            Err(e) => {
                self.inner.publish_error(format!(
                    "Error updating product: {}",
                    UserErrorFormatter::format_for_ui(&e)
                ));
                false
            }
        }
    }

    pub async fn try_update_product_stock(&self, id: &str, new_stock: i32) -> CatalogResult<()> {
        self.inner
            .bounded(self.inner.repository.update_product_stock(id, new_stock))
            .await
    }

    pub fn state(&self) -> CatalogState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.inner.state.subscribe()
    }

    pub fn filter(&self) -> FilterState {
        self.inner.filter.borrow().clone()
    }

    /// Number of searches triggered so far.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    pub fn shutdown(&self) {
        self.pipeline.abort();
    }
}

impl Drop for CatalogController {
    fn drop(&mut self) {
        self.pipeline.abort();
    }
}

impl Inner {
    async fn run_pipeline(inner: Arc<Inner>, mut filter_rx: watch::Receiver<FilterState>) {
        // The initial empty filter does not fetch; only changes do.
        filter_rx.borrow_and_update();
        while filter_rx.changed().await.is_ok() {
            let filter = filter_rx.borrow_and_update().clone();
            Self::trigger_search(&inner, filter);
        }
    }

    fn trigger_search(inner: &Arc<Inner>, filter: FilterState) {
        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let guard = LoadingGuard::acquire(&inner.state, FetchKind::Products);
        let inner = Arc::clone(inner);

        debug!(generation, query = %filter.search_query, category = ?filter.selected_category, "Search triggered");
        tokio::spawn(async move {
            let _guard = guard;
            let query = filter.to_query(inner.options.search_limit);
            let result = inner.bounded(inner.repository.search_products(&query)).await;
            inner.apply_search(generation, result);
        });
    }

    fn apply_search(&self, generation: u64, result: CatalogResult<Vec<Product>>) {
        // Checked under the channel's write lock so two completions cannot interleave.
        self.state.send_if_modified(|s| {
            let current = self.generation.load(Ordering::SeqCst);
            if current != generation {
                LogHelper::log_stale_result("search_products", generation, current);
                return false;
            }
            match result {
                Ok(products) => {
                    s.products = products;
                    s.error.clear();
                    s.phase = LoadPhase::Loaded;
                }
                Err(e) => {
                    s.products.clear();
                    s.error = UserErrorFormatter::format_for_ui(&e);
                    s.phase = LoadPhase::Failed;
                }
            }
            true
        });
    }

    fn spawn_category_load(inner: &Arc<Inner>) {
        let guard = LoadingGuard::acquire(&inner.state, FetchKind::Categories);
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            let _guard = guard;
            match inner.bounded(inner.repository.get_categories()).await {
                Ok(categories) => inner.state.send_modify(|s| s.categories = categories),
                Err(e) => {
                    warn!(error = %e, "Category load failed");
                    inner.publish_error(format!(
                        "Error loading categories: {}",
                        UserErrorFormatter::format_for_ui(&e)
                    ));
                }
            }
        });
    }

    fn publish_error(&self, message: String) {
        self.state.send_modify(|s| s.error = message);
    }

    async fn bounded<T>(&self, operation: impl Future<Output = CatalogResult<T>>) -> CatalogResult<T> {
        let limit = self.options.request_timeout;
        match tokio::time::timeout(limit, operation).await {
            Ok(result) => result,
            Err(_) => Err(CatalogError::Timeout {
                duration_secs: limit.as_secs(),
            }),
        }
    }
}
