use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::gateway::CatalogGateway;
use crate::domain::filter::ProductQuery;
use crate::domain::product::{Product, StockPatch};
use crate::services::error_handling::{CatalogError, CatalogResult};

const SELECT_COLUMNS: &str = "id,name,description,price,category,image_url,stock,created_at";

#[derive(Debug, Deserialize)]
struct CategoryRow {
    #[serde(default)]
    category: Option<String>,
}

/// PostgREST-compatible hosted database client.
#[derive(Clone)]
pub struct RestGateway {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
    timeout: Duration,
}

impl RestGateway {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        table: impl Into<String>,
        timeout: Duration,
    ) -> CatalogResult<Self> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Configuration { message: e.to_string() })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            table: table.into(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), self.table)
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, self.endpoint())
            .header("apikey", &self.api_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
    }

    /// Query-string parameters for a filtered select.
    pub fn search_params(query: &ProductQuery) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), SELECT_COLUMNS.to_string())];

        if let Some(text) = &query.text {
            let pattern = quote_filter_value(&format!("*{}*", escape_like(text)));
            params.push((
                "or".to_string(),
                format!("(name.ilike.{},description.ilike.{})", pattern, pattern),
            ));
        }

        if let Some(category) = &query.category {
            params.push(("category".to_string(), format!("eq.{}", category)));
        }

        params.push(("limit".to_string(), query.limit.to_string()));
        params.push(("order".to_string(), "name.asc".to_string()));
        params
    }

    fn transport_error(&self, err: reqwest::Error) -> CatalogError {
        if err.is_timeout() {
            CatalogError::Timeout {
                duration_secs: self.timeout.as_secs(),
            }
        } else {
            CatalogError::from(err)
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> CatalogResult<T> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        Self::check_status(response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| self.transport_error(e))
    }

    async fn check_status(response: Response) -> CatalogResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(CatalogError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

/// Backslash-escape `ilike` wildcards so user text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Double-quote a value for use inside a PostgREST logical filter so commas
/// and parentheses in user text do not split the expression.
fn quote_filter_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

#[async_trait]
impl CatalogGateway for RestGateway {
    async fn select_products(&self, query: &ProductQuery) -> CatalogResult<Vec<Product>> {
        let params = Self::search_params(query);
        debug!(table = %self.table, ?params, "Selecting products");

        self.fetch(self.request(Method::GET).query(&params)).await
    }

    async fn select_categories(&self) -> CatalogResult<Vec<String>> {
        let rows: Vec<CategoryRow> = self
            .fetch(self.request(Method::GET).query(&[("select", "category")]))
            .await?;
        Ok(rows.into_iter().filter_map(|row| row.category).collect())
    }

    async fn select_all(&self) -> CatalogResult<Vec<Product>> {
        self.fetch(self.request(Method::GET).query(&[("select", "*")])).await
    }

    async fn select_by_id(&self, id: &str) -> CatalogResult<Option<Product>> {
        let mut products: Vec<Product> = self
            .fetch(
                self.request(Method::GET)
                    .query(&[("select", "*".to_string()), ("id", format!("eq.{}", id))]),
            )
            .await?;

        if products.len() > 1 {
            return Err(CatalogError::Decode(format!(
                "expected at most one row for id {}, got {}",
                id,
                products.len()
            )));
        }
        Ok(products.pop())
    }

    async fn update_stock(&self, id: &str, stock: i32) -> CatalogResult<()> {
        let updated: Vec<Product> = self
            .fetch(
                self.request(Method::PATCH)
                    .header("Prefer", "return=representation")
                    .query(&[("id", format!("eq.{}", id))])
                    .json(&StockPatch { stock }),
            )
            .await?;

        if updated.is_empty() {
            return Err(CatalogError::NotFound { id: id.to_string() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned HTTP response and hand back the raw request text.
    async fn serve_once(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let lower = line.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn gateway(base_url: &str) -> RestGateway {
        RestGateway::new(base_url, "anon-key", "products", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_search_params_full_filter() {
        let query = ProductQuery::new("lat", Some("Coffee".to_string())).with_limit(10);
        let params = RestGateway::search_params(&query);

        assert!(params.contains(&(
            "or".to_string(),
            "(name.ilike.\"*lat*\",description.ilike.\"*lat*\")".to_string()
        )));
        assert!(params.contains(&("category".to_string(), "eq.Coffee".to_string())));
        assert!(params.contains(&("limit".to_string(), "10".to_string())));
        assert!(params.contains(&("order".to_string(), "name.asc".to_string())));
    }

    #[test]
    fn test_search_params_escape_wildcards() {
        let params = RestGateway::search_params(&ProductQuery::new("a_b", None));
        assert!(params.contains(&(
            "or".to_string(),
            "(name.ilike.\"*a\\\\_b*\",description.ilike.\"*a\\\\_b*\")".to_string()
        )));

        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("latte"), "latte");
    }

    #[test]
    fn test_search_params_unfiltered() {
        let params = RestGateway::search_params(&ProductQuery::default());
        assert!(params.iter().all(|(k, _)| k != "or" && k != "category"));
        assert!(params.contains(&("limit".to_string(), "20".to_string())));
    }

    #[test]
    fn test_filter_value_quoting() {
        assert_eq!(quote_filter_value("*a,b*"), "\"*a,b*\"");
        assert_eq!(quote_filter_value("say \"hi\""), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let gateway = gateway("https://example.test/");
        assert_eq!(gateway.endpoint(), "https://example.test/rest/v1/products");
    }

    #[tokio::test]
    async fn test_select_products_sends_auth_headers() {
        let (url, handle) =
            serve_once("200 OK", r#"[{"id":"1","name":"Latte","category":"Coffee","stock":5}]"#).await;

        let products = gateway(&url)
            .select_products(&ProductQuery::new("lat", None))
            .await
            .unwrap();
        let request = handle.await.unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].stock, 5);
        assert!(request.starts_with("GET /rest/v1/products?"));
        assert!(request.contains("apikey: anon-key"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer anon-key"));
    }

    #[tokio::test]
    async fn test_request_timeout_is_timeout_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        // Accept and never answer.
        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let gateway =
            RestGateway::new(&url, "anon-key", "products", Duration::from_millis(100)).unwrap();
        let err = gateway.select_all().await.unwrap_err();
        handle.abort();

        assert!(matches!(err, CatalogError::Timeout { .. }), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn test_http_error_status_is_reported() {
        let (url, handle) = serve_once("401 Unauthorized", r#"{"message":"bad key"}"#).await;

        let err = gateway(&url).select_all().await.unwrap_err();
        handle.await.unwrap();

        match err {
            CatalogError::Http { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("bad key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let (url, handle) = serve_once("200 OK", "not json").await;

        let err = gateway(&url).select_all().await.unwrap_err();
        handle.await.unwrap();

        assert!(matches!(err, CatalogError::Decode(_)));
    }

    #[tokio::test]
    async fn test_update_stock_patches_single_column() {
        let (url, handle) = serve_once("200 OK", r#"[{"id":"2","stock":10}]"#).await;

        gateway(&url).update_stock("2", 10).await.unwrap();
        let request = handle.await.unwrap();

        assert!(request.starts_with("PATCH /rest/v1/products?id=eq.2"));
        assert!(request.contains("return=representation"));
        assert!(request.ends_with(r#"{"stock":10}"#));
    }

    #[tokio::test]
    async fn test_update_stock_no_rows_is_not_found() {
        let (url, handle) = serve_once("200 OK", "[]").await;

        let err = gateway(&url).update_stock("missing", 1).await.unwrap_err();
        handle.await.unwrap();

        assert!(matches!(err, CatalogError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_categories_skip_null_rows() {
        let (url, handle) =
            serve_once("200 OK", r#"[{"category":"Coffee"},{"category":null},{"category":"Coffee"}]"#).await;

        let categories = gateway(&url).select_categories().await.unwrap();
        handle.await.unwrap();

        assert_eq!(categories, vec!["Coffee".to_string(), "Coffee".to_string()]);
    }
}
