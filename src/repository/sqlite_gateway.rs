use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

use super::gateway::CatalogGateway;
use crate::domain::filter::ProductQuery;
use crate::domain::product::Product;
use crate::services::error_handling::{CatalogError, CatalogResult};

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, category, image_url, stock, created_at";

/// Local catalog store backed by the `products` table.
#[derive(Clone)]
pub struct SqliteGateway {
    pool: Arc<SqlitePool>,
}

impl SqliteGateway {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    /// Insert a row. The store assigns `id` and `created_at` when they are empty.
    pub async fn insert_product(&self, product: &Product) -> CatalogResult<Product> {
        let mut stored = product.clone();
        if stored.id.is_empty() {
            stored.id = Uuid::new_v4().to_string();
        }
        if stored.created_at.is_empty() {
            stored.created_at = Utc::now().to_rfc3339();
        }

        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, category, image_url, stock, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&stored.id)
        .bind(&stored.name)
        .bind(&stored.description)
        .bind(stored.price)
        .bind(&stored.category)
        .bind(&stored.image_url)
        .bind(stored.stock)
        .bind(&stored.created_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(stored)
    }

    fn row_to_product(row: sqlx::sqlite::SqliteRow) -> CatalogResult<Product> {
        Ok(Product {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            category: row.try_get("category")?,
            image_url: row.try_get("image_url")?,
            stock: row.try_get("stock")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl CatalogGateway for SqliteGateway {
    /// Category, order and limit run in SQL. Text matching runs on the
    /// candidate rows through [`Product::matches`], since SQLite's `LOWER`
    /// only folds ASCII.
    async fn select_products(&self, query: &ProductQuery) -> CatalogResult<Vec<Product>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM products", PRODUCT_COLUMNS));

        if let Some(category) = &query.category {
            builder.push(" WHERE category = ").push_bind(category.clone());
        }

        builder.push(" ORDER BY name ASC");
        if query.text.is_none() {
            builder
                .push(" LIMIT ")
                .push_bind(i64::try_from(query.limit).unwrap_or(i64::MAX));
        }

        let rows = builder.build().fetch_all(self.pool.as_ref()).await?;
        let mut products = rows
            .into_iter()
            .map(Self::row_to_product)
            .collect::<CatalogResult<Vec<_>>>()?;

        if query.text.is_some() {
            products.retain(|product| product.matches(query));
            products.truncate(query.limit);
        }
        Ok(products)
    }

    async fn select_categories(&self) -> CatalogResult<Vec<String>> {
        let categories: Vec<String> = sqlx::query_scalar("SELECT category FROM products")
            .fetch_all(self.pool.as_ref())
            .await?;
        Ok(categories)
    }

    async fn select_all(&self) -> CatalogResult<Vec<Product>> {
        let rows = sqlx::query(&format!("SELECT {} FROM products", PRODUCT_COLUMNS))
            .fetch_all(self.pool.as_ref())
            .await?;
        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn select_by_id(&self, id: &str) -> CatalogResult<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {} FROM products WHERE id = ?", PRODUCT_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;
        row.map(Self::row_to_product).transpose()
    }

    async fn update_stock(&self, id: &str, stock: i32) -> CatalogResult<()> {
        let result = sqlx::query("UPDATE products SET stock = ? WHERE id = ?")
            .bind(stock)
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CatalogError::NotFound { id: id.to_string() });
        }
        Ok(())
    }
}
