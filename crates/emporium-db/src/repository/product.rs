//! # Product Repository
//!
//! The catalog slice checkout needs: price and stock by product id.
//!
//! Catalog management (search, categories, images) lives elsewhere; this
//! table is what the storefront reads when pricing and what inventory
//! effects write to.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use emporium_core::{Money, Product};

/// Row shape of `products`.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    unit_price: i64,
    stock_quantity: i64,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            unit_price: Money::from_minor(row.unit_price),
            stock_quantity: row.stock_quantity,
        }
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, unit_price, stock_quantity
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Lists products ordered by name.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, unit_price, stock_quantity
            FROM products
            ORDER BY name
            LIMIT ?1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Inserting product");
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO products (id, name, unit_price, stock_quantity, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.unit_price.minor())
        .bind(product.stock_quantity)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &product.id),
            other => other,
        })?;

        Ok(())
    }

    /// Changes the list price. Existing carts and orders keep their frozen price.
    pub async fn update_price(&self, id: &str, price: Money) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET unit_price = ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(price.minor())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }

    /// Current stock for a product.
    pub async fn stock(&self, id: &str) -> DbResult<i64> {
        let stock: Option<i64> =
            sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        stock.ok_or_else(|| DbError::not_found("Product", id))
    }
}
