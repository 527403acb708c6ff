use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    pub in_stock: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    pub in_stock: bool,
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Product>, StoreError>;
    async fn count(&self) -> Result<i64, StoreError>;
    async fn insert_many(&self, products: Vec<NewProduct>) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct PgProductStore {
    db: PgPool,
}

impl PgProductStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price, category, in_stock, created_at, updated_at
            FROM products
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    async fn insert_many(&self, products: Vec<NewProduct>) -> Result<u64, StoreError> {
        let mut tx = self.db.begin().await?;
        let mut inserted = 0;
        for p in products {
            let res = sqlx::query(
                r#"
                INSERT INTO products (id, name, description, price, category, in_stock)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(p.name)
            .bind(p.description)
            .bind(p.price)
            .bind(p.category)
            .bind(p.in_stock)
            .execute(&mut *tx)
            .await?;
            inserted += res.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }
}

#[derive(Default)]
pub struct MemoryProductStore {
    products: RwLock<Vec<Product>>,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.products.read().await.clone())
    }

    async fn count(&self) -> Result<i64, StoreError> {
        Ok(self.products.read().await.len() as i64)
    }

    async fn insert_many(&self, products: Vec<NewProduct>) -> Result<u64, StoreError> {
        let mut store = self.products.write().await;
        let now = OffsetDateTime::now_utc();
        let n = products.len() as u64;
        store.extend(products.into_iter().map(|p| Product {
            id: Uuid::new_v4(),
            name: p.name,
            description: p.description,
            price: p.price,
            category: p.category,
            in_stock: p.in_stock,
            created_at: now,
            updated_at: now,
        }));
        Ok(n)
    }
}
