//! Product repository.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::entities::product::{
    CreateProductRequest, ListingFlags, Product, ProductCategory, ProductStatus,
    UpdateProductRequest,
};
use crate::types::{new_public_id, now_rfc3339, ProductError, ProductResult};

const PRODUCT_COLUMNS: &str = "id, public_id, name, description, category, image_urls, \
     for_exchange, for_sale, is_free, user_id, status, created_at, updated_at";

/// Repository for product rows.
#[derive(Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: i64, request: &CreateProductRequest) -> ProductResult<Product> {
        let now = now_rfc3339();
        let public_id = new_public_id();
        let image_urls = serde_json::to_string(&request.image_urls)
            .map_err(|e| ProductError::DatabaseError(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO products (public_id, name, description, category, image_urls, \
             for_exchange, for_sale, is_free, user_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.category.as_str())
        .bind(&image_urls)
        .bind(request.listing.for_exchange)
        .bind(request.listing.for_sale)
        .bind(request.listing.is_free)
        .bind(user_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let product_id = result.last_insert_rowid();
        self.find_by_id(product_id).await?.ok_or_else(|| {
            ProductError::DatabaseError("failed to read back created product".to_string())
        })
    }

    pub async fn find_by_id(&self, id: i64) -> ProductResult<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_product).transpose()
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> ProductResult<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_product).transpose()
    }

    /// Active products of one user, newest first.
    pub async fn find_by_user(&self, user_id: i64) -> ProductResult<Vec<Product>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE user_id = ? AND status = 'active' ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_product).collect()
    }

    /// Active products in the given categories, newest first. An empty
    /// category list means every category; this is the store-side half of the
    /// discovery feed.
    pub async fn find_active_by_categories(
        &self,
        categories: &[ProductCategory],
    ) -> ProductResult<Vec<Product>> {
        if categories.is_empty() {
            let rows = sqlx::query(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products \
                 WHERE status = 'active' ORDER BY created_at DESC, id DESC"
            ))
            .fetch_all(&self.pool)
            .await?;
            return rows.iter().map(map_product).collect();
        }

        let placeholders = vec!["?"; categories.len()].join(", ");
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE status = 'active' AND category IN ({placeholders}) \
             ORDER BY created_at DESC, id DESC"
        );

        let mut query = sqlx::query(&sql);
        for category in categories {
            query = query.bind(category.as_str());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(map_product).collect()
    }

    /// Apply a partial update to a product.
    pub async fn update(&self, product_id: i64, request: &UpdateProductRequest) -> ProductResult<Product> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut text_args: Vec<String> = Vec::new();

        if let Some(ref name) = request.name {
            clauses.push("name = ?");
            text_args.push(name.clone());
        }
        if let Some(ref description) = request.description {
            clauses.push("description = ?");
            text_args.push(description.clone());
        }
        if let Some(category) = request.category {
            clauses.push("category = ?");
            text_args.push(category.as_str().to_string());
        }
        if let Some(ref image_urls) = request.image_urls {
            clauses.push("image_urls = ?");
            text_args.push(
                serde_json::to_string(image_urls)
                    .map_err(|e| ProductError::DatabaseError(e.to_string()))?,
            );
        }

        let listing = request.listing;
        if listing.is_some() {
            clauses.push("for_exchange = ?");
            clauses.push("for_sale = ?");
            clauses.push("is_free = ?");
        }

        if clauses.is_empty() {
            return self
                .find_by_id(product_id)
                .await?
                .ok_or(ProductError::ProductNotFound);
        }

        clauses.push("updated_at = ?");

        let sql = format!(
            "UPDATE products SET {} WHERE id = ? AND status = 'active'",
            clauses.join(", ")
        );

        let mut query = sqlx::query(&sql);
        for value in text_args {
            query = query.bind(value);
        }
        if let Some(ListingFlags {
            for_exchange,
            for_sale,
            is_free,
        }) = listing
        {
            query = query.bind(for_exchange).bind(for_sale).bind(is_free);
        }
        query = query.bind(now_rfc3339()).bind(product_id);

        let result = query.execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(ProductError::ProductNotFound);
        }

        self.find_by_id(product_id)
            .await?
            .ok_or(ProductError::ProductNotFound)
    }

    /// Soft-delete a product.
    pub async fn soft_delete(&self, product_id: i64) -> ProductResult<()> {
        let result = sqlx::query(
            "UPDATE products SET status = 'deleted', updated_at = ? \
             WHERE id = ? AND status = 'active'",
        )
        .bind(now_rfc3339())
        .bind(product_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ProductError::ProductNotFound);
        }
        Ok(())
    }
}

fn map_product(row: &SqliteRow) -> ProductResult<Product> {
    let get_err = |e: sqlx::Error| ProductError::DatabaseError(e.to_string());

    let image_urls_json: String = row.try_get("image_urls").map_err(get_err)?;
    let image_urls: Vec<String> = serde_json::from_str(&image_urls_json).unwrap_or_default();

    Ok(Product {
        id: row.try_get("id").map_err(get_err)?,
        public_id: row.try_get("public_id").map_err(get_err)?,
        name: row.try_get("name").map_err(get_err)?,
        description: row.try_get("description").map_err(get_err)?,
        category: ProductCategory::from(
            row.try_get::<String, _>("category").map_err(get_err)?.as_str(),
        ),
        image_urls,
        listing: ListingFlags {
            for_exchange: row.try_get("for_exchange").map_err(get_err)?,
            for_sale: row.try_get("for_sale").map_err(get_err)?,
            is_free: row.try_get("is_free").map_err(get_err)?,
        },
        user_id: row.try_get("user_id").map_err(get_err)?,
        status: ProductStatus::from(
            row.try_get::<String, _>("status").map_err(get_err)?.as_str(),
        ),
        created_at: row.try_get("created_at").map_err(get_err)?,
        updated_at: row.try_get("updated_at").map_err(get_err)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::UserRepository;
    use crate::test_support::test_pool;

    fn tomato_request() -> CreateProductRequest {
        CreateProductRequest {
            name: "Cherry tomatoes".to_string(),
            description: "Sweet, home grown".to_string(),
            category: ProductCategory::Vegetables,
            image_urls: vec!["https://example.com/t.jpg".to_string()],
            listing: ListingFlags {
                for_exchange: true,
                for_sale: false,
                is_free: false,
            },
        }
    }

    async fn seeded_user(pool: &SqlitePool) -> i64 {
        UserRepository::new(pool.clone())
            .create(None, Some("grower"))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn create_and_read_back() {
        let (pool, _guard) = test_pool().await;
        let user_id = seeded_user(&pool).await;
        let repo = ProductRepository::new(pool);

        let product = repo.create(user_id, &tomato_request()).await.unwrap();
        assert_eq!(product.name, "Cherry tomatoes");
        assert_eq!(product.category, ProductCategory::Vegetables);
        assert!(product.listing.for_exchange);
        assert!(product.is_active());
        assert_eq!(product.image_urls.len(), 1);

        let found = repo.find_by_public_id(&product.public_id).await.unwrap().unwrap();
        assert_eq!(found, product);
    }

    #[tokio::test]
    async fn category_filter_matches_store_side_semantics() {
        let (pool, _guard) = test_pool().await;
        let user_id = seeded_user(&pool).await;
        let repo = ProductRepository::new(pool);

        repo.create(user_id, &tomato_request()).await.unwrap();

        let mut seeds = tomato_request();
        seeds.name = "Pumpkin seeds".to_string();
        seeds.category = ProductCategory::Seeds;
        repo.create(user_id, &seeds).await.unwrap();

        let all = repo.find_active_by_categories(&[]).await.unwrap();
        assert_eq!(all.len(), 2);

        let only_seeds = repo
            .find_active_by_categories(&[ProductCategory::Seeds])
            .await
            .unwrap();
        assert_eq!(only_seeds.len(), 1);
        assert_eq!(only_seeds[0].name, "Pumpkin seeds");

        let both = repo
            .find_active_by_categories(&[ProductCategory::Seeds, ProductCategory::Vegetables])
            .await
            .unwrap();
        assert_eq!(both.len(), 2);
    }

    #[tokio::test]
    async fn update_is_partial_and_soft_delete_hides() {
        let (pool, _guard) = test_pool().await;
        let user_id = seeded_user(&pool).await;
        let repo = ProductRepository::new(pool);

        let product = repo.create(user_id, &tomato_request()).await.unwrap();

        let updated = repo
            .update(
                product.id,
                &UpdateProductRequest {
                    description: Some("Extra sweet".to_string()),
                    listing: Some(ListingFlags {
                        for_exchange: true,
                        for_sale: false,
                        is_free: true,
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.description, "Extra sweet");
        assert!(updated.listing.is_free);
        assert_eq!(updated.name, product.name);

        repo.soft_delete(product.id).await.unwrap();
        let gone = repo.find_by_user(user_id).await.unwrap();
        assert!(gone.is_empty());

        // Soft-deleted rows stay addressable by id for existing references.
        let still_there = repo.find_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(still_there.status, ProductStatus::Deleted);

        let err = repo.soft_delete(product.id).await.unwrap_err();
        assert!(matches!(err, ProductError::ProductNotFound));
    }
}
