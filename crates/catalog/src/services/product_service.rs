//! Product publishing.

use sqlx::SqlitePool;
use tracing::info;

use gardenswap_database::{
    CreateProductRequest, Product, ProductError, ProductRepository, ProductResult,
    UpdateProductRequest,
};

use crate::types::{ProductEvent, ProductEventBus};

/// Service for publishing and maintaining a user's own products.
#[derive(Clone)]
pub struct ProductService {
    products: ProductRepository,
    bus: ProductEventBus,
}

impl ProductService {
    pub fn new(pool: SqlitePool, bus: ProductEventBus) -> Self {
        Self {
            products: ProductRepository::new(pool),
            bus,
        }
    }

    pub async fn publish(
        &self,
        user_id: i64,
        request: CreateProductRequest,
    ) -> ProductResult<Product> {
        if let Err(reason) = request.validate() {
            return Err(ProductError::ValidationFailed(reason));
        }

        let product = self.products.create(user_id, &request).await?;

        info!(product = %product.public_id, user = user_id, "published product");
        self.bus.publish(ProductEvent::Created {
            product: product.clone(),
        });

        Ok(product)
    }

    pub async fn update(
        &self,
        user_id: i64,
        public_id: &str,
        request: UpdateProductRequest,
    ) -> ProductResult<Product> {
        if let Err(reason) = request.validate() {
            return Err(ProductError::ValidationFailed(reason));
        }

        let existing = self.get(public_id).await?;
        if existing.user_id != user_id {
            return Err(ProductError::NotProductOwner);
        }

        let product = self.products.update(existing.id, &request).await?;
        self.bus.publish(ProductEvent::Updated {
            product: product.clone(),
        });

        Ok(product)
    }

    pub async fn remove(&self, user_id: i64, public_id: &str) -> ProductResult<()> {
        let existing = self.get(public_id).await?;
        if existing.user_id != user_id {
            return Err(ProductError::NotProductOwner);
        }

        self.products.soft_delete(existing.id).await?;

        info!(product = %public_id, user = user_id, "removed product");
        self.bus.publish(ProductEvent::Deleted {
            product_id: existing.id,
            public_id: existing.public_id,
        });

        Ok(())
    }

    pub async fn get(&self, public_id: &str) -> ProductResult<Product> {
        self.products
            .find_by_public_id(public_id)
            .await?
            .ok_or(ProductError::ProductNotFound)
    }

    /// A user's own active products.
    pub async fn products_of(&self, user_id: i64) -> ProductResult<Vec<Product>> {
        self.products.find_by_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gardenswap_config::DatabaseConfig;
    use gardenswap_database::{
        initialize_database, ListingFlags, ProductCategory, UserRepository,
    };
    use tempfile::TempDir;

    async fn setup() -> (ProductService, ProductEventBus, i64, i64, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("catalog.db").display()),
            max_connections: 2,
        };
        let pool = initialize_database(&config).await.unwrap();

        let users = UserRepository::new(pool.clone());
        let owner = users.create(Some("owner@example.com"), None).await.unwrap();
        let other = users.create(Some("other@example.com"), None).await.unwrap();

        let bus = ProductEventBus::default();
        let service = ProductService::new(pool, bus.clone());
        (service, bus, owner.id, other.id, temp_dir)
    }

    fn herb_request() -> CreateProductRequest {
        CreateProductRequest {
            name: "Rosemary cuttings".to_string(),
            description: "Rooted, ready to plant".to_string(),
            category: ProductCategory::Herbs,
            image_urls: Vec::new(),
            listing: ListingFlags {
                for_exchange: true,
                for_sale: false,
                is_free: true,
            },
        }
    }

    #[tokio::test]
    async fn publish_emits_an_event() {
        let (service, bus, owner, _other, _guard) = setup().await;
        let mut rx = bus.subscribe();

        let product = service.publish(owner, herb_request()).await.unwrap();

        let event = rx.recv().await.unwrap();
        match event {
            ProductEvent::Created { product: emitted } => assert_eq!(emitted.id, product.id),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn only_the_owner_may_update_or_remove() {
        let (service, _bus, owner, other, _guard) = setup().await;
        let product = service.publish(owner, herb_request()).await.unwrap();

        let err = service
            .update(
                other,
                &product.public_id,
                UpdateProductRequest {
                    name: Some("Stolen rosemary".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProductError::NotProductOwner));

        let err = service.remove(other, &product.public_id).await.unwrap_err();
        assert!(matches!(err, ProductError::NotProductOwner));

        service.remove(owner, &product.public_id).await.unwrap();
        assert!(service.products_of(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_request_is_rejected_before_storage() {
        let (service, _bus, owner, _other, _guard) = setup().await;

        let mut request = herb_request();
        request.listing = ListingFlags::default();

        let err = service.publish(owner, request).await.unwrap_err();
        assert!(matches!(err, ProductError::ValidationFailed(_)));
        assert!(service.products_of(owner).await.unwrap().is_empty());
    }
}
