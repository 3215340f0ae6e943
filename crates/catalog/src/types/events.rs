//! Event types for live product-feed updates.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use gardenswap_database::Product;

/// A change to the product collection, as seen by live feeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProductEvent {
    /// Product was published
    Created { product: Product },

    /// Product fields changed
    Updated { product: Product },

    /// Product was removed from the marketplace
    Deleted { product_id: i64, public_id: String },
}

impl ProductEvent {
    pub fn product_id(&self) -> i64 {
        match self {
            ProductEvent::Created { product } | ProductEvent::Updated { product } => product.id,
            ProductEvent::Deleted { product_id, .. } => *product_id,
        }
    }

    /// Event type name for logging.
    pub fn event_type_name(&self) -> &'static str {
        match self {
            ProductEvent::Created { .. } => "product_created",
            ProductEvent::Updated { .. } => "product_updated",
            ProductEvent::Deleted { .. } => "product_deleted",
        }
    }
}

/// Broadcast bus carrying [`ProductEvent`]s from the publishing side to any
/// number of live feeds.
#[derive(Clone)]
pub struct ProductEventBus {
    tx: broadcast::Sender<ProductEvent>,
}

impl ProductEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProductEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: ProductEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for ProductEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gardenswap_database::{ListingFlags, ProductCategory, ProductStatus};

    fn sample_product(id: i64) -> Product {
        Product {
            id,
            public_id: format!("p{id}"),
            name: "Thyme".to_string(),
            description: String::new(),
            category: ProductCategory::Herbs,
            image_urls: Vec::new(),
            listing: ListingFlags {
                for_exchange: true,
                ..Default::default()
            },
            user_id: 1,
            status: ProductStatus::Active,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn event_accessors() {
        let created = ProductEvent::Created {
            product: sample_product(3),
        };
        assert_eq!(created.product_id(), 3);
        assert_eq!(created.event_type_name(), "product_created");

        let deleted = ProductEvent::Deleted {
            product_id: 9,
            public_id: "p9".to_string(),
        };
        assert_eq!(deleted.product_id(), 9);
    }

    #[tokio::test]
    async fn bus_delivers_to_subscribers() {
        let bus = ProductEventBus::default();

        // No subscribers yet: publish must not fail.
        bus.publish(ProductEvent::Created {
            product: sample_product(1),
        });

        let mut rx = bus.subscribe();
        bus.publish(ProductEvent::Created {
            product: sample_product(2),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.product_id(), 2);
    }
}
