//! Product discovery pipeline.
//!
//! The store side of the pipeline filters by category only; everything else —
//! producer join, search term, distance radius, transaction type, exclude-own
//! toggle, sorting — is computed client-side over the subscription snapshot.
//! [`DiscoveryFeed`] keeps that snapshot live against the product event bus
//! and re-subscribes only when the category set changes.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::Receiver;
use tracing::warn;

use gardenswap_database::{
    Product, ProductCategory, ProductRepository, ProductResult, TransactionKind, User,
    UserRepository,
};
use gardenswap_geo::{distance_km, Coordinates};

use crate::types::{ProductEvent, ProductEventBus};

/// Radius value meaning "no distance filter".
pub const UNBOUNDED_DISTANCE_KM: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Distance,
    #[default]
    Newest,
    Oldest,
}

/// Client-side filter over the subscription snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryFilter {
    /// Categories the subscription is narrowed to; empty means all.
    #[serde(default)]
    pub categories: Vec<ProductCategory>,
    /// Case-insensitive term matched against name and description.
    pub search: Option<String>,
    /// Radius in km around the viewer; [`UNBOUNDED_DISTANCE_KM`] and above
    /// means unbounded.
    pub max_distance_km: Option<f64>,
    /// Transaction types to keep; empty keeps everything.
    #[serde(default)]
    pub transaction_kinds: Vec<TransactionKind>,
    /// Whether the viewer's own products stay in the result.
    #[serde(default)]
    pub include_own: bool,
    #[serde(default)]
    pub sort: SortOrder,
}

/// Who is looking, and from where.
#[derive(Debug, Clone, Copy)]
pub struct Viewer {
    pub user_id: i64,
    pub location: Option<Coordinates>,
}

/// A product joined with its producer for display.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub product: Product,
    pub producer_public_id: Option<String>,
    pub producer_name: Option<String>,
    /// Distance from the viewer, when both locations are known.
    pub distance_km: Option<f64>,
}

/// Read side of the catalog: snapshot queries plus the producer join.
#[derive(Clone)]
pub struct DiscoveryService {
    products: ProductRepository,
    users: UserRepository,
}

impl DiscoveryService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            products: ProductRepository::new(pool.clone()),
            users: UserRepository::new(pool),
        }
    }

    /// One-shot search: store-side category query, then the client-side
    /// pipeline.
    pub async fn search(&self, viewer: Viewer, filter: &DiscoveryFilter) -> ProductResult<Vec<Listing>> {
        let snapshot = self.subscription_snapshot(&filter.categories).await?;
        self.assemble(&snapshot, viewer, filter).await
    }

    /// The store-side half: active products in the given categories, in
    /// subscription order (newest first).
    pub async fn subscription_snapshot(
        &self,
        categories: &[ProductCategory],
    ) -> ProductResult<Vec<Product>> {
        self.products.find_active_by_categories(categories).await
    }

    /// Join producers onto a snapshot and run the client-side filters.
    pub async fn assemble(
        &self,
        snapshot: &[Product],
        viewer: Viewer,
        filter: &DiscoveryFilter,
    ) -> ProductResult<Vec<Listing>> {
        let producers = self.load_producers(snapshot).await;

        let listings = snapshot
            .iter()
            .cloned()
            .map(|product| {
                let producer = producers.get(&product.user_id);
                let coords = producer.and_then(|user| user.visible_coordinates());
                let distance_km = match (viewer.location, coords) {
                    (Some(from), Some((latitude, longitude))) => {
                        Some(distance_km(from, Coordinates::new(latitude, longitude)))
                    }
                    _ => None,
                };

                Listing {
                    producer_public_id: producer.map(|user| user.public_id.clone()),
                    producer_name: producer.map(|user| user.display_name_or_fallback()),
                    distance_km,
                    product,
                }
            })
            .collect();

        Ok(apply_filters(listings, viewer, filter))
    }

    /// Fetch each distinct producer once. A failed fetch drops only the
    /// producer join for that user's items, never the items themselves.
    async fn load_producers(&self, snapshot: &[Product]) -> HashMap<i64, User> {
        let user_ids: HashSet<i64> = snapshot.iter().map(|product| product.user_id).collect();

        let mut producers = HashMap::with_capacity(user_ids.len());
        for user_id in user_ids {
            match self.users.find_by_id(user_id).await {
                Ok(Some(user)) => {
                    producers.insert(user_id, user);
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(user = user_id, %error, "producer fetch failed, omitting distance");
                }
            }
        }
        producers
    }
}

/// The pure client-side half of the pipeline.
fn apply_filters(mut listings: Vec<Listing>, viewer: Viewer, filter: &DiscoveryFilter) -> Vec<Listing> {
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        listings.retain(|listing| listing.product.matches_search(term));
    }

    if !filter.transaction_kinds.is_empty() {
        listings.retain(|listing| listing.product.listing.matches_any(&filter.transaction_kinds));
    }

    if !filter.include_own {
        listings.retain(|listing| listing.product.user_id != viewer.user_id);
    }

    if let Some(radius) = filter.max_distance_km {
        if radius < UNBOUNDED_DISTANCE_KM {
            listings.retain(|listing| {
                listing
                    .distance_km
                    .map(|distance| distance <= radius)
                    .unwrap_or(false)
            });
        }
    }

    match filter.sort {
        SortOrder::Distance => {
            // Without a viewer location there is nothing to sort by; keep
            // the subscription order. Unknown distances go last. The sort is
            // stable, so equal distances also keep subscription order.
            if viewer.location.is_some() {
                listings.sort_by(|a, b| match (a.distance_km, b.distance_km) {
                    (Some(da), Some(db)) => da.total_cmp(&db),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                });
            }
        }
        SortOrder::Newest => {
            listings.sort_by_key(|listing| std::cmp::Reverse(created_at_key(&listing.product)));
        }
        SortOrder::Oldest => {
            listings.sort_by_key(|listing| created_at_key(&listing.product));
        }
    }

    listings
}

fn created_at_key(product: &Product) -> i64 {
    chrono::DateTime::parse_from_rfc3339(&product.created_at)
        .map(|ts| ts.timestamp_millis())
        .unwrap_or(0)
}

/// A live product feed: subscription snapshot plus incremental updates from
/// the event bus.
pub struct DiscoveryFeed {
    service: DiscoveryService,
    bus: ProductEventBus,
    rx: Receiver<ProductEvent>,
    filter: DiscoveryFilter,
    snapshot: Vec<Product>,
}

impl DiscoveryFeed {
    /// Open a feed: subscribe to the bus, then load the initial snapshot.
    pub async fn open(
        service: DiscoveryService,
        bus: &ProductEventBus,
        filter: DiscoveryFilter,
    ) -> ProductResult<Self> {
        let rx = bus.subscribe();
        let snapshot = service.subscription_snapshot(&filter.categories).await?;

        Ok(Self {
            service,
            bus: bus.clone(),
            rx,
            filter,
            snapshot,
        })
    }

    /// Swap the filter. Only a change to the category set re-subscribes and
    /// reloads; every other change is pure recomputation at read time.
    pub async fn set_filter(&mut self, filter: DiscoveryFilter) -> ProductResult<()> {
        if !same_category_set(&self.filter.categories, &filter.categories) {
            self.rx = self.bus.subscribe();
            self.snapshot = self
                .service
                .subscription_snapshot(&filter.categories)
                .await?;
        }
        self.filter = filter;
        Ok(())
    }

    /// Drain pending events into the snapshot.
    pub fn pump(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "product feed lagged behind the event bus");
                }
            }
        }
    }

    /// The joined, filtered view of the current snapshot.
    pub async fn listings(&self, viewer: Viewer) -> ProductResult<Vec<Listing>> {
        self.service
            .assemble(&self.snapshot, viewer, &self.filter)
            .await
    }

    /// Raw snapshot, in subscription order.
    pub fn snapshot(&self) -> &[Product] {
        &self.snapshot
    }

    fn apply_event(&mut self, event: ProductEvent) {
        match event {
            ProductEvent::Created { product } => {
                if self.in_scope(&product) {
                    // Subscription order is newest first. The retain makes a
                    // replayed event idempotent.
                    self.snapshot.retain(|existing| existing.id != product.id);
                    self.snapshot.insert(0, product);
                }
            }
            ProductEvent::Updated { product } => {
                self.snapshot.retain(|existing| existing.id != product.id);
                if self.in_scope(&product) {
                    self.snapshot.insert(0, product);
                    self.snapshot
                        .sort_by_key(|p| std::cmp::Reverse((created_at_key(p), p.id)));
                }
            }
            ProductEvent::Deleted { product_id, .. } => {
                self.snapshot.retain(|existing| existing.id != product_id);
            }
        }
    }

    fn in_scope(&self, product: &Product) -> bool {
        product.is_active()
            && (self.filter.categories.is_empty()
                || self.filter.categories.contains(&product.category))
    }
}

fn same_category_set(a: &[ProductCategory], b: &[ProductCategory]) -> bool {
    let a: HashSet<ProductCategory> = a.iter().copied().collect();
    let b: HashSet<ProductCategory> = b.iter().copied().collect();
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use gardenswap_database::{ListingFlags, ProductStatus};

    fn product(id: i64, user_id: i64, name: &str, created_at: &str) -> Product {
        Product {
            id,
            public_id: format!("p{id}"),
            name: name.to_string(),
            description: String::new(),
            category: ProductCategory::Vegetables,
            image_urls: Vec::new(),
            listing: ListingFlags {
                for_exchange: true,
                for_sale: false,
                is_free: false,
            },
            user_id,
            status: ProductStatus::Active,
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
        }
    }

    fn listing(id: i64, distance_km: Option<f64>) -> Listing {
        Listing {
            product: product(id, 100 + id, "item", "2026-01-01T00:00:00+00:00"),
            producer_public_id: None,
            producer_name: None,
            distance_km,
        }
    }

    fn viewer_at_origin() -> Viewer {
        Viewer {
            user_id: 1,
            location: Some(Coordinates::new(0.0, 0.0)),
        }
    }

    #[test]
    fn distance_filter_keeps_and_sorts_the_near_subset() {
        let listings = vec![listing(1, Some(12.0)), listing(2, Some(3.0)), listing(3, Some(45.0))];
        let filter = DiscoveryFilter {
            max_distance_km: Some(20.0),
            sort: SortOrder::Distance,
            ..Default::default()
        };

        let result = apply_filters(listings, viewer_at_origin(), &filter);
        let distances: Vec<f64> = result.iter().filter_map(|l| l.distance_km).collect();
        assert_eq!(distances, vec![3.0, 12.0]);
    }

    #[test]
    fn radius_of_one_hundred_means_unbounded() {
        let listings = vec![listing(1, Some(250.0)), listing(2, None)];
        let filter = DiscoveryFilter {
            max_distance_km: Some(UNBOUNDED_DISTANCE_KM),
            ..Default::default()
        };

        let result = apply_filters(listings, viewer_at_origin(), &filter);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn bounded_radius_drops_unknown_distances() {
        let listings = vec![listing(1, Some(5.0)), listing(2, None)];
        let filter = DiscoveryFilter {
            max_distance_km: Some(10.0),
            ..Default::default()
        };

        let result = apply_filters(listings, viewer_at_origin(), &filter);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].product.id, 1);
    }

    #[test]
    fn empty_transaction_selection_returns_everything() {
        let mut for_sale = listing(1, None);
        for_sale.product.listing = ListingFlags {
            for_exchange: false,
            for_sale: true,
            is_free: false,
        };
        let mut free = listing(2, None);
        free.product.listing = ListingFlags {
            for_exchange: false,
            for_sale: false,
            is_free: true,
        };

        let all = apply_filters(
            vec![for_sale.clone(), free.clone()],
            viewer_at_origin(),
            &DiscoveryFilter::default(),
        );
        assert_eq!(all.len(), 2);

        let only_free = apply_filters(
            vec![for_sale, free],
            viewer_at_origin(),
            &DiscoveryFilter {
                transaction_kinds: vec![TransactionKind::Free],
                ..Default::default()
            },
        );
        assert_eq!(only_free.len(), 1);
        assert!(only_free[0].product.listing.is_free);
    }

    #[test]
    fn own_products_are_excluded_unless_asked_for() {
        let mut mine = listing(1, None);
        mine.product.user_id = 1;
        let theirs = listing(2, None);

        let without_own = apply_filters(
            vec![mine.clone(), theirs.clone()],
            viewer_at_origin(),
            &DiscoveryFilter::default(),
        );
        assert_eq!(without_own.len(), 1);
        assert_eq!(without_own[0].product.id, 2);

        let with_own = apply_filters(
            vec![mine, theirs],
            viewer_at_origin(),
            &DiscoveryFilter {
                include_own: true,
                ..Default::default()
            },
        );
        assert_eq!(with_own.len(), 2);
    }

    #[test]
    fn distance_sort_is_non_decreasing_and_puts_unknowns_last() {
        let listings = vec![
            listing(1, Some(8.0)),
            listing(2, None),
            listing(3, Some(2.0)),
            listing(4, Some(8.0)),
        ];
        let filter = DiscoveryFilter {
            sort: SortOrder::Distance,
            ..Default::default()
        };

        let result = apply_filters(listings, viewer_at_origin(), &filter);

        let known: Vec<f64> = result.iter().filter_map(|l| l.distance_km).collect();
        assert!(known.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(result.last().unwrap().distance_km.is_none());
        // Stable: the two 8.0 items keep their subscription order.
        assert_eq!(result[1].product.id, 1);
        assert_eq!(result[2].product.id, 4);
    }

    #[test]
    fn distance_sort_without_viewer_location_preserves_subscription_order() {
        let listings = vec![listing(5, None), listing(3, None), listing(9, None)];
        let filter = DiscoveryFilter {
            sort: SortOrder::Distance,
            include_own: true,
            ..Default::default()
        };
        let viewer = Viewer {
            user_id: 1,
            location: None,
        };

        let result = apply_filters(listings, viewer, &filter);
        let ids: Vec<i64> = result.iter().map(|l| l.product.id).collect();
        assert_eq!(ids, vec![5, 3, 9]);
    }

    #[test]
    fn newest_and_oldest_sorts_are_monotonic() {
        let mut a = listing(1, None);
        a.product.created_at = "2026-03-01T00:00:00+00:00".to_string();
        let mut b = listing(2, None);
        b.product.created_at = "2026-01-01T00:00:00+00:00".to_string();
        let mut c = listing(3, None);
        c.product.created_at = "2026-02-01T00:00:00+00:00".to_string();

        let newest = apply_filters(
            vec![a.clone(), b.clone(), c.clone()],
            viewer_at_origin(),
            &DiscoveryFilter {
                sort: SortOrder::Newest,
                ..Default::default()
            },
        );
        let ids: Vec<i64> = newest.iter().map(|l| l.product.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);

        let oldest = apply_filters(
            vec![a, b, c],
            viewer_at_origin(),
            &DiscoveryFilter {
                sort: SortOrder::Oldest,
                ..Default::default()
            },
        );
        let ids: Vec<i64> = oldest.iter().map(|l| l.product.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn search_matches_name_and_description() {
        let mut basil = listing(1, None);
        basil.product.name = "Basil".to_string();
        let mut tomato = listing(2, None);
        tomato.product.name = "Tomato".to_string();
        tomato.product.description = "pairs well with basil".to_string();
        let mut mint = listing(3, None);
        mint.product.name = "Mint".to_string();

        let result = apply_filters(
            vec![basil, tomato, mint],
            viewer_at_origin(),
            &DiscoveryFilter {
                search: Some("BASIL".to_string()),
                ..Default::default()
            },
        );
        let ids: Vec<i64> = result.iter().map(|l| l.product.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn category_sets_compare_as_sets() {
        use ProductCategory::*;
        assert!(same_category_set(&[Herbs, Seeds], &[Seeds, Herbs]));
        assert!(same_category_set(&[], &[]));
        assert!(!same_category_set(&[Herbs], &[Seeds]));
        assert!(!same_category_set(&[Herbs], &[]));
    }
}
