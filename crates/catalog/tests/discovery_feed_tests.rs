//! Live-feed behavior: snapshot, incremental events, and re-subscription
//! semantics.

use gardenswap_catalog::{
    DiscoveryFeed, DiscoveryFilter, DiscoveryService, ProductEventBus, ProductService, SortOrder,
    Viewer,
};
use gardenswap_config::DatabaseConfig;
use gardenswap_database::{
    initialize_database, CreateProductRequest, ListingFlags, ProductCategory,
    UpdateProductRequest, UserRepository,
};
use sqlx::SqlitePool;
use tempfile::TempDir;

struct Fixture {
    pool: SqlitePool,
    bus: ProductEventBus,
    products: ProductService,
    discovery: DiscoveryService,
    grower: i64,
    viewer: Viewer,
    _guard: TempDir,
}

async fn fixture() -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite://{}", temp_dir.path().join("feed.db").display()),
        max_connections: 2,
    };
    let pool = initialize_database(&config).await.unwrap();

    let users = UserRepository::new(pool.clone());
    let grower = users.create(Some("grower@example.com"), Some("Grower")).await.unwrap();
    let browser = users.create(Some("browser@example.com"), None).await.unwrap();

    let bus = ProductEventBus::default();
    Fixture {
        products: ProductService::new(pool.clone(), bus.clone()),
        discovery: DiscoveryService::new(pool.clone()),
        bus,
        pool,
        grower: grower.id,
        viewer: Viewer {
            user_id: browser.id,
            location: None,
        },
        _guard: temp_dir,
    }
}

fn request(name: &str, category: ProductCategory) -> CreateProductRequest {
    CreateProductRequest {
        name: name.to_string(),
        description: String::new(),
        category,
        image_urls: Vec::new(),
        listing: ListingFlags {
            for_exchange: true,
            for_sale: false,
            is_free: false,
        },
    }
}

#[tokio::test]
async fn feed_folds_create_update_delete_events() {
    let f = fixture().await;

    f.products
        .publish(f.grower, request("Kale", ProductCategory::Vegetables))
        .await
        .unwrap();

    let mut feed = DiscoveryFeed::open(
        f.discovery.clone(),
        &f.bus,
        DiscoveryFilter {
            categories: vec![ProductCategory::Vegetables],
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(feed.snapshot().len(), 1);

    // A publish after the feed opened arrives via the bus.
    let chard = f
        .products
        .publish(f.grower, request("Chard", ProductCategory::Vegetables))
        .await
        .unwrap();
    // Products in other categories stay out of the subscription scope.
    f.products
        .publish(f.grower, request("Chive seeds", ProductCategory::Seeds))
        .await
        .unwrap();

    feed.pump();
    assert_eq!(feed.snapshot().len(), 2);
    assert_eq!(feed.snapshot()[0].name, "Chard", "newest first");

    let listings = feed.listings(f.viewer).await.unwrap();
    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0].producer_name.as_deref(), Some("Grower"));

    f.products
        .update(
            f.grower,
            &chard.public_id,
            UpdateProductRequest {
                name: Some("Rainbow chard".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    feed.pump();
    assert!(feed.snapshot().iter().any(|p| p.name == "Rainbow chard"));

    f.products.remove(f.grower, &chard.public_id).await.unwrap();
    feed.pump();
    assert_eq!(feed.snapshot().len(), 1);
}

#[tokio::test]
async fn category_change_reloads_other_changes_do_not() {
    let f = fixture().await;

    f.products
        .publish(f.grower, request("Dill seeds", ProductCategory::Seeds))
        .await
        .unwrap();

    let mut feed = DiscoveryFeed::open(
        f.discovery.clone(),
        &f.bus,
        DiscoveryFilter {
            categories: vec![ProductCategory::Vegetables],
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(feed.snapshot().is_empty());

    // Same category set, different sort: the snapshot is untouched even
    // though the store has rows the feed never loaded.
    feed.set_filter(DiscoveryFilter {
        categories: vec![ProductCategory::Vegetables],
        sort: SortOrder::Oldest,
        ..Default::default()
    })
    .await
    .unwrap();
    assert!(feed.snapshot().is_empty());

    // Changing the category set re-subscribes and reloads.
    feed.set_filter(DiscoveryFilter {
        categories: vec![ProductCategory::Seeds],
        ..Default::default()
    })
    .await
    .unwrap();
    assert_eq!(feed.snapshot().len(), 1);
    assert_eq!(feed.snapshot()[0].name, "Dill seeds");
}

#[tokio::test]
async fn update_moving_product_out_of_scope_removes_it() {
    let f = fixture().await;

    let kale = f
        .products
        .publish(f.grower, request("Kale", ProductCategory::Vegetables))
        .await
        .unwrap();

    let mut feed = DiscoveryFeed::open(
        f.discovery.clone(),
        &f.bus,
        DiscoveryFilter {
            categories: vec![ProductCategory::Vegetables],
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(feed.snapshot().len(), 1);

    f.products
        .update(
            f.grower,
            &kale.public_id,
            UpdateProductRequest {
                category: Some(ProductCategory::Seeds),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    feed.pump();
    assert!(feed.snapshot().is_empty());
}

#[tokio::test]
async fn distance_join_uses_fuzzed_producer_location() {
    let f = fixture().await;

    // Give the grower a location through the raw repository.
    let users = UserRepository::new(f.pool.clone());
    users
        .set_location(
            f.grower,
            &gardenswap_database::UserLocation {
                latitude: 40.4168,
                longitude: -3.7038,
                geohash: "ezjmgtwyz".to_string(),
                display_latitude: 40.4201,
                display_longitude: -3.7100,
                approximate_address: Some("Madrid, Spain".to_string()),
            },
        )
        .await
        .unwrap();

    f.products
        .publish(f.grower, request("Kale", ProductCategory::Vegetables))
        .await
        .unwrap();

    let viewer = Viewer {
        user_id: f.viewer.user_id,
        location: Some(gardenswap_geo::Coordinates::new(40.4168, -3.7038)),
    };
    let listings = f
        .discovery
        .search(viewer, &DiscoveryFilter::default())
        .await
        .unwrap();

    assert_eq!(listings.len(), 1);
    let distance = listings[0].distance_km.expect("distance joined");
    // Fuzzed display coordinates, so near zero but not zero.
    assert!(distance > 0.0 && distance < 2.0, "distance {distance}");
}
