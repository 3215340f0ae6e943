//! Business logic for the product catalog.

pub mod discovery;
pub mod product_service;

pub use discovery::{
    DiscoveryFeed, DiscoveryFilter, DiscoveryService, Listing, SortOrder, Viewer,
    UNBOUNDED_DISTANCE_KM,
};
pub use product_service::ProductService;
