//! Product catalog: publishing, the live discovery feed, and the
//! client-side filter/sort pipeline.

pub mod services;
pub mod types;

pub use services::{
    DiscoveryFeed, DiscoveryFilter, DiscoveryService, Listing, ProductService, SortOrder, Viewer,
    UNBOUNDED_DISTANCE_KM,
};
pub use types::{ProductEvent, ProductEventBus};
