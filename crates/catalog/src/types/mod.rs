//! Shared types for the catalog crate.

pub mod events;

pub use events::{ProductEvent, ProductEventBus};
