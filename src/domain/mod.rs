//! Storefront domain: aggregates, value objects and domain events.
pub mod aggregates;
pub mod events;
pub mod value_objects;
