//! Shared types for the order query service.

pub mod types;

pub use types::{DeliveryId, MemberId, OrderId};
