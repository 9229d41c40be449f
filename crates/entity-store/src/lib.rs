//! Entity store for orders, members, and deliveries.
//!
//! Provides the read contract the query layer depends on:
//! - [`EntityStore`] trait, one method per store round trip
//! - [`InMemoryEntityStore`] that records every round trip in a [`QueryLog`]
//! - [`PostgresEntityStore`] backed by sqlx

pub mod entity;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use common::{DeliveryId, MemberId, OrderId};
pub use entity::{
    Address, Association, Delivery, Entity, Member, Order, OrderRecord, OrderStatus,
    OrderSummaryRow,
};
pub use error::{EntityStoreError, Result};
pub use memory::{InMemoryEntityStore, QueryLog};
pub use postgres::PostgresEntityStore;
pub use query::{FetchPlan, OrderSearch};
pub use store::{EntityStore, QueryKind};
