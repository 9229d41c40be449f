//! Query layer error types.

use common::OrderId;
use entity_store::EntityStoreError;
use thiserror::Error;

/// Errors that can occur while fetching and shaping orders.
///
/// There is no partial success: any error aborts the whole result.
#[derive(Debug, Error)]
pub enum QueryError {
    /// An order's member or delivery could not be resolved.
    #[error("Order {order_id} has unresolved {association} {id}")]
    UnresolvedAssociation {
        order_id: OrderId,
        association: &'static str,
        id: i64,
    },

    /// The entity store could not be reached.
    #[error("Entity store unavailable: {0}")]
    StoreUnavailable(String),

    /// Any other entity store failure.
    #[error("Entity store error: {0}")]
    Store(EntityStoreError),
}

impl From<EntityStoreError> for QueryError {
    fn from(err: EntityStoreError) -> Self {
        match err {
            EntityStoreError::DanglingReference {
                order_id,
                association,
                id,
            } => QueryError::UnresolvedAssociation {
                order_id,
                association,
                id,
            },
            err if err.is_unavailable() => QueryError::StoreUnavailable(err.to_string()),
            err => QueryError::Store(err),
        }
    }
}

/// Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;
