use common::OrderId;
use thiserror::Error;

/// Errors that can occur when reading from the entity store.
#[derive(Debug, Error)]
pub enum EntityStoreError {
    /// The store could not be reached.
    #[error("Entity store unavailable: {0}")]
    Unavailable(String),

    /// An order references a member or delivery that does not exist.
    #[error("Order {order_id} references missing {association} {id}")]
    DanglingReference {
        order_id: OrderId,
        association: &'static str,
        id: i64,
    },

    /// A column held a value the entity model cannot represent.
    #[error("Invalid column value: {0}")]
    InvalidColumn(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl EntityStoreError {
    /// Returns true if the error means the store itself is unreachable,
    /// as opposed to a problem with the stored data.
    pub fn is_unavailable(&self) -> bool {
        match self {
            EntityStoreError::Unavailable(_) => true,
            EntityStoreError::Database(err) => matches!(
                err,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
                    | sqlx::Error::Tls(_)
            ),
            _ => false,
        }
    }
}

/// Result type for entity store operations.
pub type Result<T> = std::result::Result<T, EntityStoreError>;
