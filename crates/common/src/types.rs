use serde::{Deserialize, Serialize};

/// Defines a typed wrapper around an `i64` primary key.
///
/// Each entity table keys its rows with a database sequence, so identifiers
/// are plain integers. Wrapping them keeps an order id from being passed
/// where a member id is expected.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an identifier from a raw primary key.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw primary key.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id!(
    /// Primary key of an order.
    OrderId
);

entity_id!(
    /// Primary key of a member (the purchaser of an order).
    MemberId
);

entity_id!(
    /// Primary key of a delivery.
    DeliveryId
);
