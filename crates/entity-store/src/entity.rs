//! Persisted entities and their association graph.
//!
//! Ownership is one-directional: an [`Order`] points at its [`Member`] and
//! [`Delivery`], neither of which points back. Whether an association has
//! been loaded is tracked explicitly by [`Association`] instead of being
//! hidden behind a proxy.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use chrono::NaiveDateTime;
use common::{DeliveryId, MemberId, OrderId};
use serde::{Serialize, Serializer};

use crate::EntityStoreError;

/// An entity with an identity of its own.
pub trait Entity {
    /// Primary key type.
    type Id: Copy + Eq + Hash + fmt::Debug + fmt::Display + Into<i64>;

    /// Association name used in diagnostics ("member", "delivery").
    const NAME: &'static str;

    /// Returns the entity's primary key.
    fn id(&self) -> Self::Id;
}

/// Load state of a to-one association.
///
/// `Unresolved` carries only the foreign key; nothing has been read for the
/// target yet. `Resolved` carries the loaded target.
#[derive(Debug, Clone, PartialEq)]
pub enum Association<T: Entity> {
    Unresolved(T::Id),
    Resolved(T),
}

impl<T: Entity> Association<T> {
    /// Returns the id of the associated entity, loaded or not.
    pub fn id(&self) -> T::Id {
        match self {
            Association::Unresolved(id) => *id,
            Association::Resolved(entity) => entity.id(),
        }
    }

    /// Returns true if the target has been loaded.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Association::Resolved(_))
    }

    /// Returns the loaded target, if any.
    pub fn get(&self) -> Option<&T> {
        match self {
            Association::Unresolved(_) => None,
            Association::Resolved(entity) => Some(entity),
        }
    }

    /// Replaces the association with a loaded target.
    pub fn resolve(&mut self, entity: T) {
        *self = Association::Resolved(entity);
    }
}

/// A resolved association serializes as its target. An unresolved one is a
/// serialization error rather than `null`.
impl<T: Entity + Serialize> Serialize for Association<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Association::Resolved(entity) => entity.serialize(serializer),
            Association::Unresolved(id) => Err(serde::ser::Error::custom(format!(
                "{} {id} is not resolved",
                T::NAME
            ))),
        }
    }
}

/// Status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Open,
    Canceled,
}

impl OrderStatus {
    /// Column value stored in the `orders.status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "OPEN",
            OrderStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = EntityStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(OrderStatus::Open),
            "CANCELED" => Ok(OrderStatus::Canceled),
            other => Err(EntityStoreError::InvalidColumn(format!(
                "unknown order status {other:?}"
            ))),
        }
    }
}

/// Postal address embedded in a delivery. Has no identity of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    pub city: String,
    pub street: String,
    pub zipcode: String,
}

impl Address {
    pub fn new(
        city: impl Into<String>,
        street: impl Into<String>,
        zipcode: impl Into<String>,
    ) -> Self {
        Self {
            city: city.into(),
            street: street.into(),
            zipcode: zipcode.into(),
        }
    }
}

/// A purchasing member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
}

impl Member {
    pub fn new(id: impl Into<MemberId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl Entity for Member {
    type Id = MemberId;
    const NAME: &'static str = "member";

    fn id(&self) -> MemberId {
        self.id
    }
}

/// Delivery destination of exactly one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub id: DeliveryId,
    pub address: Address,
}

impl Delivery {
    pub fn new(id: impl Into<DeliveryId>, address: Address) -> Self {
        Self {
            id: id.into(),
            address,
        }
    }
}

impl Entity for Delivery {
    type Id = DeliveryId;
    const NAME: &'static str = "delivery";

    fn id(&self) -> DeliveryId {
        self.id
    }
}

/// The order aggregate as read from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "orderId")]
    pub id: OrderId,
    pub member: Association<Member>,
    pub delivery: Association<Delivery>,
    pub order_date: NaiveDateTime,
    pub status: OrderStatus,
}

impl Order {
    /// Builds an order whose associations have not been loaded.
    pub fn unresolved(record: &OrderRecord) -> Self {
        Self {
            id: record.id,
            member: Association::Unresolved(record.member_id),
            delivery: Association::Unresolved(record.delivery_id),
            order_date: record.order_date,
            status: record.status,
        }
    }

    /// Returns true if both member and delivery are loaded.
    pub fn is_fully_resolved(&self) -> bool {
        self.member.is_resolved() && self.delivery.is_resolved()
    }
}

/// Raw `orders` table row: foreign keys instead of associations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRecord {
    pub id: OrderId,
    pub member_id: MemberId,
    pub delivery_id: DeliveryId,
    pub order_date: NaiveDateTime,
    pub status: OrderStatus,
}

impl OrderRecord {
    pub fn new(
        id: impl Into<OrderId>,
        member_id: impl Into<MemberId>,
        delivery_id: impl Into<DeliveryId>,
        order_date: NaiveDateTime,
        status: OrderStatus,
    ) -> Self {
        Self {
            id: id.into(),
            member_id: member_id.into(),
            delivery_id: delivery_id.into(),
            order_date,
            status,
        }
    }
}

/// Columns selected by a summary query: exactly what an order summary shows,
/// without materializing the member or delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummaryRow {
    pub order_id: OrderId,
    pub member_name: String,
    pub order_date: NaiveDateTime,
    pub status: OrderStatus,
    pub address: Address,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn order_date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn resolved_order() -> Order {
        Order {
            id: OrderId::new(1),
            member: Association::Resolved(Member::new(10, "Alice")),
            delivery: Association::Resolved(Delivery::new(
                20,
                Address::new("Seoul", "Teheran-ro 1", "06236"),
            )),
            order_date: order_date(),
            status: OrderStatus::Open,
        }
    }

    #[test]
    fn association_reports_id_in_both_states() {
        let mut assoc: Association<Member> = Association::Unresolved(MemberId::new(10));
        assert_eq!(assoc.id(), MemberId::new(10));
        assert!(!assoc.is_resolved());
        assert!(assoc.get().is_none());

        assoc.resolve(Member::new(10, "Alice"));
        assert!(assoc.is_resolved());
        assert_eq!(assoc.id(), MemberId::new(10));
        assert_eq!(assoc.get().unwrap().name, "Alice");
    }

    #[test]
    fn resolved_order_serializes_without_back_references() {
        let json = serde_json::to_value(resolved_order()).unwrap();

        assert_eq!(json["orderId"], 1);
        assert_eq!(json["member"]["name"], "Alice");
        assert_eq!(json["delivery"]["address"]["city"], "Seoul");
        assert_eq!(json["orderDate"], "2024-03-01T10:30:00");
        assert_eq!(json["status"], "OPEN");
        assert!(json["member"].get("orders").is_none());
        assert!(json["delivery"].get("order").is_none());
    }

    #[test]
    fn unresolved_association_fails_serialization() {
        let mut order = resolved_order();
        order.delivery = Association::Unresolved(DeliveryId::new(20));

        let err = serde_json::to_value(&order).unwrap_err();
        assert!(err.to_string().contains("delivery 20 is not resolved"));
    }

    #[test]
    fn order_status_round_trips_through_column_text() {
        for status in [OrderStatus::Open, OrderStatus::Canceled] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("SHIPPED".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn unresolved_order_keeps_foreign_keys() {
        let record = OrderRecord::new(1, 10, 20, order_date(), OrderStatus::Canceled);
        let order = Order::unresolved(&record);

        assert_eq!(order.member.id(), MemberId::new(10));
        assert_eq!(order.delivery.id(), DeliveryId::new(20));
        assert!(!order.is_fully_resolved());
    }
}
