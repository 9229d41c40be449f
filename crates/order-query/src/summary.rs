//! Flat order summary and the mapping into it.

use chrono::NaiveDateTime;
use common::OrderId;
use entity_store::{Address, Association, Entity, Order, OrderStatus, OrderSummaryRow};
use serde::Serialize;

use crate::{QueryError, Result};

/// Serialization-ready view of one order.
///
/// Plain values only: no associations, no back references, nothing left to
/// load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_id: OrderId,
    #[serde(rename = "name")]
    pub member_name: String,
    pub order_date: NaiveDateTime,
    #[serde(rename = "orderStatus")]
    pub status: OrderStatus,
    pub address: Address,
}

/// Maps an order whose member and delivery are already resolved.
///
/// The mapping never loads anything. An unresolved association means the
/// caller skipped resolution and fails with
/// [`QueryError::UnresolvedAssociation`].
impl TryFrom<&Order> for OrderSummary {
    type Error = QueryError;

    fn try_from(order: &Order) -> Result<Self> {
        let member = resolved(order, &order.member)?;
        let delivery = resolved(order, &order.delivery)?;

        Ok(OrderSummary {
            order_id: order.id,
            member_name: member.name.clone(),
            order_date: order.order_date,
            status: order.status,
            address: delivery.address.clone(),
        })
    }
}

impl From<OrderSummaryRow> for OrderSummary {
    fn from(row: OrderSummaryRow) -> Self {
        OrderSummary {
            order_id: row.order_id,
            member_name: row.member_name,
            order_date: row.order_date,
            status: row.status,
            address: row.address,
        }
    }
}

fn resolved<'a, T: Entity>(order: &Order, association: &'a Association<T>) -> Result<&'a T> {
    association
        .get()
        .ok_or_else(|| QueryError::UnresolvedAssociation {
            order_id: order.id,
            association: T::NAME,
            id: association.id().into(),
        })
}

/// Maps a list of resolved orders, failing on the first unresolved one.
pub fn summarize(orders: &[Order]) -> Result<Vec<OrderSummary>> {
    orders.iter().map(OrderSummary::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use entity_store::{Delivery, DeliveryId, Member, MemberId};

    fn order() -> Order {
        Order {
            id: OrderId::new(1),
            member: Association::Resolved(Member::new(1, "Alice")),
            delivery: Association::Resolved(Delivery::new(
                1,
                Address::new("Seoul", "Teheran-ro 1", "06236"),
            )),
            order_date: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            status: OrderStatus::Open,
        }
    }

    #[test]
    fn maps_resolved_order() {
        let summary = OrderSummary::try_from(&order()).unwrap();

        assert_eq!(summary.order_id, OrderId::new(1));
        assert_eq!(summary.member_name, "Alice");
        assert_eq!(summary.status, OrderStatus::Open);
        assert_eq!(summary.address.city, "Seoul");
    }

    #[test]
    fn unresolved_delivery_fails_instead_of_null_address() {
        let mut order = order();
        order.delivery = Association::Unresolved(DeliveryId::new(7));

        let err = OrderSummary::try_from(&order).unwrap_err();
        assert!(matches!(
            err,
            QueryError::UnresolvedAssociation {
                association: "delivery",
                id: 7,
                ..
            }
        ));
    }

    #[test]
    fn unresolved_member_fails() {
        let mut order = order();
        order.member = Association::Unresolved(MemberId::new(3));

        let err = OrderSummary::try_from(&order).unwrap_err();
        assert!(matches!(
            err,
            QueryError::UnresolvedAssociation {
                association: "member",
                ..
            }
        ));
    }

    #[test]
    fn serializes_with_response_field_names() {
        let json = serde_json::to_value(OrderSummary::try_from(&order()).unwrap()).unwrap();

        assert_eq!(json["orderId"], 1);
        assert_eq!(json["name"], "Alice");
        assert_eq!(json["orderDate"], "2024-01-01T09:00:00");
        assert_eq!(json["orderStatus"], "OPEN");
        assert_eq!(json["address"]["city"], "Seoul");
        assert_eq!(json.as_object().unwrap().len(), 5);
    }

    #[test]
    fn summarize_aborts_on_first_unresolved_order() {
        let mut broken = order();
        broken.id = OrderId::new(2);
        broken.member = Association::Unresolved(MemberId::new(2));

        assert!(summarize(&[order(), broken]).is_err());
        assert_eq!(summarize(&[order()]).unwrap().len(), 1);
    }
}
