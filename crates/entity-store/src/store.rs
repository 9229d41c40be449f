use async_trait::async_trait;

use crate::{
    Delivery, DeliveryId, FetchPlan, Member, MemberId, Order, OrderSearch, OrderSummaryRow, Result,
};

/// Read contract of the entity store.
///
/// Each method is exactly one round trip to the underlying store, so the
/// number of calls made is the number of queries issued. Order results are
/// returned in primary-key order. All implementations must be thread-safe
/// (Send + Sync).
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Fetches the orders matching `search`.
    ///
    /// With [`FetchPlan::Lazy`] the member and delivery of each order are
    /// left unresolved. With [`FetchPlan::JoinMemberDelivery`] they are
    /// loaded by the same query; an association whose target row is missing
    /// stays unresolved.
    async fn find_orders(&self, search: &OrderSearch, plan: FetchPlan) -> Result<Vec<Order>>;

    /// Fetches a single member by id.
    async fn find_member(&self, id: MemberId) -> Result<Option<Member>>;

    /// Fetches a single delivery by id.
    async fn find_delivery(&self, id: DeliveryId) -> Result<Option<Delivery>>;

    /// Selects the summary columns of matching orders directly, without
    /// materializing members or deliveries.
    ///
    /// Fails with `DanglingReference` if a matching order points at a
    /// missing member or delivery.
    async fn find_order_summaries(&self, search: &OrderSearch) -> Result<Vec<OrderSummaryRow>>;
}

/// Kind of round trip made against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Order fetch without associations.
    Orders,
    /// Order fetch joined with member and delivery.
    OrdersJoinFetch,
    /// Single member lookup.
    Member,
    /// Single delivery lookup.
    Delivery,
    /// Summary column selection.
    OrderSummaries,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Orders => "orders",
            QueryKind::OrdersJoinFetch => "orders_join_fetch",
            QueryKind::Member => "member",
            QueryKind::Delivery => "delivery",
            QueryKind::OrderSummaries => "order_summaries",
        }
    }

    /// Returns true if the query loads member or delivery entities.
    pub fn materializes_associations(&self) -> bool {
        matches!(
            self,
            QueryKind::OrdersJoinFetch | QueryKind::Member | QueryKind::Delivery
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_kind_labels_are_distinct() {
        let kinds = [
            QueryKind::Orders,
            QueryKind::OrdersJoinFetch,
            QueryKind::Member,
            QueryKind::Delivery,
            QueryKind::OrderSummaries,
        ];
        let labels: std::collections::HashSet<_> = kinds.iter().map(QueryKind::as_str).collect();
        assert_eq!(labels.len(), kinds.len());
    }

    #[test]
    fn test_only_entity_loads_materialize_associations() {
        assert!(QueryKind::OrdersJoinFetch.materializes_associations());
        assert!(QueryKind::Member.materializes_associations());
        assert!(!QueryKind::Orders.materializes_associations());
        assert!(!QueryKind::OrderSummaries.materializes_associations());
    }
}
