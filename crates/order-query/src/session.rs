//! Request-scoped access to the entity store.

use std::collections::HashMap;

use entity_store::{
    Association, Delivery, DeliveryId, EntityStore, FetchPlan, Member, MemberId, Order,
    OrderSearch, OrderSummaryRow,
};

use crate::{QueryError, Result};

/// Identity map and query counter for one request.
///
/// Every member and delivery loaded through the session is kept for the
/// rest of the request, so resolving the same association twice costs one
/// round trip. Nothing is shared between sessions.
pub struct Session<'a, S: EntityStore + ?Sized> {
    store: &'a S,
    members: HashMap<MemberId, Member>,
    deliveries: HashMap<DeliveryId, Delivery>,
    queries: usize,
}

impl<'a, S: EntityStore + ?Sized> Session<'a, S> {
    /// Opens an empty session over `store`.
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            members: HashMap::new(),
            deliveries: HashMap::new(),
            queries: 0,
        }
    }

    /// Number of store round trips issued through this session.
    pub fn queries_issued(&self) -> usize {
        self.queries
    }

    /// Number of members and deliveries held by the identity map.
    pub fn cached_entities(&self) -> usize {
        self.members.len() + self.deliveries.len()
    }

    /// Fetches orders and caches any association the fetch resolved.
    pub async fn find_orders(
        &mut self,
        search: &OrderSearch,
        plan: FetchPlan,
    ) -> Result<Vec<Order>> {
        self.queries += 1;
        let orders = self.store.find_orders(search, plan).await?;
        for order in &orders {
            self.absorb(order);
        }
        Ok(orders)
    }

    /// Selects summary columns directly. Nothing is cached.
    pub async fn find_order_summaries(
        &mut self,
        search: &OrderSearch,
    ) -> Result<Vec<OrderSummaryRow>> {
        self.queries += 1;
        Ok(self.store.find_order_summaries(search).await?)
    }

    /// Returns a member, from the identity map if already loaded.
    pub async fn find_member(&mut self, id: MemberId) -> Result<Option<Member>> {
        if let Some(member) = self.members.get(&id) {
            return Ok(Some(member.clone()));
        }
        self.queries += 1;
        let member = self.store.find_member(id).await?;
        if let Some(ref member) = member {
            self.members.insert(id, member.clone());
        }
        Ok(member)
    }

    /// Returns a delivery, from the identity map if already loaded.
    pub async fn find_delivery(&mut self, id: DeliveryId) -> Result<Option<Delivery>> {
        if let Some(delivery) = self.deliveries.get(&id) {
            return Ok(Some(delivery.clone()));
        }
        self.queries += 1;
        let delivery = self.store.find_delivery(id).await?;
        if let Some(ref delivery) = delivery {
            self.deliveries.insert(id, delivery.clone());
        }
        Ok(delivery)
    }

    /// Forces the member and delivery of `order` to load.
    ///
    /// Costs at most two round trips, none if both are already resolved or
    /// cached. A reference to a missing row fails with
    /// [`QueryError::UnresolvedAssociation`].
    pub async fn resolve(&mut self, order: &mut Order) -> Result<()> {
        if let Association::Unresolved(id) = order.member {
            let member = self
                .find_member(id)
                .await?
                .ok_or_else(|| QueryError::UnresolvedAssociation {
                    order_id: order.id,
                    association: "member",
                    id: id.as_i64(),
                })?;
            order.member.resolve(member);
        }

        if let Association::Unresolved(id) = order.delivery {
            let delivery = self
                .find_delivery(id)
                .await?
                .ok_or_else(|| QueryError::UnresolvedAssociation {
                    order_id: order.id,
                    association: "delivery",
                    id: id.as_i64(),
                })?;
            order.delivery.resolve(delivery);
        }

        Ok(())
    }

    fn absorb(&mut self, order: &Order) {
        if let Some(member) = order.member.get() {
            self.members
                .entry(member.id)
                .or_insert_with(|| member.clone());
        }
        if let Some(delivery) = order.delivery.get() {
            self.deliveries
                .entry(delivery.id)
                .or_insert_with(|| delivery.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use entity_store::{InMemoryEntityStore, OrderRecord, OrderStatus, QueryKind};

    #[tokio::test]
    async fn test_repeated_lookup_hits_identity_map() {
        let store = InMemoryEntityStore::with_sample_data().await;
        let mut session = Session::new(&store);

        session.find_member(MemberId::new(1)).await.unwrap();
        session.find_member(MemberId::new(1)).await.unwrap();

        assert_eq!(session.queries_issued(), 1);
        assert_eq!(store.query_log().await.count(QueryKind::Member), 1);
    }

    #[tokio::test]
    async fn test_missing_entity_is_not_cached() {
        let store = InMemoryEntityStore::with_sample_data().await;
        let mut session = Session::new(&store);

        assert!(session.find_delivery(DeliveryId::new(9)).await.unwrap().is_none());
        assert!(session.find_delivery(DeliveryId::new(9)).await.unwrap().is_none());

        assert_eq!(session.queries_issued(), 2);
        assert_eq!(session.cached_entities(), 0);
    }

    #[tokio::test]
    async fn test_resolve_loads_both_associations() {
        let store = InMemoryEntityStore::with_sample_data().await;
        let mut session = Session::new(&store);

        let mut orders = session
            .find_orders(&OrderSearch::new(), FetchPlan::Lazy)
            .await
            .unwrap();
        session.resolve(&mut orders[0]).await.unwrap();

        assert!(orders[0].is_fully_resolved());
        assert!(!orders[1].is_fully_resolved());
        assert_eq!(session.queries_issued(), 3);
    }

    #[tokio::test]
    async fn test_shared_member_is_loaded_once() {
        let store = InMemoryEntityStore::with_sample_data().await;
        store
            .insert_delivery(Delivery::new(
                3,
                entity_store::Address::new("Seoul", "Gangnam-daero 3", "06000"),
            ))
            .await;
        store
            .insert_order(OrderRecord::new(3, 1, 3, NaiveDateTime::MIN, OrderStatus::Open))
            .await;
        let mut session = Session::new(&store);

        let mut orders = session
            .find_orders(&OrderSearch::new(), FetchPlan::Lazy)
            .await
            .unwrap();
        for order in &mut orders {
            session.resolve(order).await.unwrap();
        }

        // 1 order fetch + 2 distinct members + 3 deliveries
        assert_eq!(session.queries_issued(), 6);
    }

    #[tokio::test]
    async fn test_join_fetch_populates_identity_map() {
        let store = InMemoryEntityStore::with_sample_data().await;
        let mut session = Session::new(&store);

        let mut orders = session
            .find_orders(&OrderSearch::new(), FetchPlan::JoinMemberDelivery)
            .await
            .unwrap();
        assert_eq!(session.cached_entities(), 4);

        let mut lazy = session
            .find_orders(&OrderSearch::new(), FetchPlan::Lazy)
            .await
            .unwrap();
        for order in orders.iter_mut().chain(lazy.iter_mut()) {
            session.resolve(order).await.unwrap();
        }

        assert_eq!(session.queries_issued(), 2);
    }

    #[tokio::test]
    async fn test_resolve_reports_dangling_member() {
        let store = InMemoryEntityStore::with_sample_data().await;
        store.remove_member(MemberId::new(2)).await;
        let mut session = Session::new(&store);

        let mut orders = session
            .find_orders(&OrderSearch::new(), FetchPlan::Lazy)
            .await
            .unwrap();
        let err = session.resolve(&mut orders[1]).await.unwrap_err();

        assert!(matches!(
            err,
            QueryError::UnresolvedAssociation {
                association: "member",
                id: 2,
                ..
            }
        ));
    }
}
