use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use tokio::sync::RwLock;

use crate::{
    Address, Association, Delivery, DeliveryId, EntityStoreError, FetchPlan, Member, MemberId,
    Order, OrderId, OrderRecord, OrderSearch, OrderStatus, OrderSummaryRow, QueryKind, Result,
    store::EntityStore,
};

/// Ordered record of the round trips made against an in-memory store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryLog(Vec<QueryKind>);

impl QueryLog {
    /// Total number of round trips.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of round trips of one kind.
    pub fn count(&self, kind: QueryKind) -> usize {
        self.0.iter().filter(|k| **k == kind).count()
    }

    /// Round trips in the order they were made.
    pub fn kinds(&self) -> &[QueryKind] {
        &self.0
    }
}

#[derive(Default)]
struct Tables {
    members: BTreeMap<MemberId, Member>,
    deliveries: BTreeMap<DeliveryId, Delivery>,
    orders: BTreeMap<OrderId, OrderRecord>,
}

/// In-memory entity store for testing and local runs.
///
/// Provides the same interface as the PostgreSQL implementation and records
/// every round trip so callers can assert on query cost.
#[derive(Clone, Default)]
pub struct InMemoryEntityStore {
    tables: Arc<RwLock<Tables>>,
    log: Arc<RwLock<Vec<QueryKind>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryEntityStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with two members, each with one order.
    pub async fn with_sample_data() -> Self {
        let store = Self::new();
        let base = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .unwrap_or(NaiveDateTime::MIN);

        store.insert_member(Member::new(1, "Alice")).await;
        store.insert_member(Member::new(2, "Bob")).await;
        store
            .insert_delivery(Delivery::new(
                1,
                Address::new("Seoul", "Teheran-ro 1", "06236"),
            ))
            .await;
        store
            .insert_delivery(Delivery::new(
                2,
                Address::new("Busan", "Haeundae-ro 2", "48094"),
            ))
            .await;
        store
            .insert_order(OrderRecord::new(1, 1, 1, base, OrderStatus::Open))
            .await;
        store
            .insert_order(OrderRecord::new(
                2,
                2,
                2,
                base + Duration::hours(1),
                OrderStatus::Canceled,
            ))
            .await;

        store
    }

    /// Inserts or replaces a member.
    pub async fn insert_member(&self, member: Member) {
        self.tables.write().await.members.insert(member.id, member);
    }

    /// Inserts or replaces a delivery.
    pub async fn insert_delivery(&self, delivery: Delivery) {
        self.tables
            .write()
            .await
            .deliveries
            .insert(delivery.id, delivery);
    }

    /// Inserts or replaces an order row. Referential integrity is not
    /// checked, so dangling references can be seeded.
    pub async fn insert_order(&self, order: OrderRecord) {
        self.tables.write().await.orders.insert(order.id, order);
    }

    /// Removes a member, leaving orders that point at it dangling.
    pub async fn remove_member(&self, id: MemberId) -> Option<Member> {
        self.tables.write().await.members.remove(&id)
    }

    /// Removes a delivery, leaving the order that points at it dangling.
    pub async fn remove_delivery(&self, id: DeliveryId) -> Option<Delivery> {
        self.tables.write().await.deliveries.remove(&id)
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Marks the store reachable or unreachable.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Returns the round trips made so far.
    pub async fn query_log(&self) -> QueryLog {
        QueryLog(self.log.read().await.clone())
    }

    /// Forgets all recorded round trips.
    pub async fn clear_query_log(&self) {
        self.log.write().await.clear();
    }

    async fn begin(&self, kind: QueryKind) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(EntityStoreError::Unavailable(
                "in-memory store is offline".to_string(),
            ));
        }
        self.log.write().await.push(kind);
        metrics::counter!("entity_store_queries_total", "kind" => kind.as_str()).increment(1);
        tracing::debug!(kind = kind.as_str(), "entity store query");
        Ok(())
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn find_orders(&self, search: &OrderSearch, plan: FetchPlan) -> Result<Vec<Order>> {
        let kind = match plan {
            FetchPlan::Lazy => QueryKind::Orders,
            FetchPlan::JoinMemberDelivery => QueryKind::OrdersJoinFetch,
        };
        self.begin(kind).await?;

        let tables = self.tables.read().await;
        let orders = tables
            .orders
            .values()
            .filter(|record| search.matches(record, tables.members.get(&record.member_id)))
            .map(|record| {
                let mut order = Order::unresolved(record);
                if plan == FetchPlan::JoinMemberDelivery {
                    if let Some(member) = tables.members.get(&record.member_id) {
                        order.member = Association::Resolved(member.clone());
                    }
                    if let Some(delivery) = tables.deliveries.get(&record.delivery_id) {
                        order.delivery = Association::Resolved(delivery.clone());
                    }
                }
                order
            })
            .collect();

        Ok(orders)
    }

    async fn find_member(&self, id: MemberId) -> Result<Option<Member>> {
        self.begin(QueryKind::Member).await?;
        Ok(self.tables.read().await.members.get(&id).cloned())
    }

    async fn find_delivery(&self, id: DeliveryId) -> Result<Option<Delivery>> {
        self.begin(QueryKind::Delivery).await?;
        Ok(self.tables.read().await.deliveries.get(&id).cloned())
    }

    async fn find_order_summaries(&self, search: &OrderSearch) -> Result<Vec<OrderSummaryRow>> {
        self.begin(QueryKind::OrderSummaries).await?;

        let tables = self.tables.read().await;
        let mut rows = Vec::new();
        for record in tables.orders.values() {
            let member = tables.members.get(&record.member_id);
            if !search.matches(record, member) {
                continue;
            }
            let member = member.ok_or(EntityStoreError::DanglingReference {
                order_id: record.id,
                association: "member",
                id: record.member_id.as_i64(),
            })?;
            let delivery = tables.deliveries.get(&record.delivery_id).ok_or(
                EntityStoreError::DanglingReference {
                    order_id: record.id,
                    association: "delivery",
                    id: record.delivery_id.as_i64(),
                },
            )?;
            rows.push(OrderSummaryRow {
                order_id: record.id,
                member_name: member.name.clone(),
                order_date: record.order_date,
                status: record.status,
                address: delivery.address.clone(),
            });
        }

        Ok(rows)
    }
}
