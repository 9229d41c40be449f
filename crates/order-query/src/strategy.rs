//! Fetch strategies for reading orders with their member and delivery.
//!
//! Four strategies produce the same orders and differ only in how many
//! round trips they cost and how tightly the query is bound to the response
//! shape:
//!
//! | Strategy             | Endpoint | Queries        | Output    | Repository reusable |
//! |----------------------|----------|----------------|-----------|---------------------|
//! | [`EntityExposure`]   | v1       | 1 + 2N (worst) | entities  | yes                 |
//! | [`EntityToSummary`]  | v2       | 1 + 2N (worst) | summaries | yes                 |
//! | [`FetchJoin`]        | v3       | 1              | summaries | yes                 |
//! | [`DirectProjection`] | v4       | 1              | summaries | no                  |
//!
//! The per-item strategies drop to a single query when every member and
//! delivery is already in the session's identity map.
//!
//! [`EntityExposure`]: FetchStrategy::EntityExposure
//! [`EntityToSummary`]: FetchStrategy::EntityToSummary
//! [`FetchJoin`]: FetchStrategy::FetchJoin
//! [`DirectProjection`]: FetchStrategy::DirectProjection

use std::fmt;

use entity_store::{EntityStore, FetchPlan, Order, OrderSearch};
use serde::Serialize;

use crate::Result;
use crate::session::Session;
use crate::summary::{OrderSummary, summarize};

/// How an order list and its associations are loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FetchStrategy {
    /// Fetch orders, force each member and delivery to load one by one, and
    /// return the entities themselves.
    ///
    /// The naive baseline. It shows the N+1 cost and ties the response to the
    /// entity graph; it is not meant for production use.
    EntityExposure,

    /// Same fetch and per-item resolution as [`FetchStrategy::EntityExposure`],
    /// then map each order into an [`OrderSummary`].
    ///
    /// The response no longer depends on the entity graph, but the N+1 cost
    /// remains unless the request already loaded the associations.
    EntityToSummary,

    /// Fetch orders joined with member and delivery in one query, then map.
    ///
    /// The default. Removes the N+1 cost while the repository keeps a
    /// general-purpose fetch with an additive join directive.
    #[default]
    FetchJoin,

    /// Select exactly the summary columns in one query, never materializing
    /// entities.
    ///
    /// A last resort. The gain over [`FetchStrategy::FetchJoin`] is small and
    /// the query becomes specific to this response shape.
    DirectProjection,
}

/// Upper bound on store round trips for a result of N orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryCost {
    /// `base + per_item * N` in the worst case, `base` when every
    /// association is already loaded.
    PerItem { base: usize, per_item: usize },

    /// A fixed number of queries regardless of N.
    Constant(usize),
}

impl QueryCost {
    /// Maximum number of queries for `rows` orders.
    pub fn worst_case(&self, rows: usize) -> usize {
        match *self {
            QueryCost::PerItem { base, per_item } => base + per_item * rows,
            QueryCost::Constant(n) => n,
        }
    }

    /// Number of queries when every association is already loaded.
    pub fn best_case(&self) -> usize {
        match *self {
            QueryCost::PerItem { base, .. } => base,
            QueryCost::Constant(n) => n,
        }
    }

    /// Returns true if the cost does not grow with the result size.
    pub fn is_constant(&self) -> bool {
        matches!(self, QueryCost::Constant(_))
    }
}

/// One step of the order in which to reach for a query approach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStep {
    /// Use one of the fetch strategies.
    Strategy(FetchStrategy),

    /// Hand-written native SQL outside the entity store contract. Only when
    /// no strategy can express the needed shape.
    NativeQuery,
}

/// Preferred order of query approaches: map entities to summaries first,
/// add a fetch join when the query count matters, select summaries directly
/// if that is still not enough, and fall back to native SQL last.
pub const SELECTION_ORDER: [SelectionStep; 4] = [
    SelectionStep::Strategy(FetchStrategy::EntityToSummary),
    SelectionStep::Strategy(FetchStrategy::FetchJoin),
    SelectionStep::Strategy(FetchStrategy::DirectProjection),
    SelectionStep::NativeQuery,
];

impl FetchStrategy {
    /// All strategies, in endpoint order.
    pub const ALL: [FetchStrategy; 4] = [
        FetchStrategy::EntityExposure,
        FetchStrategy::EntityToSummary,
        FetchStrategy::FetchJoin,
        FetchStrategy::DirectProjection,
    ];

    /// Endpoint version tag.
    pub fn version(&self) -> &'static str {
        match self {
            FetchStrategy::EntityExposure => "v1",
            FetchStrategy::EntityToSummary => "v2",
            FetchStrategy::FetchJoin => "v3",
            FetchStrategy::DirectProjection => "v4",
        }
    }

    /// Looks up a strategy by endpoint version tag.
    pub fn from_version(version: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.version() == version)
    }

    pub fn query_cost(&self) -> QueryCost {
        match self {
            FetchStrategy::EntityExposure | FetchStrategy::EntityToSummary => QueryCost::PerItem {
                base: 1,
                per_item: 2,
            },
            FetchStrategy::FetchJoin | FetchStrategy::DirectProjection => QueryCost::Constant(1),
        }
    }

    /// Returns true if the strategy hands out entities rather than summaries.
    pub fn returns_entities(&self) -> bool {
        matches!(self, FetchStrategy::EntityExposure)
    }

    /// Returns false if the store query is written for this one response
    /// shape and cannot serve other callers.
    pub fn keeps_repository_reusable(&self) -> bool {
        !matches!(self, FetchStrategy::DirectProjection)
    }

    /// Returns true if the strategy materializes member and delivery
    /// entities on the way to its output.
    pub fn materializes_associations(&self) -> bool {
        !matches!(self, FetchStrategy::DirectProjection)
    }

    /// Position in [`SELECTION_ORDER`], or `None` for the baseline that is
    /// not part of it.
    pub fn preference(&self) -> Option<usize> {
        SELECTION_ORDER
            .iter()
            .position(|step| *step == SelectionStep::Strategy(*self))
    }

    /// The next approach to try when this one is not good enough.
    pub fn escalate(&self) -> Option<SelectionStep> {
        match self.preference() {
            None => Some(SELECTION_ORDER[0]),
            Some(i) => SELECTION_ORDER.get(i + 1).copied(),
        }
    }

    /// Runs the strategy inside `session`.
    ///
    /// Per-item resolution happens sequentially in result order, so
    /// associations loaded for an earlier order serve later ones from the
    /// identity map.
    pub async fn run<S: EntityStore + ?Sized>(
        &self,
        session: &mut Session<'_, S>,
        search: &OrderSearch,
    ) -> Result<OrderQueryResult> {
        match self {
            FetchStrategy::EntityExposure => {
                let orders = fetch_and_resolve(session, search).await?;
                Ok(OrderQueryResult::Entities(orders))
            }
            FetchStrategy::EntityToSummary => {
                let orders = fetch_and_resolve(session, search).await?;
                Ok(OrderQueryResult::Summaries(summarize(&orders)?))
            }
            FetchStrategy::FetchJoin => {
                let orders = session
                    .find_orders(search, FetchPlan::JoinMemberDelivery)
                    .await?;
                Ok(OrderQueryResult::Summaries(summarize(&orders)?))
            }
            FetchStrategy::DirectProjection => {
                let rows = session.find_order_summaries(search).await?;
                Ok(OrderQueryResult::Summaries(
                    rows.into_iter().map(OrderSummary::from).collect(),
                ))
            }
        }
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchStrategy::EntityExposure => "entity_exposure",
            FetchStrategy::EntityToSummary => "entity_to_summary",
            FetchStrategy::FetchJoin => "fetch_join",
            FetchStrategy::DirectProjection => "direct_projection",
        };
        f.write_str(name)
    }
}

/// Lazy order fetch followed by per-item resolution, in result order.
pub(crate) async fn fetch_and_resolve<S: EntityStore + ?Sized>(
    session: &mut Session<'_, S>,
    search: &OrderSearch,
) -> Result<Vec<Order>> {
    let mut orders = session.find_orders(search, FetchPlan::Lazy).await?;
    for order in &mut orders {
        session.resolve(order).await?;
    }
    Ok(orders)
}

/// Output of a strategy: entities for the baseline, summaries otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OrderQueryResult {
    Entities(Vec<Order>),
    Summaries(Vec<OrderSummary>),
}

impl OrderQueryResult {
    /// Number of orders in the result.
    pub fn len(&self) -> usize {
        match self {
            OrderQueryResult::Entities(orders) => orders.len(),
            OrderQueryResult::Summaries(summaries) => summaries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts to summaries, mapping entities if needed.
    pub fn into_summaries(self) -> Result<Vec<OrderSummary>> {
        match self {
            OrderQueryResult::Entities(orders) => summarize(&orders),
            OrderQueryResult::Summaries(summaries) => Ok(summaries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_join_is_the_default() {
        assert_eq!(FetchStrategy::default(), FetchStrategy::FetchJoin);
    }

    #[test]
    fn version_tags_round_trip() {
        for strategy in FetchStrategy::ALL {
            assert_eq!(FetchStrategy::from_version(strategy.version()), Some(strategy));
        }
        assert_eq!(FetchStrategy::from_version("v5"), None);
    }

    #[test]
    fn query_cost_table() {
        let per_item = FetchStrategy::EntityToSummary.query_cost();
        assert_eq!(per_item.worst_case(0), 1);
        assert_eq!(per_item.worst_case(4), 9);
        assert_eq!(per_item.best_case(), 1);
        assert!(!per_item.is_constant());

        for strategy in [FetchStrategy::FetchJoin, FetchStrategy::DirectProjection] {
            let cost = strategy.query_cost();
            assert!(cost.is_constant());
            assert_eq!(cost.worst_case(1_000), 1);
        }
    }

    #[test]
    fn only_direct_projection_gives_up_reusability() {
        let reusable: Vec<_> = FetchStrategy::ALL
            .into_iter()
            .filter(|s| !s.keeps_repository_reusable())
            .collect();
        assert_eq!(reusable, vec![FetchStrategy::DirectProjection]);
    }

    #[test]
    fn only_entity_exposure_returns_entities() {
        assert!(FetchStrategy::EntityExposure.returns_entities());
        assert!(!FetchStrategy::EntityToSummary.returns_entities());
    }

    #[test]
    fn selection_order_escalates_to_native_query() {
        use SelectionStep::*;

        assert_eq!(FetchStrategy::EntityExposure.preference(), None);
        assert_eq!(FetchStrategy::EntityToSummary.preference(), Some(0));
        assert_eq!(
            FetchStrategy::EntityExposure.escalate(),
            Some(Strategy(FetchStrategy::EntityToSummary))
        );
        assert_eq!(
            FetchStrategy::EntityToSummary.escalate(),
            Some(Strategy(FetchStrategy::FetchJoin))
        );
        assert_eq!(
            FetchStrategy::FetchJoin.escalate(),
            Some(Strategy(FetchStrategy::DirectProjection))
        );
        assert_eq!(FetchStrategy::DirectProjection.escalate(), Some(NativeQuery));
    }
}
