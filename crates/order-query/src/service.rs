//! Order query service: one session per call.

use std::time::Instant;

use entity_store::{EntityStore, Order, OrderSearch};

use crate::Result;
use crate::session::Session;
use crate::strategy::{FetchStrategy, OrderQueryResult, fetch_and_resolve};
use crate::summary::OrderSummary;

/// Cost record of a single strategy execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryReport {
    pub strategy: FetchStrategy,
    /// Number of orders returned.
    pub rows: usize,
    /// Store round trips issued by the request.
    pub queries: usize,
}

impl QueryReport {
    /// Returns true if the query count stayed within the strategy's bound.
    pub fn within_bound(&self) -> bool {
        self.queries <= self.strategy.query_cost().worst_case(self.rows)
    }
}

/// Result of a strategy together with what it cost.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub result: OrderQueryResult,
    pub report: QueryReport,
}

/// Runs fetch strategies against an entity store.
///
/// Each call opens its own [`Session`], so requests never share loaded
/// entities. Within a call everything runs sequentially.
#[derive(Clone)]
pub struct OrderQueryService<S: EntityStore> {
    store: S,
}

impl<S: EntityStore> OrderQueryService<S> {
    /// Creates a new service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Opens a fresh request-scoped session.
    pub fn session(&self) -> Session<'_, S> {
        Session::new(&self.store)
    }

    /// Runs `strategy` in a fresh session.
    pub async fn execute(
        &self,
        strategy: FetchStrategy,
        search: &OrderSearch,
    ) -> Result<QueryOutcome> {
        let mut session = self.session();
        self.execute_in(&mut session, strategy, search).await
    }

    /// Runs `strategy` inside an existing session. Only the queries issued
    /// by this call are reported.
    #[tracing::instrument(skip(self, session, search), fields(strategy = %strategy))]
    pub async fn execute_in(
        &self,
        session: &mut Session<'_, S>,
        strategy: FetchStrategy,
        search: &OrderSearch,
    ) -> Result<QueryOutcome> {
        let start = Instant::now();
        let queries_before = session.queries_issued();
        let result = strategy.run(session, search).await;
        let queries = session.queries_issued() - queries_before;

        let (result, report) = observe(strategy, start, queries, result, OrderQueryResult::len)?;
        Ok(QueryOutcome { result, report })
    }

    /// Runs `strategy` and returns summaries, mapping entities if the
    /// strategy returns them.
    pub async fn summaries(
        &self,
        strategy: FetchStrategy,
        search: &OrderSearch,
    ) -> Result<Vec<OrderSummary>> {
        self.execute(strategy, search).await?.result.into_summaries()
    }

    /// v1: entities with member and delivery force-loaded.
    #[tracing::instrument(skip(self, search), fields(strategy = %FetchStrategy::EntityExposure))]
    pub async fn orders_v1(&self, search: &OrderSearch) -> Result<Vec<Order>> {
        let start = Instant::now();
        let mut session = self.session();
        let result = fetch_and_resolve(&mut session, search).await;

        let (orders, _) = observe(
            FetchStrategy::EntityExposure,
            start,
            session.queries_issued(),
            result,
            Vec::len,
        )?;
        Ok(orders)
    }

    /// v2: entities mapped to summaries.
    pub async fn orders_v2(&self, search: &OrderSearch) -> Result<Vec<OrderSummary>> {
        self.summaries(FetchStrategy::EntityToSummary, search).await
    }

    /// v3: fetch join mapped to summaries.
    pub async fn orders_v3(&self, search: &OrderSearch) -> Result<Vec<OrderSummary>> {
        self.summaries(FetchStrategy::FetchJoin, search).await
    }

    /// v4: summaries selected directly.
    pub async fn orders_v4(&self, search: &OrderSearch) -> Result<Vec<OrderSummary>> {
        self.summaries(FetchStrategy::DirectProjection, search).await
    }
}

/// Records metrics and logs for a finished strategy execution.
fn observe<T>(
    strategy: FetchStrategy,
    start: Instant,
    queries: usize,
    result: Result<T>,
    rows: impl FnOnce(&T) -> usize,
) -> Result<(T, QueryReport)> {
    let version = strategy.version();
    metrics::counter!("order_query_requests_total", "strategy" => version).increment(1);

    let output = match result {
        Ok(output) => output,
        Err(err) => {
            metrics::counter!("order_query_failures_total", "strategy" => version).increment(1);
            tracing::warn!(error = %err, "order query failed");
            return Err(err);
        }
    };

    let report = QueryReport {
        strategy,
        rows: rows(&output),
        queries,
    };

    metrics::histogram!("order_query_store_queries", "strategy" => version)
        .record(report.queries as f64);
    metrics::histogram!("order_query_duration_seconds", "strategy" => version)
        .record(start.elapsed().as_secs_f64());

    if report.within_bound() {
        tracing::info!(rows = report.rows, queries = report.queries, "order query complete");
    } else {
        tracing::warn!(
            rows = report.rows,
            queries = report.queries,
            "order query exceeded its query bound"
        );
    }

    Ok((output, report))
}
