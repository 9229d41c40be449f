//! Query side for order reads.
//!
//! Loads orders together with their member and delivery and shapes them
//! into responses:
//! - [`FetchStrategy`] selects how associations are loaded, with its cost
//!   and trade-offs encoded alongside ([`QueryCost`], [`SELECTION_ORDER`])
//! - [`Session`] is the request-scoped identity map that counts round trips
//! - [`OrderSummary`] is the flat response shape, mapped from resolved orders
//! - [`OrderQueryService`] runs a strategy per request and reports its cost

pub mod error;
pub mod service;
pub mod session;
pub mod strategy;
pub mod summary;

pub use entity_store::OrderSearch;
pub use error::{QueryError, Result};
pub use service::{OrderQueryService, QueryOutcome, QueryReport};
pub use session::Session;
pub use strategy::{FetchStrategy, OrderQueryResult, QueryCost, SELECTION_ORDER, SelectionStep};
pub use summary::{OrderSummary, summarize};
