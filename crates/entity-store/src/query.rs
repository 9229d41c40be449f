use crate::{Member, OrderRecord, OrderStatus};

/// Search criteria for order fetches.
///
/// Every field is optional; an absent field applies no filter. All fetch
/// operations of the store honour the same criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderSearch {
    /// Only orders in this status.
    pub status: Option<OrderStatus>,

    /// Only orders whose member name contains this text. `%` and `_` match
    /// themselves.
    pub member_name: Option<String>,
}

impl OrderSearch {
    /// Creates empty criteria that match every order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters by order status.
    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filters by member name (literal substring match).
    pub fn member_name(mut self, name: impl Into<String>) -> Self {
        self.member_name = Some(name.into());
        self
    }

    /// Returns true if no filter is set.
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.member_name.is_none()
    }

    /// Checks an order row against the criteria. `member` is the row's
    /// member if it exists; a name filter never matches a missing member.
    pub fn matches(&self, record: &OrderRecord, member: Option<&Member>) -> bool {
        if let Some(status) = self.status
            && record.status != status
        {
            return false;
        }
        if let Some(ref name) = self.member_name {
            return member.is_some_and(|m| m.name.contains(name.as_str()));
        }
        true
    }
}

/// How associations are loaded by an order fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FetchPlan {
    /// Orders only. Member and delivery stay unresolved.
    #[default]
    Lazy,

    /// Orders joined with their member and delivery in the same round trip.
    JoinMemberDelivery,
}
