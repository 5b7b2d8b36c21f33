use serde::{Deserialize, Serialize};

use crate::db_types::OrderStatus;

/// Search criteria for order listings. All criteria are combined with AND; an empty filter matches
/// everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQueryFilter {
    pub customer_email: Option<String>,
    pub statuses: Vec<OrderStatus>,
}

impl OrderQueryFilter {
    pub fn with_customer_email<S: Into<String>>(mut self, email: S) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.customer_email.is_none() && self.statuses.is_empty()
    }
}
