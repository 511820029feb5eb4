use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Polled,
    Streamed,
}

/// The current engagement score for one customer, tagged with whichever
/// source last reported it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngagementScore {
    pub value: f64,
    pub source: ScoreSource,
}

/// Insert-style row emitted by the customer-scoped change feed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreEvent {
    pub customer_id: CustomerId,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}
