use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// The singleton MetaInfo row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetaInfo {
    pub version: f64,
    pub created: DateTime<Utc>,
    pub last_update: Option<DateTime<Utc>>,
}
