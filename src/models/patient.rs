use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub full_name: String,
    /// Minutes east of UTC. Constant; no daylight-saving transitions.
    pub timezone_offset: i32,
    pub created_at: DateTime<Utc>,
}
