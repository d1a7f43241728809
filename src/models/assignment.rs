use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssignmentStatus {
    Broadcasted,
    Assigned,
}

/// A delivery offer broadcast to candidate couriers for one shop order.
/// Completion removes the record from the ledger; any assignment still in the
/// ledger is non-terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub shop_order_id: Uuid,
    pub shop_id: Uuid,
    pub broadcasted_to: Vec<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}
