use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A delivery courier tracked by the directory. Busy/free is never stored
/// here; it is derived from the assignment ledger at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub full_name: String,
    pub mobile: String,
    pub location: GeoPoint,
    pub is_online: bool,
    pub updated_at: DateTime<Utc>,
}
