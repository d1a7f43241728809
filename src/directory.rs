use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::courier::{Courier, GeoPoint};

/// Last-known location and connectivity per courier. Pure storage and point
/// lookup; availability lives in the assignment ledger.
pub struct CourierDirectory {
    couriers: DashMap<Uuid, Courier>,
}

impl CourierDirectory {
    pub fn new() -> Self {
        Self {
            couriers: DashMap::new(),
        }
    }

    pub fn upsert(&self, courier: Courier) {
        self.couriers.insert(courier.id, courier);
    }

    pub fn get(&self, id: Uuid) -> Option<Courier> {
        self.couriers.get(&id).map(|entry| entry.value().clone())
    }

    pub fn update_location(&self, id: Uuid, location: GeoPoint) -> Result<Courier, AppError> {
        let mut courier = self
            .couriers
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("courier {} not found", id)))?;

        courier.location = location;
        courier.updated_at = Utc::now();

        Ok(courier.clone())
    }

    /// Connect/disconnect signal. Unknown principals (customers, shop owners)
    /// are ignored.
    pub fn set_connected(&self, id: Uuid, online: bool) {
        if let Some(mut courier) = self.couriers.get_mut(&id) {
            courier.is_online = online;
            courier.updated_at = Utc::now();
        }
    }

    pub fn snapshot(&self) -> Vec<Courier> {
        self.couriers
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.couriers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.couriers.is_empty()
    }
}

impl Default for CourierDirectory {
    fn default() -> Self {
        Self::new()
    }
}
