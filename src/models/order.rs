use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::courier::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ShopOrderStatus {
    Pending,
    Preparing,
    OutForDelivery,
    Delivered,
}

impl ShopOrderStatus {
    /// Transitions are linear: pending -> preparing -> out for delivery ->
    /// delivered. No skipping, no reversal.
    pub fn is_next(&self, next: &ShopOrderStatus) -> bool {
        matches!(
            (self, next),
            (ShopOrderStatus::Pending, ShopOrderStatus::Preparing)
                | (ShopOrderStatus::Preparing, ShopOrderStatus::OutForDelivery)
                | (ShopOrderStatus::OutForDelivery, ShopOrderStatus::Delivered)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub item_id: Uuid,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub text: String,
    pub location: GeoPoint,
}

/// One-time code proving receipt at delivery. Cleared after one use, invalid
/// past `expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopOrder {
    pub id: Uuid,
    pub shop_id: Uuid,
    pub owner_id: Uuid,
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
    pub status: ShopOrderStatus,
    pub assignment: Option<Uuid>,
    pub assigned_courier: Option<Uuid>,
    #[serde(default, skip_serializing)]
    pub delivery_code: Option<DeliveryCode>,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub delivery_address: DeliveryAddress,
    pub total_amount: f64,
    pub shop_orders: Vec<ShopOrder>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn shop_order(&self, id: Uuid) -> Option<&ShopOrder> {
        self.shop_orders.iter().find(|so| so.id == id)
    }

    pub fn shop_order_mut(&mut self, id: Uuid) -> Option<&mut ShopOrder> {
        self.shop_orders.iter_mut().find(|so| so.id == id)
    }
}
