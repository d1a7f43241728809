use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::models::courier::GeoPoint;
use crate::models::order::{DeliveryAddress, OrderItem, ShopOrder, ShopOrderStatus};

/// Events pushed over a principal's live channel. Tag names mirror the events
/// the web client listens for.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum OutboundEvent {
    NewOrder {
        order_id: Uuid,
        customer_id: Uuid,
        delivery_address: DeliveryAddress,
        shop_order: ShopOrder,
    },
    NewAssignment {
        assignment_id: Uuid,
        order_id: Uuid,
        shop_id: Uuid,
        delivery_address: DeliveryAddress,
        items: Vec<OrderItem>,
        subtotal: f64,
    },
    StatusUpdate {
        order_id: Uuid,
        shop_order_id: Uuid,
        shop_id: Uuid,
        status: ShopOrderStatus,
        assigned_courier: Option<Uuid>,
    },
    DeliveryLocation {
        courier_id: Uuid,
        location: GeoPoint,
    },
}

/// One addressable channel per connected principal. The registry is mutated
/// only through `register`/`unregister_if`; delivery is best-effort and never
/// blocks or errors.
pub struct Notifier {
    channels: DashMap<Uuid, mpsc::UnboundedSender<OutboundEvent>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    pub fn register(&self, principal: Uuid, tx: mpsc::UnboundedSender<OutboundEvent>) {
        self.channels.insert(principal, tx);
    }

    /// Clears the channel only if `tx` is still the registered one, so a
    /// stale disconnect cannot evict a newer connection.
    pub fn unregister_if(&self, principal: Uuid, tx: &mpsc::UnboundedSender<OutboundEvent>) {
        self.channels
            .remove_if(&principal, |_, registered| registered.same_channel(tx));
    }

    pub fn send(&self, principal: Uuid, event: OutboundEvent) {
        match self.channels.get(&principal) {
            Some(tx) => {
                if tx.send(event).is_err() {
                    debug!(%principal, "dropped event: channel closed");
                }
            }
            None => debug!(%principal, "dropped event: no live connection"),
        }
    }

    pub fn connected(&self) -> usize {
        self.channels.len()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
