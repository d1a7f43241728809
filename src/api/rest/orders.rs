use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::engine::dispatch;
use crate::error::AppError;
use crate::models::order::{
    DeliveryAddress, Order, OrderItem, ShopOrder, ShopOrderStatus,
};
use crate::notify::OutboundEvent;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(place_order))
        .route("/orders/:id", get(get_order))
        .route(
            "/orders/:order_id/shop-orders/:shop_order_id/status",
            patch(update_status),
        )
        .route(
            "/orders/:order_id/shop-orders/:shop_order_id/delivery-code",
            post(request_delivery_code),
        )
        .route(
            "/orders/:order_id/shop-orders/:shop_order_id/confirm-delivery",
            post(confirm_delivery),
        )
}

#[derive(Deserialize)]
pub struct CartItem {
    pub shop_id: Uuid,
    pub owner_id: Uuid,
    pub item_id: Uuid,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub customer_id: Uuid,
    pub delivery_address: DeliveryAddress,
    pub cart_items: Vec<CartItem>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ShopOrderStatus,
}

#[derive(Deserialize)]
pub struct ConfirmDeliveryRequest {
    pub code: String,
}

async fn place_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<Json<Order>, AppError> {
    if payload.cart_items.is_empty() {
        return Err(AppError::BadRequest("cart is empty".to_string()));
    }

    if payload.delivery_address.text.trim().is_empty() {
        return Err(AppError::BadRequest(
            "send complete delivery address".to_string(),
        ));
    }

    // one shop order per shop, in cart order
    let mut shop_orders: Vec<ShopOrder> = Vec::new();
    for item in payload.cart_items {
        let line = OrderItem {
            item_id: item.item_id,
            name: item.name,
            price: item.price,
            quantity: item.quantity,
        };
        let line_total = line.price * f64::from(line.quantity);

        match shop_orders.iter_mut().find(|so| so.shop_id == item.shop_id) {
            Some(shop_order) => {
                shop_order.items.push(line);
                shop_order.subtotal += line_total;
            }
            None => shop_orders.push(ShopOrder {
                id: Uuid::new_v4(),
                shop_id: item.shop_id,
                owner_id: item.owner_id,
                items: vec![line],
                subtotal: line_total,
                status: ShopOrderStatus::Pending,
                assignment: None,
                assigned_courier: None,
                delivery_code: None,
                delivered_at: None,
            }),
        }
    }

    let order = Order {
        id: Uuid::new_v4(),
        customer_id: payload.customer_id,
        delivery_address: payload.delivery_address,
        total_amount: shop_orders.iter().map(|so| so.subtotal).sum(),
        shop_orders,
        created_at: Utc::now(),
    };

    state.orders.insert(order.id, order.clone());

    for shop_order in &order.shop_orders {
        state.notifier.send(
            shop_order.owner_id,
            OutboundEvent::NewOrder {
                order_id: order.id,
                customer_id: order.customer_id,
                delivery_address: order.delivery_address.clone(),
                shop_order: shop_order.clone(),
            },
        );
    }

    Ok(Json(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", id)))?;

    Ok(Json(order.value().clone()))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path((order_id, shop_order_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let (shop_order, outcome) =
        dispatch::update_shop_order_status(&state, order_id, shop_order_id, payload.status)?;

    Ok(Json(json!({
        "message": outcome.message(),
        "shop_order": shop_order,
        "assignment": outcome.assignment(),
    })))
}

async fn request_delivery_code(
    State(state): State<Arc<AppState>>,
    Path((order_id, shop_order_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    dispatch::request_delivery_code(&state, order_id, shop_order_id).await?;

    Ok(Json(json!({ "message": "delivery code sent" })))
}

async fn confirm_delivery(
    State(state): State<Arc<AppState>>,
    Path((order_id, shop_order_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ConfirmDeliveryRequest>,
) -> Result<Json<Value>, AppError> {
    let shop_order = dispatch::confirm_delivery(&state, order_id, shop_order_id, &payload.code)?;

    Ok(Json(json!({
        "message": "order delivered",
        "shop_order": shop_order,
    })))
}
