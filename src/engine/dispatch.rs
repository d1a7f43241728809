use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::matcher;
use crate::error::AppError;
use crate::models::assignment::Assignment;
use crate::models::courier::GeoPoint;
use crate::models::order::{DeliveryAddress, DeliveryCode, OrderItem, ShopOrder, ShopOrderStatus};
use crate::notify::OutboundEvent;
use crate::state::AppState;

#[derive(Debug)]
pub enum DispatchOutcome {
    Broadcasted(Assignment),
    AlreadyDispatched,
    NoCourierAvailable,
    StatusOnly,
}

impl DispatchOutcome {
    pub fn assignment(&self) -> Option<&Assignment> {
        match self {
            DispatchOutcome::Broadcasted(assignment) => Some(assignment),
            _ => None,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            DispatchOutcome::Broadcasted(_) => "assignment broadcasted",
            DispatchOutcome::AlreadyDispatched => "assignment already exists",
            DispatchOutcome::NoCourierAvailable => "no courier available",
            DispatchOutcome::StatusOnly => "status updated",
        }
    }
}

/// A broadcast offer as shown to a candidate courier.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentOffer {
    pub assignment_id: Uuid,
    pub order_id: Uuid,
    pub shop_id: Uuid,
    pub delivery_address: DeliveryAddress,
    pub items: Vec<OrderItem>,
    pub subtotal: f64,
}

/// The delivery a courier currently holds.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentDelivery {
    pub assignment_id: Uuid,
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub delivery_address: DeliveryAddress,
    pub shop_order: ShopOrder,
    pub courier_location: Option<GeoPoint>,
}

/// Advances a shop order through its status machine. Entering
/// `OutForDelivery` runs the matcher and broadcasts an assignment; re-sending
/// `OutForDelivery` is the shop's re-trigger after "no courier available".
/// `Delivered` is reachable only through `confirm_delivery`.
pub fn update_shop_order_status(
    state: &AppState,
    order_id: Uuid,
    shop_order_id: Uuid,
    new_status: ShopOrderStatus,
) -> Result<(ShopOrder, DispatchOutcome), AppError> {
    let mut order = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;

    let customer_id = order.customer_id;
    let delivery_address = order.delivery_address.clone();

    let shop_order = order
        .shop_order_mut(shop_order_id)
        .ok_or_else(|| AppError::NotFound(format!("shop order {} not found", shop_order_id)))?;

    if new_status == ShopOrderStatus::Delivered {
        return Err(AppError::InvalidState(
            "delivered is reached by confirming the delivery code".to_string(),
        ));
    }

    let retrigger = shop_order.status == ShopOrderStatus::OutForDelivery
        && new_status == ShopOrderStatus::OutForDelivery;
    if !retrigger && !shop_order.status.is_next(&new_status) {
        return Err(AppError::InvalidState(format!(
            "cannot move shop order from {:?} to {:?}",
            shop_order.status, new_status
        )));
    }

    shop_order.status = new_status;

    let outcome = if new_status == ShopOrderStatus::OutForDelivery {
        if shop_order.assignment.is_some()
            || state.ledger.active_for_shop_order(shop_order_id).is_some()
        {
            state
                .metrics
                .dispatches_total
                .with_label_values(&["already_dispatched"])
                .inc();
            DispatchOutcome::AlreadyDispatched
        } else {
            let candidates = matcher::find_candidates(
                &state.directory,
                &state.ledger,
                &delivery_address.location,
                state.settings.radius_m,
            );

            if candidates.is_empty() {
                info!(%order_id, %shop_order_id, "no courier available within dispatch radius");
                state
                    .metrics
                    .dispatches_total
                    .with_label_values(&["no_courier"])
                    .inc();
                DispatchOutcome::NoCourierAvailable
            } else {
                let candidate_ids = candidates.iter().map(|c| c.id).collect();
                match state
                    .ledger
                    .create(order_id, shop_order.shop_id, shop_order_id, candidate_ids)
                {
                    Ok(assignment) => {
                        shop_order.assignment = Some(assignment.id);
                        state.metrics.active_assignments.inc();
                        state
                            .metrics
                            .dispatches_total
                            .with_label_values(&["broadcasted"])
                            .inc();

                        for courier in &candidates {
                            state.notifier.send(
                                courier.id,
                                OutboundEvent::NewAssignment {
                                    assignment_id: assignment.id,
                                    order_id,
                                    shop_id: shop_order.shop_id,
                                    delivery_address: delivery_address.clone(),
                                    items: shop_order.items.clone(),
                                    subtotal: shop_order.subtotal,
                                },
                            );
                        }

                        info!(
                            %order_id,
                            %shop_order_id,
                            assignment_id = %assignment.id,
                            candidates = candidates.len(),
                            "assignment broadcasted"
                        );
                        DispatchOutcome::Broadcasted(assignment)
                    }
                    // a concurrent status update won the create race
                    Err(AppError::Conflict(_)) => {
                        state
                            .metrics
                            .dispatches_total
                            .with_label_values(&["already_dispatched"])
                            .inc();
                        DispatchOutcome::AlreadyDispatched
                    }
                    Err(err) => return Err(err),
                }
            }
        }
    } else {
        DispatchOutcome::StatusOnly
    };

    let updated = shop_order.clone();
    drop(order);

    state.notifier.send(
        customer_id,
        OutboundEvent::StatusUpdate {
            order_id,
            shop_order_id,
            shop_id: updated.shop_id,
            status: updated.status,
            assigned_courier: updated.assigned_courier,
        },
    );

    Ok((updated, outcome))
}

/// Courier acceptance: the ledger arbitrates the claim, then the shop order's
/// back-reference is updated and the customer is told. A missing order after
/// a won claim is tolerated; the claim stands.
pub fn accept_assignment(
    state: &AppState,
    assignment_id: Uuid,
    courier_id: Uuid,
) -> Result<Assignment, AppError> {
    let assignment = match state.ledger.accept(assignment_id, courier_id) {
        Ok(assignment) => {
            state.metrics.accepts_total.with_label_values(&["won"]).inc();
            assignment
        }
        Err(err) => {
            let outcome = match &err {
                AppError::InvalidState(_) => "lost",
                AppError::Busy(_) => "busy",
                _ => "error",
            };
            state
                .metrics
                .accepts_total
                .with_label_values(&[outcome])
                .inc();
            return Err(err);
        }
    };

    match state.orders.get_mut(&assignment.order_id) {
        Some(mut order) => {
            let customer_id = order.customer_id;
            let mut update = None;
            if let Some(shop_order) = order.shop_order_mut(assignment.shop_order_id) {
                shop_order.assigned_courier = Some(courier_id);
                update = Some((shop_order.id, shop_order.shop_id, shop_order.status));
            }
            drop(order);

            if let Some((shop_order_id, shop_id, status)) = update {
                state.notifier.send(
                    customer_id,
                    OutboundEvent::StatusUpdate {
                        order_id: assignment.order_id,
                        shop_order_id,
                        shop_id,
                        status,
                        assigned_courier: Some(courier_id),
                    },
                );
            }
        }
        None => warn!(
            %assignment_id,
            order_id = %assignment.order_id,
            "accepted assignment references a missing order"
        ),
    }

    info!(%assignment_id, %courier_id, "assignment accepted");
    Ok(assignment)
}

pub fn list_broadcasts_for(state: &AppState, courier_id: Uuid) -> Vec<AssignmentOffer> {
    state
        .ledger
        .broadcasts_for(courier_id)
        .into_iter()
        .filter_map(|assignment| {
            let order = state.orders.get(&assignment.order_id)?;
            let shop_order = order.shop_order(assignment.shop_order_id)?;

            Some(AssignmentOffer {
                assignment_id: assignment.id,
                order_id: order.id,
                shop_id: assignment.shop_id,
                delivery_address: order.delivery_address.clone(),
                items: shop_order.items.clone(),
                subtotal: shop_order.subtotal,
            })
        })
        .collect()
}

pub fn current_assignment_for(
    state: &AppState,
    courier_id: Uuid,
) -> Result<CurrentDelivery, AppError> {
    let assignment = state.ledger.current_for(courier_id).ok_or_else(|| {
        AppError::NotFound(format!("no active assignment for courier {}", courier_id))
    })?;

    let order = state
        .orders
        .get(&assignment.order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", assignment.order_id)))?;

    let shop_order = order
        .shop_order(assignment.shop_order_id)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "shop order {} not found",
                assignment.shop_order_id
            ))
        })?
        .clone();

    Ok(CurrentDelivery {
        assignment_id: assignment.id,
        order_id: order.id,
        customer_id: order.customer_id,
        delivery_address: order.delivery_address.clone(),
        shop_order,
        courier_location: state.directory.get(courier_id).map(|c| c.location),
    })
}

/// Issues a fresh one-time code and hands it to the mailer. Mail failure is
/// logged; the code stays valid either way.
pub async fn request_delivery_code(
    state: &AppState,
    order_id: Uuid,
    shop_order_id: Uuid,
) -> Result<(), AppError> {
    let code = generate_code();
    let expires_at = Utc::now() + state.settings.code_ttl;

    let customer_id = {
        let mut order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;
        let customer_id = order.customer_id;

        let shop_order = order
            .shop_order_mut(shop_order_id)
            .ok_or_else(|| AppError::NotFound(format!("shop order {} not found", shop_order_id)))?;

        shop_order.delivery_code = Some(DeliveryCode {
            code: code.clone(),
            expires_at,
        });

        customer_id
    };

    if let Err(err) = state.mailer.send_delivery_code(customer_id, &code).await {
        warn!(%order_id, %shop_order_id, error = %err, "delivery code delivery failed");
    }

    Ok(())
}

/// Confirms receipt with the one-time code: status moves to `Delivered`, the
/// code is consumed, and the assignment is retired so the courier frees up.
pub fn confirm_delivery(
    state: &AppState,
    order_id: Uuid,
    shop_order_id: Uuid,
    code: &str,
) -> Result<ShopOrder, AppError> {
    let (snapshot, customer_id, assignment_id) = {
        let mut order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;
        let customer_id = order.customer_id;

        let shop_order = order
            .shop_order_mut(shop_order_id)
            .ok_or_else(|| AppError::NotFound(format!("shop order {} not found", shop_order_id)))?;

        let valid = shop_order
            .delivery_code
            .as_ref()
            .is_some_and(|dc| dc.code == code && Utc::now() <= dc.expires_at);
        if !valid {
            return Err(AppError::InvalidCode);
        }

        if shop_order.status != ShopOrderStatus::OutForDelivery {
            return Err(AppError::InvalidState(format!(
                "shop order is {:?}, not out for delivery",
                shop_order.status
            )));
        }

        shop_order.status = ShopOrderStatus::Delivered;
        shop_order.delivered_at = Some(Utc::now());
        shop_order.delivery_code = None;
        let assignment_id = shop_order.assignment.take();

        (shop_order.clone(), customer_id, assignment_id)
    };

    if let Some(assignment_id) = assignment_id {
        if state.ledger.complete(assignment_id).is_some() {
            state.metrics.active_assignments.dec();
        }
    }
    state.metrics.deliveries_total.inc();

    state.notifier.send(
        customer_id,
        OutboundEvent::StatusUpdate {
            order_id,
            shop_order_id,
            shop_id: snapshot.shop_id,
            status: snapshot.status,
            assigned_courier: snapshot.assigned_courier,
        },
    );

    info!(%order_id, %shop_order_id, "delivery confirmed");
    Ok(snapshot)
}

/// Live location update from a courier's device: the directory is refreshed
/// and the customer of the held delivery, if any, sees the movement.
pub fn handle_location_update(
    state: &AppState,
    courier_id: Uuid,
    location: GeoPoint,
) -> Result<(), AppError> {
    let courier = state.directory.update_location(courier_id, location)?;

    if let Some(assignment) = state.ledger.current_for(courier_id) {
        if let Some(order) = state.orders.get(&assignment.order_id) {
            state.notifier.send(
                order.customer_id,
                OutboundEvent::DeliveryLocation {
                    courier_id,
                    location: courier.location.clone(),
                },
            );
        }
    }

    Ok(())
}

/// Removes stale broadcasts when a TTL is configured. Expired assignments
/// lose their shop-order back-reference so a re-trigger can dispatch again.
pub async fn run_expiry_sweeper(
    state: Arc<AppState>,
    ttl: chrono::Duration,
    sweep_every: Duration,
) {
    info!(ttl_secs = ttl.num_seconds(), "broadcast expiry sweeper started");

    loop {
        sleep(sweep_every).await;

        let cutoff = Utc::now() - ttl;
        for assignment in state.ledger.expire_older_than(cutoff) {
            state.metrics.broadcasts_expired.inc();
            state.metrics.active_assignments.dec();

            if let Some(mut order) = state.orders.get_mut(&assignment.order_id) {
                if let Some(shop_order) = order.shop_order_mut(assignment.shop_order_id) {
                    if shop_order.assignment == Some(assignment.id) {
                        shop_order.assignment = None;
                    }
                }
            }

            warn!(
                assignment_id = %assignment.id,
                order_id = %assignment.order_id,
                "broadcast expired with no acceptance"
            );
        }
    }
}

fn generate_code() -> String {
    use rand::Rng;
    format!("{:06}", rand::rng().random_range(0u32..1_000_000))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::{
        accept_assignment, confirm_delivery, current_assignment_for, list_broadcasts_for,
        request_delivery_code, update_shop_order_status, DispatchOutcome,
    };
    use crate::config::DispatchSettings;
    use crate::error::AppError;
    use crate::models::courier::{Courier, GeoPoint};
    use crate::models::order::{
        DeliveryAddress, Order, OrderItem, ShopOrder, ShopOrderStatus,
    };
    use crate::state::AppState;

    const SHOP_LAT: f64 = 52.52;
    const SHOP_LNG: f64 = 13.405;

    fn test_state() -> AppState {
        AppState::new(DispatchSettings::default())
    }

    fn add_courier(state: &AppState, lat: f64, lng: f64) -> Uuid {
        let id = Uuid::new_v4();
        state.directory.upsert(Courier {
            id,
            full_name: "Test Courier".to_string(),
            mobile: "5550100".to_string(),
            location: GeoPoint { lat, lng },
            is_online: true,
            updated_at: Utc::now(),
        });
        id
    }

    fn seed_order(state: &AppState, status: ShopOrderStatus) -> (Uuid, Uuid) {
        let order_id = Uuid::new_v4();
        let shop_order_id = Uuid::new_v4();

        let order = Order {
            id: order_id,
            customer_id: Uuid::new_v4(),
            delivery_address: DeliveryAddress {
                text: "12 Test Lane".to_string(),
                location: GeoPoint {
                    lat: SHOP_LAT,
                    lng: SHOP_LNG,
                },
            },
            total_amount: 18.5,
            shop_orders: vec![ShopOrder {
                id: shop_order_id,
                shop_id: Uuid::new_v4(),
                owner_id: Uuid::new_v4(),
                items: vec![OrderItem {
                    item_id: Uuid::new_v4(),
                    name: "noodles".to_string(),
                    price: 9.25,
                    quantity: 2,
                }],
                subtotal: 18.5,
                status,
                assignment: None,
                assigned_courier: None,
                delivery_code: None,
                delivered_at: None,
            }],
            created_at: Utc::now(),
        };

        state.orders.insert(order_id, order);
        (order_id, shop_order_id)
    }

    fn stored_code(state: &AppState, order_id: Uuid, shop_order_id: Uuid) -> String {
        state
            .orders
            .get(&order_id)
            .unwrap()
            .shop_order(shop_order_id)
            .unwrap()
            .delivery_code
            .clone()
            .unwrap()
            .code
    }

    fn shift_code_expiry(state: &AppState, order_id: Uuid, shop_order_id: Uuid, by: Duration) {
        let mut order = state.orders.get_mut(&order_id).unwrap();
        let shop_order = order.shop_order_mut(shop_order_id).unwrap();
        let dc = shop_order.delivery_code.as_mut().unwrap();
        dc.expires_at = Utc::now() + by;
    }

    #[test]
    fn out_for_delivery_without_candidates_is_a_soft_outcome() {
        let state = test_state();
        let (order_id, shop_order_id) = seed_order(&state, ShopOrderStatus::Preparing);

        let (shop_order, outcome) = update_shop_order_status(
            &state,
            order_id,
            shop_order_id,
            ShopOrderStatus::OutForDelivery,
        )
        .unwrap();

        assert!(matches!(outcome, DispatchOutcome::NoCourierAvailable));
        assert_eq!(shop_order.status, ShopOrderStatus::OutForDelivery);
        assert!(shop_order.assignment.is_none());
        assert!(state.ledger.is_empty());
    }

    #[test]
    fn skipping_a_status_is_rejected() {
        let state = test_state();
        let (order_id, shop_order_id) = seed_order(&state, ShopOrderStatus::Pending);

        let result = update_shop_order_status(
            &state,
            order_id,
            shop_order_id,
            ShopOrderStatus::OutForDelivery,
        );

        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[test]
    fn reversing_a_status_is_rejected() {
        let state = test_state();
        let (order_id, shop_order_id) = seed_order(&state, ShopOrderStatus::OutForDelivery);

        let result =
            update_shop_order_status(&state, order_id, shop_order_id, ShopOrderStatus::Preparing);

        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[test]
    fn delivered_is_not_reachable_through_the_status_endpoint() {
        let state = test_state();
        let (order_id, shop_order_id) = seed_order(&state, ShopOrderStatus::OutForDelivery);

        let result =
            update_shop_order_status(&state, order_id, shop_order_id, ShopOrderStatus::Delivered);

        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[test]
    fn broadcast_creates_assignment_with_back_reference() {
        let state = test_state();
        let courier_id = add_courier(&state, SHOP_LAT + 0.001, SHOP_LNG + 0.001);
        let (order_id, shop_order_id) = seed_order(&state, ShopOrderStatus::Preparing);

        let (shop_order, outcome) = update_shop_order_status(
            &state,
            order_id,
            shop_order_id,
            ShopOrderStatus::OutForDelivery,
        )
        .unwrap();

        let assignment = outcome.assignment().expect("assignment broadcasted");
        assert_eq!(shop_order.assignment, Some(assignment.id));
        assert_eq!(assignment.broadcasted_to, vec![courier_id]);

        let offers = list_broadcasts_for(&state, courier_id);
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].assignment_id, assignment.id);
        assert_eq!(offers[0].subtotal, 18.5);
    }

    #[test]
    fn retrigger_after_no_courier_dispatches_once_a_courier_appears() {
        let state = test_state();
        let (order_id, shop_order_id) = seed_order(&state, ShopOrderStatus::Preparing);

        let (_, outcome) = update_shop_order_status(
            &state,
            order_id,
            shop_order_id,
            ShopOrderStatus::OutForDelivery,
        )
        .unwrap();
        assert!(matches!(outcome, DispatchOutcome::NoCourierAvailable));

        add_courier(&state, SHOP_LAT + 0.001, SHOP_LNG);

        let (_, outcome) = update_shop_order_status(
            &state,
            order_id,
            shop_order_id,
            ShopOrderStatus::OutForDelivery,
        )
        .unwrap();
        assert!(matches!(outcome, DispatchOutcome::Broadcasted(_)));
    }

    #[test]
    fn retrigger_with_a_live_assignment_short_circuits() {
        let state = test_state();
        add_courier(&state, SHOP_LAT + 0.001, SHOP_LNG);
        let (order_id, shop_order_id) = seed_order(&state, ShopOrderStatus::Preparing);

        update_shop_order_status(
            &state,
            order_id,
            shop_order_id,
            ShopOrderStatus::OutForDelivery,
        )
        .unwrap();

        let (_, outcome) = update_shop_order_status(
            &state,
            order_id,
            shop_order_id,
            ShopOrderStatus::OutForDelivery,
        )
        .unwrap();

        assert!(matches!(outcome, DispatchOutcome::AlreadyDispatched));
        assert_eq!(state.ledger.len(), 1);
    }

    #[test]
    fn acceptance_updates_the_shop_order_back_reference() {
        let state = test_state();
        let courier_id = add_courier(&state, SHOP_LAT + 0.001, SHOP_LNG);
        let (order_id, shop_order_id) = seed_order(&state, ShopOrderStatus::Preparing);

        let (_, outcome) = update_shop_order_status(
            &state,
            order_id,
            shop_order_id,
            ShopOrderStatus::OutForDelivery,
        )
        .unwrap();
        let assignment_id = outcome.assignment().unwrap().id;

        accept_assignment(&state, assignment_id, courier_id).unwrap();

        let order = state.orders.get(&order_id).unwrap();
        assert_eq!(
            order.shop_order(shop_order_id).unwrap().assigned_courier,
            Some(courier_id)
        );
        drop(order);

        let current = current_assignment_for(&state, courier_id).unwrap();
        assert_eq!(current.order_id, order_id);
        assert!(current.courier_location.is_some());
    }

    #[test]
    fn a_courier_on_a_delivery_is_not_matched_for_other_orders() {
        let state = test_state();
        let courier_id = add_courier(&state, SHOP_LAT + 0.001, SHOP_LNG);

        let (first_order, first_shop_order) = seed_order(&state, ShopOrderStatus::Preparing);
        let (_, outcome) = update_shop_order_status(
            &state,
            first_order,
            first_shop_order,
            ShopOrderStatus::OutForDelivery,
        )
        .unwrap();
        accept_assignment(&state, outcome.assignment().unwrap().id, courier_id).unwrap();

        let (second_order, second_shop_order) = seed_order(&state, ShopOrderStatus::Preparing);
        let (_, outcome) = update_shop_order_status(
            &state,
            second_order,
            second_shop_order,
            ShopOrderStatus::OutForDelivery,
        )
        .unwrap();

        assert!(matches!(outcome, DispatchOutcome::NoCourierAvailable));
    }

    #[tokio::test]
    async fn delivery_code_confirms_once_and_retires_the_assignment() {
        let state = test_state();
        let courier_id = add_courier(&state, SHOP_LAT + 0.001, SHOP_LNG);
        let (order_id, shop_order_id) = seed_order(&state, ShopOrderStatus::Preparing);

        let (_, outcome) = update_shop_order_status(
            &state,
            order_id,
            shop_order_id,
            ShopOrderStatus::OutForDelivery,
        )
        .unwrap();
        accept_assignment(&state, outcome.assignment().unwrap().id, courier_id).unwrap();

        request_delivery_code(&state, order_id, shop_order_id)
            .await
            .unwrap();
        let code = stored_code(&state, order_id, shop_order_id);

        let wrong = confirm_delivery(&state, order_id, shop_order_id, "000000x");
        assert!(matches!(wrong, Err(AppError::InvalidCode)));

        let shop_order = confirm_delivery(&state, order_id, shop_order_id, &code).unwrap();
        assert_eq!(shop_order.status, ShopOrderStatus::Delivered);
        assert!(shop_order.delivered_at.is_some());

        assert!(state.ledger.is_empty());
        assert!(!state.ledger.is_busy(courier_id));

        // the code is single-use
        let replay = confirm_delivery(&state, order_id, shop_order_id, &code);
        assert!(matches!(replay, Err(AppError::InvalidCode)));
    }

    #[tokio::test]
    async fn code_expiry_boundary() {
        let state = test_state();
        let (order_id, shop_order_id) = seed_order(&state, ShopOrderStatus::OutForDelivery);

        request_delivery_code(&state, order_id, shop_order_id)
            .await
            .unwrap();
        let code = stored_code(&state, order_id, shop_order_id);

        shift_code_expiry(&state, order_id, shop_order_id, Duration::seconds(-1));
        let expired = confirm_delivery(&state, order_id, shop_order_id, &code);
        assert!(matches!(expired, Err(AppError::InvalidCode)));

        shift_code_expiry(&state, order_id, shop_order_id, Duration::seconds(1));
        assert!(confirm_delivery(&state, order_id, shop_order_id, &code).is_ok());
    }

    #[test]
    fn confirm_without_an_issued_code_is_rejected() {
        let state = test_state();
        let (order_id, shop_order_id) = seed_order(&state, ShopOrderStatus::OutForDelivery);

        let result = confirm_delivery(&state, order_id, shop_order_id, "123456");
        assert!(matches!(result, Err(AppError::InvalidCode)));
    }

    #[tokio::test]
    async fn a_fresh_code_replaces_the_previous_one() {
        let state = test_state();
        let (order_id, shop_order_id) = seed_order(&state, ShopOrderStatus::OutForDelivery);

        request_delivery_code(&state, order_id, shop_order_id)
            .await
            .unwrap();
        let first = stored_code(&state, order_id, shop_order_id);
        shift_code_expiry(&state, order_id, shop_order_id, Duration::seconds(-1));

        request_delivery_code(&state, order_id, shop_order_id)
            .await
            .unwrap();
        let second = stored_code(&state, order_id, shop_order_id);

        assert_eq!(second.len(), 6);
        if first != second {
            let stale = confirm_delivery(&state, order_id, shop_order_id, &first);
            assert!(matches!(stale, Err(AppError::InvalidCode)));
        }
        assert!(confirm_delivery(&state, order_id, shop_order_id, &second).is_ok());
    }
}
