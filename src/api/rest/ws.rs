use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::dispatch;
use crate::models::courier::GeoPoint;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
enum InboundMessage {
    #[serde(rename_all = "camelCase")]
    Identity { user_id: Uuid },
    UpdateLocation { latitude: f64, longitude: f64 },
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // the first readable message must identify the principal
    let principal = loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<InboundMessage>(&text) {
                Ok(InboundMessage::Identity { user_id }) => break user_id,
                Ok(_) => warn!("message before identity ignored"),
                Err(err) => warn!(error = %err, "unreadable client message"),
            },
            Some(Ok(_)) => {}
            Some(Err(_)) | None => return,
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    state.notifier.register(principal, tx.clone());
    state.directory.set_connected(principal, true);
    state.metrics.connected_clients.inc();

    info!(%principal, "live channel connected");

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let Message::Text(text) = msg else { continue };

            match serde_json::from_str::<InboundMessage>(&text) {
                Ok(InboundMessage::UpdateLocation {
                    latitude,
                    longitude,
                }) => {
                    let location = GeoPoint {
                        lat: latitude,
                        lng: longitude,
                    };
                    if let Err(err) =
                        dispatch::handle_location_update(&recv_state, principal, location)
                    {
                        warn!(%principal, error = %err, "location update rejected");
                    }
                }
                Ok(InboundMessage::Identity { .. }) => {}
                Err(err) => warn!(%principal, error = %err, "unreadable client message"),
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    state.notifier.unregister_if(principal, &tx);
    state.directory.set_connected(principal, false);
    state.metrics.connected_clients.dec();

    info!(%principal, "live channel disconnected");
}
