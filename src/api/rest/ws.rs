use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::models::event::DeviceSignal;
use crate::state::AppState;

/// Persistent connection for courier devices: dispatch events flow out,
/// accept/reject/arrived signals flow in.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = BroadcastStream::new(state.events_tx.subscribe());

    info!("courier device connected");

    let send_task = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            // A lagged receiver just skips to the current position.
            let Ok(event) = event else { continue };

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize dispatch event for ws");
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

            match serde_json::from_str::<DeviceSignal>(&text) {
                Ok(DeviceSignal::Decision {
                    order_id,
                    courier_id,
                    accepted,
                }) => {
                    recv_state.engine.on_decision(order_id, courier_id, accepted);
                }
                Ok(DeviceSignal::Arrived { order_id }) => {
                    if let Err(err) = recv_state.engine.on_arrival_confirmed(order_id).await {
                        warn!(%order_id, error = %err, "arrival signal failed");
                    }
                }
                Err(err) => {
                    warn!(error = %err, "unparseable device signal");
                }
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("courier device disconnected");
}
