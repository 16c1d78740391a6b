use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamMap;

use super::BusState;
use crate::tracking::VehicleUpdate;

/// Client-to-server control frame modifying this connection's room membership.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    SubscribeRoute { route_id: String },
    UnsubscribeRoute { route_id: String },
}

/// Server-to-client frame. `BusUpdate` flattens the composite [`VehicleUpdate`]
/// alongside its `type` discriminant, exactly as on the HTTP paths (§6.2).
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ServerMessage<'a> {
    #[serde(rename = "bus_update")]
    BusUpdate {
        #[serde(flatten)]
        update: &'a VehicleUpdate,
    },
}

enum Action {
    Subscribe(String),
    Unsubscribe(String),
}

/// Push channel for vehicle updates (§4.6). A connection starts with an empty
/// room set; `subscribe_route`/`unsubscribe_route` control frames join or
/// leave `route:<routeId>` rooms, and every `bus:update` for a joined room is
/// forwarded as a `bus_update` frame.
pub async fn bus_ws(ws: WebSocketUpgrade, State(state): State<BusState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: BusState) {
    let (mut sender, mut receiver) = socket.split();
    let (action_tx, mut action_rx) = mpsc::channel::<Action>(16);

    let forward_state = state.clone();
    let forward_task = tokio::spawn(async move {
        let mut rooms: StreamMap<String, BroadcastStream<VehicleUpdate>> = StreamMap::new();

        loop {
            tokio::select! {
                action = action_rx.recv() => {
                    match action {
                        Some(Action::Subscribe(route_id)) => {
                            if !rooms.contains_key(&route_id) {
                                let rx = forward_state.tracking.subscribe(&route_id).await;
                                rooms.insert(route_id, BroadcastStream::new(rx));
                            }
                        }
                        Some(Action::Unsubscribe(route_id)) => {
                            rooms.remove(&route_id);
                        }
                        None => break,
                    }
                }
                Some((_, result)) = rooms.next(), if !rooms.is_empty() => {
                    let Ok(update) = result else {
                        // Lagged: the client missed events on this room; keep streaming.
                        continue;
                    };
                    let msg = ServerMessage::BusUpdate { update: &update };
                    if let Ok(json) = serde_json::to_string(&msg) {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) {
                    let action = match client_msg {
                        ClientMessage::SubscribeRoute { route_id } => Action::Subscribe(route_id),
                        ClientMessage::UnsubscribeRoute { route_id } => Action::Unsubscribe(route_id),
                    };
                    if action_tx.send(action).await.is_err() {
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    forward_task.abort();
}
