//! WebSocket upgrade handler.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{error, info, warn};

use cotune_core::message::serializer;
use cotune_core::types::Identity;
use cotune_realtime::connection::authenticator::HandshakeParams;
use cotune_realtime::connection::heartbeat::{HeartbeatConfig, run_heartbeat};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /ws?user_id={identity}
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<HandshakeParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    // Authenticate before upgrade
    let identity = state.authenticator.authenticate(&params).await?;

    Ok(ws.on_upgrade(move |socket| handle_ws_connection(state, identity, socket)))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, identity: Identity, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let connections = state.realtime.connections.clone();

    let (handle, mut outbound_rx) = connections.connect(identity.clone());
    let conn_id = handle.id;

    info!(
        conn_id = %conn_id,
        user_id = %identity,
        "WebSocket connection established"
    );

    // Spawn outbound message forwarder
    let outbound_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let text = match serializer::serialize_outbound(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!(error = %e, kind = msg.kind(), "Failed to serialize outbound frame");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let heartbeat_task = tokio::spawn(run_heartbeat(
        handle.clone(),
        HeartbeatConfig::from(&state.config.realtime),
    ));

    // Process inbound messages until the peer leaves or the server closes us
    loop {
        tokio::select! {
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    connections.handle_inbound(&conn_id, text.as_str());
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            },
            _ = handle.closed() => {
                info!(conn_id = %conn_id, "Connection closed by server");
                break;
            }
        }
    }

    // Cleanup
    connections.disconnect(&conn_id);
    heartbeat_task.abort();
    outbound_task.abort();

    info!(
        conn_id = %conn_id,
        user_id = %identity,
        "WebSocket connection closed"
    );
}
