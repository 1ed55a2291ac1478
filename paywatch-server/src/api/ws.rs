use axum::{
    Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use paywatch_sdk::objects::PaymentStatus;
use paywatch_sdk::objects::ws::encode_status_frame;

use crate::state::AppState;

/// Build the live status router.
pub fn router() -> Router<AppState> {
    Router::new().route("/payment/{payment_id}/status", get(payment_status_ws))
}

/// `GET /ws/payment/{payment_id}/status` — live status push.
///
/// Sends exactly one text frame with the bare status literal once the
/// payment is no longer pending, then closes.
async fn payment_status_ws(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_status_ws(socket, state, payment_id))
}

/// Background task that drives a single WebSocket connection.
///
/// 1. Registers an observer for the payment.
/// 2. Reads the current status; if it is already terminal (or the payment
///    is unknown) replies right away and closes.
/// 3. Otherwise waits for the observer to fire or the client to leave.
async fn handle_status_ws(mut socket: WebSocket, state: AppState, payment_id: String) {
    // Subscribe *before* reading the current status so that a transition
    // racing with the read still reaches this observer.
    let observer = state.live.subscribe(&payment_id).await;

    let current = match state.store().payment_by_id(&payment_id).await {
        Ok(Some(record)) => PaymentStatus::from(record.status),
        Ok(None) => {
            tracing::debug!(%payment_id, "WS: unknown payment");
            drop(observer);
            state.live.prune(&payment_id).await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, %payment_id, "WS: failed to query payment");
            drop(observer);
            state.live.prune(&payment_id).await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    if current.is_terminal() {
        drop(observer);
        state.live.prune(&payment_id).await;
        send_status_and_close(&mut socket, current).await;
        return;
    }

    tokio::select! {
        status = observer => {
            match status {
                Ok(status) => send_status_and_close(&mut socket, status).await,
                Err(_) => {
                    // Hub dropped the sender without publishing.
                    let _ = socket.send(Message::Close(None)).await;
                }
            }
        }
        _ = wait_for_client_close(&mut socket) => {
            tracing::debug!(%payment_id, "WS: observer disconnected");
            state.live.prune(&payment_id).await;
        }
    }
}

async fn wait_for_client_close(socket: &mut WebSocket) {
    loop {
        match socket.recv().await {
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
            Some(Ok(_)) => continue,
        }
    }
}

async fn send_status_and_close(socket: &mut WebSocket, status: PaymentStatus) {
    if socket
        .send(Message::Text(encode_status_frame(status).into()))
        .await
        .is_ok()
    {
        let _ = socket.send(Message::Close(None)).await;
    }
}
