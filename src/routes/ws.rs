//! WebSocket handler — the transport adapter.
//!
//! DESIGN
//! ======
//! On upgrade, the connection guard is consulted first: an origin at its
//! connection cap is closed immediately with policy code 1008. Accepted
//! connections get a client id and enter a `select!` loop:
//! - Incoming client frames → parse + dispatch by event prefix
//! - Broadcast frames from peers → forward to the socket
//!
//! Handler functions are pure dispatch — they validate and call into the
//! hub services, which own both the mutation and the fan-out. The only
//! frames built here are replies to the sender.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → guard accept → send `session:connected`
//! 2. `hub::join` queues the grid snapshot + chat history, roster goes out
//! 3. Client frames → dispatch → done/error reply to sender
//! 4. Close → `hub::part` (roster broadcast) + guard decrement, once
//!
//! Policy severity is uniform: the connection cap is the only hard close.
//! Rate limits, oversize batches, and oversize chat messages are soft —
//! the offending frame is answered with an error reply and the
//! connection stays open.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::frame::{Data, Frame};
use crate::grid::{CellWrite, GridError, parse_cell_key};
use crate::services::chat::ChatLog;
use crate::services::{hub, session};
use crate::state::{AppState, CLIENT_CHANNEL_CAPACITY};

/// WebSocket close code 1008: policy violation.
const CLOSE_POLICY_VIOLATION: u16 = 1008;

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. Broadcasts to peers happen
/// inside the hub services, atomically with the mutation; handlers only
/// decide what the sender gets back.
enum Outcome {
    /// Send done+data to sender.
    Reply(Data),
    /// Send empty done to sender.
    Done,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state, addr.ip()))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, origin: IpAddr) {
    // Connection cap is the one hard policy: refuse before any state is
    // touched, with a policy close code the client can distinguish.
    if let Err(e) = state.guard.on_connect(origin) {
        warn!(%origin, error = %e, "ws: connection refused");
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: CLOSE_POLICY_VIOLATION,
                reason: e.to_string().into(),
            })))
            .await;
        return;
    }

    let conn_id = Uuid::new_v4();

    // Per-connection channel for frames broadcast by peers.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(CLIENT_CHANNEL_CAPACITY);

    let welcome = Frame::request("session:connected", Data::new())
        .with_data("conn_id", conn_id.to_string())
        .with_data("width", state.config.grid_width)
        .with_data("height", state.config.grid_height);
    if send_frame(&mut socket, &welcome).await.is_err() {
        state.guard.on_disconnect(origin);
        return;
    }

    info!(%conn_id, %origin, "ws: client connected");

    // Queues the bootstrap snapshot on client_tx and broadcasts the roster.
    hub::join(&state, conn_id, client_tx).await;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        for frame in process_inbound_text(&state, origin, conn_id, text.as_str()).await {
                            let _ = send_frame(&mut socket, &frame).await;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    // Single exit path: registry and guard cleanup run exactly once.
    // Both removals are no-ops if somehow already gone.
    hub::part(&state, conn_id).await;
    state.guard.on_disconnect(origin);
    info!(%conn_id, %origin, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse and process one inbound text frame and return frames for the
/// sender. Kept free of socket concerns so tests can exercise dispatch
/// and fan-out end-to-end through in-process channels.
async fn process_inbound_text(state: &AppState, origin: IpAddr, conn_id: Uuid, text: &str) -> Vec<Frame> {
    let mut req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(%conn_id, error = %e, "ws: invalid inbound frame");
            let err = Frame::request("error", Data::new()).with_data("message", format!("invalid json: {e}"));
            return vec![err];
        }
    };

    // Stamp the connection id as `from` — clients cannot impersonate.
    req.from = Some(conn_id.to_string());

    // Global message window applies to every inbound frame, all kinds.
    // Soft policy: advisory error reply, connection stays open, the
    // message is never applied to shared state.
    if let Err(e) = state.guard.check_message(origin) {
        warn!(%conn_id, %origin, error = %e, "ws: message rate limited");
        return vec![req.error_from(&e)];
    }

    let prefix = req.prefix();
    let result = match prefix {
        "session" => handle_session(state, conn_id, &req).await,
        "grid" => handle_grid(state, conn_id, &req).await,
        "chat" => handle_chat(state, origin, conn_id, &req).await,
        _ => Err(req.error(format!("unknown prefix: {prefix}"))),
    };

    match result {
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Ok(Outcome::Done) => vec![req.done()],
        Err(err_frame) => vec![err_frame],
    }
}

// =============================================================================
// SESSION HANDLERS
// =============================================================================

async fn handle_session(state: &AppState, conn_id: Uuid, req: &Frame) -> Result<Outcome, Frame> {
    let op = req.event.split_once(':').map_or("", |(_, op)| op);

    match op {
        "name" => {
            let Some(name) = req.data.get("name").and_then(|v| v.as_str()) else {
                return Err(req.error("name required"));
            };
            session::set_name(state, conn_id, name).await;
            Ok(Outcome::Done)
        }
        _ => Err(req.error(format!("unknown session op: {op}"))),
    }
}

// =============================================================================
// GRID HANDLERS
// =============================================================================

async fn handle_grid(state: &AppState, conn_id: Uuid, req: &Frame) -> Result<Outcome, Frame> {
    let op = req.event.split_once(':').map_or("", |(_, op)| op);

    match op {
        "update" => {
            let Some(x) = req.data.get("x").and_then(serde_json::Value::as_i64) else {
                return Err(req.error("x required"));
            };
            let Some(y) = req.data.get("y").and_then(serde_json::Value::as_i64) else {
                return Err(req.error("y required"));
            };
            let color = parse_color(req.data.get("color")).map_err(|()| req.error("color must be a string or null"))?;

            // Out-of-range writes are dropped silently; the sender still
            // gets its done ack.
            hub::apply_cell_update(state, conn_id, CellWrite { x, y, color }).await;
            Ok(Outcome::Done)
        }
        "batch" => {
            let Some(cells) = req.data.get("cells").and_then(serde_json::Value::as_object) else {
                return Err(req.error("cells required"));
            };
            // Reject the whole mapping before parsing a single pair.
            if cells.len() > state.config.max_batch_cells {
                let e = GridError::BatchTooLarge { max: state.config.max_batch_cells, got: cells.len() };
                return Err(req.error_from(&e));
            }

            let mut writes = Vec::with_capacity(cells.len());
            for (key, value) in cells {
                // Malformed keys or colors drop that pair, not the batch.
                let Some((x, y)) = parse_cell_key(key) else { continue };
                let Ok(color) = parse_color(Some(value)) else { continue };
                writes.push(CellWrite { x, y, color });
            }

            match hub::apply_batch(state, conn_id, writes).await {
                Ok(applied) => {
                    let mut data = Data::new();
                    data.insert("applied".into(), serde_json::json!(applied));
                    Ok(Outcome::Reply(data))
                }
                Err(e) => Err(req.error_from(&e)),
            }
        }
        _ => Err(req.error(format!("unknown grid op: {op}"))),
    }
}

/// `null` or absent clears the cell; a string paints it; anything else is
/// malformed.
fn parse_color(value: Option<&serde_json::Value>) -> Result<Option<String>, ()> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(()),
    }
}

// =============================================================================
// CHAT HANDLER
// =============================================================================

async fn handle_chat(state: &AppState, origin: IpAddr, conn_id: Uuid, req: &Frame) -> Result<Outcome, Frame> {
    let op = req.event.split_once(':').map_or("", |(_, op)| op);

    match op {
        "message" => {
            let Some(text) = req.data.get("text").and_then(|v| v.as_str()) else {
                return Err(req.error("text required"));
            };
            if let Err(e) = ChatLog::validate(text, state.config.max_chat_len) {
                return Err(req.error_from(&e));
            }
            // Chat has its own window on top of the global message window.
            if let Err(e) = state.guard.check_chat(origin) {
                warn!(%conn_id, %origin, error = %e, "ws: chat rate limited");
                return Err(req.error_from(&e));
            }

            hub::append_chat(state, conn_id, text).await;
            // The sender's copy arrives through the broadcast path with
            // the server timestamp; the done ack carries nothing.
            Ok(Outcome::Done)
        }
        _ => Err(req.error(format!("unknown chat op: {op}"))),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            // Internal fault: log, discard, keep the connection.
            warn!(error = %e, "ws: failed to serialize frame");
            return Ok(());
        }
    };
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
