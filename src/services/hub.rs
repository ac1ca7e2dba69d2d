//! Broadcast Router — apply a mutation and fan it out, atomically.
//!
//! DESIGN
//! ======
//! Every entry point takes the hub write lock once and performs both the
//! store mutation and the recipient delivery under it. Two accepted
//! mutations can therefore never interleave: observers receive deltas in
//! exactly the order the stores applied them.
//!
//! RECIPIENT RULE (held invariant per event kind)
//! ==============================================
//! - `grid:update` / `grid:batch`: every live connection EXCEPT the
//!   sender. Clients render their own edits locally; echoing them back
//!   would double-render.
//! - `chat:message` and `session:users`: every live connection INCLUDING
//!   the sender. The sender's own chat entry must carry the server
//!   timestamp, so it comes back through the broadcast path.
//!
//! Delivery uses `try_send` only. A slow or dead recipient loses the
//! frame; its disconnect is observed by the transport independently and
//! never stalls anyone else.

use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::frame::{Data, Frame};
use crate::grid::{CellWrite, GridError, cell_key};
use crate::services::chat::ChatEntry;
use crate::services::session;
use crate::state::{AppState, Hub};

// =============================================================================
// JOIN / PART
// =============================================================================

/// Register a connection and queue its bootstrap: the full grid snapshot
/// plus chat history, followed by the current roster (broadcast to all).
pub async fn join(state: &AppState, conn_id: Uuid, tx: tokio::sync::mpsc::Sender<Frame>) {
    let mut hub = state.hub.write().await;
    hub.register(conn_id, tx);

    let snapshot = snapshot_frame(&hub);
    if let Some(client) = hub.clients.get(&conn_id) {
        let _ = client.tx.try_send(snapshot);
    }
    session::broadcast_roster(&hub);

    info!(%conn_id, clients = hub.clients.len(), "client joined");
}

/// Remove a connection and broadcast the updated roster to the remaining
/// clients. Safe to call more than once — removal of an absent id is a
/// no-op with no broadcast.
pub async fn part(state: &AppState, conn_id: Uuid) {
    let mut hub = state.hub.write().await;
    if hub.clients.remove(&conn_id).is_none() {
        return;
    }
    session::broadcast_roster(&hub);
    info!(%conn_id, clients = hub.clients.len(), "client left");
}

// =============================================================================
// GRID
// =============================================================================

/// Apply one cell write and fan it out to everyone but the sender.
/// Returns whether the write was in range; out-of-range writes are
/// dropped silently and nothing is broadcast.
pub async fn apply_cell_update(state: &AppState, sender: Uuid, write: CellWrite) -> bool {
    let mut hub = state.hub.write().await;
    if !hub.grid.set(write.x, write.y, write.color.clone()) {
        debug!(%sender, x = write.x, y = write.y, "dropped out-of-range cell update");
        return false;
    }

    let mut data = Data::new();
    data.insert("x".into(), json!(write.x));
    data.insert("y".into(), json!(write.y));
    data.insert("color".into(), json!(write.color));
    let frame = Frame::request("grid:update", data).with_from(sender.to_string());
    fan_out(&hub, &frame, Some(sender));
    true
}

/// Apply a batch of cell writes and fan out the applied subset to
/// everyone but the sender. An oversize batch is rejected in its entirety
/// with zero cells applied.
pub async fn apply_batch(state: &AppState, sender: Uuid, writes: Vec<CellWrite>) -> Result<usize, GridError> {
    let max_cells = state.config.max_batch_cells;
    let mut hub = state.hub.write().await;
    let applied = hub.grid.apply_batch(writes, max_cells)?;
    if applied.is_empty() {
        return Ok(0);
    }

    let mut cells = serde_json::Map::new();
    for write in &applied {
        cells.insert(cell_key(write.x, write.y), json!(write.color));
    }
    let mut data = Data::new();
    data.insert("cells".into(), serde_json::Value::Object(cells));
    let frame = Frame::request("grid:batch", data).with_from(sender.to_string());
    fan_out(&hub, &frame, Some(sender));
    Ok(applied.len())
}

// =============================================================================
// CHAT
// =============================================================================

/// Append a chat message under the sender's registered display name and
/// fan it out to every connection, sender included. The broadcast payload
/// is exactly the stored entry.
pub async fn append_chat(state: &AppState, sender: Uuid, text: &str) -> ChatEntry {
    let mut hub = state.hub.write().await;
    let name = hub
        .clients
        .get(&sender)
        .and_then(|c| c.name.clone())
        .unwrap_or_else(|| "anonymous".into());
    let entry = hub.chat.append(name, text);

    let mut data = Data::new();
    data.insert("name".into(), json!(entry.name));
    data.insert("text".into(), json!(entry.text));
    data.insert("ts".into(), json!(entry.ts));
    let frame = Frame::request("chat:message", data).with_from(sender.to_string());
    fan_out(&hub, &frame, None);
    entry
}

// =============================================================================
// FAN-OUT
// =============================================================================

/// Push a frame to every live connection, optionally excluding one.
/// Best-effort: a full or closed channel is skipped, never awaited.
pub(crate) fn fan_out(hub: &Hub, frame: &Frame, exclude: Option<Uuid>) {
    for (conn_id, client) in &hub.clients {
        if exclude == Some(*conn_id) {
            continue;
        }
        let _ = client.tx.try_send(frame.clone());
    }
}

/// Build the join-time bootstrap frame: sparse cell map + chat history.
fn snapshot_frame(hub: &Hub) -> Frame {
    let mut cells = serde_json::Map::new();
    for write in hub.grid.snapshot() {
        cells.insert(cell_key(write.x, write.y), json!(write.color));
    }
    let mut data = Data::new();
    data.insert("cells".into(), serde_json::Value::Object(cells));
    data.insert("history".into(), json!(hub.chat.snapshot()));
    Frame::request("grid:snapshot", data)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;
