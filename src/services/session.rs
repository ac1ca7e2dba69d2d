//! Session Registry — display names and the roster broadcast.
//!
//! DESIGN
//! ======
//! Names live on the hub's `ConnectedClient` records, so the registry
//! shares the hub's lifecycle and lock. The roster is the ordered list of
//! currently set display names, join order preserved. Duplicate names are
//! tolerated — the roster is for human observers, not identity.

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::frame::{Data, Frame};
use crate::services::hub::fan_out;
use crate::state::{AppState, Hub};

/// Store or overwrite a connection's display name, then broadcast the
/// roster to every connection, the setter included.
pub async fn set_name(state: &AppState, conn_id: Uuid, name: &str) {
    let mut hub = state.hub.write().await;
    let Some(client) = hub.clients.get_mut(&conn_id) else {
        return;
    };
    client.name = Some(name.to_owned());
    info!(%conn_id, name, "display name set");
    broadcast_roster(&hub);
}

/// Ordered list of set display names, by join sequence.
#[must_use]
pub fn roster(hub: &Hub) -> Vec<String> {
    let mut named: Vec<(u64, &str)> = hub
        .clients
        .values()
        .filter_map(|c| Some((c.seq, c.name.as_deref()?)))
        .collect();
    named.sort_unstable_by_key(|(seq, _)| *seq);
    named.into_iter().map(|(_, name)| name.to_owned()).collect()
}

/// Push the current roster to every connection. Called under the hub
/// write lock on any join, leave, or name-set.
pub(crate) fn broadcast_roster(hub: &Hub) {
    let mut data = Data::new();
    data.insert("users".into(), json!(roster(hub)));
    let frame = Frame::request("session:users", data);
    fan_out(hub, &frame, None);
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
