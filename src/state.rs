//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! All shared mutable stores — the grid, the connected-client map, the
//! chat log — live together inside `Hub` behind one `RwLock`. Every
//! accepted mutation takes the write lock, applies, and fans out before
//! releasing it, so mutations are atomic relative to each other and to
//! join-time snapshots. The guard keeps its own `Mutex` because it is
//! consulted before a connection ever reaches the hub.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::config::Config;
use crate::frame::Frame;
use crate::grid::Grid;
use crate::guard::Guard;
use crate::services::chat::ChatLog;

/// Outbound queue depth per connection. A client that falls this far
/// behind starts losing frames rather than stalling the server.
pub const CLIENT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// CONNECTED CLIENT
// =============================================================================

/// One live connection as the hub sees it.
pub struct ConnectedClient {
    /// Display name, unset until the client announces one.
    pub name: Option<String>,
    /// Join order, used to keep the roster stable.
    pub seq: u64,
    /// Sender for outgoing frames. Pushed with `try_send` only.
    pub tx: mpsc::Sender<Frame>,
}

// =============================================================================
// HUB
// =============================================================================

/// The single serialization point for all shared state.
pub struct Hub {
    pub grid: Grid,
    pub chat: ChatLog,
    pub clients: HashMap<Uuid, ConnectedClient>,
    next_seq: u64,
}

impl Hub {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            grid: Grid::new(config.grid_width, config.grid_height),
            chat: ChatLog::new(config.chat_history_cap),
            clients: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Register a connection. Idempotent per `conn_id` is not needed —
    /// ids are generated fresh per socket.
    pub fn register(&mut self, conn_id: Uuid, tx: mpsc::Sender<Frame>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.clients.insert(conn_id, ConnectedClient { name: None, seq, tx });
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State
/// extractor. Clone is required by Axum — all inner fields are Arc-wrapped
/// or Copy.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub hub: Arc<RwLock<Hub>>,
    pub guard: Guard,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            hub: Arc::new(RwLock::new(Hub::new(&config))),
            guard: Guard::new(&config),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
