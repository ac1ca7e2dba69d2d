//! Server configuration — documented constants with env overrides.
//!
//! DESIGN
//! ======
//! Every limit the abuse-control layer enforces lives here as a named
//! default, overridable through an environment variable of the same
//! intent. Invalid or missing values fall back to the default; grid
//! dimensions are additionally range-checked so a typo cannot allocate
//! an absurd dense array.

use std::time::Duration;

/// Grid width in cells.
pub const DEFAULT_GRID_WIDTH: usize = 500;
/// Grid height in cells.
pub const DEFAULT_GRID_HEIGHT: usize = 500;
/// Upper bound accepted for either grid axis.
const MAX_GRID_AXIS: usize = 10_000;

/// Maximum simultaneous connections from one origin (IP).
pub const DEFAULT_MAX_CONN_PER_ORIGIN: usize = 5;

/// Inbound messages allowed per origin per window, all event kinds.
pub const DEFAULT_MSG_RATE_LIMIT: usize = 60;
pub const DEFAULT_MSG_RATE_WINDOW_MS: u64 = 10_000;

/// Chat messages allowed per origin per window. Independent of the
/// global message window.
pub const DEFAULT_CHAT_RATE_LIMIT: usize = 5;
pub const DEFAULT_CHAT_RATE_WINDOW_MS: u64 = 10_000;

/// Maximum chat message length in characters. Longer messages are
/// rejected outright, never truncated.
pub const DEFAULT_MAX_CHAT_LEN: usize = 500;

/// Maximum cell pairs accepted in one `grid:batch` frame.
pub const DEFAULT_MAX_BATCH_CELLS: usize = 256;

/// Chat history entries retained for replay to new joiners.
pub const DEFAULT_CHAT_HISTORY_CAP: usize = 100;

/// Listen port.
pub const DEFAULT_PORT: u16 = 3000;

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub grid_width: usize,
    pub grid_height: usize,
    pub max_conn_per_origin: usize,
    pub msg_rate_limit: usize,
    pub msg_rate_window: Duration,
    pub chat_rate_limit: usize,
    pub chat_rate_window: Duration,
    pub max_chat_len: usize,
    pub max_batch_cells: usize,
    pub chat_history_cap: usize,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            grid_width: grid_axis(env_parse("GRID_WIDTH", DEFAULT_GRID_WIDTH), DEFAULT_GRID_WIDTH),
            grid_height: grid_axis(env_parse("GRID_HEIGHT", DEFAULT_GRID_HEIGHT), DEFAULT_GRID_HEIGHT),
            max_conn_per_origin: env_parse("MAX_CONN_PER_ORIGIN", DEFAULT_MAX_CONN_PER_ORIGIN),
            msg_rate_limit: env_parse("MSG_RATE_LIMIT", DEFAULT_MSG_RATE_LIMIT),
            msg_rate_window: Duration::from_millis(env_parse("MSG_RATE_WINDOW_MS", DEFAULT_MSG_RATE_WINDOW_MS)),
            chat_rate_limit: env_parse("CHAT_RATE_LIMIT", DEFAULT_CHAT_RATE_LIMIT),
            chat_rate_window: Duration::from_millis(env_parse("CHAT_RATE_WINDOW_MS", DEFAULT_CHAT_RATE_WINDOW_MS)),
            max_chat_len: env_parse("MAX_CHAT_LEN", DEFAULT_MAX_CHAT_LEN),
            max_batch_cells: env_parse("MAX_BATCH_CELLS", DEFAULT_MAX_BATCH_CELLS),
            chat_history_cap: env_parse("CHAT_HISTORY_CAP", DEFAULT_CHAT_HISTORY_CAP),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid_width: DEFAULT_GRID_WIDTH,
            grid_height: DEFAULT_GRID_HEIGHT,
            max_conn_per_origin: DEFAULT_MAX_CONN_PER_ORIGIN,
            msg_rate_limit: DEFAULT_MSG_RATE_LIMIT,
            msg_rate_window: Duration::from_millis(DEFAULT_MSG_RATE_WINDOW_MS),
            chat_rate_limit: DEFAULT_CHAT_RATE_LIMIT,
            chat_rate_window: Duration::from_millis(DEFAULT_CHAT_RATE_WINDOW_MS),
            max_chat_len: DEFAULT_MAX_CHAT_LEN,
            max_batch_cells: DEFAULT_MAX_BATCH_CELLS,
            chat_history_cap: DEFAULT_CHAT_HISTORY_CAP,
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

pub fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn grid_axis(value: usize, default: usize) -> usize {
    if (1..=MAX_GRID_AXIS).contains(&value) {
        value
    } else {
        default
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.grid_width, DEFAULT_GRID_WIDTH);
        assert_eq!(cfg.grid_height, DEFAULT_GRID_HEIGHT);
        assert_eq!(cfg.max_conn_per_origin, DEFAULT_MAX_CONN_PER_ORIGIN);
        assert!(cfg.chat_rate_limit <= cfg.msg_rate_limit);
    }

    #[test]
    fn grid_axis_rejects_zero_and_huge() {
        assert_eq!(grid_axis(0, DEFAULT_GRID_WIDTH), DEFAULT_GRID_WIDTH);
        assert_eq!(grid_axis(1_000_000, DEFAULT_GRID_WIDTH), DEFAULT_GRID_WIDTH);
        assert_eq!(grid_axis(100, DEFAULT_GRID_WIDTH), 100);
    }
}
