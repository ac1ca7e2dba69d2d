//! Rate / Connection Guard — per-origin abuse accounting.
//!
//! DESIGN
//! ======
//! Fixed-window counters backed by `HashMap<IpAddr, OriginRecord>`.
//! Three limits enforced:
//! - Connections: at most `max_conn_per_origin` live sockets per IP
//! - Messages: `msg_rate_limit` inbound frames per window, all kinds
//! - Chat: an independent, tighter window for chat messages
//!
//! A record is created on an origin's first connect and deleted when its
//! last connection closes, so the map never grows past the set of origins
//! currently connected. Window reset happens strictly when elapsed time
//! exceeds the window, not merely equals it, so a burst exactly at the
//! boundary is not double-counted.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::frame::ErrorCode;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("connection limit reached (max {limit} per origin)")]
    ConnectionLimit { limit: usize },
    #[error("message rate limit exceeded (max {limit} messages/{window_ms}ms)")]
    RateLimited { limit: usize, window_ms: u64 },
    #[error("chat rate limit exceeded (max {limit} messages/{window_ms}ms)")]
    ChatRateLimited { limit: usize, window_ms: u64 },
}

impl ErrorCode for GuardError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConnectionLimit { .. } => "E_CONN_LIMIT",
            Self::RateLimited { .. } => "E_RATE_LIMIT",
            Self::ChatRateLimited { .. } => "E_CHAT_RATE_LIMIT",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::ChatRateLimited { .. })
    }
}

// =============================================================================
// GUARD
// =============================================================================

#[derive(Clone, Copy)]
struct GuardConfig {
    max_conn_per_origin: usize,
    msg_rate_limit: usize,
    msg_rate_window: Duration,
    chat_rate_limit: usize,
    chat_rate_window: Duration,
}

struct OriginRecord {
    connections: usize,
    window_start: Instant,
    message_count: usize,
    chat_window_start: Instant,
    chat_count: usize,
}

impl OriginRecord {
    fn new(now: Instant) -> Self {
        Self {
            connections: 0,
            window_start: now,
            message_count: 0,
            chat_window_start: now,
            chat_count: 0,
        }
    }
}

#[derive(Clone)]
pub struct Guard {
    inner: Arc<Mutex<HashMap<IpAddr, OriginRecord>>>,
    config: GuardConfig,
}

impl Guard {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            config: GuardConfig {
                max_conn_per_origin: config.max_conn_per_origin,
                msg_rate_limit: config.msg_rate_limit,
                msg_rate_window: config.msg_rate_window,
                chat_rate_limit: config.chat_rate_limit,
                chat_rate_window: config.chat_rate_window,
            },
        }
    }

    /// Account a new connection. Rejects without incrementing when the
    /// origin is at its cap.
    pub fn on_connect(&self, origin: IpAddr) -> Result<(), GuardError> {
        self.on_connect_at(origin, Instant::now())
    }

    fn on_connect_at(&self, origin: IpAddr, now: Instant) -> Result<(), GuardError> {
        let mut inner = self.lock();
        let record = inner.entry(origin).or_insert_with(|| OriginRecord::new(now));
        if record.connections >= self.config.max_conn_per_origin {
            return Err(GuardError::ConnectionLimit { limit: self.config.max_conn_per_origin });
        }
        record.connections += 1;
        Ok(())
    }

    /// Account one inbound message against the origin's window.
    /// On rejection the message must not be applied to shared state.
    pub fn check_message(&self, origin: IpAddr) -> Result<(), GuardError> {
        self.check_message_at(origin, Instant::now())
    }

    fn check_message_at(&self, origin: IpAddr, now: Instant) -> Result<(), GuardError> {
        let cfg = self.config;
        let mut inner = self.lock();
        let record = inner.entry(origin).or_insert_with(|| OriginRecord::new(now));
        if now.duration_since(record.window_start) > cfg.msg_rate_window {
            record.window_start = now;
            record.message_count = 0;
        }
        record.message_count += 1;
        if record.message_count > cfg.msg_rate_limit {
            return Err(GuardError::RateLimited {
                limit: cfg.msg_rate_limit,
                window_ms: u64::try_from(cfg.msg_rate_window.as_millis()).unwrap_or(u64::MAX),
            });
        }
        Ok(())
    }

    /// Account one chat message against the origin's chat window. This is
    /// in addition to `check_message`, with its own limit and interval.
    pub fn check_chat(&self, origin: IpAddr) -> Result<(), GuardError> {
        self.check_chat_at(origin, Instant::now())
    }

    fn check_chat_at(&self, origin: IpAddr, now: Instant) -> Result<(), GuardError> {
        let cfg = self.config;
        let mut inner = self.lock();
        let record = inner.entry(origin).or_insert_with(|| OriginRecord::new(now));
        if now.duration_since(record.chat_window_start) > cfg.chat_rate_window {
            record.chat_window_start = now;
            record.chat_count = 0;
        }
        record.chat_count += 1;
        if record.chat_count > cfg.chat_rate_limit {
            return Err(GuardError::ChatRateLimited {
                limit: cfg.chat_rate_limit,
                window_ms: u64::try_from(cfg.chat_rate_window.as_millis()).unwrap_or(u64::MAX),
            });
        }
        Ok(())
    }

    /// Account a closed connection. The origin's record is deleted when
    /// its last connection closes, so counters do not leak across
    /// reconnects.
    pub fn on_disconnect(&self, origin: IpAddr) {
        let mut inner = self.lock();
        let Some(record) = inner.get_mut(&origin) else {
            return;
        };
        record.connections = record.connections.saturating_sub(1);
        if record.connections == 0 {
            inner.remove(&origin);
        }
    }

    /// Live connection count for an origin. Zero when no record exists.
    #[must_use]
    pub fn connections(&self, origin: IpAddr) -> usize {
        self.lock().get(&origin).map_or(0, |r| r.connections)
    }

    /// Whether the origin currently has a record at all.
    #[must_use]
    pub fn has_record(&self, origin: IpAddr) -> bool {
        self.lock().contains_key(&origin)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<IpAddr, OriginRecord>> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
