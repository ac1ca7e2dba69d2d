use super::*;

use crate::config::Config;

fn test_guard() -> Guard {
    Guard::new(&Config {
        max_conn_per_origin: 5,
        msg_rate_limit: 10,
        msg_rate_window: Duration::from_millis(10_000),
        chat_rate_limit: 3,
        chat_rate_window: Duration::from_millis(5_000),
        ..Config::default()
    })
}

fn origin_a() -> IpAddr {
    "10.0.0.1".parse().expect("valid ip")
}

fn origin_b() -> IpAddr {
    "10.0.0.2".parse().expect("valid ip")
}

// --- connections ---

#[test]
fn sixth_connection_from_same_origin_refused() {
    let guard = test_guard();
    for i in 0..5 {
        assert!(guard.on_connect(origin_a()).is_ok(), "connection {i} should be accepted");
    }
    assert!(matches!(
        guard.on_connect(origin_a()),
        Err(GuardError::ConnectionLimit { limit: 5 })
    ));
    // The refused attempt does not disturb the accepted five.
    assert_eq!(guard.connections(origin_a()), 5);
}

#[test]
fn distinct_origins_have_independent_caps() {
    let guard = test_guard();
    for _ in 0..5 {
        guard.on_connect(origin_a()).expect("within cap");
    }
    assert!(guard.on_connect(origin_b()).is_ok());
}

#[test]
fn disconnect_frees_a_slot() {
    let guard = test_guard();
    for _ in 0..5 {
        guard.on_connect(origin_a()).expect("within cap");
    }
    guard.on_disconnect(origin_a());
    assert!(guard.on_connect(origin_a()).is_ok());
}

#[test]
fn record_deleted_when_last_connection_closes() {
    let guard = test_guard();
    guard.on_connect(origin_a()).expect("accepted");
    guard.on_connect(origin_a()).expect("accepted");

    guard.on_disconnect(origin_a());
    assert!(guard.has_record(origin_a()));

    guard.on_disconnect(origin_a());
    assert!(!guard.has_record(origin_a()));

    // Reconnecting starts the counters from zero.
    guard.on_connect(origin_a()).expect("fresh record");
    assert_eq!(guard.connections(origin_a()), 1);
}

#[test]
fn disconnect_of_unknown_origin_is_a_noop() {
    let guard = test_guard();
    guard.on_disconnect(origin_a());
    assert!(!guard.has_record(origin_a()));
}

// --- message window ---

#[test]
fn messages_allowed_up_to_limit() {
    let guard = test_guard();
    let now = Instant::now();
    for i in 0..10 {
        assert!(guard.check_message_at(origin_a(), now).is_ok(), "message {i} should pass");
    }
    assert!(matches!(
        guard.check_message_at(origin_a(), now),
        Err(GuardError::RateLimited { limit: 10, .. })
    ));
}

#[test]
fn window_resets_strictly_after_elapse() {
    let guard = test_guard();
    let start = Instant::now();
    for _ in 0..10 {
        guard.check_message_at(origin_a(), start).expect("within limit");
    }

    // Exactly at the boundary the window has NOT reset yet.
    let at_boundary = start + Duration::from_millis(10_000);
    assert!(guard.check_message_at(origin_a(), at_boundary).is_err());

    // Strictly past it, counting starts over.
    let past_boundary = start + Duration::from_millis(10_001);
    assert!(guard.check_message_at(origin_a(), past_boundary).is_ok());
}

#[test]
fn origins_do_not_share_message_windows() {
    let guard = test_guard();
    let now = Instant::now();
    for _ in 0..10 {
        guard.check_message_at(origin_a(), now).expect("within limit");
    }
    assert!(guard.check_message_at(origin_a(), now).is_err());
    assert!(guard.check_message_at(origin_b(), now).is_ok());
}

// --- chat window ---

#[test]
fn chat_window_is_independent_of_message_window() {
    let guard = test_guard();
    let now = Instant::now();

    // Exhaust the chat window without touching the message window.
    for _ in 0..3 {
        guard.check_chat_at(origin_a(), now).expect("within chat limit");
    }
    assert!(matches!(
        guard.check_chat_at(origin_a(), now),
        Err(GuardError::ChatRateLimited { limit: 3, .. })
    ));

    // The global message window is untouched.
    assert!(guard.check_message_at(origin_a(), now).is_ok());
}

#[test]
fn chat_limit_rejects_n_plus_one() {
    let guard = test_guard();
    let now = Instant::now();
    let mut accepted = 0;
    let mut rejected = 0;
    for _ in 0..4 {
        match guard.check_chat_at(origin_a(), now) {
            Ok(()) => accepted += 1,
            Err(_) => rejected += 1,
        }
    }
    assert_eq!(accepted, 3);
    assert_eq!(rejected, 1);
}

#[test]
fn chat_window_resets_after_interval() {
    let guard = test_guard();
    let start = Instant::now();
    for _ in 0..3 {
        guard.check_chat_at(origin_a(), start).expect("within limit");
    }
    assert!(guard.check_chat_at(origin_a(), start).is_err());

    let later = start + Duration::from_millis(5_001);
    assert!(guard.check_chat_at(origin_a(), later).is_ok());
}

// --- error taxonomy ---

#[test]
fn rate_errors_are_retryable_conn_limit_is_not() {
    use crate::frame::ErrorCode;

    let conn = GuardError::ConnectionLimit { limit: 5 };
    let rate = GuardError::RateLimited { limit: 10, window_ms: 10_000 };
    let chat = GuardError::ChatRateLimited { limit: 3, window_ms: 5_000 };

    assert_eq!(conn.error_code(), "E_CONN_LIMIT");
    assert!(!conn.retryable());
    assert_eq!(rate.error_code(), "E_RATE_LIMIT");
    assert!(rate.retryable());
    assert_eq!(chat.error_code(), "E_CHAT_RATE_LIMIT");
    assert!(chat.retryable());
}
