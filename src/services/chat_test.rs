use super::*;

#[test]
fn append_and_snapshot_chronological() {
    let mut log = ChatLog::new(5);
    log.append_at("alice", "first", 1);
    log.append_at("bob", "second", 2);

    let history = log.snapshot();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].name, "alice");
    assert_eq!(history[0].text, "first");
    assert_eq!(history[1].name, "bob");
    assert_eq!(history[1].ts, 2);
}

#[test]
fn append_returns_the_stored_entry() {
    let mut log = ChatLog::new(5);
    let entry = log.append_at("alice", "hello", 42);
    assert_eq!(log.snapshot().last(), Some(&entry));
}

#[test]
fn append_stamps_server_time() {
    let mut log = ChatLog::new(5);
    let before = now_ms();
    let entry = log.append("alice", "hello");
    let after = now_ms();
    assert!(entry.ts >= before && entry.ts <= after);
}

#[test]
fn capacity_evicts_oldest_first() {
    let mut log = ChatLog::new(3);
    for i in 0..5 {
        log.append_at("alice", format!("msg {i}"), i);
    }

    let history = log.snapshot();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].text, "msg 2");
    assert_eq!(history[2].text, "msg 4");
}

#[test]
fn validate_accepts_up_to_max() {
    assert!(ChatLog::validate("hello", 5).is_ok());
    assert!(ChatLog::validate("", 5).is_ok());
}

#[test]
fn validate_rejects_over_max() {
    let err = ChatLog::validate("hello!", 5).expect_err("over limit");
    assert!(matches!(err, ChatError::TooLong { max: 5, len: 6 }));
}

#[test]
fn validate_counts_characters_not_bytes() {
    // Five characters, more than five bytes.
    assert!(ChatLog::validate("héllö", 5).is_ok());
}

#[test]
fn entry_serde_round_trip() {
    let entry = ChatEntry { name: "alice".into(), text: "hi".into(), ts: 7 };
    let json = serde_json::to_string(&entry).expect("serialize");
    let restored: ChatEntry = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(restored, entry);
}

#[test]
fn empty_log_reports_empty() {
    let log = ChatLog::new(3);
    assert!(log.is_empty());
    assert_eq!(log.len(), 0);
    assert!(log.snapshot().is_empty());
}
