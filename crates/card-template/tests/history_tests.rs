use card_template::*;
use std::time::{Duration, Instant};

fn side_with(count: usize) -> Side {
    let mut side = Side::default();
    for i in 0..count {
        side.add(DesignObject::new(
            format!("obj-{}", i),
            ObjectKind::Shape(ShapeProps::default()),
            Transform::default(),
        ))
        .unwrap();
    }
    side
}

fn snapshot(count: usize) -> Snapshot {
    side_with(count).snapshot().unwrap()
}

#[test]
fn test_undo_then_redo_restores_snapshot() {
    let mut history = History::new(snapshot(0));
    let mut now = Instant::now();
    for n in 1..=7 {
        history.record(snapshot(n), now);
        now += Duration::from_millis(400);
        history.tick(now);
    }

    let before = history.current().clone();
    history.undo().unwrap();
    history.end_replay();
    let after = history.redo().unwrap();
    history.end_replay();

    assert_eq!(after, before);
    assert_eq!(history.current(), &before);
}

#[test]
fn test_history_is_bounded_fifo() {
    let mut history = History::new(snapshot(0));
    let mut now = Instant::now();
    for n in 1..=75 {
        history.record(snapshot(n), now);
        now += Duration::from_millis(301);
        assert!(history.tick(now));
        assert!(history.len() <= 50);
    }

    assert_eq!(history.len(), 50);
    assert_eq!(history.index(), 49);
    // Entries 0..=25 were evicted oldest first
    let oldest = history.entries().next().unwrap();
    assert_eq!(oldest, &snapshot(26));
    assert_eq!(history.current(), &snapshot(75));
}

#[test]
fn test_replayed_snapshot_is_normalized() {
    let stored = r#"{"objects":[{"id":"a","type":"shape","locks":{"movementX":"true","movementY":"true"},"selectable":true,"evented":true}]}"#;
    let side = Side::from_snapshot(&Snapshot::new(stored)).unwrap();
    let object = &side.objects[0];
    assert!(object.is_locked());
    assert!(object.locks.rotation);
    assert!(!object.selectable);
    assert!(!object.evented);
}

#[test]
fn test_session_undo_leaves_state_when_exhausted() {
    let mut session = EditorSession::new(Template::new(85.6, 54.0)).unwrap();
    let now = Instant::now();
    let id = session
        .add_object(
            DesignObject::new("a", ObjectKind::Shape(ShapeProps::default()), Transform::default()),
            now,
        )
        .unwrap();
    session.tick(now + Duration::from_secs(1));

    assert!(session.undo());
    assert!(!session.undo());
    assert!(session.side().is_empty());
    assert!(session.redo());
    assert!(!session.redo());
    assert!(session.side().contains(&id));
}
