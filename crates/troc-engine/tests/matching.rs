mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::{as_user, list_item};
use troc_engine::{EngineError, Marketplace, Session, ValidationReason};
use troc_shared::{ItemPair, NotificationKind, UserId};
use troc_store::Database;

#[test]
fn one_sided_like_does_not_match() {
    let db = Database::open_in_memory().unwrap();
    let (alice, bob) = (UserId::new(), UserId::new());
    list_item(&db, alice, "Camera");
    let guitar = list_item(&db, bob, "Guitar");

    let outcome = as_user(&db, alice).like(guitar.id, None).unwrap();
    assert!(!outcome.matched);
    assert!(outcome.match_info.is_none());
    assert!(outcome.conversation_id.is_none());
    assert_eq!(db.count_matches().unwrap(), 0);
    assert!(db.list_conversations_for_user(alice).unwrap().is_empty());
}

#[test]
fn reciprocal_like_matches_and_opens_conversation() {
    let db = Database::open_in_memory().unwrap();
    let (alice, bob) = (UserId::new(), UserId::new());
    let camera = list_item(&db, alice, "Camera");
    let guitar = list_item(&db, bob, "Guitar");

    assert!(!as_user(&db, alice).like(guitar.id, None).unwrap().matched);
    let outcome = as_user(&db, bob).like(camera.id, None).unwrap();

    assert!(outcome.matched);
    let info = outcome.match_info.unwrap();
    assert_eq!(info.other_user_id, alice);
    assert_eq!(info.other_user_item_id, camera.id);
    assert_eq!(info.my_item_id, guitar.id);

    let conversation_id = outcome.conversation_id.unwrap();
    let conversation = as_user(&db, alice).get_conversation(conversation_id).unwrap();
    assert_eq!(conversation.requester_id, bob);
    assert_eq!(conversation.owner_id, alice);
    assert_eq!(conversation.pair(), ItemPair::new(camera.id, guitar.id));

    let messages = as_user(&db, bob)
        .list_messages(conversation_id, 50, 0)
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender_id, bob);
    assert_eq!(
        messages[0].text,
        "Hi! I'm interested in trading my Guitar for your Camera."
    );

    for user in [alice, bob] {
        let notes = as_user(&db, user).list_notifications().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::Match);
        assert_eq!(notes[0].related_id, Some(info.match_id.0));
    }
}

#[test]
fn repeated_like_reports_same_match_without_duplicates() {
    let db = Database::open_in_memory().unwrap();
    let (alice, bob) = (UserId::new(), UserId::new());
    let camera = list_item(&db, alice, "Camera");
    let guitar = list_item(&db, bob, "Guitar");

    as_user(&db, alice).like(guitar.id, None).unwrap();
    let first = as_user(&db, bob).like(camera.id, None).unwrap();
    let second = as_user(&db, bob).like(camera.id, None).unwrap();
    let mirrored = as_user(&db, alice).like(guitar.id, None).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        mirrored.match_info.unwrap().match_id,
        first.match_info.unwrap().match_id
    );
    assert_eq!(mirrored.conversation_id, first.conversation_id);
    assert_eq!(db.count_matches().unwrap(), 1);
    assert_eq!(db.list_conversations_for_user(alice).unwrap().len(), 1);
    assert_eq!(as_user(&db, alice).list_notifications().unwrap().len(), 1);
}

#[test]
fn context_scoped_like_only_matches_that_item() {
    let db = Database::open_in_memory().unwrap();
    let (alice, bob) = (UserId::new(), UserId::new());
    let camera = list_item(&db, alice, "Camera");
    let bike = list_item(&db, alice, "Bike");
    let guitar = list_item(&db, bob, "Guitar");

    as_user(&db, bob).like(camera.id, None).unwrap();

    let scoped = as_user(&db, alice).like(guitar.id, Some(bike.id)).unwrap();
    assert!(!scoped.matched);

    let scoped = as_user(&db, alice).like(guitar.id, Some(camera.id)).unwrap();
    assert!(scoped.matched);
    assert_eq!(scoped.match_info.unwrap().my_item_id, camera.id);
}

#[test]
fn validation_failures_leave_no_trace() {
    let db = Database::open_in_memory().unwrap();
    let alice = UserId::new();
    let camera = list_item(&db, alice, "Camera");

    let err = as_user(&db, alice).like(camera.id, None).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationReason::SelfLike)
    ));
    assert!(db.list_likes_by_user(alice).unwrap().is_empty());

    let anonymous: Option<Session> = None;
    let err = Marketplace::new(&db, &anonymous)
        .like(camera.id, None)
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthenticated));
}

#[test]
fn unlike_keeps_existing_match() {
    let db = Database::open_in_memory().unwrap();
    let (alice, bob) = (UserId::new(), UserId::new());
    let camera = list_item(&db, alice, "Camera");
    let guitar = list_item(&db, bob, "Guitar");

    as_user(&db, alice).like(guitar.id, None).unwrap();
    as_user(&db, bob).like(camera.id, None).unwrap();

    assert!(as_user(&db, alice).unlike(guitar.id, None).unwrap().ok);
    assert!(as_user(&db, alice).unlike(guitar.id, None).unwrap().ok);
    assert_eq!(as_user(&db, alice).list_matches().unwrap().len(), 1);
}

#[test]
fn concurrent_reciprocal_likes_record_one_match() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("troc.db");

    let (alice, bob) = (UserId::new(), UserId::new());
    let (camera, guitar) = {
        let db = Database::open_at(&path).unwrap();
        (list_item(&db, alice, "Camera"), list_item(&db, bob, "Guitar"))
    };

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = [(alice, guitar.id), (bob, camera.id)]
        .into_iter()
        .map(|(user, item)| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let db = Database::open_at(&path).unwrap();
                barrier.wait();
                as_user(&db, user).like(item, None).unwrap()
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(outcomes.iter().any(|o| o.matched));

    let db = Database::open_at(&path).unwrap();
    assert_eq!(db.count_matches().unwrap(), 1);
    let conversations = db.list_conversations_for_user(alice).unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(
        db.list_messages_for_conversation(conversations[0].id, 50, 0)
            .unwrap()
            .len(),
        1
    );

    let matched_ids: Vec<_> = outcomes
        .iter()
        .filter_map(|o| o.conversation_id)
        .collect();
    assert!(matched_ids.iter().all(|id| *id == conversations[0].id));
}

#[test]
fn notification_failure_does_not_undo_the_match() {
    let db = Database::open_in_memory().unwrap();
    let (alice, bob) = (UserId::new(), UserId::new());
    let camera = list_item(&db, alice, "Camera");
    let guitar = list_item(&db, bob, "Guitar");
    as_user(&db, alice).like(guitar.id, None).unwrap();

    db.conn().execute_batch("DROP TABLE notifications").unwrap();

    let outcome = as_user(&db, bob).like(camera.id, None).unwrap();
    assert!(outcome.matched);
    assert_eq!(db.count_matches().unwrap(), 1);
    assert!(outcome.conversation_id.is_some());
}

#[test]
fn failed_opening_is_completed_by_the_next_like() {
    let db = Database::open_in_memory().unwrap();
    let (alice, bob) = (UserId::new(), UserId::new());
    let camera = list_item(&db, alice, "Camera");
    let guitar = list_item(&db, bob, "Guitar");
    as_user(&db, alice).like(guitar.id, None).unwrap();

    db.conn()
        .execute_batch(
            "CREATE TRIGGER messages_offline BEFORE INSERT ON messages
             BEGIN SELECT RAISE(ABORT, 'messages offline'); END;",
        )
        .unwrap();
    assert!(matches!(
        as_user(&db, bob).like(camera.id, None),
        Err(EngineError::Store(_))
    ));
    assert_eq!(db.count_matches().unwrap(), 1);
    assert!(db.list_conversations_for_user(bob).unwrap().is_empty());

    db.conn()
        .execute_batch("DROP TRIGGER messages_offline")
        .unwrap();
    let retried = as_user(&db, bob).like(camera.id, None).unwrap();
    assert!(retried.matched);
    let conversation_id = retried.conversation_id.unwrap();

    let messages = as_user(&db, bob)
        .list_messages(conversation_id, 50, 0)
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender_id, bob);
    assert_eq!(db.count_matches().unwrap(), 1);
    assert_eq!(db.list_conversations_for_user(alice).unwrap().len(), 1);
    assert_eq!(as_user(&db, alice).list_notifications().unwrap().len(), 1);
}
