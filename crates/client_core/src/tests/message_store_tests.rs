use super::*;
use chrono::Utc;
use shared::domain::UserId;

fn grant() -> AccessGrant {
    AccessGrant::new(
        "owner1".into(),
        [UserId::from("guest1"), UserId::from("guest3")],
    )
}

fn message(sender: &str, text: &str) -> Message {
    Message {
        text: text.to_string(),
        room: "abc".into(),
        sender: sender.into(),
        timestamp: Utc::now(),
        image: None,
    }
}

#[test]
fn accepts_owner_and_listed_guests_only() {
    let mut store = MessageStore::new();
    assert!(store.accept(message("owner1", "from owner"), &grant()));
    assert!(store.accept(message("guest1", "from guest"), &grant()));
    assert!(!store.accept(message("guest2", "intruder"), &grant()));
    assert_eq!(store.len(), 2);
}

#[test]
fn preserves_arrival_order() {
    let mut store = MessageStore::new();
    for text in ["one", "two", "three"] {
        store.accept(message("guest1", text), &grant());
    }
    let texts: Vec<&str> = store.messages().iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, ["one", "two", "three"]);
}

#[test]
fn does_not_deduplicate() {
    let mut store = MessageStore::new();
    let msg = message("guest1", "again");
    store.accept(msg.clone(), &grant());
    store.accept(msg, &grant());
    assert_eq!(store.len(), 2);
}

#[test]
fn clear_empties_the_log() {
    let mut store = MessageStore::new();
    store.accept(message("guest1", "gone soon"), &grant());
    assert!(!store.is_empty());
    store.clear();
    assert!(store.is_empty());
}
