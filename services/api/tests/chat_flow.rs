//! Integration tests for the chat operations and the live feeds, run
//! against the in-process document store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use api_lib::adapters::MemoryStore;
use futures::StreamExt;
use serde_json::json;

use samvaad_core::chat::{open_chat, send_message};
use samvaad_core::directory::{get_user_chats, search_user, setup_user, update_profile};
use samvaad_core::domain::{
    ChatSummary, MediaKind, MessageLog, MessagePayload, MESSAGES, USERS, USER_CHATS,
};
use samvaad_core::ports::{AuthUser, DocumentStore, PortError, WriteOp};
use samvaad_core::sync::{watch_chat_list, watch_thread};

fn auth(uid: &str) -> AuthUser {
    AuthUser {
        uid: uid.to_string(),
        email: format!("{uid}@example.com"),
        display_name: None,
        photo_url: None,
    }
}

async fn setup_pair(store: &MemoryStore) -> (String, String) {
    setup_user(store, &auth("alice")).await.unwrap();
    setup_user(store, &auth("bob")).await.unwrap();
    ("alice".to_string(), "bob".to_string())
}

async fn read_log(store: &MemoryStore, chat_id: &str) -> MessageLog {
    let doc = store.get(MESSAGES, chat_id).await.unwrap().unwrap();
    serde_json::from_value(doc).unwrap()
}

async fn summary_for(store: &MemoryStore, uid: &str, chat_id: &str) -> ChatSummary {
    get_user_chats(store, uid)
        .await
        .unwrap()
        .chat_data
        .into_iter()
        .find(|c| c.chat_id == chat_id)
        .unwrap()
}

#[tokio::test]
async fn send_appends_exactly_one_entry_from_the_sender() {
    let store = MemoryStore::new();
    let (alice, bob) = setup_pair(&store).await;
    let chat = open_chat(&store, &alice, &bob).await.unwrap();

    send_message(
        &store,
        &alice,
        &bob,
        &chat.chat_id,
        MessagePayload::Text("hello".into()),
    )
    .await
    .unwrap();

    let log = read_log(&store, &chat.chat_id).await;
    assert_eq!(log.messages.len(), 1);
    assert_eq!(log.messages[0].sender_id, alice);
    assert_eq!(log.messages[0].text.as_deref(), Some("hello"));
}

#[tokio::test]
async fn both_summaries_agree_and_only_the_recipient_is_unread() {
    let store = MemoryStore::new();
    let (alice, bob) = setup_pair(&store).await;
    let chat = open_chat(&store, &alice, &bob).await.unwrap();

    send_message(
        &store,
        &alice,
        &bob,
        &chat.chat_id,
        MessagePayload::Text("are you there?".into()),
    )
    .await
    .unwrap();

    let mine = summary_for(&store, &alice, &chat.chat_id).await;
    let theirs = summary_for(&store, &bob, &chat.chat_id).await;
    assert_eq!(mine.last_message, theirs.last_message);
    assert_eq!(mine.updated_at, theirs.updated_at);
    assert!(!mine.is_unread);
    assert!(theirs.is_unread);
}

#[tokio::test]
async fn open_chat_is_idempotent_for_the_initiator() {
    let store = MemoryStore::new();
    let (alice, bob) = setup_pair(&store).await;

    let first = open_chat(&store, &alice, &bob).await.unwrap();
    let second = open_chat(&store, &alice, &bob).await.unwrap();
    assert_eq!(first.chat_id, second.chat_id);

    // One shared log, one entry per participant.
    assert_eq!(get_user_chats(&store, &alice).await.unwrap().chat_data.len(), 1);
    assert_eq!(get_user_chats(&store, &bob).await.unwrap().chat_data.len(), 1);
}

#[tokio::test]
async fn long_text_is_truncated_in_the_summary_but_not_the_log() {
    let store = MemoryStore::new();
    let (alice, bob) = setup_pair(&store).await;
    let chat = open_chat(&store, &alice, &bob).await.unwrap();

    let text = "a".repeat(80);
    send_message(
        &store,
        &alice,
        &bob,
        &chat.chat_id,
        MessagePayload::Text(text.clone()),
    )
    .await
    .unwrap();

    let log = read_log(&store, &chat.chat_id).await;
    assert_eq!(log.messages[0].text.as_deref(), Some(text.as_str()));

    let summary = summary_for(&store, &bob, &chat.chat_id).await;
    assert_eq!(summary.last_message.chars().count(), 50);
    assert!(text.starts_with(&summary.last_message));
}

#[tokio::test]
async fn video_sends_are_stored_as_media_entries() {
    let store = MemoryStore::new();
    let (alice, bob) = setup_pair(&store).await;
    let chat = open_chat(&store, &alice, &bob).await.unwrap();

    send_message(
        &store,
        &alice,
        &bob,
        &chat.chat_id,
        MessagePayload::Media {
            url: "https://cdn.example/v.mp4".into(),
            kind: MediaKind::Video,
        },
    )
    .await
    .unwrap();

    let log = read_log(&store, &chat.chat_id).await;
    assert_eq!(log.messages[0].text, None);
    assert_eq!(log.messages[0].media_url.as_deref(), Some("https://cdn.example/v.mp4"));
    assert_eq!(log.messages[0].media_type, Some(MediaKind::Video));

    let summary = summary_for(&store, &alice, &chat.chat_id).await;
    assert_eq!(summary.last_message, "[VIDEO sent]");
}

#[tokio::test]
async fn empty_text_is_rejected_before_any_write() {
    let store = MemoryStore::new();
    let (alice, bob) = setup_pair(&store).await;
    let chat = open_chat(&store, &alice, &bob).await.unwrap();

    let err = send_message(
        &store,
        &alice,
        &bob,
        &chat.chat_id,
        MessagePayload::Text("  ".into()),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, PortError::Invalid(_)));
    assert!(read_log(&store, &chat.chat_id).await.messages.is_empty());
}

#[tokio::test]
async fn missing_documents_yield_empty_views() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());

    let mut chats = watch_chat_list(store.clone(), "ghost").await.unwrap();
    assert_eq!(chats.next().await.unwrap(), vec![]);

    let mut thread = watch_thread(store.clone(), "no-such-chat").await.unwrap();
    assert_eq!(thread.next().await.unwrap(), vec![]);
}

#[tokio::test]
async fn chat_list_is_sorted_by_recency_and_joined_with_live_profiles() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    setup_user(store.as_ref(), &auth("alice")).await.unwrap();
    setup_user(store.as_ref(), &auth("bob")).await.unwrap();
    setup_user(store.as_ref(), &auth("carol")).await.unwrap();

    let with_carol = open_chat(store.as_ref(), "alice", "carol").await.unwrap();
    let with_bob = open_chat(store.as_ref(), "alice", "bob").await.unwrap();

    send_message(
        store.as_ref(),
        "alice",
        "carol",
        &with_carol.chat_id,
        MessagePayload::Text("first".into()),
    )
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    send_message(
        store.as_ref(),
        "bob",
        "alice",
        &with_bob.chat_id,
        MessagePayload::Text("second".into()),
    )
    .await
    .unwrap();

    update_profile(store.as_ref(), "bob", "Bobby", "new bio", None)
        .await
        .unwrap();

    let mut feed = watch_chat_list(store.clone(), "alice").await.unwrap();
    let list = feed.next().await.unwrap();
    assert_eq!(list.len(), 2);
    // Most recent first, and the counterpart profile is fetched fresh.
    assert_eq!(list[0].summary.chat_id, with_bob.chat_id);
    assert_eq!(list[0].user_data.name, "Bobby");
    assert_eq!(list[1].summary.chat_id, with_carol.chat_id);
    assert!(list[0].summary.is_unread);
}

#[tokio::test]
async fn missing_counterparts_show_the_deleted_user_placeholder() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    store
        .set(
            USER_CHATS,
            "alice",
            json!({ "chatData": [{
                "chatId": "c1",
                "rId": "ghost",
                "lastMessage": "bye",
                "updatedAt": 1,
                "isUnread": false
            }] }),
        )
        .await
        .unwrap();

    let mut feed = watch_chat_list(store.clone(), "alice").await.unwrap();
    let list = feed.next().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].user_data.name, "Deleted User");
    assert_eq!(list[0].user_data.id, None);
}

#[tokio::test]
async fn thread_feed_emits_on_change_and_stops_after_teardown() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    setup_user(store.as_ref(), &auth("alice")).await.unwrap();
    setup_user(store.as_ref(), &auth("bob")).await.unwrap();
    let chat = open_chat(store.as_ref(), "alice", "bob").await.unwrap();

    let mut feed = watch_thread(store.clone(), &chat.chat_id).await.unwrap();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let consumer = tokio::spawn(async move {
        while feed.next().await.is_some() {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    // Initial snapshot, then the live update for the first send.
    send_message(
        store.as_ref(),
        "alice",
        "bob",
        &chat.chat_id,
        MessagePayload::Text("ping".into()),
    )
    .await
    .unwrap();
    tokio::time::timeout(Duration::from_secs(1), async {
        while seen.load(Ordering::SeqCst) < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("feed should deliver the initial snapshot and the update");

    // Teardown: no update may be observed afterwards.
    consumer.abort();
    let _ = consumer.await;
    let before = seen.load(Ordering::SeqCst);

    send_message(
        store.as_ref(),
        "bob",
        "alice",
        &chat.chat_id,
        MessagePayload::Text("pong".into()),
    )
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(seen.load(Ordering::SeqCst), before);

    // The log itself still gained the message.
    assert_eq!(read_log(&store, &chat.chat_id).await.messages.len(), 2);
}

#[tokio::test]
async fn failing_batch_leaves_nothing_half_applied() {
    let store = MemoryStore::new();
    store
        .set(USERS, "alice", json!({ "name": "Alice" }))
        .await
        .unwrap();

    // The first write alone would succeed; the second targets a missing
    // document, so the whole batch must be rejected.
    let result = store
        .commit(vec![
            WriteOp::Update {
                collection: USERS.to_string(),
                id: "alice".to_string(),
                fields: json!({ "name": "Changed" }),
            },
            WriteOp::Append {
                collection: USER_CHATS.to_string(),
                id: "ghost".to_string(),
                field: "chatData".to_string(),
                value: json!({}),
            },
        ])
        .await;

    assert!(matches!(result, Err(PortError::NotFound(_))));
    let doc = store.get(USERS, "alice").await.unwrap().unwrap();
    assert_eq!(doc["name"], "Alice");
}

#[tokio::test]
async fn search_matches_lowercased_usernames_and_never_the_caller() {
    let store = MemoryStore::new();
    setup_pair(&store).await;

    let hit = search_user(&store, "BOB", "alice").await.unwrap().unwrap();
    assert_eq!(hit.id, "bob");

    let own = search_user(&store, "alice", "alice").await.unwrap();
    assert!(own.is_none());

    let none = search_user(&store, "nobody", "alice").await.unwrap();
    assert!(none.is_none());
}
