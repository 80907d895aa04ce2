//! crates/samvaad_core/src/chat.rs
//!
//! Chat-side operations of the backend access layer: opening a chat
//! between two users and appending messages to a shared log while keeping
//! both participants' denormalized summary entries current.

use serde_json::json;

use crate::directory::get_user_chats;
use crate::domain::{
    now_millis, ChatSummary, Message, MessagePayload, MESSAGES, USER_CHATS,
};
use crate::ports::{DocumentStore, PortError, PortResult, WriteOp};
use uuid::Uuid;

/// How much of a text message survives into the summary's `lastMessage`.
const LAST_MESSAGE_CHARS: usize = 50;

/// Opens a chat from `current_uid` to `target_uid`.
///
/// Idempotent from the initiator's perspective: if their summary list
/// already references the counterpart, that entry is returned unchanged.
/// Otherwise a fresh empty message log is created and a summary entry is
/// appended to both participants' lists in one batch. Simultaneous
/// initiation from both sides can still race into two logs for the same
/// pair; that hazard is unguarded.
pub async fn open_chat(
    store: &dyn DocumentStore,
    current_uid: &str,
    target_uid: &str,
) -> PortResult<ChatSummary> {
    let existing = get_user_chats(store, current_uid).await?;
    if let Some(entry) = existing.chat_data.into_iter().find(|c| c.r_id == target_uid) {
        return Ok(entry);
    }

    let chat_id = Uuid::new_v4().simple().to_string();
    let now = now_millis();
    store
        .set(
            MESSAGES,
            &chat_id,
            json!({ "createdAt": now, "messages": [] }),
        )
        .await?;

    let entry_for = |counterpart: &str| ChatSummary {
        chat_id: chat_id.clone(),
        r_id: counterpart.to_string(),
        last_message: String::new(),
        updated_at: now,
        is_unread: false,
    };
    let mine = entry_for(target_uid);
    let theirs = entry_for(current_uid);

    store
        .commit(vec![
            append_summary(current_uid, &mine)?,
            append_summary(target_uid, &theirs)?,
        ])
        .await?;

    Ok(mine)
}

/// Appends one message to the shared log, then updates both participants'
/// summary entries in one batched commit: same `lastMessage` and
/// `updatedAt` on both copies, `isUnread` only on the recipient's.
///
/// The log append and the summary commit are two independent writes; a
/// failure in between leaves the message visible with a stale summary.
/// That inconsistency is accepted and never retried.
pub async fn send_message(
    store: &dyn DocumentStore,
    sender_uid: &str,
    recipient_uid: &str,
    chat_id: &str,
    payload: MessagePayload,
) -> PortResult<()> {
    let timestamp = now_millis();
    let message = build_message(sender_uid, &payload, timestamp)?;

    let value = serde_json::to_value(&message)
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
    store.append(MESSAGES, chat_id, "messages", value).await?;

    let last_message = summary_text(&payload);
    let mut writes = Vec::with_capacity(2);
    for uid in [sender_uid, recipient_uid] {
        let mut chats = get_user_chats(store, uid).await?;
        let Some(entry) = chats.chat_data.iter_mut().find(|c| c.chat_id == chat_id) else {
            // A participant without a summary entry is skipped, matching
            // the source; their copy stays stale.
            continue;
        };
        entry.last_message = last_message.clone();
        entry.updated_at = timestamp;
        entry.is_unread = uid != sender_uid;

        writes.push(WriteOp::Update {
            collection: USER_CHATS.to_string(),
            id: uid.to_string(),
            fields: json!({
                "chatData": serde_json::to_value(&chats.chat_data)
                    .map_err(|e| PortError::Unexpected(e.to_string()))?
            }),
        });
    }
    if !writes.is_empty() {
        store.commit(writes).await?;
    }
    Ok(())
}

fn build_message(
    sender_uid: &str,
    payload: &MessagePayload,
    timestamp: i64,
) -> PortResult<Message> {
    match payload {
        MessagePayload::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(PortError::Invalid("Message text is empty.".to_string()));
            }
            Ok(Message {
                sender_id: sender_uid.to_string(),
                text: Some(text.to_string()),
                media_url: None,
                media_type: None,
                created_at: timestamp,
            })
        }
        MessagePayload::Media { url, kind } => {
            if url.is_empty() {
                return Err(PortError::Invalid("Media URL is empty.".to_string()));
            }
            Ok(Message {
                sender_id: sender_uid.to_string(),
                text: None,
                media_url: Some(url.clone()),
                media_type: Some(*kind),
                created_at: timestamp,
            })
        }
    }
}

/// The `lastMessage` text for a summary entry: text truncated to 50
/// characters, or a `[KIND sent]` marker for media.
fn summary_text(payload: &MessagePayload) -> String {
    match payload {
        MessagePayload::Text(text) => text.trim().chars().take(LAST_MESSAGE_CHARS).collect(),
        MessagePayload::Media { kind, .. } => {
            format!("[{} sent]", kind.as_str().to_uppercase())
        }
    }
}

fn append_summary(uid: &str, entry: &ChatSummary) -> PortResult<WriteOp> {
    Ok(WriteOp::Append {
        collection: USER_CHATS.to_string(),
        id: uid.to_string(),
        field: "chatData".to_string(),
        value: serde_json::to_value(entry).map_err(|e| PortError::Unexpected(e.to_string()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MediaKind;

    #[test]
    fn summary_text_truncates_to_fifty_chars() {
        let long = "x".repeat(80);
        let s = summary_text(&MessagePayload::Text(long.clone()));
        assert_eq!(s.chars().count(), 50);
        assert!(long.starts_with(&s));

        let short = summary_text(&MessagePayload::Text("hello".into()));
        assert_eq!(short, "hello");
    }

    #[test]
    fn summary_text_labels_media_by_kind() {
        let s = summary_text(&MessagePayload::Media {
            url: "https://cdn.example/a.mp4".into(),
            kind: MediaKind::Video,
        });
        assert_eq!(s, "[VIDEO sent]");
    }

    #[test]
    fn empty_text_is_rejected() {
        let err = build_message("u1", &MessagePayload::Text("   ".into()), 0).unwrap_err();
        assert!(matches!(err, PortError::Invalid(_)));
    }

    #[test]
    fn media_message_has_no_text() {
        let msg = build_message(
            "u1",
            &MessagePayload::Media {
                url: "https://cdn.example/a.png".into(),
                kind: MediaKind::Image,
            },
            42,
        )
        .unwrap();
        assert_eq!(msg.text, None);
        assert_eq!(msg.media_type, Some(MediaKind::Image));
        assert_eq!(msg.created_at, 42);
    }
}
