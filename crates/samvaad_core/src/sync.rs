//! crates/samvaad_core/src/sync.rs
//!
//! The two live synchronizers: the chat-list feed (per-user summary
//! document joined with fresh counterpart profiles) and the message-thread
//! feed (whole-log replacement). Both are change-notification driven; no
//! polling, no incremental diffing.

use futures::{Stream, StreamExt};
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use tracing::warn;

use crate::directory::get_profile;
use crate::domain::{
    ChatPreview, Counterpart, Message, MessageLog, UserChats, MESSAGES, USER_CHATS,
};
use crate::ports::{DocumentStore, PortResult};

/// A live view of one user's chat list, re-emitted in full on every change.
pub type ChatListFeed = Pin<Box<dyn Stream<Item = Vec<ChatPreview>> + Send>>;

/// A live view of one conversation's messages, replaced in full on every
/// change.
pub type ThreadFeed = Pin<Box<dyn Stream<Item = Vec<Message>> + Send>>;

/// Subscribes to `userChats/{uid}` and emits the joined, sorted chat list
/// on every change notification.
///
/// Each emission re-fetches every referenced counterpart profile (no
/// caching across updates). A counterpart whose account is gone gets the
/// `Deleted User` sentinel. A missing summary document yields an empty
/// list, not an error. The feed ends when the returned stream is dropped.
pub async fn watch_chat_list(store: Arc<dyn DocumentStore>, uid: &str) -> PortResult<ChatListFeed> {
    let mut watch = store.watch(USER_CHATS, uid).await?;
    let stream = async_stream::stream! {
        while let Some(doc) = watch.next().await {
            yield assemble_chat_list(store.as_ref(), doc).await;
        }
    };
    Ok(Box::pin(stream))
}

/// Subscribes to `messages/{chat_id}` and emits the whole ordered message
/// sequence on every change. Absence of the document yields an empty
/// sequence.
pub async fn watch_thread(store: Arc<dyn DocumentStore>, chat_id: &str) -> PortResult<ThreadFeed> {
    let mut watch = store.watch(MESSAGES, chat_id).await?;
    let stream = async_stream::stream! {
        while let Some(doc) = watch.next().await {
            yield parse_thread(doc);
        }
    };
    Ok(Box::pin(stream))
}

/// Joins one summary-document snapshot with live counterpart profiles and
/// sorts by recency.
async fn assemble_chat_list(store: &dyn DocumentStore, doc: Option<Value>) -> Vec<ChatPreview> {
    let Some(doc) = doc else {
        return Vec::new();
    };
    let chats: UserChats = match serde_json::from_value(doc) {
        Ok(chats) => chats,
        Err(e) => {
            warn!("Malformed userChats document in chat-list feed: {e}");
            return Vec::new();
        }
    };

    let mut previews = Vec::with_capacity(chats.chat_data.len());
    for summary in chats.chat_data {
        // A failed or empty profile read degrades to the sentinel rather
        // than surfacing an error into the feed.
        let user_data = match get_profile(store, &summary.r_id).await {
            Ok(Some(profile)) => Counterpart::from_profile(&profile),
            Ok(None) => Counterpart::deleted(),
            Err(e) => {
                warn!("Failed to fetch counterpart {}: {e}", summary.r_id);
                Counterpart::deleted()
            }
        };
        previews.push(ChatPreview { summary, user_data });
    }
    previews.sort_by(|a, b| b.summary.updated_at.cmp(&a.summary.updated_at));
    previews
}

fn parse_thread(doc: Option<Value>) -> Vec<Message> {
    let Some(doc) = doc else {
        return Vec::new();
    };
    match serde_json::from_value::<MessageLog>(doc) {
        Ok(log) => log.messages,
        Err(e) => {
            warn!("Malformed message log in thread feed: {e}");
            Vec::new()
        }
    }
}
