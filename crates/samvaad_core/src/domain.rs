//! crates/samvaad_core/src/domain.rs
//!
//! Defines the core data structures for the messaging domain.
//! Serde names follow the JSON documents stored by the hosted document
//! database, which both clients of a conversation read and write.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Collection names in the hosted document database.
pub const USERS: &str = "users";
pub const USER_CHATS: &str = "userChats";
pub const MESSAGES: &str = "messages";

/// Epoch milliseconds, the timestamp unit used throughout the documents.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// A user's profile document (`users/{uid}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// The identity-provider uid, also the document id.
    pub id: String,
    /// Secondary public id, a dashless hex string.
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    pub avatar: Option<String>,
    pub bio: String,
    pub last_seen: i64,
}

impl UserProfile {
    /// Builds the first-login profile for a freshly authenticated user.
    /// The username is the email local part; name and bio get defaults.
    pub fn initial(
        uid: &str,
        email: &str,
        display_name: Option<&str>,
        avatar: Option<&str>,
    ) -> Self {
        let username = email.split('@').next().unwrap_or(email).to_string();
        Self {
            id: uid.to_string(),
            user_id: Uuid::new_v4().simple().to_string(),
            username,
            email: email.to_string(),
            name: display_name
                .filter(|n| !n.is_empty())
                .unwrap_or("Samvaad User")
                .to_string(),
            avatar: avatar.map(str::to_string),
            bio: "Hey, I am using Samvaad!".to_string(),
            last_seen: now_millis(),
        }
    }
}

/// One entry of a user's `userChats/{uid}` summary list. Denormalized:
/// the same `chat_id` appears in both participants' lists and points at
/// one shared message log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub chat_id: String,
    /// The counterpart's uid.
    pub r_id: String,
    pub last_message: String,
    pub updated_at: i64,
    pub is_unread: bool,
}

/// The `userChats/{uid}` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChats {
    pub chat_data: Vec<ChatSummary>,
}

/// Coarse media classification, derived from the MIME type prefix.
/// Doubles as the destination folder name on the media host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Raw,
}

impl MediaKind {
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            MediaKind::Image
        } else if mime.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Raw
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Raw => "raw",
        }
    }
}

/// One message in a conversation log. Exactly one of `text` / `media_url`
/// is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub sender_id: String,
    pub text: Option<String>,
    #[serde(rename = "mediaURL")]
    pub media_url: Option<String>,
    pub media_type: Option<MediaKind>,
    pub created_at: i64,
}

/// The `messages/{chatId}` document: a shared, append-only log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageLog {
    pub created_at: i64,
    pub messages: Vec<Message>,
}

/// What a sender hands to `send_message`: text or an already-uploaded
/// media reference, never both.
#[derive(Debug, Clone)]
pub enum MessagePayload {
    Text(String),
    Media { url: String, kind: MediaKind },
}

/// A chat-list row as shown to the user: the summary entry joined with
/// the counterpart's live profile.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatPreview {
    #[serde(flatten)]
    pub summary: ChatSummary,
    pub user_data: Counterpart,
}

/// Counterpart profile data joined into a chat-list row. When the
/// counterpart's document no longer exists the sentinel is used instead.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Counterpart {
    pub id: Option<String>,
    pub name: String,
    pub username: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

impl Counterpart {
    pub fn from_profile(p: &UserProfile) -> Self {
        Self {
            id: Some(p.id.clone()),
            name: p.name.clone(),
            username: Some(p.username.clone()),
            avatar: p.avatar.clone(),
            bio: Some(p.bio.clone()),
        }
    }

    /// Placeholder shown when the counterpart account was deleted.
    pub fn deleted() -> Self {
        Self {
            id: None,
            name: "Deleted User".to_string(),
            username: None,
            avatar: None,
            bio: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_kind_follows_mime_prefix() {
        assert_eq!(MediaKind::from_mime("image/png"), MediaKind::Image);
        assert_eq!(MediaKind::from_mime("video/mp4"), MediaKind::Video);
        assert_eq!(MediaKind::from_mime("application/pdf"), MediaKind::Raw);
        assert_eq!(MediaKind::from_mime(""), MediaKind::Raw);
    }

    #[test]
    fn initial_profile_uses_email_local_part_and_defaults() {
        let p = UserProfile::initial("uid-1", "ana@example.com", None, None);
        assert_eq!(p.username, "ana");
        assert_eq!(p.name, "Samvaad User");
        assert_eq!(p.bio, "Hey, I am using Samvaad!");
        assert_eq!(p.user_id.len(), 32);
        assert!(!p.user_id.contains('-'));
    }

    #[test]
    fn message_serializes_with_wire_names() {
        let msg = Message {
            sender_id: "a".into(),
            text: None,
            media_url: Some("https://cdn.example/v.mp4".into()),
            media_type: Some(MediaKind::Video),
            created_at: 7,
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["senderId"], "a");
        assert_eq!(v["mediaURL"], "https://cdn.example/v.mp4");
        assert_eq!(v["mediaType"], "video");
        assert!(v["text"].is_null());
    }
}
