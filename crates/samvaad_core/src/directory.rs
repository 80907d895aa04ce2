//! crates/samvaad_core/src/directory.rs
//!
//! User-facing operations of the backend access layer: profile setup on
//! first login, profile reads/updates, and username search. All state
//! lives in the hosted document database behind the `DocumentStore` port.

use serde_json::{json, Value};

use crate::domain::{UserProfile, UserChats, USERS, USER_CHATS};
use crate::ports::{AuthUser, DocumentStore, PortError, PortResult};

/// Writes the first-login documents for a freshly authenticated user:
/// their profile and an empty chat-summary list.
pub async fn setup_user(store: &dyn DocumentStore, auth: &AuthUser) -> PortResult<UserProfile> {
    let profile = UserProfile::initial(
        &auth.uid,
        &auth.email,
        auth.display_name.as_deref(),
        auth.photo_url.as_deref(),
    );
    let doc = serde_json::to_value(&profile)
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
    store.set(USERS, &auth.uid, doc).await?;
    store
        .set(USER_CHATS, &auth.uid, json!({ "chatData": [] }))
        .await?;
    Ok(profile)
}

/// Reads the caller's own profile, creating the first-login documents if
/// they are missing (get-or-create).
pub async fn get_user_data(store: &dyn DocumentStore, auth: &AuthUser) -> PortResult<UserProfile> {
    match store.get(USERS, &auth.uid).await? {
        Some(doc) => parse_profile(doc),
        None => setup_user(store, auth).await,
    }
}

/// Reads another user's profile; `Ok(None)` when the account is gone.
pub async fn get_profile(store: &dyn DocumentStore, uid: &str) -> PortResult<Option<UserProfile>> {
    match store.get(USERS, uid).await? {
        Some(doc) => parse_profile(doc).map(Some),
        None => Ok(None),
    }
}

/// Updates the editable profile fields. The name must be non-empty after
/// trimming; bio and avatar are taken as given.
pub async fn update_profile(
    store: &dyn DocumentStore,
    uid: &str,
    name: &str,
    bio: &str,
    avatar: Option<&str>,
) -> PortResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PortError::Invalid("Name cannot be empty.".to_string()));
    }
    store
        .update(
            USERS,
            uid,
            json!({ "name": name, "bio": bio, "avatar": avatar }),
        )
        .await
}

/// Looks a user up by exact username. The query is lowercased; a hit that
/// is the caller themselves counts as no match.
pub async fn search_user(
    store: &dyn DocumentStore,
    username: &str,
    current_uid: &str,
) -> PortResult<Option<UserProfile>> {
    let needle = Value::String(username.trim().to_lowercase());
    let hits = store.query_eq(USERS, "username", &needle).await?;
    match hits.into_iter().next() {
        Some(doc) => {
            let profile = parse_profile(doc)?;
            if profile.id == current_uid {
                Ok(None)
            } else {
                Ok(Some(profile))
            }
        }
        None => Ok(None),
    }
}

/// Reads a user's chat-summary list; a missing document is an empty list.
pub async fn get_user_chats(store: &dyn DocumentStore, uid: &str) -> PortResult<UserChats> {
    match store.get(USER_CHATS, uid).await? {
        Some(doc) => serde_json::from_value(doc)
            .map_err(|e| PortError::Unexpected(format!("malformed userChats document: {e}"))),
        None => Ok(UserChats::default()),
    }
}

pub(crate) fn parse_profile(doc: Value) -> PortResult<UserProfile> {
    serde_json::from_value(doc)
        .map_err(|e| PortError::Unexpected(format!("malformed user document: {e}")))
}
