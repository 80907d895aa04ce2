//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification. All handlers here sit behind
//! the auth middleware and receive the authenticated account from request
//! extensions.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};

use crate::web::state::AppState;
use samvaad_core::domain::{MediaKind, MessagePayload};
use samvaad_core::ports::{AuthUser, PortError};
use samvaad_core::{chat, directory};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::reset_handler,
        crate::web::auth::logout_handler,
        crate::web::auth::delete_account_handler,
        me_handler,
        update_me_handler,
        search_user_handler,
        create_chat_handler,
        send_message_handler,
        upload_media_handler,
    ),
    components(
        schemas(
            crate::web::auth::SignupRequest,
            crate::web::auth::LoginRequest,
            crate::web::auth::ResetRequest,
            crate::web::auth::AuthResponse,
            UpdateProfileRequest,
            CreateChatRequest,
            SendMessageRequest,
            UploadMediaResponse,
        )
    ),
    tags(
        (name = "Samvaad API", description = "Messaging endpoints backed by the hosted document database.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request and Response Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: String,
    #[serde(default)]
    pub bio: String,
    pub avatar: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub username: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    /// The counterpart's uid.
    pub user_id: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// The counterpart's uid, whose summary copy gets the unread mark.
    pub r_id: String,
    pub text: Option<String>,
    pub media_url: Option<String>,
    #[schema(value_type = Option<String>)]
    pub media_type: Option<MediaKind>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadMediaResponse {
    pub url: String,
    #[schema(value_type = String)]
    pub media_type: MediaKind,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn port_failure(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(what) => (StatusCode::NOT_FOUND, format!("Not found: {what}")),
        PortError::Invalid(message) => (StatusCode::BAD_REQUEST, message),
        PortError::Auth(_) => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Unexpected(message) => {
            error!("Port operation failed: {message}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong. Please try again.".to_string(),
            )
        }
    }
}

//=========================================================================================
// Profile Handlers
//=========================================================================================

/// Get the caller's own profile, creating it on first access.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "The caller's profile document"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<AuthUser>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let profile = directory::get_user_data(state.store.as_ref(), &user)
        .await
        .map_err(port_failure)?;
    Ok(Json(profile))
}

/// Update the caller's editable profile fields (single canonical version:
/// a trimmed non-empty name is required, bio and avatar pass through).
#[utoipa::path(
    put,
    path = "/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated"),
        (status = 400, description = "Invalid profile data"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn update_me_handler(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    directory::update_profile(
        state.store.as_ref(),
        &user.uid,
        &req.name,
        &req.bio,
        req.avatar.as_deref(),
    )
    .await
    .map_err(port_failure)?;
    Ok(StatusCode::OK)
}

/// Look a user up by exact username. A match on the caller themselves is
/// reported as no match, mirroring the client's search box behavior.
#[utoipa::path(
    get,
    path = "/users/search",
    params(("username" = String, Query, description = "Exact username to look up.")),
    responses(
        (status = 200, description = "The matching profile, or null"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn search_user_handler(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<AuthUser>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let hit = directory::search_user(state.store.as_ref(), &params.username, &user.uid)
        .await
        .map_err(port_failure)?;
    Ok(Json(hit))
}

//=========================================================================================
// Chat Handlers
//=========================================================================================

/// Open (or return the existing) chat with another user.
#[utoipa::path(
    post,
    path = "/chats",
    request_body = CreateChatRequest,
    responses(
        (status = 200, description = "The caller's summary entry for the chat"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn create_chat_handler(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<AuthUser>,
    Json(req): Json<CreateChatRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let summary = chat::open_chat(state.store.as_ref(), &user.uid, &req.user_id)
        .await
        .map_err(port_failure)?;
    Ok(Json(summary))
}

/// Append one message (text or an uploaded media reference) to a chat.
#[utoipa::path(
    post,
    path = "/chats/{chat_id}/messages",
    params(("chat_id" = String, Path, description = "The shared conversation id.")),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Message appended"),
        (status = 400, description = "Neither or both of text and media given"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Unknown conversation")
    )
)]
pub async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<AuthUser>,
    Path(chat_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let payload = match (req.text, req.media_url) {
        (Some(text), None) => MessagePayload::Text(text),
        (None, Some(url)) => MessagePayload::Media {
            url,
            kind: req.media_type.ok_or((
                StatusCode::BAD_REQUEST,
                "mediaType is required with mediaUrl".to_string(),
            ))?,
        },
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                "Send either text or mediaUrl, not both".to_string(),
            ))
        }
    };

    chat::send_message(state.store.as_ref(), &user.uid, &req.r_id, &chat_id, payload)
        .await
        .map_err(port_failure)?;
    Ok(StatusCode::OK)
}

//=========================================================================================
// Media Handler
//=========================================================================================

/// Upload a media file for later sending.
///
/// Accepts a multipart/form-data request with a single file part. The kind
/// is classified from the part's MIME prefix and decides the destination
/// on the media host.
#[utoipa::path(
    post,
    path = "/media",
    request_body(content_type = "multipart/form-data", description = "The file to upload."),
    responses(
        (status = 200, description = "Upload complete", body = UploadMediaResponse),
        (status = 400, description = "Multipart form without a file part"),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "The media host rejected the upload")
    )
)]
pub async fn upload_media_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {e}"),
        )
    })?
    else {
        return Err((
            StatusCode::BAD_REQUEST,
            "Multipart form must include a file".to_string(),
        ));
    };

    let kind = MediaKind::from_mime(field.content_type().unwrap_or_default());
    let filename = field.file_name().unwrap_or("upload").to_string();
    let data = field.bytes().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read file bytes: {e}"),
        )
    })?;

    let url = state
        .media
        .upload(data, &filename, kind)
        .await
        .map_err(port_failure)?;

    Ok(Json(UploadMediaResponse {
        url,
        media_type: kind,
    }))
}
