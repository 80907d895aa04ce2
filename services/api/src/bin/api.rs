//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{LocalIdentity, LocalMedia, MemoryStore, RemoteIdentity, RemoteMedia, RemoteStore},
    config::Config,
    error::ApiError,
    sessions::SessionStore,
    web::{
        auth::{
            delete_account_handler, login_handler, logout_handler, reset_handler, signup_handler,
        },
        middleware::require_auth,
        rest::{
            create_chat_handler, me_handler, search_user_handler, send_message_handler,
            update_me_handler, upload_media_handler, ApiDoc,
        },
        state::AppState,
        ws_handler,
    },
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use samvaad_core::ports::{DocumentStore, IdentityService, MediaStore};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Pick the Collaborator Adapters ---
    // Every stateful concern is delegated: the document database, the
    // identity provider, and the media host each get the hosted adapter
    // when configured, or the in-process development stand-in otherwise.
    let store: Arc<dyn DocumentStore> = match &config.docstore_url {
        Some(url) => {
            info!("Using the hosted document database at {url}");
            Arc::new(RemoteStore::new(url.clone()))
        }
        None => {
            info!("DOCSTORE_URL not set; using the in-process document store");
            Arc::new(MemoryStore::new())
        }
    };

    let identity: Arc<dyn IdentityService> = match (&config.identity_url, &config.identity_api_key)
    {
        (Some(url), Some(key)) => {
            info!("Using the hosted identity provider at {url}");
            Arc::new(RemoteIdentity::new(url.clone(), key.clone()))
        }
        _ => {
            info!("IDENTITY_URL not set; using the local credential store");
            Arc::new(LocalIdentity::new())
        }
    };

    let serving_local_media = config.media_upload_url.is_none();
    let media: Arc<dyn MediaStore> = match &config.media_upload_url {
        Some(url) => {
            info!("Using the hosted media host at {url}");
            Arc::new(RemoteMedia::new(
                url.clone(),
                config.media_upload_preset.clone(),
            ))
        }
        None => {
            info!(
                "MEDIA_UPLOAD_URL not set; writing media under {}",
                config.media_dir.display()
            );
            Arc::new(LocalMedia::new(
                config.media_dir.clone(),
                config.media_public_base.clone(),
            ))
        }
    };

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        store,
        identity,
        media,
        sessions: SessionStore::new(),
        config: config.clone(),
    });

    let cors_origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {e}")))?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/reset", post(reset_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/account", delete(delete_account_handler))
        .route("/me", get(me_handler).put(update_me_handler))
        .route("/users/search", get(search_user_handler))
        .route("/chats", post(create_chat_handler))
        .route("/chats/{chat_id}/messages", post(send_message_handler))
        .route("/media", post(upload_media_handler))
        .route("/ws", get(ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes
    let mut api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(25 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Locally written media is exposed as static files; with a hosted
    // media API the returned URLs already point elsewhere.
    if serving_local_media {
        api_router = api_router.nest_service("/files", ServeDir::new(&config.media_dir));
    }

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
