//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::sessions::SessionStore;
use samvaad_core::ports::{DocumentStore, IdentityService, MediaStore};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. Everything stateful sits behind a collaborator port; the only
/// in-process state is the session map.
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityService>,
    pub media: Arc<dyn MediaStore>,
    pub sessions: SessionStore,
    pub config: Arc<Config>,
}
