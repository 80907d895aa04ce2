//! crates/samvaad_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the hosted collaborators the
//! system delegates to: the realtime document database, the identity
//! provider, and the media host. These traits form the boundary of the
//! hexagonal architecture; the core never sees a concrete backend.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;

use crate::domain::MediaKind;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    Invalid(String),
    /// An identity-provider rejection, carrying the provider's error
    /// identifier (e.g. `auth/wrong-password`) for user-facing formatting.
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Document Database Port
//=========================================================================================

/// A live change feed for one document. Each item is the document's new
/// contents, or `None` while the document does not exist. The feed stops
/// when the subscriber is dropped.
pub type DocumentWatch = Pin<Box<dyn Stream<Item = Option<Value>> + Send>>;

/// One write in a batched commit.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Create or fully replace a document.
    Set {
        collection: String,
        id: String,
        doc: Value,
    },
    /// Merge the given top-level fields into an existing document.
    Update {
        collection: String,
        id: String,
        fields: Value,
    },
    /// Atomically append one element to an array field.
    Append {
        collection: String,
        id: String,
        field: String,
        value: Value,
    },
}

/// The realtime document database collaborator. The system depends on
/// exactly these primitives: point reads/writes, an equality query, an
/// atomic array append, a live change subscription, and a batched commit.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads one document; `Ok(None)` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> PortResult<Option<Value>>;

    /// Creates or fully replaces one document.
    async fn set(&self, collection: &str, id: &str, doc: Value) -> PortResult<()>;

    /// Merges the given top-level fields into an existing document.
    async fn update(&self, collection: &str, id: &str, fields: Value) -> PortResult<()>;

    /// Returns every document in `collection` whose `field` equals `value`.
    async fn query_eq(&self, collection: &str, field: &str, value: &Value)
        -> PortResult<Vec<Value>>;

    /// Atomically appends `value` to the array field `field` of a document.
    async fn append(&self, collection: &str, id: &str, field: &str, value: Value)
        -> PortResult<()>;

    /// Subscribes to one document. The current state is delivered as the
    /// first item.
    async fn watch(&self, collection: &str, id: &str) -> PortResult<DocumentWatch>;

    /// Applies all writes as one atomic batch.
    async fn commit(&self, writes: Vec<WriteOp>) -> PortResult<()>;
}

//=========================================================================================
// Identity Provider Port
//=========================================================================================

/// What the identity provider reports about an authenticated account.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// The hosted identity provider. Credential storage and verification are
/// its job, never this system's.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> PortResult<AuthUser>;

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<AuthUser>;

    async fn send_password_reset(&self, email: &str) -> PortResult<()>;

    async fn delete_account(&self, uid: &str) -> PortResult<()>;
}

//=========================================================================================
// Media Host Port
//=========================================================================================

/// The external media/object host. Uploads land under a kind-named
/// destination and come back as a public URL.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, data: Bytes, filename: &str, kind: MediaKind) -> PortResult<String>;
}
