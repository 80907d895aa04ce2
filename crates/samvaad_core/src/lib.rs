pub mod chat;
pub mod directory;
pub mod domain;
pub mod error_text;
pub mod ports;
pub mod sync;

pub use domain::{
    ChatPreview, ChatSummary, Counterpart, MediaKind, Message, MessageLog, MessagePayload,
    UserChats, UserProfile,
};
pub use ports::{
    AuthUser, DocumentStore, DocumentWatch, IdentityService, MediaStore, PortError, PortResult,
    WriteOp,
};
