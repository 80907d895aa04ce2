pub mod identity;
pub mod media;
pub mod memory;
pub mod remote;

pub use identity::{LocalIdentity, RemoteIdentity};
pub use media::{LocalMedia, RemoteMedia};
pub use memory::MemoryStore;
pub use remote::RemoteStore;
