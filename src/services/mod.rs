// src/services/mod.rs
//
// Shared services: identity provider, ephemeral store backends,
// session tokens and the user directory

pub mod ephemeral_store;
pub mod google;
pub mod identity;
pub mod monitoring;
pub mod redis_store;
pub mod session_tokens;
pub mod users;

// Re-export commonly used types for convenience
pub use ephemeral_store::{EphemeralStore, MemoryStore};
pub use google::GoogleIdentityClient;
pub use redis_store::RedisStore;
