// Module declarations for local key-value persistence
pub mod file;
pub mod memory;
pub mod traits;

// Re-exports for convenience
pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::KeyValueStore;

/// Key holding the bearer token
pub const TOKEN_KEY: &str = "auth_token";
/// Key holding the serialized user profile
pub const USER_KEY: &str = "user_data";
