pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod news;
pub mod session;
pub mod state;
pub mod storage;

// Re-exports for convenience
pub use api::ApiClient;
pub use config::Config;
pub use error::{ClientError, ClientResult};
pub use media::{MediaKind, MediaSelection};
pub use session::SessionManager;
pub use state::{Analysis, AppState};
