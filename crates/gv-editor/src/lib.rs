pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod input;
pub mod session;
pub mod tools;
pub mod views;

pub use config::EditorConfig;
pub use context::{ChangeEvent, PropertyKey, SessionContext, Snapshot, ViewKind};
pub use error::{EditorError, Result};
pub use session::EditorSession;
