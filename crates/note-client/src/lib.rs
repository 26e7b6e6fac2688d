//! note-client library: the pieces the binary wires together.
//!
//! Exposed as a library so integration tests can drive them directly.

pub mod command;
pub mod config;
pub mod file_surface;
pub mod http_store;
pub mod watcher;

// Re-export key types for convenience
pub use command::{CommandError, UserCommand};
pub use config::{Config, ConfigError, TimingConfig};
pub use file_surface::FileSurface;
pub use http_store::HttpStore;
pub use watcher::{FileEvent, FileWatcher};
