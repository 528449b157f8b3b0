//! Runtime configuration loaded from environment variables.

pub mod settings;

pub use settings::{uri_requires_tls, RemoteSettings, Settings};
