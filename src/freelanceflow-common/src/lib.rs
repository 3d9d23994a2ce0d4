//! Common utilities shared across FreelanceFlow crates.

pub mod dirs;
pub mod http_client;

pub use dirs::AppDirs;
pub use http_client::{USER_AGENT, create_client_builder, create_download_client};
