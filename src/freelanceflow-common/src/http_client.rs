//! Centralized HTTP client factory for FreelanceFlow services.
//!
//! Provides factory functions to create HTTP clients with consistent configuration:
//! - `create_client_builder()` - Standard 30s timeout for API metadata requests
//! - `create_download_client()` - No overall timeout, for artifact bodies
//!
//! All clients include: User-Agent, tcp_nodelay and a bounded idle pool.
//! The release-hosting API rejects requests without a User-Agent.

use reqwest::Client;
use std::time::Duration;

/// User-Agent string for all HTTP requests
pub const USER_AGENT: &str = concat!("freelanceflow/", env!("CARGO_PKG_VERSION"));

/// Default timeout for standard API requests (30 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout applied to every client, including download clients
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection pool idle timeout so DNS is re-resolved periodically.
pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Creates an HTTP client for streaming large artifacts.
///
/// Only the connect phase is bounded. The body transfer has no deadline of
/// its own; callers that need one must cancel the download themselves.
pub fn create_download_client() -> Result<Client, String> {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .tcp_nodelay(true)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(4)
        .build()
        .map_err(|e| format!("Failed to build download HTTP client: {e}"))
}

/// Creates an HTTP client builder with standard configuration.
///
/// Use this when you need to customize the client further before building.
pub fn create_client_builder() -> reqwest::ClientBuilder {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(DEFAULT_TIMEOUT)
        .read_timeout(DEFAULT_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .tcp_nodelay(true)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(4)
}
