use reqwest::Client;
use std::time::Duration;

use crate::utils::AppResult;

/// App user-agent string derived from Cargo.toml version at compile time.
pub const APP_USER_AGENT: &str = concat!("app-updater/", env!("CARGO_PKG_VERSION"));

/// Shared client for feed lookups and artifact downloads. Downloads can be
/// large, so only connect and idle reads are bounded, not the whole request.
pub fn create_http_client() -> AppResult<Client> {
    let client = Client::builder()
        .user_agent(APP_USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .read_timeout(Duration::from_secs(60))
        .gzip(true)
        .pool_max_idle_per_host(3)
        .tcp_nodelay(true)
        .build()?;
    Ok(client)
}
