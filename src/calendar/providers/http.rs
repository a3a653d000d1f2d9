// src/calendar/providers/http.rs
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::time::Duration;

use crate::error::{FetchError, FetchResult};

/// The provider rejects default client identifications, so present as a browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

pub fn build_client(timeout: Duration) -> FetchResult<Client> {
    Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .timeout(timeout)
        .build()
        .map_err(|e| FetchError::Transport(format!("building http client: {e}")))
}

/// Single GET, no retry. Non-2xx statuses are transport failures.
pub async fn get_text(client: &Client, url: &str) -> FetchResult<String> {
    let resp = client
        .get(url)
        .header(ACCEPT, "text/html,application/xhtml+xml,application/xml,application/json;q=0.9,*/*;q=0.8")
        .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        .send()
        .await?
        .error_for_status()?;
    Ok(resp.text().await?)
}
