use std::time::Duration;

use reqwest::{redirect::Policy, Client};

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

const READ_TIMEOUT_SECS: u64 = 5 * 60;

/// Build the two clients the downloader needs: a regular one for plain
/// fetches, and one that surfaces redirects instead of chasing them. The
/// artifact endpoint answers with a 302 carrying a signed blob URL, and we
/// must see that response ourselves.
pub fn build_reqwest_clients() -> (Client, Client) {
    let client = Client::builder()
        .user_agent(APP_USER_AGENT)
        .read_timeout(Duration::from_secs(READ_TIMEOUT_SECS))
        .build()
        .expect("failed to create reqwest Client");

    let no_redirect_client = Client::builder()
        .user_agent(APP_USER_AGENT)
        .redirect(Policy::none())
        .read_timeout(Duration::from_secs(READ_TIMEOUT_SECS))
        .build()
        .expect("failed to create reqwest Client");

    (client, no_redirect_client)
}
