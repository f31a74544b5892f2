//! Outbound HTTP client.
//!
//! Every request carries the configured `User-Agent`. Redirect following can be
//! turned off, in which case 3xx responses are handed back to the caller as-is.

use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::Client;

use crate::error::ClientError;

/// Build a client with the given user agent, timeout in seconds (0 disables
/// the timeout) and redirect policy.
pub fn new_http_client(
    user_agent: &str,
    timeout_secs: u64,
    follow_redirects: bool,
) -> Result<Client, ClientError> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .redirect(redirect_policy(follow_redirects));

    if timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(timeout_secs));
    }

    Ok(builder.build()?)
}

fn redirect_policy(follow: bool) -> Policy {
    if follow {
        Policy::default()
    } else {
        tracing::debug!("Disable http redirects for http client");
        Policy::custom(|attempt| {
            tracing::debug!(url = %attempt.url(), "Do not follow redirect");
            attempt.stop()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client() {
        assert!(new_http_client("appkit-test/1.0", 10, true).is_ok());
        assert!(new_http_client("appkit-test/1.0", 0, false).is_ok());
    }

    #[test]
    fn test_invalid_user_agent_rejected() {
        let err = new_http_client("bad\nagent", 10, true).unwrap_err();
        assert!(matches!(err, ClientError::Build(_)));
    }
}
