use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::time::Duration;

use super::{Alert, Notifier};
use crate::config::ChatOptions;

const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Chat message through Slack's `chat.postMessage`.
pub struct SlackChat {
    options: ChatOptions,
    agent: ureq::Agent,
}

impl SlackChat {
    pub fn new(options: &ChatOptions) -> Self {
        Self {
            options: options.clone(),
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
        }
    }
}

impl Notifier for SlackChat {
    fn channel(&self) -> &'static str {
        "slack"
    }

    fn send(&self, alert: &Alert<'_>) -> Result<()> {
        let resp: PostMessageResponse = self
            .agent
            .post(POST_MESSAGE_URL)
            .set("Authorization", &format!("Bearer {}", self.options.token))
            .send_json(serde_json::json!({
                "channel": self.options.channel_id,
                "text": alert.summary(),
            }))
            .context("post slack message")?
            .into_json()
            .context("decode slack response")?;
        check_response(resp)
    }
}

// Slack reports API errors with HTTP 200 and `ok: false`.
fn check_response(resp: PostMessageResponse) -> Result<()> {
    if resp.ok {
        Ok(())
    } else {
        Err(anyhow!(
            "slack rejected message: {}",
            resp.error.unwrap_or_else(|| "unknown error".to_string())
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_false_is_an_error() {
        let resp: PostMessageResponse =
            serde_json::from_str(r#"{"ok": false, "error": "channel_not_found"}"#).unwrap();
        let err = check_response(resp).unwrap_err();
        assert!(err.to_string().contains("channel_not_found"));
    }

    #[test]
    fn ok_true_is_success() {
        let resp: PostMessageResponse = serde_json::from_str(r#"{"ok": true}"#).unwrap();
        assert!(check_response(resp).is_ok());
    }
}
