use anyhow::{Context, Result};
use std::time::Duration;

use super::{Alert, Notifier};

/// Port the stacklight display listens on.
pub const STACKLIGHT_PORT: u16 = 8080;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Always-on telemetry display. Receives the bare label as the POST body.
pub struct StacklightDisplay {
    url: String,
    agent: ureq::Agent,
}

impl StacklightDisplay {
    pub fn new(ip: &str) -> Self {
        Self {
            url: display_url(ip),
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
        }
    }
}

fn display_url(ip: &str) -> String {
    format!("http://{}:{}/display", ip.trim(), STACKLIGHT_PORT)
}

impl Notifier for StacklightDisplay {
    fn channel(&self) -> &'static str {
        "stacklight"
    }

    fn send(&self, alert: &Alert<'_>) -> Result<()> {
        self.agent
            .post(&self.url)
            .send_string(alert.label)
            .with_context(|| format!("post label to {}", self.url))?;
        Ok(())
    }
}
