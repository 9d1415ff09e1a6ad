use anyhow::{Context, Result};
use base64::Engine;
use std::time::Duration;

use super::{Alert, Notifier};
use crate::config::SmsOptions;

const TWILIO_API: &str = "https://api.twilio.com/2010-04-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// SMS through the Twilio Messages REST API.
pub struct TwilioSms {
    options: SmsOptions,
    agent: ureq::Agent,
}

impl TwilioSms {
    pub fn new(options: &SmsOptions) -> Self {
        Self {
            options: options.clone(),
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            TWILIO_API, self.options.account_sid
        )
    }

    fn basic_auth(&self) -> String {
        let credentials = format!("{}:{}", self.options.account_sid, self.options.auth_token);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        )
    }
}

impl Notifier for TwilioSms {
    fn channel(&self) -> &'static str {
        "sms"
    }

    fn send(&self, alert: &Alert<'_>) -> Result<()> {
        let body = alert.summary();
        self.agent
            .post(&self.messages_url())
            .set("Authorization", &self.basic_auth())
            .send_form(&[
                ("To", self.options.to_number.as_str()),
                ("From", self.options.from_number.as_str()),
                ("Body", body.as_str()),
            ])
            .context("send twilio message")?;
        Ok(())
    }
}
