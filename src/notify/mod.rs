//! Notification dispatch for settled detector results.
//!
//! A dispatcher is built once per worker from its `NotificationOptions`. On each
//! crossing event the worker calls `dispatch`:
//!
//! 1. `YES`/`NO` labels are normalized to `PASS`/`FAIL`.
//! 2. The telemetry display (stacklight) is always updated first.
//! 3. Without a configured condition nothing else is sent.
//! 4. Email, SMS and chat fire only when the normalized label matches the condition.
//!
//! A channel that errors or panics is logged and recorded in the `DispatchReport`;
//! it never stops sibling channels and never reaches the caller.

use anyhow::{anyhow, Result};
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;

use crate::config::NotificationOptions;
use crate::frame::Frame;
use crate::worker::panic_message;

pub mod email;
pub mod slack;
pub mod sms;
pub mod stacklight;

pub use email::SmtpEmail;
pub use slack::SlackChat;
pub use sms::TwilioSms;
pub use stacklight::StacklightDisplay;

/// Label value a result must carry for condition-gated channels to fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    Pass,
    Fail,
}

impl Condition {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        }
    }
}

impl FromStr for Condition {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "PASS" => Ok(Self::Pass),
            "FAIL" => Ok(Self::Fail),
            other => Err(anyhow!(
                "unknown notification condition '{}': expected PASS or FAIL",
                other
            )),
        }
    }
}

/// Maps binary answers onto the PASS/FAIL vocabulary; other labels pass through.
pub fn normalize_label(label: &str) -> &str {
    match label {
        "YES" => "PASS",
        "NO" => "FAIL",
        other => other,
    }
}

/// What a channel gets to send.
pub struct Alert<'a> {
    pub detector_name: &'a str,
    pub query_text: &'a str,
    /// Already normalized.
    pub label: &'a str,
    pub frame: &'a Frame,
}

impl Alert<'_> {
    pub fn summary(&self) -> String {
        format!(
            "Your detector [{}] returned a \"{}\" result to the query [{}].",
            self.detector_name, self.label, self.query_text
        )
    }
}

pub trait Notifier: Send {
    /// Channel name used in logs and reports.
    fn channel(&self) -> &'static str;

    fn send(&self, alert: &Alert<'_>) -> Result<()>;
}

/// Which channels a dispatch attempted and which of those failed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub condition_met: bool,
    pub attempted: Vec<&'static str>,
    pub failed: Vec<&'static str>,
}

pub struct NotificationDispatcher {
    condition: Option<Result<Condition, String>>,
    telemetry: Option<Box<dyn Notifier>>,
    channels: Vec<Box<dyn Notifier>>,
}

impl NotificationDispatcher {
    /// Dispatcher with no channels. `condition` is the raw configured value.
    pub fn new(condition: Option<&str>) -> Self {
        Self {
            condition: condition.map(|raw| Condition::from_str(raw).map_err(|_| raw.to_string())),
            telemetry: None,
            channels: Vec::new(),
        }
    }

    /// Builds the provider channels named in `options`.
    pub fn from_options(options: &NotificationOptions) -> Self {
        let mut dispatcher = Self::new(options.condition.as_deref());
        if let Some(stacklight) = &options.stacklight {
            match &stacklight.ip {
                Some(ip) => {
                    dispatcher = dispatcher.with_telemetry(Box::new(StacklightDisplay::new(ip)))
                }
                None => log::warn!("stacklight configured without ip; skipping"),
            }
        }
        if let Some(email) = &options.email {
            dispatcher = dispatcher.with_channel(Box::new(SmtpEmail::new(email)));
        }
        if let Some(sms) = &options.twilio {
            dispatcher = dispatcher.with_channel(Box::new(TwilioSms::new(sms)));
        }
        if let Some(chat) = &options.slack {
            dispatcher = dispatcher.with_channel(Box::new(SlackChat::new(chat)));
        }
        dispatcher
    }

    pub fn with_telemetry(mut self, telemetry: Box<dyn Notifier>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Adds a condition-gated channel. Channels are attempted in insertion order.
    pub fn with_channel(mut self, channel: Box<dyn Notifier>) -> Self {
        self.channels.push(channel);
        self
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.telemetry
            .iter()
            .chain(self.channels.iter())
            .map(|channel| channel.channel())
            .collect()
    }

    pub fn dispatch(
        &self,
        detector_name: &str,
        query_text: &str,
        label: &str,
        frame: &Frame,
    ) -> DispatchReport {
        let alert = Alert {
            detector_name,
            query_text,
            label: normalize_label(label),
            frame,
        };
        let mut report = DispatchReport::default();

        if let Some(telemetry) = &self.telemetry {
            attempt(telemetry.as_ref(), &alert, &mut report);
        }

        let condition = match &self.condition {
            Some(Ok(condition)) => *condition,
            Some(Err(raw)) => {
                log::warn!("unrecognized notification condition '{}'", raw);
                return report;
            }
            None => {
                log::warn!("no notification condition provided");
                return report;
            }
        };

        if alert.label != condition.as_label() {
            log::info!(
                "detector {}: label {} does not meet condition {}",
                detector_name,
                alert.label,
                condition.as_label()
            );
            return report;
        }
        report.condition_met = true;

        for channel in &self.channels {
            attempt(channel.as_ref(), &alert, &mut report);
        }
        report
    }
}

fn attempt(channel: &dyn Notifier, alert: &Alert<'_>, report: &mut DispatchReport) {
    log::info!(
        "detector {}: sending {} notification",
        alert.detector_name,
        channel.channel()
    );
    report.attempted.push(channel.channel());
    let failure = match panic::catch_unwind(AssertUnwindSafe(|| channel.send(alert))) {
        Ok(Ok(())) => return,
        Ok(Err(e)) => format!("{:#}", e),
        Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
    };
    log::error!(
        "detector {}: {} notification failed: {}",
        alert.detector_name,
        channel.channel(),
        failure
    );
    report.failed.push(channel.channel());
}
