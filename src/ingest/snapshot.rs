//! HTTP JPEG snapshot source.
//!
//! Fetches a single JPEG from `id.url` per grab. Suits IP cameras that expose a
//! snapshot endpoint.

use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::time::Duration;
use url::Url;

use super::FrameSource;
use crate::config::CameraConfig;
use crate::frame::{Frame, MAX_JPEG_BYTES};

const DEFAULT_TIMEOUT_SECS: u32 = 5;

pub struct HttpSnapshotSource {
    name: String,
    url: String,
    agent: ureq::Agent,
}

impl HttpSnapshotSource {
    pub const INPUT_TYPE: &'static str = "http_snapshot";

    pub fn new(name: &str, url: &str, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(url).context("parse snapshot url")?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(anyhow!(
                    "unsupported snapshot scheme '{}'; expected http(s)",
                    other
                ))
            }
        }
        Ok(Self {
            name: name.to_string(),
            url: url.to_string(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        })
    }

    pub fn from_camera(camera: &CameraConfig) -> Result<Self> {
        let timeout = camera.option_u32("timeout_secs", DEFAULT_TIMEOUT_SECS);
        Self::new(
            &camera.name,
            camera.id_field("url")?,
            Duration::from_secs(u64::from(timeout)),
        )
    }
}

impl FrameSource for HttpSnapshotSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn grab(&mut self) -> Result<Option<Frame>> {
        let response = self
            .agent
            .get(&self.url)
            .call()
            .with_context(|| format!("fetch jpeg snapshot from {}", self.url))?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_JPEG_BYTES as u64 + 1)
            .read_to_end(&mut bytes)
            .context("read jpeg snapshot")?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Frame::decode(&bytes).map(Some)
    }
}
