//! REST inference client.
//!
//! Endpoints (relative to the configured base URL):
//! - `GET  /v1/detectors/{id}`
//! - `POST /v1/image-queries?detector_id={id}&wait={secs}` with a JPEG body
//! - `GET  /v1/image-queries/{id}`

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::time::Duration;

use super::{DetectorInfo, InferenceClient, InferenceConnector, Query};
use crate::config::InferenceSettings;
use crate::frame::Frame;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct DetectorResponse {
    id: String,
    name: String,
    #[serde(default)]
    confidence_threshold: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ImageQueryResponse {
    id: String,
    #[serde(default)]
    result: Option<QueryResultResponse>,
}

#[derive(Debug, Deserialize)]
struct QueryResultResponse {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

impl From<ImageQueryResponse> for Query {
    fn from(resp: ImageQueryResponse) -> Self {
        let (label, confidence) = match resp.result {
            Some(result) => (result.label, result.confidence),
            None => (None, None),
        };
        Query {
            id: resp.id,
            label,
            confidence,
        }
    }
}

pub struct HttpInferenceClient {
    agent: ureq::Agent,
    base: url::Url,
    auth_header: Option<String>,
}

impl HttpInferenceClient {
    pub fn new(settings: &InferenceSettings) -> Result<Self> {
        let mut base = url::Url::parse(&settings.endpoint)
            .with_context(|| format!("parse inference endpoint {}", settings.endpoint))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Ok(Self {
            agent,
            base,
            auth_header: settings
                .api_token
                .as_ref()
                .map(|token| format!("Bearer {}", token)),
        })
    }

    fn url(&self, path: &str) -> Result<url::Url> {
        self.base
            .join(path)
            .with_context(|| format!("build inference url for {}", path))
    }

    fn authorize(&self, request: ureq::Request) -> ureq::Request {
        match &self.auth_header {
            Some(value) => request.set("Authorization", value),
            None => request,
        }
    }
}

impl InferenceClient for HttpInferenceClient {
    fn detector(&self, id: &str) -> Result<DetectorInfo> {
        let url = self.url(&format!("v1/detectors/{}", id))?;
        let resp: DetectorResponse = self
            .authorize(self.agent.request_url("GET", &url))
            .call()
            .with_context(|| format!("fetch detector {}", id))?
            .into_json()
            .context("decode detector response")?;
        Ok(DetectorInfo {
            id: resp.id,
            name: resp.name,
            confidence_threshold: resp.confidence_threshold,
        })
    }

    fn submit_query(
        &self,
        detector: &DetectorInfo,
        frame: &Frame,
        wait: Duration,
    ) -> Result<Query> {
        let jpeg = frame.to_jpeg()?;
        let url = self.url("v1/image-queries")?;
        let resp: ImageQueryResponse = self
            .authorize(self.agent.request_url("POST", &url))
            .query("detector_id", &detector.id)
            .query("wait", &wait.as_secs_f64().to_string())
            .set("Content-Type", "image/jpeg")
            .send_bytes(&jpeg)
            .with_context(|| format!("submit image query for detector {}", detector.id))?
            .into_json()
            .context("decode image query response")?;
        if resp.id.is_empty() {
            return Err(anyhow!("image query response carried no id"));
        }
        Ok(resp.into())
    }

    fn get_query(&self, id: &str) -> Result<Query> {
        let url = self.url(&format!("v1/image-queries/{}", id))?;
        let resp: ImageQueryResponse = self
            .authorize(self.agent.request_url("GET", &url))
            .call()
            .with_context(|| format!("fetch image query {}", id))?
            .into_json()
            .context("decode image query response")?;
        Ok(resp.into())
    }
}

/// Builds one `HttpInferenceClient` per worker from shared settings.
pub struct HttpInferenceConnector {
    settings: InferenceSettings,
}

impl HttpInferenceConnector {
    pub fn new(settings: InferenceSettings) -> Self {
        Self { settings }
    }
}

impl InferenceConnector for HttpInferenceConnector {
    fn connect(&self) -> Result<Box<dyn InferenceClient>> {
        Ok(Box::new(HttpInferenceClient::new(&self.settings)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(endpoint: &str) -> InferenceSettings {
        InferenceSettings {
            endpoint: endpoint.to_string(),
            api_token: Some("tok".to_string()),
        }
    }

    #[test]
    fn joins_paths_under_base_prefix() {
        let client = HttpInferenceClient::new(&settings("http://edge:30101/device-api")).unwrap();
        assert_eq!(
            client.url("v1/image-queries/iq_1").unwrap().as_str(),
            "http://edge:30101/device-api/v1/image-queries/iq_1"
        );
        assert_eq!(client.auth_header.as_deref(), Some("Bearer tok"));
    }

    #[test]
    fn pending_response_maps_to_empty_result() {
        let resp: ImageQueryResponse = serde_json::from_str(r#"{"id": "iq_9"}"#).unwrap();
        let query = Query::from(resp);
        assert_eq!(query, Query::pending("iq_9"));
    }

    #[test]
    fn answered_response_maps_label_and_confidence() {
        let resp: ImageQueryResponse = serde_json::from_str(
            r#"{"id": "iq_9", "result": {"label": "YES", "confidence": 0.97}}"#,
        )
        .unwrap();
        let query = Query::from(resp);
        assert_eq!(query.label.as_deref(), Some("YES"));
        assert_eq!(query.confidence, Some(0.97));
    }

    #[test]
    fn rejects_invalid_endpoint() {
        assert!(HttpInferenceClient::new(&settings("not a url")).is_err());
    }
}
