//! Inference service collaborators.
//!
//! A worker connects once at startup through an `InferenceConnector` and then
//! drives its own `InferenceClient`: submit a frame without waiting, then poll the
//! query by id until the cycle deadline.

use anyhow::Result;
use std::time::Duration;

use crate::frame::Frame;

pub mod http;

pub use http::{HttpInferenceClient, HttpInferenceConnector};

/// Label the service reports when it could not answer a query.
pub const QUERY_FAIL_LABEL: &str = "QUERY_FAIL";

/// Server-side view of a detector.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorInfo {
    pub id: String,
    pub name: String,
    pub confidence_threshold: Option<f64>,
}

/// An in-flight or answered image query.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub id: String,
    pub label: Option<String>,
    pub confidence: Option<f64>,
}

impl Query {
    pub fn pending(id: &str) -> Self {
        Self {
            id: id.to_string(),
            label: None,
            confidence: None,
        }
    }

    /// True once the result is decisive: confidence above `threshold`, or no
    /// confidence but a real label (answers from human review carry none).
    pub fn crosses(&self, threshold: f64) -> bool {
        match (self.confidence, self.label.as_deref()) {
            (Some(confidence), _) => confidence > threshold,
            (None, Some(label)) => label != QUERY_FAIL_LABEL,
            (None, None) => false,
        }
    }
}

pub trait InferenceClient: Send {
    /// Looks up the detector by id.
    fn detector(&self, id: &str) -> Result<DetectorInfo>;

    /// Submits a frame. With a zero `wait` the call returns as soon as the query is
    /// accepted.
    fn submit_query(&self, detector: &DetectorInfo, frame: &Frame, wait: Duration)
        -> Result<Query>;

    /// Fetches the current state of a query.
    fn get_query(&self, id: &str) -> Result<Query>;
}

/// Opens a client for one worker.
pub trait InferenceConnector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn InferenceClient>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(label: Option<&str>, confidence: Option<f64>) -> Query {
        Query {
            id: "iq_1".to_string(),
            label: label.map(str::to_string),
            confidence,
        }
    }

    #[test]
    fn confidence_must_exceed_threshold() {
        assert!(query(Some("YES"), Some(0.95)).crosses(0.9));
        assert!(!query(Some("YES"), Some(0.9)).crosses(0.9));
        assert!(!query(Some("YES"), Some(0.5)).crosses(0.9));
    }

    #[test]
    fn label_without_confidence_crosses_unless_failed() {
        assert!(query(Some("NO"), None).crosses(0.9));
        assert!(!query(Some(QUERY_FAIL_LABEL), None).crosses(0.9));
        assert!(!Query::pending("iq_1").crosses(0.9));
    }
}
