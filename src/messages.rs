//! Messages published by detector workers.
//!
//! `LiveReviewMetadata` and `CancelNotice` are fire-and-forget snapshots for the live
//! review consumer. Field names on the wire follow the consumer's JSON shape
//! (`det_id`, `det_name`, ...).

use serde::{Deserialize, Serialize};

/// Signal from a worker asking its frame server for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchRequest;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiveReviewMetadata {
    pub uuid: String,
    #[serde(rename = "det_id")]
    pub detector_id: String,
    #[serde(rename = "det_name")]
    pub detector_name: String,
    #[serde(rename = "det_query")]
    pub detector_query_text: String,
    pub query_id: String,
    #[serde(rename = "det_idx")]
    pub detector_index: usize,
    #[serde(rename = "imgsrc_idx")]
    pub image_source_index: Option<usize>,
    /// Base64 JPEG.
    #[serde(rename = "image")]
    pub image_base64: String,
}

/// Tells the live review consumer that a cycle's decision has settled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CancelNotice {
    pub cancel: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub uuid: String,
    #[serde(rename = "det_id")]
    pub detector_id: String,
    #[serde(rename = "det_name")]
    pub detector_name: String,
    #[serde(rename = "det_query")]
    pub detector_query_text: String,
    #[serde(rename = "det_idx")]
    pub detector_index: usize,
    #[serde(rename = "imgsrc_idx")]
    pub image_source_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl CancelNotice {
    /// True for the notice published when a cycle reaches its deadline without a
    /// result crossing the threshold.
    pub fn is_default(&self) -> bool {
        self.confidence.is_none() && self.label.is_none()
    }

    #[cfg(test)]
    pub(crate) fn test_notice(detector_id: &str) -> Self {
        Self {
            cancel: true,
            confidence: None,
            uuid: "0".repeat(32),
            detector_id: detector_id.to_string(),
            detector_name: detector_id.to_string(),
            detector_query_text: "?".to_string(),
            detector_index: 0,
            image_source_index: Some(0),
            label: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_notice_uses_wire_field_names() {
        let notice = CancelNotice {
            confidence: Some(0.95),
            label: Some("YES".to_string()),
            ..CancelNotice::test_notice("det_1")
        };
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["cancel"], true);
        assert_eq!(json["det_id"], "det_1");
        assert_eq!(json["imgsrc_idx"], 0);
        assert_eq!(json["confidence"], 0.95);
        assert_eq!(json["label"], "YES");
        assert!(!notice.is_default());
    }

    #[test]
    fn default_notice_omits_confidence_and_label() {
        let notice = CancelNotice::test_notice("det_1");
        let json = serde_json::to_value(&notice).unwrap();
        assert!(json.get("confidence").is_none());
        assert!(json.get("label").is_none());
        assert!(notice.is_default());
    }
}
