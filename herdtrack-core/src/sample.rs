//! Position Samples
//!
//! A [`Sample`] is one observation of one tracked object at one instant, in
//! local planar units. Samples are produced by the detector outside the
//! engine and consumed once.

use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;

/// Accept both string and integer object ids.
///
/// The detector pipelines emit tracker ids as plain integers (`"id": 3`) in
/// some feeds and as strings (`"id": "elephant_3"`) in others.
fn deserialize_object_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Ok(u.to_string())
            } else {
                Err(D::Error::custom("object id must be an integer or a string"))
            }
        }
        _ => Err(D::Error::custom("object id must be an integer or a string")),
    }
}

/// One observation of a tracked object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    #[serde(alias = "id", deserialize_with = "deserialize_object_id")]
    pub object_id: String,

    /// East offset from the reference point, in local units
    pub x: f64,

    /// North offset from the reference point, in local units
    pub y: f64,

    /// Milliseconds since epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,

    /// Detector confidence in [0, 1]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    #[serde(
        default,
        alias = "frame_index",
        alias = "frame_source",
        skip_serializing_if = "Option::is_none"
    )]
    pub frame_index: Option<u64>,
}

impl Sample {
    pub fn new(object_id: impl Into<String>, x: f64, y: f64) -> Self {
        Sample {
            object_id: object_id.into(),
            x,
            y,
            timestamp: None,
            object_type: None,
            confidence: None,
            frame_index: None,
        }
    }

    pub fn with_frame(mut self, frame_index: u64) -> Self {
        self.frame_index = Some(frame_index);
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn order(&self) -> SampleOrder {
        SampleOrder {
            frame_index: self.frame_index,
            timestamp: self.timestamp,
        }
    }
}

/// Chronological ordering key of a sample: frame index, then timestamp.
///
/// Missing values sort before present ones, which keeps untagged samples in
/// their arrival order under a stable sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleOrder {
    pub frame_index: Option<u64>,
    pub timestamp: Option<i64>,
}

impl SampleOrder {
    pub fn cmp_key(&self, other: &SampleOrder) -> Ordering {
        self.frame_index
            .cmp(&other.frame_index)
            .then(self.timestamp.cmp(&other.timestamp))
    }

    /// True if `self` is strictly earlier than `last`.
    ///
    /// Only components present on both sides are compared: a sample with no
    /// frame index is never stale by frame, and likewise for timestamps.
    pub fn is_before(&self, last: &SampleOrder) -> bool {
        if let (Some(frame), Some(last_frame)) = (self.frame_index, last.frame_index) {
            if frame != last_frame {
                return frame < last_frame;
            }
        }
        match (self.timestamp, last.timestamp) {
            (Some(ts), Some(last_ts)) => ts < last_ts,
            _ => false,
        }
    }
}
