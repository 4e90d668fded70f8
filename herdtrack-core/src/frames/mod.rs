//! Frame Assembly
//!
//! Detections reach the engine in one of two shapes:
//!
//! - **Batch**: a complete, pre-recorded set of samples with explicit frame
//!   indices, replayed by revealing a growing prefix ([`BatchAssembler`]).
//! - **Live**: an open-ended sequence of frames, each carrying its own
//!   reference point and scale snapshot ([`LiveAssembler`]).
//!
//! Both implement [`SampleAssembler`], so the session consumes either
//! without knowing which one it has.
//!
//! # Example
//!
//! ```rust
//! use herdtrack_core::frames::{Frame, LiveAssembler, SampleAssembler};
//! use herdtrack_core::projection::{GeoPoint, Scale};
//! use herdtrack_core::sample::Sample;
//!
//! let mut live = LiveAssembler::new();
//! let frame = Frame::new(1, vec![Sample::new("3", 12.0, 40.0)])
//!     .with_reference(GeoPoint::new(-1.2921, 34.7617), Scale::new(10.0));
//! live.push(frame).unwrap();
//!
//! let assembled = live.drain();
//! assert_eq!(assembled.len(), 1);
//! assert_eq!(assembled[0].fresh[0].samples[0].frame_index, Some(1));
//! ```

mod batch;
mod live;

pub use batch::BatchAssembler;
pub use live::{FrameAcceptance, LiveAssembler};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::projection::{Projector, ReferencePoint, Scale};
use crate::sample::Sample;

/// Data source mode of a tracking session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    #[default]
    Batch,
    Live,
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionMode::Batch => write!(f, "batch"),
            SessionMode::Live => write!(f, "live"),
        }
    }
}

/// One frame of detections, as produced by the tracking pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    #[serde(alias = "frame_number")]
    pub frame_number: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_point: Option<ReferencePoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Scale>,

    #[serde(default)]
    pub objects: Vec<Sample>,

    /// Milliseconds since epoch, applied to samples without their own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Frame {
    pub fn new(frame_number: u64, objects: Vec<Sample>) -> Self {
        Frame {
            frame_number,
            reference_point: None,
            scale: None,
            objects,
            timestamp: None,
        }
    }

    pub fn with_reference(mut self, reference: ReferencePoint, scale: Scale) -> Self {
        self.reference_point = Some(reference);
        self.scale = Some(scale);
        self
    }

    /// The frame's samples, stamped with the frame number as frame index
    /// and the frame timestamp where a sample has none
    pub fn into_samples(self) -> Vec<Sample> {
        let frame_number = self.frame_number;
        let timestamp = self.timestamp;
        self.objects
            .into_iter()
            .map(|mut s| {
                s.frame_index.get_or_insert(frame_number);
                if s.timestamp.is_none() {
                    s.timestamp = timestamp;
                }
                s
            })
            .collect()
    }
}

/// All samples of one object, sorted by (frame index, timestamp)
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSamples {
    pub object_id: String,
    pub samples: Vec<Sample>,
}

/// Group samples by object id. Groups are ordered by id, each group is
/// stable-sorted by (frame index, timestamp).
pub fn group_by_object<I>(samples: I) -> Vec<ObjectSamples>
where
    I: IntoIterator<Item = Sample>,
{
    let mut groups: BTreeMap<String, Vec<Sample>> = BTreeMap::new();
    for sample in samples {
        groups
            .entry(sample.object_id.clone())
            .or_default()
            .push(sample);
    }

    groups
        .into_iter()
        .map(|(object_id, mut samples)| {
            samples.sort_by(|a, b| a.order().cmp_key(&b.order()));
            ObjectSamples { object_id, samples }
        })
        .collect()
}

/// A unit of work handed from an assembler to the session
#[derive(Debug, Clone, PartialEq)]
pub struct Assembled {
    /// Reference point and scale the samples are expressed in
    pub projector: Projector,
    /// Samples not handed out before
    pub fresh: Vec<ObjectSamples>,
    /// Batch only: every revealed sample, for wholesale trail rebuild
    pub history: Option<Vec<ObjectSamples>>,
    /// Batch only: the reveal count moved backwards since the last drain
    pub rewound: bool,
    /// Live only: the frame these samples came from
    pub frame_number: Option<u64>,
}

/// Source of ordered, grouped samples for a tracking session
pub trait SampleAssembler {
    fn mode(&self) -> SessionMode;

    /// Take everything that became available since the last call
    fn drain(&mut self) -> Vec<Assembled>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_object_sorts_each_group() {
        let samples = vec![
            Sample::new("b", 1.0, 0.0).with_frame(3),
            Sample::new("a", 2.0, 0.0).with_frame(2),
            Sample::new("a", 0.0, 0.0).with_frame(0),
            Sample::new("b", 3.0, 0.0).with_frame(1),
            Sample::new("a", 1.0, 0.0).with_frame(1),
        ];

        let groups = group_by_object(samples);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].object_id, "a");
        let frames: Vec<_> = groups[0].samples.iter().map(|s| s.frame_index).collect();
        assert_eq!(frames, vec![Some(0), Some(1), Some(2)]);
        let frames: Vec<_> = groups[1].samples.iter().map(|s| s.frame_index).collect();
        assert_eq!(frames, vec![Some(1), Some(3)]);
    }

    #[test]
    fn test_frame_stamps_samples() {
        let mut own = Sample::new("1", 0.0, 0.0).with_timestamp(42);
        own.frame_index = Some(99);
        let frame = Frame {
            timestamp: Some(1000),
            ..Frame::new(5, vec![Sample::new("2", 1.0, 1.0), own])
        };

        let samples = frame.into_samples();
        assert_eq!(samples[0].frame_index, Some(5));
        assert_eq!(samples[0].timestamp, Some(1000));
        assert_eq!(samples[1].frame_index, Some(99));
        assert_eq!(samples[1].timestamp, Some(42));
    }

    #[test]
    fn test_frame_wire_format() {
        let frame: Frame = serde_json::from_str(
            r#"{
                "frame_number": 12,
                "referencePoint": {"lat": -1.2921, "lng": 34.7617},
                "scale": {"metersPerUnit": 10},
                "objects": [
                    {"id": 1, "x": 120, "y": 80, "timestamp": 1700000000000,
                     "objectType": "elephant", "confidence": 0.87}
                ],
                "timestamp": 1700000000000,
                "video_fps": 30
            }"#,
        )
        .unwrap();

        assert_eq!(frame.frame_number, 12);
        assert_eq!(frame.scale, Some(Scale::new(10.0)));
        assert_eq!(frame.objects[0].object_id, "1");
    }
}
