use super::{group_by_object, Assembled, Frame, ObjectSamples, SampleAssembler, SessionMode};
use crate::error::Result;
use crate::projection::{Projector, ReferencePoint, Scale};
use crate::sample::Sample;

/// Replays a complete, pre-recorded set of samples.
///
/// Samples are kept in arrival order; playback reveals a growing prefix of
/// them. Each reveal hands the session the newly revealed samples plus the
/// whole revealed prefix, from which trails are rebuilt in frame order.
#[derive(Debug, Clone)]
pub struct BatchAssembler {
    projector: Projector,
    samples: Vec<Sample>,
    /// Number of samples visible to the session
    visible: usize,
    /// Number of samples already handed out by `drain`
    delivered: usize,
}

impl BatchAssembler {
    /// Create an assembler with every sample revealed
    pub fn new(reference: ReferencePoint, scale: Scale, samples: Vec<Sample>) -> Result<Self> {
        let projector = Projector::new(reference, scale)?;
        let visible = samples.len();
        Ok(BatchAssembler {
            projector,
            samples,
            visible,
            delivered: 0,
        })
    }

    /// Create an assembler from recorded frames, flattened in frame order
    /// of the recording. Per-frame reference snapshots are ignored: a batch
    /// has a single reference point and scale.
    pub fn from_frames(reference: ReferencePoint, scale: Scale, frames: Vec<Frame>) -> Result<Self> {
        let samples = frames.into_iter().flat_map(Frame::into_samples).collect();
        Self::new(reference, scale, samples)
    }

    pub fn projector(&self) -> Projector {
        self.projector
    }

    /// Total number of samples in the batch
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn revealed(&self) -> usize {
        self.visible
    }

    pub fn is_complete(&self) -> bool {
        self.visible == self.samples.len()
    }

    /// Set the playback position, clamped to the batch size
    pub fn set_reveal(&mut self, count: usize) {
        self.visible = count.min(self.samples.len());
    }

    /// Advance the playback position by `count` samples
    pub fn step(&mut self, count: usize) {
        self.set_reveal(self.visible.saturating_add(count));
    }

    /// The first `count` samples (clamped), grouped by object
    pub fn reveal(&self, count: usize) -> Vec<ObjectSamples> {
        let end = count.min(self.samples.len());
        group_by_object(self.samples[..end].iter().cloned())
    }
}

impl SampleAssembler for BatchAssembler {
    fn mode(&self) -> SessionMode {
        SessionMode::Batch
    }

    fn drain(&mut self) -> Vec<Assembled> {
        let rewound = self.visible < self.delivered;
        if rewound {
            log::debug!(
                "Batch playback rewound from {} to {} samples",
                self.delivered,
                self.visible
            );
            self.delivered = 0;
        } else if self.visible == self.delivered && self.delivered > 0 {
            return Vec::new();
        }

        let fresh = group_by_object(self.samples[self.delivered..self.visible].iter().cloned());
        let history = self.reveal(self.visible);
        self.delivered = self.visible;

        vec![Assembled {
            projector: self.projector,
            fresh,
            history: Some(history),
            rewound,
            frame_number: None,
        }]
    }
}
