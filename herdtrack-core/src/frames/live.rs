use std::collections::VecDeque;

use super::{group_by_object, Assembled, Frame, SampleAssembler, SessionMode};
use crate::error::{EngineError, Result};
use crate::projection::Projector;

/// What happened to a pushed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAcceptance {
    /// Queued for the next drain
    Accepted,
    /// Same frame number as the last accepted frame; ignored
    Duplicate,
    /// Lower frame number than the last accepted frame; ignored
    Stale,
}

/// Accumulates live frames as they arrive.
///
/// Each frame may carry a reference point and scale snapshot; frames
/// without one use the last known snapshot. Frame numbers must increase:
/// repeats and regressions are dropped without error, since live feeds
/// redeliver frames on reconnect.
#[derive(Debug, Clone, Default)]
pub struct LiveAssembler {
    projector: Option<Projector>,
    last_frame: Option<u64>,
    queue: VecDeque<(Projector, Frame)>,
    frames_accepted: u64,
}

impl LiveAssembler {
    pub fn new() -> Self {
        LiveAssembler::default()
    }

    /// Start with a known reference point and scale, for feeds whose
    /// frames carry no snapshot
    pub fn with_projector(projector: Projector) -> Self {
        LiveAssembler {
            projector: Some(projector),
            ..LiveAssembler::default()
        }
    }

    /// Last known reference point and scale
    pub fn projector(&self) -> Option<Projector> {
        self.projector
    }

    pub fn last_frame(&self) -> Option<u64> {
        self.last_frame
    }

    pub fn frames_accepted(&self) -> u64 {
        self.frames_accepted
    }

    /// Number of frames waiting for the next drain
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Offer a frame.
    ///
    /// Returns an error only when the frame's reference snapshot is invalid
    /// or when no snapshot is known at all; the frame is then dropped and
    /// the assembler state is unchanged.
    pub fn push(&mut self, frame: Frame) -> Result<FrameAcceptance> {
        if let Some(last) = self.last_frame {
            if frame.frame_number == last {
                log::debug!("Frame {}: duplicate delivery, ignored", frame.frame_number);
                return Ok(FrameAcceptance::Duplicate);
            }
            if frame.frame_number < last {
                log::warn!(
                    "Frame {}: arrived after frame {}, ignored",
                    frame.frame_number,
                    last
                );
                return Ok(FrameAcceptance::Stale);
            }
        }

        let projector = match (frame.reference_point, frame.scale, self.projector) {
            (Some(reference), Some(scale), _) => Projector::new(reference, scale)?,
            (Some(reference), None, Some(known)) => Projector::new(reference, known.scale())?,
            (None, Some(scale), Some(known)) => Projector::new(known.reference(), scale)?,
            (None, None, Some(known)) => known,
            (_, _, None) => {
                return Err(EngineError::invalid(format!(
                    "frame {} has no reference point and scale, and none is known yet",
                    frame.frame_number
                )))
            }
        };

        if let Some(known) = self.projector {
            if known.reference() != projector.reference() {
                log::info!(
                    "Frame {}: reference point moved to {:?}",
                    frame.frame_number,
                    projector.reference()
                );
            }
        }

        log::trace!(
            "Frame {}: {} objects",
            frame.frame_number,
            frame.objects.len()
        );
        self.projector = Some(projector);
        self.last_frame = Some(frame.frame_number);
        self.frames_accepted += 1;
        self.queue.push_back((projector, frame));
        Ok(FrameAcceptance::Accepted)
    }
}

impl SampleAssembler for LiveAssembler {
    fn mode(&self) -> SessionMode {
        SessionMode::Live
    }

    fn drain(&mut self) -> Vec<Assembled> {
        self.queue
            .drain(..)
            .map(|(projector, frame)| {
                let frame_number = frame.frame_number;
                Assembled {
                    projector,
                    fresh: group_by_object(frame.into_samples()),
                    history: None,
                    rewound: false,
                    frame_number: Some(frame_number),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{GeoPoint, Scale};
    use crate::sample::Sample;

    fn frame(n: u64, objects: Vec<Sample>) -> Frame {
        Frame::new(n, objects).with_reference(GeoPoint::new(-1.2921, 34.7617), Scale::new(10.0))
    }

    #[test]
    fn test_push_and_drain() {
        let mut live = LiveAssembler::new();
        assert_eq!(
            live.push(frame(1, vec![Sample::new("1", 1.0, 1.0)])).unwrap(),
            FrameAcceptance::Accepted
        );
        assert_eq!(
            live.push(frame(2, vec![Sample::new("1", 2.0, 2.0), Sample::new("2", 0.0, 5.0)]))
                .unwrap(),
            FrameAcceptance::Accepted
        );
        assert_eq!(live.pending(), 2);

        let drained = live.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].frame_number, Some(1));
        assert_eq!(drained[1].fresh.len(), 2);
        assert_eq!(drained[1].fresh[1].samples[0].frame_index, Some(2));
        assert_eq!(live.pending(), 0);
        assert!(live.drain().is_empty());
    }

    #[test]
    fn test_repeated_frame_is_noop() {
        let mut live = LiveAssembler::new();
        live.push(frame(5, vec![Sample::new("1", 1.0, 1.0)])).unwrap();
        assert_eq!(
            live.push(frame(5, vec![Sample::new("1", 9.0, 9.0)])).unwrap(),
            FrameAcceptance::Duplicate
        );
        assert_eq!(
            live.push(frame(3, vec![Sample::new("1", 9.0, 9.0)])).unwrap(),
            FrameAcceptance::Stale
        );
        assert_eq!(live.pending(), 1);
        assert_eq!(live.frames_accepted(), 1);
    }

    #[test]
    fn test_invalid_scale_is_configuration_error() {
        let mut live = LiveAssembler::new();
        let bad = Frame::new(1, Vec::new()).with_reference(GeoPoint::new(0.0, 0.0), Scale::new(-2.0));
        assert!(matches!(
            live.push(bad),
            Err(EngineError::InvalidConfiguration(_))
        ));
        assert_eq!(live.last_frame(), None);
        assert_eq!(live.pending(), 0);
    }

    #[test]
    fn test_frame_without_snapshot_uses_last_known() {
        let mut live = LiveAssembler::new();
        assert!(live.push(Frame::new(1, Vec::new())).is_err());

        live.push(frame(2, Vec::new())).unwrap();
        live.push(Frame::new(3, vec![Sample::new("1", 1.0, 1.0)])).unwrap();

        let drained = live.drain();
        assert_eq!(drained[1].projector.scale(), Scale::new(10.0));
    }

    #[test]
    fn test_scale_change_applies_to_later_frames() {
        let mut live = LiveAssembler::new();
        live.push(frame(1, Vec::new())).unwrap();

        let mut rescaled = Frame::new(2, Vec::new());
        rescaled.scale = Some(Scale::new(1.0));
        live.push(rescaled).unwrap();

        let drained = live.drain();
        assert_eq!(drained[0].projector.scale(), Scale::new(10.0));
        assert_eq!(drained[1].projector.scale(), Scale::new(1.0));
        assert_eq!(drained[1].projector.reference(), GeoPoint::new(-1.2921, 34.7617));
    }

    #[test]
    fn test_preconfigured_projector() {
        let projector = Projector::new(GeoPoint::new(0.0, 0.0), Scale::new(1.0)).unwrap();
        let mut live = LiveAssembler::with_projector(projector);
        assert_eq!(
            live.push(Frame::new(1, Vec::new())).unwrap(),
            FrameAcceptance::Accepted
        );
    }
}
