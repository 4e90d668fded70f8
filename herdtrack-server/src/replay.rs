//! Document replay
//!
//! A recorded document can be replayed two ways:
//!
//! - **batch**: the document becomes one
//!   [`BatchAssembler`](herdtrack_core::frames::BatchAssembler) whose reveal
//!   count advances frame by frame, so trails are always rebuilt from the
//!   whole revealed history;
//! - **live**: every frame is pushed through a [`LiveAssembler`] as if it
//!   had just arrived from a camera.
//!
//! Both optionally pace themselves with a tokio interval.

use std::io::Write;
use std::time::Duration;

use chrono::Utc;
use herdtrack_core::frames::{FrameAcceptance, LiveAssembler};
use herdtrack_core::session::{SessionUpdate, TrackingSession};

use crate::document::TrackingDocument;
use crate::output::Printer;

/// Progress is logged every this many frames
pub const PROGRESS_INTERVAL_FRAMES: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOptions {
    /// Frames revealed per step, at least 1
    pub frames_per_step: usize,
    /// Delay between steps; `None` replays as fast as possible
    pub interval: Option<Duration>,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        ReplayOptions {
            frames_per_step: 1,
            interval: None,
        }
    }
}

impl ReplayOptions {
    /// Pace steps at `rate` steps per second. Non-positive rates disable
    /// pacing.
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.interval = if rate.is_finite() && rate > 0.0 {
            Some(Duration::from_secs_f64(1.0 / rate))
        } else {
            None
        };
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub frames: usize,
    pub samples: u64,
    pub events: usize,
    pub skipped_frames: usize,
}

impl ReplaySummary {
    fn absorb(&mut self, update: &SessionUpdate) {
        self.samples += update.stats.processed;
        self.events += update.events.len();
    }
}

fn log_progress(frames: usize, total: usize) {
    if frames % PROGRESS_INTERVAL_FRAMES == 0 && total > 0 {
        log::info!(
            "Frame {}/{} ({:.1}%)",
            frames,
            total,
            frames as f64 * 100.0 / total as f64
        );
    }
}

/// Replay `document` through a batch assembler
pub async fn replay_batch<W: Write>(
    document: &TrackingDocument,
    session: &mut TrackingSession,
    printer: &mut Printer<W>,
    options: &ReplayOptions,
) -> anyhow::Result<ReplaySummary> {
    let mut batch = document.batch()?;
    batch.set_reveal(0);

    let boundaries = document.frame_boundaries();
    let step = options.frames_per_step.max(1);
    let mut ticker = options.interval.map(tokio::time::interval);
    let mut summary = ReplaySummary::default();

    while summary.frames < boundaries.len() {
        if let Some(ticker) = ticker.as_mut() {
            ticker.tick().await;
        } else {
            tokio::task::yield_now().await;
        }

        let next = (summary.frames + step).min(boundaries.len());
        batch.set_reveal(boundaries[next - 1]);
        let update = session.ingest(&mut batch);
        summary.absorb(&update);
        printer.write_update(&update)?;

        for frame in summary.frames + 1..=next {
            log_progress(frame, boundaries.len());
        }
        summary.frames = next;
    }

    log::info!(
        "Batch replay complete: {} frames, {} samples, {} transitions",
        summary.frames,
        summary.samples,
        summary.events
    );
    Ok(summary)
}

/// Replay `document` frame by frame through a live assembler.
///
/// Frames without a timestamp are stamped with the wall clock time at which
/// they are pushed.
pub async fn replay_live<W: Write>(
    document: &TrackingDocument,
    session: &mut TrackingSession,
    printer: &mut Printer<W>,
    options: &ReplayOptions,
) -> anyhow::Result<ReplaySummary> {
    let mut live = LiveAssembler::with_projector(document.projector()?);
    let mut ticker = options.interval.map(tokio::time::interval);
    let mut summary = ReplaySummary::default();
    let total = document.frames.len();

    for frame in &document.frames {
        if let Some(ticker) = ticker.as_mut() {
            ticker.tick().await;
        } else {
            tokio::task::yield_now().await;
        }

        let mut frame = frame.clone();
        frame
            .timestamp
            .get_or_insert_with(|| Utc::now().timestamp_millis());
        let frame_number = frame.frame_number;

        match live.push(frame) {
            Ok(FrameAcceptance::Accepted) => {}
            Ok(other) => {
                log::debug!("Frame {}: {:?}, skipped", frame_number, other);
                summary.skipped_frames += 1;
                continue;
            }
            Err(e) => {
                log::warn!("Frame {}: {}", frame_number, e);
                summary.skipped_frames += 1;
                continue;
            }
        }

        let update = session.ingest(&mut live);
        summary.absorb(&update);
        printer.write_update(&update)?;

        summary.frames += 1;
        log_progress(summary.frames, total);
    }

    log::info!(
        "Live replay complete: {} frames ({} skipped), {} transitions",
        summary.frames,
        summary.skipped_frames,
        summary.events
    );
    Ok(summary)
}
