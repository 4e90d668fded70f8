//! Live frame streams
//!
//! Frames arrive as one JSON object per line, from a file, a pipe or stdin.
//! Malformed lines and frames the assembler refuses are logged and skipped;
//! only I/O failures end the stream early.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use herdtrack_core::frames::{Frame, FrameAcceptance, LiveAssembler};
use herdtrack_core::session::TrackingSession;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::output::Printer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub lines: u64,
    pub frames: u64,
    pub duplicates: u64,
    pub stale: u64,
    pub rejected: u64,
    pub malformed: u64,
    pub events: usize,
}

/// Open `path` for line reading; `None` or `-` reads stdin
pub async fn open_input(path: Option<&Path>) -> anyhow::Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match path {
        Some(path) if path != Path::new("-") => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Cannot open frame stream {}", path.display()))?;
            log::info!("Reading frames from {}", path.display());
            Ok(Box::new(BufReader::new(file)))
        }
        _ => {
            log::info!("Reading frames from stdin");
            Ok(Box::new(BufReader::new(tokio::io::stdin())))
        }
    }
}

/// Feed every frame read from `reader` into `session` until end of input
pub async fn stream_frames<R, W>(
    reader: R,
    live: &mut LiveAssembler,
    session: &mut TrackingSession,
    printer: &mut Printer<W>,
) -> anyhow::Result<StreamSummary>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = reader.lines();
    let mut summary = StreamSummary::default();

    while let Some(line) = lines.next_line().await.context("Cannot read frame stream")? {
        summary.lines += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut frame: Frame = match serde_json::from_str(line) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Line {}: malformed frame: {}", summary.lines, e);
                summary.malformed += 1;
                continue;
            }
        };
        frame
            .timestamp
            .get_or_insert_with(|| Utc::now().timestamp_millis());
        let frame_number = frame.frame_number;

        match live.push(frame) {
            Ok(FrameAcceptance::Accepted) => summary.frames += 1,
            Ok(FrameAcceptance::Duplicate) => {
                summary.duplicates += 1;
                continue;
            }
            Ok(FrameAcceptance::Stale) => {
                summary.stale += 1;
                continue;
            }
            Err(e) => {
                log::warn!("Frame {}: {}", frame_number, e);
                summary.rejected += 1;
                continue;
            }
        }

        let update = session.ingest(live);
        summary.events += update.events.len();
        printer.write_update(&update)?;
    }

    log::info!(
        "Stream ended after {} frames ({} duplicate, {} stale, {} rejected, {} malformed)",
        summary.frames,
        summary.duplicates,
        summary.stale,
        summary.rejected,
        summary.malformed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use herdtrack_core::config::EngineSettings;
    use herdtrack_core::projection::{GeoPoint, Projector, Scale};
    use std::io::Write as _;

    const FRAMES: &str = r#"{"frame_number": 1, "referencePoint": {"lat": -1.2921, "lng": 34.7617}, "scale": {"metersPerUnit": 1}, "objects": [{"id": 3, "x": 700, "y": 0}]}
{"frame_number": 2, "objects": [{"id": 3, "x": 300, "y": 0, "objectType": "elephant"}]}

not json
{"frame_number": 2, "objects": [{"id": 3, "x": 900, "y": 0}]}
{"frame_number": 1, "objects": [{"id": 3, "x": 900, "y": 0}]}
{"frame_number": 3, "scale": {"metersPerUnit": -1}, "objects": []}
{"frame_number": 4, "objects": [{"id": 3, "x": 800, "y": 0}]}
"#;

    #[tokio::test]
    async fn test_stream_skips_bad_frames() {
        let mut session = TrackingSession::new(EngineSettings::default()).unwrap();
        let mut live = LiveAssembler::new();
        let mut printer = Printer::new(Vec::new());

        let summary = stream_frames(FRAMES.as_bytes(), &mut live, &mut session, &mut printer)
            .await
            .unwrap();

        assert_eq!(summary.lines, 8);
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.stale, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.malformed, 1);

        // Entered + returned on frame 2, exited + violated on frame 4
        assert_eq!(summary.events, 4);
        assert_eq!(printer.alerts_raised(), 2);
        assert_eq!(session.trail("3").unwrap().len(), 3);
        assert!(!session.containment("3").unwrap().combined_inside);
    }

    #[tokio::test]
    async fn test_stream_from_file_with_known_projector() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"frame_number": 10, "objects": [{{"id": "a", "x": 5, "y": 5}}]}}"#).unwrap();
        writeln!(file, r#"{{"frame_number": 11, "objects": [{{"id": "a", "x": 6, "y": 6}}]}}"#).unwrap();

        let projector = Projector::new(GeoPoint::new(0.0, 0.0), Scale::new(10.0)).unwrap();
        let mut live = LiveAssembler::with_projector(projector);
        let mut session = TrackingSession::new(EngineSettings::default()).unwrap();
        let mut printer = Printer::new(Vec::new());

        let input = open_input(Some(file.path())).await.unwrap();
        let summary = stream_frames(input, &mut live, &mut session, &mut printer)
            .await
            .unwrap();

        assert_eq!(summary.frames, 2);
        assert_eq!(live.last_frame(), Some(11));
        assert_eq!(session.status().frames_processed, 2);
    }

    #[tokio::test]
    async fn test_missing_stream_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_input(Some(&dir.path().join("frames.jsonl"))).await.is_err());
    }
}
