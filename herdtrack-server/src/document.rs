//! Recorded tracking documents
//!
//! A document is the complete output of one offline detection run:
//!
//! ```json
//! {
//!   "metadata": {
//!     "total_frames": 2,
//!     "fps": 30.0,
//!     "video_duration": 0.066,
//!     "camera_config": {
//!       "referencePoint": {"lat": -1.2921, "lng": 34.7617},
//!       "scale": {"metersPerUnit": 1}
//!     }
//!   },
//!   "frames": [
//!     {"frame_number": 1, "objects": [{"id": 3, "x": 120, "y": 40}]},
//!     {"frame_number": 2, "objects": [{"id": 3, "x": 124, "y": 41}]}
//!   ]
//! }
//! ```

use std::path::Path;

use anyhow::Context;
use herdtrack_core::error::EngineError;
use herdtrack_core::frames::{BatchAssembler, Frame};
use herdtrack_core::projection::{Projector, ReferencePoint, Scale};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Frame rate assumed when the document does not state one
pub const DEFAULT_FPS: f64 = 30.0;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Malformed tracking document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Tracking document has no camera_config and its first frame has no referencePoint")]
    MissingCameraConfig,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Reference point and scale of the recording camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraConfig {
    #[serde(alias = "reference_point")]
    pub reference_point: ReferencePoint,
    #[serde(default)]
    pub scale: Scale,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_config: Option<CameraConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingDocument {
    #[serde(default)]
    pub metadata: DocumentMetadata,
    #[serde(default)]
    pub frames: Vec<Frame>,
}

impl TrackingDocument {
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Cannot read tracking document {}", path.display()))?;
        let document = Self::from_json(&json)
            .with_context(|| format!("Cannot load tracking document {}", path.display()))?;

        log::info!(
            "Loaded {}: {} frames ({} samples) at {} fps",
            path.display(),
            document.total_frames(),
            document.sample_count(),
            document.fps()
        );
        Ok(document)
    }

    /// Camera configuration from the metadata, else from the first frame
    /// that carries a reference point
    pub fn camera(&self) -> Result<CameraConfig, DocumentError> {
        if let Some(camera) = self.metadata.camera_config {
            return Ok(camera);
        }
        self.frames
            .iter()
            .find_map(|f| {
                f.reference_point.map(|reference_point| CameraConfig {
                    reference_point,
                    scale: f.scale.unwrap_or_default(),
                })
            })
            .ok_or(DocumentError::MissingCameraConfig)
    }

    pub fn projector(&self) -> Result<Projector, DocumentError> {
        let camera = self.camera()?;
        Ok(Projector::new(camera.reference_point, camera.scale)?)
    }

    /// Batch assembler over every sample in the document, fully revealed
    pub fn batch(&self) -> Result<BatchAssembler, DocumentError> {
        let camera = self.camera()?;
        Ok(BatchAssembler::from_frames(
            camera.reference_point,
            camera.scale,
            self.frames.clone(),
        )?)
    }

    pub fn fps(&self) -> f64 {
        match self.metadata.fps {
            Some(fps) if fps.is_finite() && fps > 0.0 => fps,
            _ => DEFAULT_FPS,
        }
    }

    pub fn total_frames(&self) -> u64 {
        self.metadata
            .total_frames
            .unwrap_or(self.frames.len() as u64)
    }

    pub fn sample_count(&self) -> usize {
        self.frames.iter().map(|f| f.objects.len()).sum()
    }

    /// Number of samples revealed after each frame, in document order
    pub fn frame_boundaries(&self) -> Vec<usize> {
        self.frames
            .iter()
            .scan(0usize, |total, frame| {
                *total += frame.objects.len();
                Some(*total)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herdtrack_core::frames::SampleAssembler;
    use herdtrack_core::projection::GeoPoint;
    use std::io::Write;

    const DOCUMENT: &str = r#"{
        "metadata": {
            "total_frames": 2,
            "fps": 25.0,
            "video_duration": 0.08,
            "camera_config": {
                "referencePoint": {"lat": -1.2921, "lng": 34.7617},
                "scale": {"metersPerUnit": 1}
            }
        },
        "frames": [
            {"frame_number": 1, "video_timestamp": 1000,
             "objects": [{"id": 3, "x": 120, "y": 40, "objectType": "elephant", "confidence": 0.91}]},
            {"frame_number": 2,
             "objects": [{"id": 3, "x": 124, "y": 41}, {"id": "elephant_7", "x": -30, "y": 10}]}
        ]
    }"#;

    #[test]
    fn test_parse_document_layout() {
        let document = TrackingDocument::from_json(DOCUMENT).unwrap();
        assert_eq!(document.total_frames(), 2);
        assert_eq!(document.fps(), 25.0);
        assert_eq!(document.sample_count(), 3);
        assert_eq!(document.frame_boundaries(), vec![1, 3]);

        let camera = document.camera().unwrap();
        assert_eq!(camera.reference_point, GeoPoint::new(-1.2921, 34.7617));
        assert_eq!(camera.scale, Scale::new(1.0));

        let first = &document.frames[0].objects[0];
        assert_eq!(first.object_id, "3");
        assert_eq!(first.object_type.as_deref(), Some("elephant"));
    }

    #[test]
    fn test_batch_stamps_frame_numbers() {
        let document = TrackingDocument::from_json(DOCUMENT).unwrap();
        let mut batch = document.batch().unwrap();
        assert_eq!(batch.len(), 3);

        let drained = batch.drain();
        let three = &drained[0].fresh[0];
        assert_eq!(three.object_id, "3");
        let frames: Vec<_> = three.samples.iter().map(|s| s.frame_index).collect();
        assert_eq!(frames, vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_camera_from_first_frame() {
        let document = TrackingDocument::from_json(
            r#"{"frames": [
                {"frame_number": 1, "objects": []},
                {"frame_number": 2, "referencePoint": {"lat": 1.0, "lng": 2.0}, "objects": []}
            ]}"#,
        )
        .unwrap();
        let camera = document.camera().unwrap();
        assert_eq!(camera.reference_point, GeoPoint::new(1.0, 2.0));
        assert_eq!(camera.scale, Scale::default());
        assert_eq!(document.fps(), DEFAULT_FPS);
    }

    #[test]
    fn test_missing_camera_is_error() {
        let document = TrackingDocument::from_json(r#"{"frames": []}"#).unwrap();
        assert!(matches!(document.batch(), Err(DocumentError::MissingCameraConfig)));
    }

    #[test]
    fn test_invalid_scale_is_error() {
        let document = TrackingDocument::from_json(
            r#"{"metadata": {"camera_config": {"referencePoint": {"lat": 0, "lng": 0}, "scale": {"metersPerUnit": 0}}}}"#,
        )
        .unwrap();
        assert!(matches!(document.projector(), Err(DocumentError::Engine(_))));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOCUMENT.as_bytes()).unwrap();

        let document = TrackingDocument::load(file.path()).await.unwrap();
        assert_eq!(document.frames.len(), 2);

        let mut broken = tempfile::NamedTempFile::new().unwrap();
        broken.write_all(b"{\"frames\": [").unwrap();
        assert!(TrackingDocument::load(broken.path()).await.is_err());
    }
}
