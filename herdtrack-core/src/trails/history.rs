use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::error::{EngineError, Result};
use crate::projection::{distance_meters, GeoPoint, ReferencePoint};
use crate::sample::SampleOrder;

/// Hard upper bound on the number of points kept per object
pub const MAX_TRAIL_POINTS: usize = 1000;

/// Points closer than this in both latitude and longitude are duplicates
pub const DEFAULT_DUPLICATE_THRESHOLD_DEGREES: f64 = 1e-5;

/// Live points within this distance of the reference point are detector noise
pub const DEFAULT_CENTER_SKIP_METERS: f64 = 1.0;

/// Trail configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrailSettings {
    /// Maximum points per trail, 1..=MAX_TRAIL_POINTS
    pub max_points: usize,
    pub duplicate_threshold_degrees: f64,
    /// Radius around the reference point in which live points are dropped.
    /// Zero disables the filter for everything but the exact anchor.
    pub center_skip_meters: f64,
}

impl Default for TrailSettings {
    fn default() -> Self {
        TrailSettings {
            max_points: MAX_TRAIL_POINTS,
            duplicate_threshold_degrees: DEFAULT_DUPLICATE_THRESHOLD_DEGREES,
            center_skip_meters: DEFAULT_CENTER_SKIP_METERS,
        }
    }
}

impl TrailSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_points == 0 || self.max_points > MAX_TRAIL_POINTS {
            return Err(EngineError::invalid(format!(
                "trail maxPoints must be within 1..={}, got {}",
                MAX_TRAIL_POINTS, self.max_points
            )));
        }
        if !self.duplicate_threshold_degrees.is_finite() || self.duplicate_threshold_degrees < 0.0
        {
            return Err(EngineError::invalid(format!(
                "duplicateThresholdDegrees must be >= 0, got {}",
                self.duplicate_threshold_degrees
            )));
        }
        if !self.center_skip_meters.is_finite() || self.center_skip_meters < 0.0 {
            return Err(EngineError::invalid(format!(
                "centerSkipMeters must be >= 0, got {}",
                self.center_skip_meters
            )));
        }
        Ok(())
    }
}

/// A single projected trail position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailPoint {
    pub position: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl TrailPoint {
    pub fn new(position: GeoPoint) -> Self {
        TrailPoint {
            position,
            frame_index: None,
            timestamp: None,
        }
    }

    pub fn at(position: GeoPoint, order: SampleOrder) -> Self {
        TrailPoint {
            position,
            frame_index: order.frame_index,
            timestamp: order.timestamp,
        }
    }

    pub fn order(&self) -> SampleOrder {
        SampleOrder {
            frame_index: self.frame_index,
            timestamp: self.timestamp,
        }
    }
}

/// Result of an incremental append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The point was added to the trail
    Appended,
    /// Dropped: same position as the trail's last point
    Duplicate,
    /// Dropped: within the center-skip radius of the reference point
    CenterNoise,
}

/// Per-object trail storage
#[derive(Debug, Clone, Default)]
pub struct TrailStore {
    settings: TrailSettings,
    trails: HashMap<String, VecDeque<TrailPoint>>,
}

impl TrailStore {
    pub fn new(settings: TrailSettings) -> Self {
        TrailStore {
            settings,
            trails: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &TrailSettings {
        &self.settings
    }

    /// True if a live point at `position` would be dropped as reference
    /// point noise
    pub fn is_center_noise(&self, position: GeoPoint, reference: ReferencePoint) -> bool {
        distance_meters(reference, position) <= self.settings.center_skip_meters
    }

    /// Replace the trail for `object_id` with `points`, sorted by
    /// (frame index, timestamp). Used for batch playback, where samples may
    /// have been delivered out of order. Every point is kept, including
    /// duplicates and points at the reference point.
    pub fn rebuild(&mut self, object_id: &str, mut points: Vec<TrailPoint>) -> &VecDeque<TrailPoint> {
        points.sort_by(|a, b| a.order().cmp_key(&b.order()));

        let skip = points.len().saturating_sub(self.settings.max_points);
        let trail: VecDeque<TrailPoint> = points.into_iter().skip(skip).collect();

        log::trace!("{}: trail rebuilt with {} points", object_id, trail.len());
        self.trails.insert(object_id.to_string(), trail);
        &self.trails[object_id]
    }

    /// Append a live point to the trail for `object_id`, creating the trail
    /// on first sighting.
    pub fn append(
        &mut self,
        object_id: &str,
        point: TrailPoint,
        reference: ReferencePoint,
    ) -> AppendOutcome {
        if self.is_center_noise(point.position, reference) {
            log::trace!(
                "{}: skipping point {:?} near reference point",
                object_id,
                point.position
            );
            return AppendOutcome::CenterNoise;
        }

        let threshold = self.settings.duplicate_threshold_degrees;
        let max_points = self.settings.max_points;
        let trail = self.trails.entry(object_id.to_string()).or_default();

        if let Some(last) = trail.back() {
            if (last.position.lat - point.position.lat).abs() <= threshold
                && (last.position.lng - point.position.lng).abs() <= threshold
            {
                return AppendOutcome::Duplicate;
            }
        }

        trail.push_back(point);
        while trail.len() > max_points {
            trail.pop_front();
        }
        AppendOutcome::Appended
    }

    pub fn trail(&self, object_id: &str) -> Option<&VecDeque<TrailPoint>> {
        self.trails.get(object_id)
    }

    /// Trail positions only, oldest first
    pub fn positions(&self, object_id: &str) -> Vec<GeoPoint> {
        self.trails
            .get(object_id)
            .map(|t| t.iter().map(|p| p.position).collect())
            .unwrap_or_default()
    }

    pub fn object_ids(&self) -> impl Iterator<Item = &str> {
        self.trails.keys().map(|k| k.as_str())
    }

    /// Number of objects with a trail
    pub fn len(&self) -> usize {
        self.trails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trails.is_empty()
    }

    pub fn remove(&mut self, object_id: &str) -> Option<VecDeque<TrailPoint>> {
        self.trails.remove(object_id)
    }

    pub fn clear(&mut self) {
        self.trails.clear();
    }
}
