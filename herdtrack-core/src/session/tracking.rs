use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::config::EngineSettings;
use crate::error::Result;
use crate::frames::{Assembled, SampleAssembler, SessionMode};
use crate::geofence::{BoundaryConfig, Containment, GeofenceCircle, GeofenceSet};
use crate::projection::{GeoPoint, Projector};
use crate::sample::{Sample, SampleOrder};
use crate::trails::{AppendOutcome, TrailPoint, TrailStore};
use crate::transitions::{TransitionEvent, TransitionTracker};

/// Latest state of one object after an ingest
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectUpdate {
    pub object_id: String,
    pub position: GeoPoint,
    pub containment: Containment,
    /// Full trail, oldest first
    pub trail: Vec<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_index: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Counters for one ingest call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    /// Live frames consumed
    pub frames: u64,
    /// Samples offered
    pub samples: u64,
    /// Samples that updated containment
    pub processed: u64,
    /// Samples older than the last processed one of their object
    pub out_of_order: u64,
    /// Live samples at the reference point
    pub center_noise: u64,
    /// Live samples not added to the trail because they did not move
    pub duplicates: u64,
}

/// Result of one ingest call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    pub mode: SessionMode,
    /// One entry per object with a processed sample, ordered by object id
    pub positions: Vec<ObjectUpdate>,
    /// Transitions in input order per object
    pub events: Vec<TransitionEvent>,
    pub stats: IngestStats,
}

impl SessionUpdate {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.events.is_empty()
    }
}

/// Summary of a session, for status queries
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub mode: SessionMode,
    pub frames_processed: u64,
    pub samples_processed: u64,
    pub objects_tracked: usize,
    pub objects_inside: usize,
    pub geofences: usize,
}

/// State of one tracking session
#[derive(Debug, Clone)]
pub struct TrackingSession {
    settings: EngineSettings,
    mode: SessionMode,
    projector: Option<Projector>,
    trails: TrailStore,
    geofences: GeofenceSet,
    tracker: TransitionTracker,
    /// Ordering key of the last processed sample per object
    cursors: HashMap<String, SampleOrder>,
    frames_processed: u64,
    samples_processed: u64,
}

impl TrackingSession {
    pub fn new(settings: EngineSettings) -> Result<Self> {
        settings.trail.validate()?;
        let geofences = settings.geofence_set()?;
        Ok(Self::from_validated(settings, geofences))
    }

    pub(crate) fn from_validated(settings: EngineSettings, geofences: GeofenceSet) -> Self {
        TrackingSession {
            trails: TrailStore::new(settings.trail.clone()),
            settings,
            mode: SessionMode::default(),
            projector: None,
            geofences,
            tracker: TransitionTracker::new(),
            cursors: HashMap::new(),
            frames_processed: 0,
            samples_processed: 0,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Reference point and scale of the most recent input
    pub fn projector(&self) -> Option<Projector> {
        self.projector
    }

    pub fn geofences(&self) -> &GeofenceSet {
        &self.geofences
    }

    pub fn trails(&self) -> &TrailStore {
        &self.trails
    }

    pub fn trail(&self, object_id: &str) -> Option<&VecDeque<TrailPoint>> {
        self.trails.trail(object_id)
    }

    pub fn containment(&self, object_id: &str) -> Option<Containment> {
        self.tracker.containment(object_id)
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            mode: self.mode,
            frames_processed: self.frames_processed,
            samples_processed: self.samples_processed,
            objects_tracked: self.cursors.len(),
            objects_inside: self.tracker.inside_count(),
            geofences: self.geofences.circles().len(),
        }
    }

    /// Consume everything the assembler has available.
    ///
    /// An assembler of a different mode than the session's current one
    /// resets the session first.
    pub fn ingest<A>(&mut self, assembler: &mut A) -> SessionUpdate
    where
        A: SampleAssembler + ?Sized,
    {
        let mode = assembler.mode();
        if mode != self.mode {
            self.switch_mode(mode);
        }

        let mut update = SessionUpdate {
            mode,
            ..SessionUpdate::default()
        };
        let mut latest: BTreeMap<String, ObjectUpdate> = BTreeMap::new();

        for work in assembler.drain() {
            self.apply(work, &mut update, &mut latest);
        }

        update.positions = latest
            .into_values()
            .map(|mut object| {
                object.trail = self.trails.positions(&object.object_id);
                object
            })
            .collect();

        if update.stats.out_of_order > 0 || update.stats.center_noise > 0 {
            log::debug!(
                "Ingest: {} samples, {} out of order, {} center noise",
                update.stats.samples,
                update.stats.out_of_order,
                update.stats.center_noise
            );
        }
        update
    }

    fn apply(
        &mut self,
        work: Assembled,
        update: &mut SessionUpdate,
        latest: &mut BTreeMap<String, ObjectUpdate>,
    ) {
        let projector = work.projector;
        self.projector = Some(projector);

        if work.rewound {
            log::info!("Playback rewound, clearing transition state");
            self.tracker.reset();
            self.cursors.clear();
        }

        if let Some(history) = work.history {
            for group in history {
                let points = group
                    .samples
                    .iter()
                    .map(|s| TrailPoint::at(projector.project(s.x, s.y), s.order()))
                    .collect();
                self.trails.rebuild(&group.object_id, points);
            }
        }

        if work.frame_number.is_some() {
            update.stats.frames += 1;
            self.frames_processed += 1;
        }

        for group in work.fresh {
            for sample in group.samples {
                self.apply_sample(sample, projector, update, latest);
            }
        }
    }

    fn apply_sample(
        &mut self,
        sample: Sample,
        projector: Projector,
        update: &mut SessionUpdate,
        latest: &mut BTreeMap<String, ObjectUpdate>,
    ) {
        update.stats.samples += 1;

        let order = sample.order();
        if let Some(last) = self.cursors.get(&sample.object_id) {
            if order.is_before(last) {
                log::warn!(
                    "{}: sample {:?} is older than last processed {:?}, ignored",
                    sample.object_id,
                    order,
                    last
                );
                update.stats.out_of_order += 1;
                return;
            }
        }

        let reference = projector.reference();
        let position = projector.project(sample.x, sample.y);
        if self.mode == SessionMode::Live && self.trails.is_center_noise(position, reference) {
            log::trace!("{}: sample at reference point, ignored", sample.object_id);
            update.stats.center_noise += 1;
            return;
        }

        if self.mode == SessionMode::Live {
            let point = TrailPoint::at(position, order);
            if self.trails.append(&sample.object_id, point, reference) == AppendOutcome::Duplicate {
                update.stats.duplicates += 1;
            }
        }

        let containment = self.geofences.evaluate(position, reference);
        let events = self
            .tracker
            .update(&sample.object_id, &containment, position, order);
        update.events.extend(events);

        self.cursors.insert(sample.object_id.clone(), order);
        update.stats.processed += 1;
        self.samples_processed += 1;

        latest.insert(
            sample.object_id.clone(),
            ObjectUpdate {
                object_id: sample.object_id,
                position,
                containment,
                trail: Vec::new(),
                object_type: sample.object_type,
                confidence: sample.confidence,
                frame_index: order.frame_index,
                timestamp: order.timestamp,
            },
        );
    }

    /// Change data source mode. All trails and transition state are
    /// discarded: scale and geofence layout may differ between sources.
    pub fn switch_mode(&mut self, mode: SessionMode) {
        log::info!("Session switching from {} to {} mode", self.mode, mode);
        self.mode = mode;
        self.clear();
    }

    /// Discard all trails and transition state, keeping mode and geofences
    pub fn clear(&mut self) {
        self.trails.clear();
        self.tracker.reset();
        self.cursors.clear();
        self.projector = None;
        self.frames_processed = 0;
        self.samples_processed = 0;
    }

    /// Replace all geofences. On success every object is re-evaluated
    /// against the new set from a clean Outside state on its next sample.
    pub fn replace_geofences(&mut self, circles: Vec<GeofenceCircle>) -> Result<()> {
        self.geofences.replace(circles)?;
        self.settings.geofences = self.geofences.circles().to_vec();
        self.tracker.reset();
        log::info!("{} geofences active", self.geofences.circles().len());
        Ok(())
    }

    /// Replace the implicit boundary used when no circles are configured
    pub fn set_boundary(&mut self, boundary: BoundaryConfig) -> Result<()> {
        self.geofences.set_boundary(boundary)?;
        self.settings.boundary = self.geofences.boundary().clone();
        self.tracker.reset();
        Ok(())
    }
}
