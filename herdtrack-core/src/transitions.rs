//! Geofence Transition Tracking
//!
//! Keeps, per tracked object, the last known containment and turns changes
//! in it into [`TransitionEvent`]s. Two independent tracks are kept:
//!
//! | Track      | Change            | Event              |
//! |------------|-------------------|--------------------|
//! | per circle | Outside → Inside  | `Entered(id)`      |
//! | per circle | Inside → Outside  | `Exited(id)`       |
//! | combined   | Inside → Outside  | `ViolatedCombined` |
//! | combined   | Outside → Inside  | `ReturnedCombined` |
//!
//! Every track starts Outside, so an object first seen inside a circle
//! produces an `Entered` event.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::geofence::Containment;
use crate::projection::GeoPoint;
use crate::sample::SampleOrder;

/// Membership state of one track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneState {
    #[default]
    Outside,
    Inside,
}

impl ZoneState {
    pub fn from_inside(inside: bool) -> Self {
        if inside {
            ZoneState::Inside
        } else {
            ZoneState::Outside
        }
    }
}

/// Kind of state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransitionKind {
    /// Object moved into a circle
    Entered,
    /// Object moved out of a circle
    Exited,
    /// Object left every configured zone
    ViolatedCombined,
    /// Object is back inside at least one zone
    ReturnedCombined,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionKind::Entered => "entered",
            TransitionKind::Exited => "exited",
            TransitionKind::ViolatedCombined => "violatedCombined",
            TransitionKind::ReturnedCombined => "returnedCombined",
        }
    }

    /// True for the per-circle kinds, which always carry a circle id
    pub fn is_per_circle(&self) -> bool {
        matches!(self, TransitionKind::Entered | TransitionKind::Exited)
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single state transition of one object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionEvent {
    pub object_id: String,
    pub kind: TransitionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circle_id: Option<String>,
    pub position: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_index: Option<u64>,
}

/// Last evaluated state of one object
#[derive(Debug, Clone, Default)]
struct ObjectZones {
    inside: BTreeSet<String>,
    combined: ZoneState,
}

/// Per-object transition state machine
#[derive(Debug, Clone, Default)]
pub struct TransitionTracker {
    objects: HashMap<String, ObjectZones>,
}

impl TransitionTracker {
    pub fn new() -> Self {
        TransitionTracker::default()
    }

    /// Feed the containment of the latest sample of `object_id` and return
    /// the transitions it causes, in order: per-circle events by circle id,
    /// then the combined event.
    ///
    /// Feeding the same containment twice returns nothing the second time.
    pub fn update(
        &mut self,
        object_id: &str,
        containment: &Containment,
        position: GeoPoint,
        order: SampleOrder,
    ) -> Vec<TransitionEvent> {
        let state = self.objects.entry(object_id.to_string()).or_default();

        let event = |kind: TransitionKind, circle_id: Option<&String>| TransitionEvent {
            object_id: object_id.to_string(),
            kind,
            circle_id: circle_id.cloned(),
            position,
            timestamp: order.timestamp,
            frame_index: order.frame_index,
        };

        // Symmetric difference walked in id order, so entries and exits are
        // interleaved deterministically
        let mut events: Vec<TransitionEvent> = state
            .inside
            .symmetric_difference(&containment.circles)
            .map(|id| {
                if containment.circles.contains(id) {
                    event(TransitionKind::Entered, Some(id))
                } else {
                    event(TransitionKind::Exited, Some(id))
                }
            })
            .collect();

        let combined = ZoneState::from_inside(containment.combined_inside);
        match (state.combined, combined) {
            (ZoneState::Inside, ZoneState::Outside) => {
                events.push(event(TransitionKind::ViolatedCombined, None))
            }
            (ZoneState::Outside, ZoneState::Inside) => {
                events.push(event(TransitionKind::ReturnedCombined, None))
            }
            _ => {}
        }

        state.inside.clone_from(&containment.circles);
        state.combined = combined;

        for e in &events {
            log::debug!(
                "{}: {} {}",
                object_id,
                e.kind,
                e.circle_id.as_deref().unwrap_or("(combined)")
            );
        }
        events
    }

    /// Last evaluated containment of an object, if it has been seen
    pub fn containment(&self, object_id: &str) -> Option<Containment> {
        self.objects.get(object_id).map(|s| Containment {
            circles: s.inside.clone(),
            combined_inside: s.combined == ZoneState::Inside,
        })
    }

    pub fn combined_state(&self, object_id: &str) -> ZoneState {
        self.objects
            .get(object_id)
            .map(|s| s.combined)
            .unwrap_or_default()
    }

    /// Number of tracked objects currently inside the combined boundary
    pub fn inside_count(&self) -> usize {
        self.objects
            .values()
            .filter(|s| s.combined == ZoneState::Inside)
            .count()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn forget(&mut self, object_id: &str) {
        self.objects.remove(object_id);
    }

    /// Drop all state; the next evaluation of every object starts from
    /// Outside again
    pub fn reset(&mut self) {
        self.objects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn containment(ids: &[&str]) -> Containment {
        let circles: BTreeSet<String> = ids.iter().map(|s| s.to_string()).collect();
        Containment {
            combined_inside: !circles.is_empty(),
            circles,
        }
    }

    fn kinds(events: &[TransitionEvent]) -> Vec<(TransitionKind, Option<&str>)> {
        events
            .iter()
            .map(|e| (e.kind, e.circle_id.as_deref()))
            .collect()
    }

    fn at() -> GeoPoint {
        GeoPoint::new(0.0, 0.0)
    }

    #[test]
    fn test_first_sighting_inside_fires_entered_once() {
        let mut tracker = TransitionTracker::new();
        let events = tracker.update("e1", &containment(&["A"]), at(), SampleOrder::default());

        let entered: Vec<_> = events
            .iter()
            .filter(|e| e.kind == TransitionKind::Entered)
            .collect();
        assert_eq!(entered.len(), 1);
        assert_eq!(entered[0].circle_id.as_deref(), Some("A"));
        assert_eq!(
            kinds(&events),
            vec![
                (TransitionKind::Entered, Some("A")),
                (TransitionKind::ReturnedCombined, None)
            ]
        );
    }

    #[test]
    fn test_first_sighting_outside_is_silent() {
        let mut tracker = TransitionTracker::new();
        let events = tracker.update("e1", &containment(&[]), at(), SampleOrder::default());
        assert!(events.is_empty());
        assert_eq!(tracker.combined_state("e1"), ZoneState::Outside);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_repeated_input_is_idempotent() {
        let mut tracker = TransitionTracker::new();
        tracker.update("e1", &containment(&["A"]), at(), SampleOrder::default());
        for _ in 0..5 {
            assert!(tracker
                .update("e1", &containment(&["A"]), at(), SampleOrder::default())
                .is_empty());
        }
    }

    #[test]
    fn test_exit_and_violation() {
        let mut tracker = TransitionTracker::new();
        tracker.update("e1", &containment(&["A"]), at(), SampleOrder::default());

        let events = tracker.update("e1", &containment(&[]), at(), SampleOrder::default());
        assert_eq!(
            kinds(&events),
            vec![
                (TransitionKind::Exited, Some("A")),
                (TransitionKind::ViolatedCombined, None)
            ]
        );
    }

    #[test]
    fn test_moving_between_circles_keeps_combined_silent() {
        let mut tracker = TransitionTracker::new();
        tracker.update("e1", &containment(&["A"]), at(), SampleOrder::default());
        tracker.update("e1", &containment(&["A", "B"]), at(), SampleOrder::default());

        let events = tracker.update("e1", &containment(&["B"]), at(), SampleOrder::default());
        assert_eq!(kinds(&events), vec![(TransitionKind::Exited, Some("A"))]);
    }

    #[test]
    fn test_events_ordered_by_circle_id() {
        let mut tracker = TransitionTracker::new();
        tracker.update("e1", &containment(&["B", "D"]), at(), SampleOrder::default());

        let events = tracker.update("e1", &containment(&["A", "C"]), at(), SampleOrder::default());
        assert_eq!(
            kinds(&events),
            vec![
                (TransitionKind::Entered, Some("A")),
                (TransitionKind::Exited, Some("B")),
                (TransitionKind::Entered, Some("C")),
                (TransitionKind::Exited, Some("D")),
            ]
        );
    }

    #[test]
    fn test_objects_are_independent() {
        let mut tracker = TransitionTracker::new();
        tracker.update("e1", &containment(&["A"]), at(), SampleOrder::default());

        let events = tracker.update("e2", &containment(&["A"]), at(), SampleOrder::default());
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.object_id == "e2"));
        assert_eq!(tracker.inside_count(), 2);
    }

    #[test]
    fn test_event_carries_sample_order() {
        let mut tracker = TransitionTracker::new();
        let order = SampleOrder {
            frame_index: Some(12),
            timestamp: Some(1_700_000_000_000),
        };
        let events = tracker.update("e1", &containment(&["A"]), GeoPoint::new(1.0, 2.0), order);
        assert_eq!(events[0].frame_index, Some(12));
        assert_eq!(events[0].timestamp, Some(1_700_000_000_000));
        assert_eq!(events[0].position, GeoPoint::new(1.0, 2.0));
    }

    #[test]
    fn test_reset_and_forget() {
        let mut tracker = TransitionTracker::new();
        tracker.update("e1", &containment(&["A"]), at(), SampleOrder::default());
        tracker.update("e2", &containment(&["A"]), at(), SampleOrder::default());

        tracker.forget("e1");
        assert!(tracker.containment("e1").is_none());
        assert!(tracker.containment("e2").unwrap().contains("A"));

        tracker.reset();
        assert!(tracker.is_empty());
        // After a reset the object is re-announced
        let events = tracker.update("e2", &containment(&["A"]), at(), SampleOrder::default());
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_event_serialization() {
        let event = TransitionEvent {
            object_id: "7".into(),
            kind: TransitionKind::ViolatedCombined,
            circle_id: None,
            position: GeoPoint::new(-1.29, 34.76),
            timestamp: Some(5),
            frame_index: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "violatedCombined");
        assert_eq!(json["objectId"], "7");
        assert!(json.get("circleId").is_none());
    }
}
