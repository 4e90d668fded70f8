use std::collections::HashMap;

use super::TrackingSession;
use crate::config::EngineSettings;
use crate::error::Result;
use crate::geofence::GeofenceSet;

/// Independent sessions keyed by feed or client id.
///
/// New sessions start from the registry's default settings. Changing a
/// session's geofences or mode never affects another session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    defaults: EngineSettings,
    geofences: GeofenceSet,
    sessions: HashMap<String, TrackingSession>,
}

impl SessionRegistry {
    pub fn new(defaults: EngineSettings) -> Result<Self> {
        defaults.trail.validate()?;
        let geofences = defaults.geofence_set()?;
        Ok(SessionRegistry {
            defaults,
            geofences,
            sessions: HashMap::new(),
        })
    }

    pub fn defaults(&self) -> &EngineSettings {
        &self.defaults
    }

    pub fn get_or_create(&mut self, key: &str) -> &mut TrackingSession {
        let defaults = &self.defaults;
        let geofences = &self.geofences;
        self.sessions.entry(key.to_string()).or_insert_with(|| {
            log::debug!("{}: new tracking session", key);
            TrackingSession::from_validated(defaults.clone(), geofences.clone())
        })
    }

    pub fn get(&self, key: &str) -> Option<&TrackingSession> {
        self.sessions.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut TrackingSession> {
        self.sessions.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<TrackingSession> {
        let removed = self.sessions.remove(key);
        if removed.is_some() {
            log::debug!("{}: tracking session closed", key);
        }
        removed
    }

    /// Session keys in sorted order
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.sessions.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::{Frame, LiveAssembler};
    use crate::geofence::GeofenceCircle;
    use crate::projection::{GeoPoint, Scale};
    use crate::sample::Sample;

    #[test]
    fn test_sessions_are_isolated() {
        let mut registry = SessionRegistry::new(EngineSettings::default()).unwrap();

        let mut live = LiveAssembler::new();
        live.push(
            Frame::new(1, vec![Sample::new("1", 100.0, 0.0)])
                .with_reference(GeoPoint::new(0.0, 0.0), Scale::new(1.0)),
        )
        .unwrap();
        registry.get_or_create("park-a").ingest(&mut live);

        registry
            .get_or_create("park-b")
            .replace_geofences(vec![GeofenceCircle::new("camp", GeoPoint::new(0.0, 0.0), 50.0).unwrap()])
            .unwrap();

        let a = registry.get("park-a").unwrap();
        assert!(a.geofences().circles().is_empty());
        assert!(a.trail("1").is_some());

        let b = registry.get("park-b").unwrap();
        assert_eq!(b.geofences().circles().len(), 1);
        assert!(b.trail("1").is_none());

        assert_eq!(registry.keys(), vec!["park-a", "park-b"]);
    }

    #[test]
    fn test_get_or_create_reuses_session() {
        let mut registry = SessionRegistry::default();
        registry.get_or_create("x").clear();
        registry.get_or_create("x");
        assert_eq!(registry.len(), 1);

        assert!(registry.remove("x").is_some());
        assert!(registry.remove("x").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_invalid_defaults_rejected() {
        let mut defaults = EngineSettings::default();
        defaults.boundary.radius_meters = 0.0;
        assert!(SessionRegistry::new(defaults).is_err());
    }
}
