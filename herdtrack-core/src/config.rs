//! Engine Settings
//!
//! Settings are plain serde types so that the driver can load them from a
//! JSON file and override individual values from the command line. Every
//! field has a default; an empty object `{}` is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::geofence::{BoundaryConfig, GeofenceCircle, GeofenceSet};
use crate::trails::TrailSettings;

/// Complete configuration of a tracking session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    pub trail: TrailSettings,

    /// Implicit zone used when `geofences` is empty
    pub boundary: BoundaryConfig,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub geofences: Vec<GeofenceCircle>,
}

impl EngineSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: EngineSettings = serde_json::from_str(json)
            .map_err(|e| EngineError::invalid(format!("settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.trail.validate()?;
        self.geofence_set().map(|_| ())
    }

    /// Build the validated geofence set described by these settings
    pub fn geofence_set(&self) -> Result<GeofenceSet> {
        GeofenceSet::new(self.geofences.clone(), self.boundary.clone())
    }
}
