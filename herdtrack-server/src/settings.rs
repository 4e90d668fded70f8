//! Engine settings as seen by the driver: an optional JSON file plus
//! command line overrides.

use std::path::Path;

use anyhow::Context;
use herdtrack_core::config::EngineSettings;

/// Values given on the command line, applied on top of the settings file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    pub boundary_radius: Option<f64>,
    pub center_skip: Option<f64>,
    pub max_trail_points: Option<usize>,
}

impl SettingsOverrides {
    pub fn apply(&self, settings: &mut EngineSettings) {
        if let Some(radius) = self.boundary_radius {
            settings.boundary.radius_meters = radius;
        }
        if let Some(skip) = self.center_skip {
            settings.trail.center_skip_meters = skip;
        }
        if let Some(max) = self.max_trail_points {
            settings.trail.max_points = max;
        }
    }
}

/// Load settings from `path` (defaults when `None`), apply the overrides
/// and validate the result.
pub fn load_settings(
    path: Option<&Path>,
    overrides: &SettingsOverrides,
) -> anyhow::Result<EngineSettings> {
    let mut settings = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read settings file {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Cannot parse settings file {}", path.display()))?
        }
        None => EngineSettings::default(),
    };

    overrides.apply(&mut settings);
    settings.validate().context("Invalid engine settings")?;

    log::debug!(
        "Settings: {} geofences, default radius {} m, center skip {} m",
        settings.geofences.len(),
        settings.boundary.radius_meters,
        settings.trail.center_skip_meters
    );
    Ok(settings)
}
