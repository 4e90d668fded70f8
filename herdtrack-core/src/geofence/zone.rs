use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::error::{EngineError, Result};
use crate::projection::{
    distance_meters, meters_per_degree_longitude, GeoPoint, METERS_PER_DEGREE_LATITUDE,
};

/// Default radius of the implicit zone used when no circles are configured
pub const DEFAULT_BOUNDARY_RADIUS_METERS: f64 = 500.0;

/// Id reported for the implicit zone
pub const DEFAULT_BOUNDARY_ID: &str = "default";

/// Slack added to every radius to absorb floating-point round-off only.
/// Containment and projection share one approximation, so a point projected
/// exactly onto the radius is off by no more than a few ulps.
const BOUNDARY_TOLERANCE_METERS: f64 = 1e-6;

fn validate_radius(id: &str, radius_meters: f64) -> Result<()> {
    if !radius_meters.is_finite() || radius_meters <= 0.0 {
        return Err(EngineError::invalid(format!(
            "geofence '{}': radiusMeters must be > 0, got {}",
            id, radius_meters
        )));
    }
    Ok(())
}

/// A circular geofence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceCircle {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub center: GeoPoint,
    pub radius_meters: f64,
}

impl GeofenceCircle {
    pub fn new(id: impl Into<String>, center: GeoPoint, radius_meters: f64) -> Result<Self> {
        let circle = GeofenceCircle {
            id: id.into(),
            name: None,
            center,
            radius_meters,
        };
        circle.validate()?;
        Ok(circle)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_radius(&self.id, self.radius_meters)
    }

    /// Inclusive containment test
    pub fn contains(&self, position: GeoPoint) -> bool {
        distance_meters(self.center, position) <= self.radius_meters + BOUNDARY_TOLERANCE_METERS
    }

    /// Display name, falling back to the id
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Polygon approximation of the circle for map display, using the same
    /// flat-Earth approximation as the containment test. The ring is closed:
    /// the last point repeats the first.
    pub fn outline(&self, segments: usize) -> Vec<GeoPoint> {
        let segments = segments.max(3);
        let lng_scale = meters_per_degree_longitude(self.center.lat);

        (0..=segments)
            .map(|i| {
                let angle = std::f64::consts::TAU * (i % segments) as f64 / segments as f64;
                let east = self.radius_meters * angle.cos();
                let north = self.radius_meters * angle.sin();
                GeoPoint {
                    lat: self.center.lat + north / METERS_PER_DEGREE_LATITUDE,
                    lng: self.center.lng + east / lng_scale,
                }
            })
            .collect()
    }
}

/// The implicit zone evaluated when no circles are configured
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackBoundary {
    pub center: GeoPoint,
    pub radius_meters: f64,
}

impl FallbackBoundary {
    pub fn new(center: GeoPoint, radius_meters: f64) -> Self {
        FallbackBoundary {
            center,
            radius_meters,
        }
    }

    fn as_circle(&self) -> GeofenceCircle {
        GeofenceCircle {
            id: DEFAULT_BOUNDARY_ID.to_string(),
            name: None,
            center: self.center,
            radius_meters: self.radius_meters,
        }
    }
}

/// Result of a containment evaluation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Containment {
    /// Ids of all zones containing the position, in id order
    pub circles: BTreeSet<String>,
    pub combined_inside: bool,
}

impl Containment {
    pub fn contains(&self, circle_id: &str) -> bool {
        self.circles.contains(circle_id)
    }
}

/// Evaluate which zones contain `position`.
///
/// With no circles configured the fallback boundary is evaluated as a
/// single zone with id [`DEFAULT_BOUNDARY_ID`].
pub fn evaluate(
    position: GeoPoint,
    circles: &[GeofenceCircle],
    fallback: &FallbackBoundary,
) -> Containment {
    let containing: BTreeSet<String> = if circles.is_empty() {
        let implicit = fallback.as_circle();
        if implicit.contains(position) {
            BTreeSet::from([implicit.id])
        } else {
            BTreeSet::new()
        }
    } else {
        circles
            .iter()
            .filter(|c| c.contains(position))
            .map(|c| c.id.clone())
            .collect()
    };

    Containment {
        combined_inside: !containing.is_empty(),
        circles: containing,
    }
}

/// Boundary defaults used when no circles are configured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoundaryConfig {
    /// Center of the implicit zone; the session reference point when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center: Option<GeoPoint>,
    pub radius_meters: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        BoundaryConfig {
            center: None,
            radius_meters: DEFAULT_BOUNDARY_RADIUS_METERS,
        }
    }
}

impl BoundaryConfig {
    pub fn validate(&self) -> Result<()> {
        validate_radius(DEFAULT_BOUNDARY_ID, self.radius_meters)
    }

    /// Resolve the implicit zone for a session anchored at `reference`
    pub fn fallback(&self, reference: GeoPoint) -> FallbackBoundary {
        FallbackBoundary::new(self.center.unwrap_or(reference), self.radius_meters)
    }
}

/// The active set of geofences for a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeofenceSet {
    circles: Vec<GeofenceCircle>,
    boundary: BoundaryConfig,
}

impl GeofenceSet {
    pub fn new(circles: Vec<GeofenceCircle>, boundary: BoundaryConfig) -> Result<Self> {
        let mut set = GeofenceSet {
            circles: Vec::new(),
            boundary: BoundaryConfig::default(),
        };
        set.set_boundary(boundary)?;
        set.replace(circles)?;
        Ok(set)
    }

    /// Replace all circles. On error the previous set is kept.
    pub fn replace(&mut self, circles: Vec<GeofenceCircle>) -> Result<()> {
        let mut seen = HashSet::new();
        for circle in &circles {
            circle.validate()?;
            if !seen.insert(circle.id.as_str()) {
                return Err(EngineError::invalid(format!(
                    "duplicate geofence id '{}'",
                    circle.id
                )));
            }
        }
        self.circles = circles;
        Ok(())
    }

    pub fn set_boundary(&mut self, boundary: BoundaryConfig) -> Result<()> {
        boundary.validate()?;
        self.boundary = boundary;
        Ok(())
    }

    pub fn circles(&self) -> &[GeofenceCircle] {
        &self.circles
    }

    pub fn boundary(&self) -> &BoundaryConfig {
        &self.boundary
    }

    pub fn get(&self, id: &str) -> Option<&GeofenceCircle> {
        self.circles.iter().find(|c| c.id == id)
    }

    pub fn evaluate(&self, position: GeoPoint, reference: GeoPoint) -> Containment {
        evaluate(position, &self.circles, &self.boundary.fallback(reference))
    }
}
