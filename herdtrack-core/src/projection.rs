//! Local Planar to Geographic Projection
//!
//! Detections arrive as planar offsets (x, y) in local units from a fixed
//! reference point. This module converts them to latitude/longitude using a
//! flat-Earth approximation around the reference point, and measures
//! distances with the same approximation so that containment tests agree
//! with the projected positions.
//!
//! # Precision
//!
//! The approximation ignores Earth curvature. Errors stay well below a meter
//! for offsets up to a few kilometers and grow to tens of meters at a few
//! tens of kilometers. Tracking areas larger than that need a real map
//! projection; this is a known bound, not a bug.
//!
//! # Example
//!
//! ```rust
//! use herdtrack_core::projection::{GeoPoint, Projector, Scale};
//!
//! let reference = GeoPoint::new(-1.2921, 34.7617);
//! let projector = Projector::new(reference, Scale::new(10.0)).unwrap();
//!
//! // 20 units east, 5 units north at 10 m/unit
//! let position = projector.project(20.0, 5.0);
//! assert!(position.lat > reference.lat);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Meters per degree of latitude (and of longitude at the equator)
pub const METERS_PER_DEGREE_LATITUDE: f64 = 111_320.0;

/// Meters per degree of longitude at the given latitude (degrees)
pub fn meters_per_degree_longitude(lat: f64) -> f64 {
    METERS_PER_DEGREE_LATITUDE * lat.to_radians().cos()
}

/// Geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude", alias = "lon")]
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        GeoPoint { lat, lng }
    }
}

/// The fixed geographic anchor all local coordinates are offset from
pub type ReferencePoint = GeoPoint;

/// Conversion from local units to meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scale {
    pub meters_per_unit: f64,
}

impl Default for Scale {
    fn default() -> Self {
        Scale {
            meters_per_unit: 1.0,
        }
    }
}

impl Scale {
    pub fn new(meters_per_unit: f64) -> Self {
        Scale { meters_per_unit }
    }

    /// A scale must be finite and strictly positive
    pub fn validate(&self) -> Result<()> {
        if !self.meters_per_unit.is_finite() || self.meters_per_unit <= 0.0 {
            return Err(EngineError::invalid(format!(
                "metersPerUnit must be > 0, got {}",
                self.meters_per_unit
            )));
        }
        Ok(())
    }
}

/// Project a local offset to a geographic coordinate.
///
/// Does not validate its inputs; use [`Projector`] when the scale comes
/// from outside.
pub fn project(reference: ReferencePoint, scale: Scale, x: f64, y: f64) -> GeoPoint {
    let x_meters = x * scale.meters_per_unit;
    let y_meters = y * scale.meters_per_unit;

    GeoPoint {
        lat: reference.lat + y_meters / METERS_PER_DEGREE_LATITUDE,
        lng: reference.lng + x_meters / meters_per_degree_longitude(reference.lat),
    }
}

/// East/north offset in meters of `point` from `reference`.
///
/// Exact inverse of [`project`] at scale 1.
pub fn offset_meters(reference: ReferencePoint, point: GeoPoint) -> (f64, f64) {
    let east = (point.lng - reference.lng) * meters_per_degree_longitude(reference.lat);
    let north = (point.lat - reference.lat) * METERS_PER_DEGREE_LATITUDE;
    (east, north)
}

/// Approximate distance in meters of `point` from `anchor`.
///
/// Measured in the local frame of `anchor`, with longitude scaled at the
/// anchor's latitude exactly as [`project`] does. A point projected from
/// `anchor` at offset (x, y) meters is therefore exactly `hypot(x, y)` away.
/// Not symmetric: pass the reference point or circle center as `anchor`.
pub fn distance_meters(anchor: GeoPoint, point: GeoPoint) -> f64 {
    let (east, north) = offset_meters(anchor, point);
    east.hypot(north)
}

/// A validated reference point and scale pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    reference: ReferencePoint,
    scale: Scale,
}

impl Projector {
    /// Create a projector, rejecting non-positive scales and references
    /// where longitude degrees collapse (the poles).
    pub fn new(reference: ReferencePoint, scale: Scale) -> Result<Self> {
        scale.validate()?;
        if !reference.lat.is_finite() || !reference.lng.is_finite() {
            return Err(EngineError::invalid(format!(
                "reference point must be finite, got ({}, {})",
                reference.lat, reference.lng
            )));
        }
        if reference.lat.abs() >= 90.0 {
            return Err(EngineError::invalid(format!(
                "reference latitude must be within (-90, 90), got {}",
                reference.lat
            )));
        }
        Ok(Projector { reference, scale })
    }

    pub fn reference(&self) -> ReferencePoint {
        self.reference
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn project(&self, x: f64, y: f64) -> GeoPoint {
        project(self.reference, self.scale, x, y)
    }

    /// Distance of `point` from the reference point in meters
    pub fn distance_from_reference(&self, point: GeoPoint) -> f64 {
        distance_meters(self.reference, point)
    }
}
