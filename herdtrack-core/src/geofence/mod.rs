//! Geofence Containment
//!
//! This module decides which circular geofences contain a tracked object.
//! Geofences are named circles on the map; an object inside none of them
//! is outside the combined boundary.
//!
//! # Features
//!
//! - Any number of circular zones, replaceable as a whole at runtime
//! - Inclusive boundary: a point exactly on the radius is inside
//! - Implicit default zone around the boundary center (or reference point)
//!   when no circles are configured
//!
//! # Example
//!
//! ```rust
//! use herdtrack_core::geofence::{evaluate, FallbackBoundary, GeofenceCircle};
//! use herdtrack_core::projection::GeoPoint;
//!
//! let center = GeoPoint::new(-1.2921, 34.7617);
//! let zones = vec![GeofenceCircle::new("waterhole", center, 200.0).unwrap()];
//! let fallback = FallbackBoundary::new(center, 500.0);
//!
//! let containment = evaluate(center, &zones, &fallback);
//! assert!(containment.combined_inside);
//! assert!(containment.contains("waterhole"));
//! ```

mod zone;

pub use zone::*;
