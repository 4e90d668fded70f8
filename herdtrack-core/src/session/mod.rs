//! Tracking Sessions
//!
//! A [`TrackingSession`] owns all per-session state: trails, the active
//! geofences, the transition tracker and per-object ordering cursors. It is
//! fed by a [`SampleAssembler`](crate::frames::SampleAssembler) and returns
//! a [`SessionUpdate`] with the latest position of every object that moved
//! and the transitions it caused.
//!
//! Sessions never share state. A service tracking several independent
//! feeds keeps one session per feed in a [`SessionRegistry`].
//!
//! # Example
//!
//! ```rust
//! use herdtrack_core::config::EngineSettings;
//! use herdtrack_core::frames::BatchAssembler;
//! use herdtrack_core::projection::{GeoPoint, Scale};
//! use herdtrack_core::sample::Sample;
//! use herdtrack_core::session::TrackingSession;
//!
//! let mut session = TrackingSession::new(EngineSettings::default()).unwrap();
//! let samples = vec![
//!     Sample::new("3", 600.0, 0.0).with_frame(0),
//!     Sample::new("3", 100.0, 0.0).with_frame(1),
//! ];
//! let mut batch = BatchAssembler::new(GeoPoint::new(0.0, 0.0), Scale::new(1.0), samples).unwrap();
//!
//! let update = session.ingest(&mut batch);
//! assert!(update.positions[0].containment.combined_inside);
//! assert!(!update.events.is_empty());
//! ```

mod registry;
mod tracking;

pub use registry::SessionRegistry;
pub use tracking::*;
