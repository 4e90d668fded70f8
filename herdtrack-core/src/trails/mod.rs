//! Object Trail History
//!
//! This module stores the projected position history of every tracked
//! object, for trail rendering and motion review.
//!
//! # Features
//!
//! - Bounded per-object trails (hard cap of [`MAX_TRAIL_POINTS`], oldest
//!   points evicted first)
//! - Wholesale, sorted rebuild for batch playback
//! - Incremental append for live frames, with near-duplicate suppression and
//!   reference-point noise filtering
//!
//! # Example
//!
//! ```rust
//! use herdtrack_core::projection::GeoPoint;
//! use herdtrack_core::trails::{AppendOutcome, TrailPoint, TrailSettings, TrailStore};
//!
//! let reference = GeoPoint::new(-1.2921, 34.7617);
//! let mut store = TrailStore::new(TrailSettings::default());
//!
//! let outcome = store.append("7", TrailPoint::new(GeoPoint::new(-1.2911, 34.7620)), reference);
//! assert_eq!(outcome, AppendOutcome::Appended);
//! assert_eq!(store.trail("7").map(|t| t.len()), Some(1));
//! ```

mod history;

pub use history::*;
