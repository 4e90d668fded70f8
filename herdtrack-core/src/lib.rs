//! herdtrack core
//!
//! Platform-independent trail and geofence engine for wildlife position
//! tracking. Detections arrive as local planar samples `(x, y)` relative to
//! a geographic reference point; the engine projects them onto lat/lng,
//! keeps a bounded trail per tracked object and reports when objects enter
//! or leave circular geofences.
//!
//! The crate does no I/O. A driver (see `herdtrack-server`) reads tracking
//! documents or live frames, feeds them through a
//! [`SampleAssembler`](frames::SampleAssembler) into a
//! [`TrackingSession`](session::TrackingSession) and delivers the resulting
//! positions and transition events wherever they need to go.
//!
//! # Modules
//!
//! - [`projection`]: local units to geographic coordinates
//! - [`trails`]: bounded, de-duplicated position history per object
//! - [`geofence`]: circle containment
//! - [`transitions`]: enter/exit detection
//! - [`frames`]: batch and live input assembly
//! - [`session`]: the engine context tying the above together
//! - [`config`]: serde settings with defaults

pub mod config;
pub mod error;
pub mod frames;
pub mod geofence;
pub mod projection;
pub mod sample;
pub mod session;
pub mod trails;
pub mod transitions;

pub use config::EngineSettings;
pub use error::{EngineError, Result};
pub use frames::{BatchAssembler, Frame, LiveAssembler, SampleAssembler, SessionMode};
pub use geofence::{Containment, GeofenceCircle};
pub use projection::{GeoPoint, Projector, Scale};
pub use sample::Sample;
pub use session::{SessionRegistry, SessionUpdate, TrackingSession};
pub use transitions::{TransitionEvent, TransitionKind};
