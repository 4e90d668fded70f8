//! herdtrack server
//!
//! Native driver for `herdtrack-core`. It owns everything the core leaves
//! out: reading settings and recorded tracking documents from disk, reading
//! live frames from files or stdin, pacing replays on a tokio runtime and
//! writing positions, transitions and alerts as JSON lines.

pub mod document;
pub mod output;
pub mod replay;
pub mod settings;
pub mod stream;
