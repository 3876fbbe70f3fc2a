//! Driftboard Application
//!
//! Headless shell that drives a board session from a recorded input script
//! and persists the result.

mod replay;
mod shortcuts;

pub use replay::{ReplayError, ReplayOptions, ReplaySummary, run};
pub use shortcuts::{Shortcut, ShortcutRegistry};
