#![forbid(unsafe_code)]

//! Core: geometry, easing curves, alarms, configuration and the window
//! transform interpolators used by the recents task switcher.
//!
//! Nothing in this crate owns a thread or touches a surface. Every type is
//! driven by the caller, either with an explicit `dt` (animations, alarms)
//! or with an explicit progress value (interpolators).

pub mod alarm;
pub mod animation;
pub mod config;
pub mod geometry;
pub mod logging;
pub mod transform;

// With tracing on, the macros live at the crate root like the quiet ones.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, error, info, trace, warn};
