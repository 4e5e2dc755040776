#![forbid(unsafe_code)]

//! Diagnostics plumbing for the core crate.
//!
//! Core code logs through `crate::debug!` and friends. With the `tracing`
//! feature those names resolve to the `tracing` macros; without it they
//! expand to nothing, and `debug_span!` yields an inert [`QuietSpan`].
//!
//! Hosts that want machine-readable output enable `tracing-json` and call
//! [`init_json_subscriber`] once at startup.

#[cfg(feature = "tracing")]
pub use tracing::{debug, debug_span, error, info, trace, warn};

// ---------------------------------------------------------------------------
// Feature-off stand-ins
// ---------------------------------------------------------------------------

#[cfg(not(feature = "tracing"))]
mod quiet {
    #[macro_export]
    #[doc(hidden)]
    macro_rules! trace {
        ($($tokens:tt)*) => {};
    }

    #[macro_export]
    #[doc(hidden)]
    macro_rules! debug {
        ($($tokens:tt)*) => {};
    }

    #[macro_export]
    #[doc(hidden)]
    macro_rules! info {
        ($($tokens:tt)*) => {};
    }

    #[macro_export]
    #[doc(hidden)]
    macro_rules! warn {
        ($($tokens:tt)*) => {};
    }

    #[macro_export]
    #[doc(hidden)]
    macro_rules! error {
        ($($tokens:tt)*) => {};
    }

    #[macro_export]
    #[doc(hidden)]
    macro_rules! debug_span {
        ($($tokens:tt)*) => {
            $crate::logging::QuietSpan
        };
    }
}

/// What `debug_span!` produces when tracing is compiled out.
#[cfg(not(feature = "tracing"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct QuietSpan;

#[cfg(not(feature = "tracing"))]
impl QuietSpan {
    /// Mirrors `tracing::Span::enter`; the guard does nothing.
    #[must_use]
    pub fn enter(&self) -> QuietSpan {
        *self
    }
}

// ---------------------------------------------------------------------------
// JSON output
// ---------------------------------------------------------------------------

/// Install a process-wide JSON formatter.
///
/// The filter comes from `RUST_LOG`, falling back to `info`. Returns `false`
/// when another global subscriber got there first.
#[cfg(feature = "tracing-json")]
pub fn init_json_subscriber() -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(true)
        .with_target(true)
        .try_init()
        .is_ok()
}
