#![forbid(unsafe_code)]

//! Error types for the recents runtime.
//!
//! Only misuse is reported as an error. A destroyed surface or a stale load
//! plan is recovered where it is detected and never surfaces here.

/// Errors returned by recents runtime operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecentsError {
    /// A structural mutation was requested while another is animating and
    /// strict mode is on.
    #[error("another pending animation is still running")]
    PendingAnimationActive,
    #[error("no slot at index {index} (carousel has {count})")]
    NoSuchSlot { index: usize, count: usize },
    #[error("carousel is empty")]
    EmptyCarousel,
    #[error("background executor has shut down")]
    ExecutorShutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            RecentsError::NoSuchSlot { index: 7, count: 3 }.to_string(),
            "no slot at index 7 (carousel has 3)"
        );
        assert_eq!(
            RecentsError::PendingAnimationActive.to_string(),
            "another pending animation is still running"
        );
    }
}
