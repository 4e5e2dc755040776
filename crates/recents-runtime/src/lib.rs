#![forbid(unsafe_code)]

//! Runtime for the recents task switcher.
//!
//! # Threading
//!
//! One foreground context owns every type in this crate except the
//! [`wrapper::RecentsAnimationWrapper`]. It ticks animations, feeds gesture
//! input and applies load plans. A single [`executor::BackgroundExecutor`]
//! builds load plans and dispatches animation-controller commands; results
//! come back through a [`executor::Mailbox`] that the foreground drains.
//!
//! # Ownership
//!
//! - [`model_cache::ModelCache`] owns the generation counter and the last
//!   served [`task::LoadPlan`]. It is constructed by the application and
//!   passed by reference to whoever needs it.
//! - [`carousel::TaskCarousel`] owns its slots, the visible set and the
//!   single in-flight [`pending::PendingAnimation`].
//! - [`view::RecentsView`] ties the carousel and the quick-scrub controller
//!   together and routes their events.

pub mod carousel;
pub mod error;
pub mod executor;
pub mod input;
pub mod model_cache;
pub mod pending;
pub mod quick_scrub;
pub mod surface;
pub mod task;
pub mod transition;
pub mod view;
pub mod wrapper;

pub use error::RecentsError;
pub use recents_core::config::RecentsConfig;
pub use task::{LoadPlan, Task, TaskId};
pub use view::{RecentsEvent, RecentsView};
