#![forbid(unsafe_code)]

//! Quick scrub: a continuous gesture quantized into carousel page moves.
//!
//! Progress in `[0, 1]` maps to a section `round(p * N)`. Crossing into a
//! new section moves the carousel by the section delta once the entry
//! transition has finished. Resting in an extreme section (0 or N) arms an
//! auto-advance alarm that keeps stepping toward that end.
//!
//! # State machine
//!
//! ```text
//!   Idle --start--> Scrubbing --end--> Idle
//!                     |   ^
//!                progress / alarm
//! ```
//!
//! The controller holds no reference to the carousel; every operation that
//! moves it takes the carousel by `&mut`.

use std::time::Duration;

use recents_core::alarm::Alarm;
use recents_core::config::RecentsConfig;

use crate::carousel::{CarouselEvent, TaskCarousel};

#[derive(Debug, Clone)]
pub struct QuickScrubController {
    sections: u32,
    initial_delay: Duration,
    repeat_delay: Duration,
    snap_per_page: Duration,
    end_snap_per_page: Duration,
    start_duration: Duration,
    alarm: Alarm,
    active: bool,
    section: u32,
    started_from_home: bool,
    has_auto_advanced: bool,
    transition_finished: bool,
    /// The first progress sample of a session arms the alarm even when it
    /// stays in section 0.
    first_sample_pending: bool,
}

impl QuickScrubController {
    pub fn new(config: &RecentsConfig) -> Self {
        Self {
            sections: config.scrub_sections.max(1),
            initial_delay: config.initial_auto_advance_delay,
            repeat_delay: config.auto_advance_delay,
            snap_per_page: config.scrub_snap_per_page,
            end_snap_per_page: config.scrub_end_snap_per_page,
            start_duration: config.scrub_start_duration,
            alarm: Alarm::new(),
            active: false,
            section: 0,
            started_from_home: false,
            has_auto_advanced: false,
            transition_finished: false,
            first_sample_pending: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn section(&self) -> u32 {
        self.section
    }

    pub fn sections(&self) -> u32 {
        self.sections
    }

    pub fn started_from_home(&self) -> bool {
        self.started_from_home
    }

    pub fn has_auto_advanced(&self) -> bool {
        self.has_auto_advanced
    }

    pub fn alarm(&self) -> &Alarm {
        &self.alarm
    }

    /// Begin a session and step toward the first candidate slot.
    pub fn start(&mut self, from_home: bool, carousel: &mut TaskCarousel) {
        self.active = true;
        self.started_from_home = from_home;
        self.section = 0;
        self.has_auto_advanced = false;
        self.transition_finished = false;
        self.first_sample_pending = true;
        self.alarm.cancel();
        tracing::debug!(from_home, slots = carousel.len(), "quick scrub started");
        self.snap_to_next_task_if_available(carousel);
    }

    /// The entry transition finished; progress may now move the carousel.
    pub fn on_transition_finished(&mut self) {
        self.transition_finished = true;
    }

    /// Snap toward slot 0 when started from home, otherwise one past the
    /// next page. No-op outside a session or with an empty pool.
    pub fn snap_to_next_task_if_available(&mut self, carousel: &mut TaskCarousel) {
        if !self.active || carousel.is_empty() {
            return;
        }
        let page = if self.started_from_home {
            0
        } else {
            carousel.next_page() + 1
        };
        carousel.snap_to_page(page, self.start_duration);
    }

    pub fn progress(&mut self, progress: f32, carousel: &mut TaskCarousel) {
        if !self.active {
            tracing::trace!(progress, "scrub progress outside a session");
            return;
        }
        let section = (progress.clamp(0.0, 1.0) * self.sections as f32).round() as u32;
        let first_sample = std::mem::take(&mut self.first_sample_pending);
        if section == self.section && !first_sample {
            return;
        }

        if section != self.section {
            let delta = i64::from(section) - i64::from(self.section);
            let target = carousel.next_page() as i64 + delta;
            if self.transition_finished {
                self.go_to_page_with_haptic(target, carousel);
            }
        }

        if section == 0 || section == self.sections {
            let delay = if self.has_auto_advanced {
                self.repeat_delay
            } else {
                self.initial_delay
            };
            self.alarm.set(delay);
        } else {
            self.alarm.cancel();
        }
        tracing::trace!(section, "scrub section changed");
        self.section = section;
    }

    /// Advance the auto-advance alarm. Returns `true` if it fired.
    pub fn tick(&mut self, dt: Duration, carousel: &mut TaskCarousel) -> bool {
        if !self.alarm.tick(dt) {
            return false;
        }
        let page = carousel.next_page();
        if self.section == self.sections && page + 1 < carousel.len() {
            self.go_to_page_with_haptic(page as i64 + 1, carousel);
        } else if self.section == 0 && page > 0 {
            self.go_to_page_with_haptic(page as i64 - 1, carousel);
        }
        self.has_auto_advanced = true;
        self.alarm.set(self.repeat_delay);
        true
    }

    /// End the session: settle on the next page, then launch it.
    pub fn end(&mut self, carousel: &mut TaskCarousel) {
        if !self.active {
            return;
        }
        self.active = false;
        self.alarm.cancel();

        let page = carousel.next_page();
        let distance = page.abs_diff(carousel.nearest_page()) as u32;
        if carousel.snap_to_page(page, self.end_snap_per_page * distance) {
            carousel.launch_on_settle();
        } else {
            carousel.launch_page(page);
        }
        tracing::debug!(
            page,
            auto_advanced = self.has_auto_advanced,
            "quick scrub ended"
        );
    }

    fn go_to_page_with_haptic(&mut self, target: i64, carousel: &mut TaskCarousel) {
        let count = carousel.len();
        if count == 0 {
            return;
        }
        let page = target.clamp(0, count as i64 - 1) as usize;
        let next = carousel.next_page();
        if page == next {
            return;
        }
        let duration = self.snap_per_page * page.abs_diff(next) as u32;
        carousel.snap_to_page(page, duration);
        carousel.push_event(CarouselEvent::HapticFeedback);
    }
}
