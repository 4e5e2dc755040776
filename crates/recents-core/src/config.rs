#![forbid(unsafe_code)]

//! Tunables for the recents carousel, quick scrub and window transitions.
//!
//! [`RecentsConfig::default`] carries the stock timings. Individual values can
//! be overridden with builder setters or from the environment:
//!
//! | variable | field |
//! |---|---|
//! | `RECENTS_STRICT` | `strict_pending_animations` |
//! | `RECENTS_MIRROR` | `mirror_preference` |
//! | `RECENTS_DISMISS_MS` | `dismiss_duration` |
//! | `RECENTS_AUTO_ADVANCE_MS` | `auto_advance_delay` |
//! | `RECENTS_INITIAL_AUTO_ADVANCE_MS` | `initial_auto_advance_delay` |
//! | `RECENTS_VISIBLE_RADIUS` | `visible_radius` |
//!
//! Booleans accept `1/true/yes/on` and `0/false/no/off`. A malformed value
//! is reported as [`ConfigError`] rather than silently ignored.

use std::time::Duration;

const ENV_STRICT: &str = "RECENTS_STRICT";
const ENV_MIRROR: &str = "RECENTS_MIRROR";
const ENV_DISMISS_MS: &str = "RECENTS_DISMISS_MS";
const ENV_AUTO_ADVANCE_MS: &str = "RECENTS_AUTO_ADVANCE_MS";
const ENV_INITIAL_AUTO_ADVANCE_MS: &str = "RECENTS_INITIAL_AUTO_ADVANCE_MS";
const ENV_VISIBLE_RADIUS: &str = "RECENTS_VISIBLE_RADIUS";

/// A rejected configuration override.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
    #[error("{key} must be at least {min}, got {value}")]
    OutOfRange {
        key: &'static str,
        value: u64,
        min: u64,
    },
}

/// Configuration for the recents system.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentsConfig {
    /// Number of quick-scrub sections; progress is quantized to `0..=N`.
    pub scrub_sections: u32,
    pub initial_auto_advance_delay: Duration,
    pub auto_advance_delay: Duration,
    /// Snap duration per page moved while scrubbing.
    pub scrub_snap_per_page: Duration,
    /// Settle duration per page when the scrub ends.
    pub scrub_end_snap_per_page: Duration,
    /// Snap duration of the first move when a scrub starts.
    pub scrub_start_duration: Duration,
    pub dismiss_duration: Duration,
    /// Slots within this many pages of the center have their data loaded.
    pub visible_radius: usize,
    /// Scroll velocity (px/s) above which thumbnail decoding is throttled.
    pub fast_fling_velocity: f32,
    pub slot_width: f32,
    pub slot_height: f32,
    pub page_spacing: f32,
    pub viewport_width: f32,
    pub recents_launch_duration: Duration,
    pub app_launch_duration: Duration,
    pub app_launch_curved_duration: Duration,
    pub closing_transition_duration: Duration,
    /// Fail fast on a second concurrent structural mutation instead of queueing.
    pub strict_pending_animations: bool,
    /// Layout direction of the system locale.
    pub system_rtl: bool,
    /// User preference to flip the carousel direction.
    pub mirror_preference: bool,
}

impl Default for RecentsConfig {
    fn default() -> Self {
        Self {
            scrub_sections: 3,
            initial_auto_advance_delay: Duration::from_millis(1000),
            auto_advance_delay: Duration::from_millis(500),
            scrub_snap_per_page: Duration::from_millis(325),
            scrub_end_snap_per_page: Duration::from_millis(60),
            scrub_start_duration: Duration::from_millis(210),
            dismiss_duration: Duration::from_millis(300),
            visible_radius: 2,
            fast_fling_velocity: 2500.0,
            slot_width: 720.0,
            slot_height: 1280.0,
            page_spacing: 48.0,
            viewport_width: 1080.0,
            recents_launch_duration: Duration::from_millis(336),
            app_launch_duration: Duration::from_millis(500),
            app_launch_curved_duration: Duration::from_millis(233),
            closing_transition_duration: Duration::from_millis(350),
            strict_pending_animations: cfg!(debug_assertions),
            system_rtl: false,
            mirror_preference: false,
        }
    }
}

impl RecentsConfig {
    /// Defaults with overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides from a custom environment lookup.
    pub fn from_env_with<F>(get_env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(strict) = env_bool(&get_env, ENV_STRICT)? {
            config.strict_pending_animations = strict;
        }
        if let Some(mirror) = env_bool(&get_env, ENV_MIRROR)? {
            config.mirror_preference = mirror;
        }
        if let Some(ms) = env_u64(&get_env, ENV_DISMISS_MS, 0)? {
            config.dismiss_duration = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64(&get_env, ENV_AUTO_ADVANCE_MS, 1)? {
            config.auto_advance_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64(&get_env, ENV_INITIAL_AUTO_ADVANCE_MS, 1)? {
            config.initial_auto_advance_delay = Duration::from_millis(ms);
        }
        if let Some(radius) = env_u64(&get_env, ENV_VISIBLE_RADIUS, 0)? {
            config.visible_radius = radius as usize;
        }
        crate::debug!(
            strict = config.strict_pending_animations,
            mirror = config.mirror_preference,
            visible_radius = config.visible_radius,
            "recents config resolved"
        );
        Ok(config)
    }

    #[must_use]
    pub fn with_scrub_sections(mut self, sections: u32) -> Self {
        self.scrub_sections = sections.max(1);
        self
    }

    #[must_use]
    pub fn with_auto_advance_delays(mut self, initial: Duration, repeat: Duration) -> Self {
        self.initial_auto_advance_delay = initial;
        self.auto_advance_delay = repeat;
        self
    }

    #[must_use]
    pub fn with_dismiss_duration(mut self, duration: Duration) -> Self {
        self.dismiss_duration = duration;
        self
    }

    #[must_use]
    pub fn with_visible_radius(mut self, radius: usize) -> Self {
        self.visible_radius = radius;
        self
    }

    #[must_use]
    pub fn with_slot_size(mut self, width: f32, height: f32) -> Self {
        self.slot_width = width;
        self.slot_height = height;
        self
    }

    #[must_use]
    pub fn with_page_spacing(mut self, spacing: f32) -> Self {
        self.page_spacing = spacing;
        self
    }

    #[must_use]
    pub fn with_viewport_width(mut self, width: f32) -> Self {
        self.viewport_width = width;
        self
    }

    #[must_use]
    pub fn with_fast_fling_velocity(mut self, velocity: f32) -> Self {
        self.fast_fling_velocity = velocity;
        self
    }

    #[must_use]
    pub fn with_strict_pending_animations(mut self, strict: bool) -> Self {
        self.strict_pending_animations = strict;
        self
    }

    #[must_use]
    pub fn with_system_rtl(mut self, rtl: bool) -> Self {
        self.system_rtl = rtl;
        self
    }

    #[must_use]
    pub fn with_mirror_preference(mut self, mirror: bool) -> Self {
        self.mirror_preference = mirror;
        self
    }

    /// Effective layout mirroring: locale direction flipped by the preference.
    pub fn is_mirrored(&self) -> bool {
        self.system_rtl ^ self.mirror_preference
    }

    /// Scroll distance between adjacent pages.
    pub fn page_stride(&self) -> f32 {
        self.slot_width + self.page_spacing
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_bool<F>(get_env: &F, key: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match get_env(key) {
        None => Ok(None),
        Some(value) => parse_bool(&value)
            .map(Some)
            .ok_or(ConfigError::InvalidValue { key, value }),
    }
}

fn env_u64<F>(get_env: &F, key: &'static str, min: u64) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = get_env(key) else {
        return Ok(None);
    };
    let parsed: u64 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })?;
    if parsed < min {
        return Err(ConfigError::OutOfRange {
            key,
            value: parsed,
            min,
        });
    }
    Ok(Some(parsed))
}
