#![forbid(unsafe_code)]

//! Per-frame window transform interpolation.
//!
//! Every transition is a pure function from a play clock (or a progress
//! scalar) to a [`WindowTransformFrame`]: the scale, translation, crop and
//! alpha to apply to one window surface. Nothing here holds state between
//! frames, so a frame can be recomputed for any instant and a dropped frame
//! costs nothing.
//!
//! Three transitions are modelled:
//!
//! - [`ThumbnailLaunch`]: a carousel slot grows into the full-screen window.
//!   At `t = 0` the window exactly covers the slot's live thumbnail, at
//!   `t = 1` it covers the device. The slot runs the complementary motion.
//! - [`IconLaunch`]: an icon flies to the screen center while the window,
//!   scaled to match the icon, reveals from a square crop to full height.
//! - [`ClosingTransition`]: the closing window shrinks and slides off to the
//!   side while fading out.
//!
//! # Coordinate model
//!
//! The window matrix maps a window-local point `p` to `p * scale +
//! translation`. Window-local coordinates coincide with device coordinates
//! when the transform is identity. Crop rectangles are window-local.
//!
//! # Failure Modes
//!
//! Degenerate geometry (zero-width slot or icon) does not panic; scales fall
//! back to 1.0 so the window is simply shown full-screen.

use std::time::Duration;

use crate::animation::{Easing, interval_value};
use crate::config::RecentsConfig;
use crate::geometry::{Insets, Point, Rect, lerp};

/// Window alpha fades in over this much of a launch from the carousel.
pub const RECENTS_WINDOW_FADE_IN: Duration = Duration::from_millis(75);
/// The launching slot fades out after the window is opaque.
pub const RECENTS_SLOT_FADE_DELAY: Duration = Duration::from_millis(75);
pub const RECENTS_SLOT_FADE_DURATION: Duration = Duration::from_millis(75);
/// Window alpha fades in over this much of a launch from an icon.
pub const ICON_WINDOW_FADE_IN: Duration = Duration::from_millis(60);
pub const ICON_FADE_OUT_DELAY: Duration = Duration::from_millis(32);
pub const ICON_FADE_OUT_DURATION: Duration = Duration::from_millis(50);
/// The closing window finishes shrinking before it finishes sliding.
pub const CLOSING_SCALE_DURATION: Duration = Duration::from_millis(267);
pub const CLOSING_END_SCALE: f32 = 0.8;
/// Lateral travel of the closing window, as a fraction of device width.
pub const CLOSING_TRAVEL_FRACTION: f32 = 1.16;

// ---------------------------------------------------------------------------
// Frame values
// ---------------------------------------------------------------------------

/// The transform for one window surface on one animation tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowTransformFrame {
    pub scale: f32,
    pub translation: Point,
    /// Window-local crop; `None` leaves the current crop untouched.
    pub crop: Option<Rect>,
    pub alpha: f32,
}

impl WindowTransformFrame {
    /// Identity transform, fully opaque, uncropped.
    pub const IDENTITY: WindowTransformFrame = WindowTransformFrame {
        scale: 1.0,
        translation: Point::new(0.0, 0.0),
        crop: None,
        alpha: 1.0,
    };

    /// Map a window-local rectangle to screen space.
    pub fn map_rect(&self, rect: &Rect) -> Rect {
        Rect::new(
            rect.x * self.scale + self.translation.x,
            rect.y * self.scale + self.translation.y,
            rect.width * self.scale,
            rect.height * self.scale,
        )
    }

    /// Post-translate by a target's position in its parent.
    #[must_use]
    pub fn positioned(mut self, position: Point) -> Self {
        self.translation.x += position.x;
        self.translation.y += position.y;
        self
    }
}

/// Visual state pushed back to a carousel slot during a launch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotFrame {
    pub scale: f32,
    pub translation_x: f32,
    pub translation_y: f32,
    pub alpha: f32,
}

// ---------------------------------------------------------------------------
// Thumbnail <-> window
// ---------------------------------------------------------------------------

/// Where a carousel slot sits when a launch from it begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThumbnailGeometry {
    /// Full device rectangle.
    pub device: Rect,
    /// Insets excluded from the thumbnail (system bars of the task).
    pub insets: Insets,
    /// Slot bounds in screen space, before the slot's own scale/translation.
    pub slot_bounds: Rect,
    /// Offset of the thumbnail from the top of the slot (header, icon).
    pub thumbnail_top: f32,
    /// Live slot scale about its center.
    pub slot_scale: f32,
    /// Live slot horizontal translation.
    pub slot_translation_x: f32,
}

impl ThumbnailGeometry {
    fn thumbnail_rect(&self) -> Rect {
        Rect::from_ltrb(
            self.slot_bounds.left(),
            self.slot_bounds.top() + self.thumbnail_top,
            self.slot_bounds.right(),
            self.slot_bounds.bottom(),
        )
    }

    /// The thumbnail as it is currently displayed.
    pub fn live_thumbnail_rect(&self) -> Rect {
        self.thumbnail_rect()
            .scale_about(self.slot_scale, self.slot_bounds.center())
            .offset(self.slot_translation_x, 0.0)
    }
}

/// Window and slot state at one progress value of a thumbnail launch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThumbnailBounds {
    pub window: WindowTransformFrame,
    pub slot: SlotFrame,
}

/// Interpolates a window between a carousel thumbnail and the full device.
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailInterpolator {
    geometry: ThumbnailGeometry,
    start_crop: Rect,
    live_thumbnail: Rect,
}

impl ThumbnailInterpolator {
    pub fn new(geometry: ThumbnailGeometry) -> Self {
        Self {
            geometry,
            start_crop: geometry.device.inset(geometry.insets),
            live_thumbnail: geometry.live_thumbnail_rect(),
        }
    }

    pub fn geometry(&self) -> &ThumbnailGeometry {
        &self.geometry
    }

    /// Bounds at eased progress `t` (clamped to [0, 1]).
    pub fn interpolate(&self, t: f32) -> ThumbnailBounds {
        let t = t.clamp(0.0, 1.0);
        let device = self.geometry.device;
        let crop = self.start_crop.lerp(&device, t);
        let target = self.live_thumbnail.lerp(&device, t);

        let scale = ratio(target.width, crop.width);
        let translation = Point::new(target.x - crop.x * scale, target.y - crop.y * scale);

        let slot_scale = self.geometry.slot_scale * ratio(target.width, self.live_thumbnail.width);
        let slot_center = self.geometry.slot_bounds.center();
        let thumb_center = self.geometry.thumbnail_rect().center();
        let translation_x =
            target.center_x() - slot_center.x - slot_scale * (thumb_center.x - slot_center.x);
        let translation_y =
            target.center_y() - slot_center.y - slot_scale * (thumb_center.y - slot_center.y);

        ThumbnailBounds {
            window: WindowTransformFrame {
                scale,
                translation,
                crop: Some(crop),
                alpha: 1.0,
            },
            slot: SlotFrame {
                scale: slot_scale,
                translation_x,
                translation_y,
                alpha: 1.0,
            },
        }
    }
}

/// A launch from a carousel slot, driven by play time.
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailLaunch {
    interpolator: ThumbnailInterpolator,
    duration: Duration,
    easing: Easing,
}

impl ThumbnailLaunch {
    pub fn new(geometry: ThumbnailGeometry, config: &RecentsConfig) -> Self {
        Self {
            interpolator: ThumbnailInterpolator::new(geometry),
            duration: config.recents_launch_duration,
            easing: Easing::TOUCH_RESPONSE,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn interpolator(&self) -> &ThumbnailInterpolator {
        &self.interpolator
    }

    /// Frame at `play_time`. The window fades in first, then the slot fades
    /// out once the window covers it.
    pub fn frame_at(&self, play_time: Duration) -> ThumbnailBounds {
        let fraction = fraction(play_time, self.duration);
        let mut bounds = self.interpolator.interpolate(self.easing.ease(fraction));
        bounds.window.alpha = interval_value(
            0.0,
            1.0,
            Duration::ZERO,
            RECENTS_WINDOW_FADE_IN,
            play_time,
            Easing::Linear,
        );
        bounds.slot.alpha = interval_value(
            1.0,
            0.0,
            RECENTS_SLOT_FADE_DELAY,
            RECENTS_SLOT_FADE_DURATION,
            play_time,
            Easing::Linear,
        );
        bounds
    }
}

// ---------------------------------------------------------------------------
// Icon <-> window
// ---------------------------------------------------------------------------

/// Where an icon sits when a launch from it begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IconGeometry {
    pub device: Rect,
    /// Icon bounds in screen space at scale 1.
    pub icon: Rect,
    /// Scale the icon is displayed at when the launch begins.
    pub start_scale: f32,
}

/// The floating icon's state at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IconState {
    pub center: Point,
    pub scale: f32,
    pub alpha: f32,
}

impl IconState {
    /// The icon's displayed rectangle.
    pub fn displayed_rect(&self, icon: &Rect) -> Rect {
        Rect::new(
            self.center.x - icon.width * self.scale / 2.0,
            self.center.y - icon.height * self.scale / 2.0,
            icon.width * self.scale,
            icon.height * self.scale,
        )
    }
}

/// Window and icon state at one instant of an icon launch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IconFrame {
    pub window: WindowTransformFrame,
    pub icon: IconState,
}

/// A launch from an icon outside the carousel.
///
/// The icon scales up to cover the device and travels to the screen center
/// along an arc (x and y use different durations). The window is scaled to
/// the icon's live size, centered over it, and its crop opens from a square
/// matched to the icon's aspect to the full device.
#[derive(Debug, Clone, Copy)]
pub struct IconLaunch {
    geometry: IconGeometry,
    duration: Duration,
    x_duration: Duration,
    y_duration: Duration,
    end_scale: f32,
    start_crop_height: f32,
}

impl IconLaunch {
    pub fn new(geometry: IconGeometry, config: &RecentsConfig) -> Self {
        let device = geometry.device;
        let icon = geometry.icon;
        let end_scale = ratio(device.width, icon.width).max(ratio(device.height, icon.height));
        let start_crop_height = (device.width * ratio(icon.height, icon.width)).min(device.height);

        let long = config.app_launch_duration;
        let short = config.app_launch_curved_duration;
        let (x_duration, y_duration) = if icon.top() < device.center_y() {
            (long, short)
        } else {
            (short, long)
        };

        Self {
            geometry,
            duration: long,
            x_duration,
            y_duration,
            end_scale,
            start_crop_height,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn geometry(&self) -> &IconGeometry {
        &self.geometry
    }

    /// Frame at linear progress `fraction` of the overall duration.
    pub fn at_progress(&self, fraction: f32) -> IconFrame {
        let fraction = fraction.clamp(0.0, 1.0);
        self.frame_at(self.duration.mul_f32(fraction))
    }

    /// Frame at `play_time`.
    pub fn frame_at(&self, play_time: Duration) -> IconFrame {
        let icon = self.icon_at(play_time);
        let device = self.geometry.device;
        let live = icon.displayed_rect(&self.geometry.icon);

        let scale = ratio(live.width, device.width)
            .min(ratio(live.height, device.height))
            .min(1.0);
        let device_center = device.center();
        let translation = Point::new(
            icon.center.x - device_center.x * scale,
            icon.center.y - device_center.y * scale,
        );

        let eased = Easing::AGGRESSIVE_EASE.ease(fraction(play_time, self.duration));
        let crop_height = lerp(self.start_crop_height, device.height, eased);
        let top = (device.height - self.start_crop_height) / 2.0 * (1.0 - eased);
        let crop = Rect::new(device.x, device.y + top, device.width, crop_height);

        let alpha = interval_value(
            0.0,
            1.0,
            Duration::ZERO,
            ICON_WINDOW_FADE_IN,
            play_time,
            Easing::Linear,
        );

        IconFrame {
            window: WindowTransformFrame {
                scale,
                translation,
                crop: Some(crop),
                alpha,
            },
            icon,
        }
    }

    /// The floating icon at `play_time`.
    pub fn icon_at(&self, play_time: Duration) -> IconState {
        let icon = self.geometry.icon;
        let target = self.geometry.device.center();
        let dx = target.x - icon.center_x();
        let dy = target.y - icon.center_y();

        let x = interval_value(
            0.0,
            dx,
            Duration::ZERO,
            self.x_duration,
            play_time,
            Easing::AGGRESSIVE_EASE,
        );
        let y = interval_value(
            0.0,
            dy,
            Duration::ZERO,
            self.y_duration,
            play_time,
            Easing::AGGRESSIVE_EASE,
        );
        let scale = interval_value(
            self.geometry.start_scale,
            self.end_scale,
            Duration::ZERO,
            self.duration,
            play_time,
            Easing::Exaggerated,
        );
        let alpha = interval_value(
            1.0,
            0.0,
            ICON_FADE_OUT_DELAY,
            ICON_FADE_OUT_DURATION,
            play_time,
            Easing::Linear,
        );

        IconState {
            center: Point::new(icon.center_x() + x, icon.center_y() + y),
            scale,
            alpha,
        }
    }
}

// ---------------------------------------------------------------------------
// Closing
// ---------------------------------------------------------------------------

/// A window closing back to the launcher.
#[derive(Debug, Clone, Copy)]
pub struct ClosingTransition {
    duration: Duration,
    end_x: f32,
}

impl ClosingTransition {
    /// `mirrored` sends the window to the left instead of the right.
    pub fn new(device: Rect, mirrored: bool, config: &RecentsConfig) -> Self {
        let travel = device.width * CLOSING_TRAVEL_FRACTION;
        Self {
            duration: config.closing_transition_duration,
            end_x: if mirrored { -travel } else { travel },
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Frame at `play_time` for a window whose source bounds are `source`.
    /// The scale pivots about the center of `source`.
    pub fn frame_at(&self, play_time: Duration, source: &Rect) -> WindowTransformFrame {
        let scale = interval_value(
            1.0,
            CLOSING_END_SCALE,
            Duration::ZERO,
            CLOSING_SCALE_DURATION,
            play_time,
            Easing::AGGRESSIVE_EASE,
        );
        let dx = interval_value(
            0.0,
            self.end_x,
            Duration::ZERO,
            self.duration,
            play_time,
            Easing::AGGRESSIVE_EASE_IN_OUT,
        );
        let alpha = interval_value(
            1.0,
            0.0,
            Duration::ZERO,
            self.duration,
            play_time,
            Easing::APP_CLOSE_ALPHA,
        );
        let pivot = source.center();

        WindowTransformFrame {
            scale,
            translation: Point::new(pivot.x - pivot.x * scale + dx, pivot.y - pivot.y * scale),
            crop: None,
            alpha,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[inline]
fn ratio(num: f32, den: f32) -> f32 {
    if den.abs() <= f32::EPSILON {
        1.0
    } else {
        num / den
    }
}

/// Linear fraction of `duration` elapsed at `play_time`, in [0, 1].
#[inline]
pub fn fraction(play_time: Duration, duration: Duration) -> f32 {
    if duration.is_zero() {
        1.0
    } else {
        (play_time.as_secs_f32() / duration.as_secs_f32()).clamp(0.0, 1.0)
    }
}
