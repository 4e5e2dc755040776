#![forbid(unsafe_code)]

//! Easing curves and time-based animation primitives.
//!
//! The recents transitions are driven by a single play clock per animation.
//! Individual properties (alpha, crop, scale, translation) are derived from
//! that clock with [`interval_value`], each with its own delay, duration and
//! curve. This keeps every property of one transition in lock-step and lets
//! a frame be recomputed from nothing but the elapsed time.
//!
//! # Invariants
//!
//! - Every [`Easing`] maps 0.0 to 0.0 and 1.0 to 1.0 and clamps its input.
//! - [`Fade`] never reports a value outside [0.0, 1.0]; a zero duration is
//!   treated as 1ns so progress is never a division by zero.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Easing functions
// ---------------------------------------------------------------------------

/// No easing.
#[inline]
pub fn linear(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Quadratic acceleration.
#[inline]
pub fn accel(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t
}

/// Quartic acceleration.
#[inline]
pub fn accel_2(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    let sq = t * t;
    sq * sq
}

/// One cubic bezier segment in the unit square, monotone in x.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicSegment {
    pub start: (f32, f32),
    pub c1: (f32, f32),
    pub c2: (f32, f32),
    pub end: (f32, f32),
}

impl CubicSegment {
    pub const fn new(start: (f32, f32), c1: (f32, f32), c2: (f32, f32), end: (f32, f32)) -> Self {
        Self { start, c1, c2, end }
    }

    fn x_at(&self, s: f32) -> f32 {
        cubic(self.start.0, self.c1.0, self.c2.0, self.end.0, s)
    }

    fn y_at(&self, s: f32) -> f32 {
        cubic(self.start.1, self.c1.1, self.c2.1, self.end.1, s)
    }

    fn dx_at(&self, s: f32) -> f32 {
        cubic_derivative(self.start.0, self.c1.0, self.c2.0, self.end.0, s)
    }

    /// Solve for the curve parameter whose x equals `x`, then return y.
    ///
    /// Newton iterations first, bisection as a fallback when the slope
    /// flattens out.
    pub fn y_for_x(&self, x: f32) -> f32 {
        let x = x.clamp(self.start.0, self.end.0);
        let span = self.end.0 - self.start.0;
        if span <= f32::EPSILON {
            return self.end.1;
        }

        let mut s = (x - self.start.0) / span;
        for _ in 0..8 {
            let err = self.x_at(s) - x;
            if err.abs() < 1e-6 {
                return self.y_at(s);
            }
            let d = self.dx_at(s);
            if d.abs() < 1e-6 {
                break;
            }
            s = (s - err / d).clamp(0.0, 1.0);
        }

        let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
        s = (x - self.start.0) / span;
        for _ in 0..32 {
            let fx = self.x_at(s);
            if (fx - x).abs() < 1e-6 {
                break;
            }
            if fx < x {
                lo = s;
            } else {
                hi = s;
            }
            s = (lo + hi) / 2.0;
        }
        self.y_at(s)
    }
}

#[inline]
fn cubic(p0: f32, p1: f32, p2: f32, p3: f32, s: f32) -> f32 {
    let inv = 1.0 - s;
    inv * inv * inv * p0 + 3.0 * inv * inv * s * p1 + 3.0 * inv * s * s * p2 + s * s * s * p3
}

#[inline]
fn cubic_derivative(p0: f32, p1: f32, p2: f32, p3: f32, s: f32) -> f32 {
    let inv = 1.0 - s;
    3.0 * inv * inv * (p1 - p0) + 6.0 * inv * s * (p2 - p1) + 3.0 * s * s * (p3 - p2)
}

/// A CSS-style cubic bezier from (0,0) to (1,1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier(CubicSegment);

impl CubicBezier {
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self(CubicSegment::new((0.0, 0.0), (x1, y1), (x2, y2), (1.0, 1.0)))
    }

    #[inline]
    pub fn ease(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        self.0.y_for_x(t)
    }
}

const EXAGGERATED_PATH: [CubicSegment; 2] = [
    CubicSegment::new((0.0, 0.0), (0.05, 0.0), (0.133333, 0.08), (0.166666, 0.4)),
    CubicSegment::new((0.166666, 0.4), (0.225, 0.94), (0.5, 1.0), (1.0, 1.0)),
];

/// The easing curves used by recents transitions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Easing {
    #[default]
    Linear,
    /// `t²`
    Accel,
    /// `t⁴`
    Accel2,
    Bezier(CubicBezier),
    /// Fast attack with a long soft landing; two bezier segments.
    Exaggerated,
}

impl Easing {
    pub const AGGRESSIVE_EASE: Easing = Easing::Bezier(CubicBezier::new(0.2, 0.0, 0.0, 1.0));
    pub const AGGRESSIVE_EASE_IN_OUT: Easing =
        Easing::Bezier(CubicBezier::new(0.6, 0.0, 0.4, 1.0));
    pub const TOUCH_RESPONSE: Easing = Easing::Bezier(CubicBezier::new(0.3, 0.0, 0.1, 1.0));
    pub const FAST_OUT_SLOW_IN: Easing = Easing::Bezier(CubicBezier::new(0.4, 0.0, 0.2, 1.0));
    pub const APP_CLOSE_ALPHA: Easing = Easing::Bezier(CubicBezier::new(0.4, 0.0, 1.0, 1.0));

    /// Map `t` in [0, 1] through this curve.
    pub fn ease(&self, t: f32) -> f32 {
        match self {
            Easing::Linear => linear(t),
            Easing::Accel => accel(t),
            Easing::Accel2 => accel_2(t),
            Easing::Bezier(curve) => curve.ease(t),
            Easing::Exaggerated => {
                let t = t.clamp(0.0, 1.0);
                let split = EXAGGERATED_PATH[0].end.0;
                if t <= split {
                    EXAGGERATED_PATH[0].y_for_x(t)
                } else {
                    EXAGGERATED_PATH[1].y_for_x(t)
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Interval sampling
// ---------------------------------------------------------------------------

/// Value of a property animated from `start` to `end` within a sub-window
/// `[delay, delay + duration]` of an overall play clock.
///
/// Before the window the result is `start`; after it, `end`.
pub fn interval_value(
    start: f32,
    end: f32,
    delay: Duration,
    duration: Duration,
    play_time: Duration,
    easing: Easing,
) -> f32 {
    let local = play_time.saturating_sub(delay);
    let p = if duration.is_zero() {
        1.0
    } else {
        (local.as_secs_f32() / duration.as_secs_f32()).min(1.0)
    };
    start + (end - start) * easing.ease(p)
}

// ---------------------------------------------------------------------------
// Animation trait
// ---------------------------------------------------------------------------

/// Something driven by an explicit clock that yields a unit value.
pub trait Animation {
    /// Move the clock forward by `dt`.
    fn tick(&mut self, dt: Duration);

    /// True once the clock has covered the whole duration.
    fn is_complete(&self) -> bool;

    /// Eased output for the current clock, within [0.0, 1.0].
    fn value(&self) -> f32;

    /// Rewind the clock to zero.
    fn reset(&mut self);

    /// Time elapsed past completion.
    fn overshoot(&self) -> Duration {
        Duration::ZERO
    }
}

// ---------------------------------------------------------------------------
// Fade
// ---------------------------------------------------------------------------

/// Progression from 0.0 to 1.0 over a duration through an [`Easing`].
#[derive(Debug, Clone, Copy)]
pub struct Fade {
    elapsed: Duration,
    duration: Duration,
    easing: Easing,
}

impl Fade {
    /// Create a fade with the given duration and linear easing.
    pub fn new(duration: Duration) -> Self {
        Self {
            elapsed: Duration::ZERO,
            duration: if duration.is_zero() {
                Duration::from_nanos(1)
            } else {
                duration
            },
            easing: Easing::Linear,
        }
    }

    /// Set the easing curve.
    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Elapsed play time, capped at the duration.
    pub fn play_time(&self) -> Duration {
        self.elapsed.min(self.duration)
    }

    /// Elapsed fraction of the duration, before the curve is applied.
    pub fn raw_progress(&self) -> f32 {
        let t = self.elapsed.as_secs_f64() / self.duration.as_secs_f64();
        (t as f32).clamp(0.0, 1.0)
    }
}

impl Animation for Fade {
    fn tick(&mut self, dt: Duration) {
        self.elapsed = self.elapsed.saturating_add(dt);
    }

    fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    fn value(&self) -> f32 {
        self.easing.ease(self.raw_progress())
    }

    fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
    }

    fn overshoot(&self) -> Duration {
        self.elapsed.saturating_sub(self.duration)
    }
}
