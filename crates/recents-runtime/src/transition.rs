#![forbid(unsafe_code)]

//! Per-frame driver for window launch and close transitions.
//!
//! A [`WindowTransition`] owns the play clock of one transition and turns it
//! into a [`Transaction`] per frame for the window targets taking part.
//! The carousel side of a thumbnail launch is returned to the caller as a
//! [`SlotFrame`] instead of being applied here, so the driver never borrows
//! the carousel across frames.
//!
//! # Frame protocol
//!
//! 1. Ask the [`SurfaceProvider`] for the next frame number of the tracking
//!    surface (the launcher-side surface the window is synchronized with).
//! 2. If there is none the surface was destroyed: skip the frame, apply
//!    nothing, and warn once for the lifetime of the transition.
//! 3. Otherwise record alpha, matrix and crop for every participating
//!    target, the frame barrier when both sides move together, and on the
//!    first applied frame a `show` for every target.
//! 4. Apply the batch through the [`TransactionSink`].
//!
//! # Failure Modes
//!
//! A launch whose slot disappeared before the transition was built yields
//! `None` from [`WindowTransition::launch`]; the caller launches without an
//! animation.

use std::sync::Arc;
use std::time::Duration;

use recents_core::config::RecentsConfig;
use recents_core::geometry::{Insets, Rect};
use recents_core::transform::{
    ClosingTransition, IconGeometry, IconLaunch, IconState, SlotFrame, ThumbnailGeometry,
    ThumbnailLaunch,
};

use crate::carousel::TaskCarousel;
use crate::surface::{
    SurfaceHandle, SurfaceProvider, TargetMode, Transaction, TransactionSink, WindowTarget,
};
use crate::task::TaskId;

/// Where a launch was initiated.
#[derive(Debug, Clone, PartialEq)]
pub enum LaunchSource {
    /// A carousel slot was tapped.
    Slot(TaskId),
    /// An icon outside the carousel. `component` identifies the app the
    /// icon starts, when known.
    Icon {
        component: Option<Arc<str>>,
        geometry: IconGeometry,
    },
}

/// Device-level layout the launch geometry is computed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaunchLayout {
    pub device: Rect,
    /// Insets used when a slot has no thumbnail of its own yet.
    pub insets: Insets,
    /// Top of the carousel row in screen space.
    pub slot_top: f32,
    /// Offset of the thumbnail below the top of its slot.
    pub thumbnail_top: f32,
}

/// Which interpolator a launch runs through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedLaunch {
    Thumbnail { index: usize, task: TaskId },
    Icon(IconGeometry),
}

/// Decide how a launch animates.
///
/// A slot launch always uses its thumbnail. An icon launch uses a thumbnail
/// when the carousel is showing the same app in a visible slot: matched by
/// component while overview is visible, otherwise by the task id of the
/// first opening target. Everything else animates from the icon.
/// Returns `None` for a slot launch whose task is no longer bound.
pub fn resolve_launch(
    source: &LaunchSource,
    carousel: &TaskCarousel,
    overview_visible: bool,
    targets: &[WindowTarget],
) -> Option<ResolvedLaunch> {
    match source {
        LaunchSource::Slot(task) => {
            let index = carousel.slot_index(*task)?;
            Some(ResolvedLaunch::Thumbnail { index, task: *task })
        }
        LaunchSource::Icon {
            component,
            geometry,
        } => {
            let by_component = || {
                let component = component.as_deref()?;
                carousel
                    .slots()
                    .iter()
                    .enumerate()
                    .find(|(index, slot)| {
                        carousel.is_slot_visible(*index) && &*slot.task().component == component
                    })
                    .map(|(index, slot)| (index, slot.task().id))
            };
            let by_target = || {
                let target = targets.iter().find(|target| target.is_opening())?;
                let index = carousel.slot_index(target.task_id)?;
                carousel
                    .is_slot_visible(index)
                    .then_some((index, target.task_id))
            };

            let matched = if overview_visible {
                by_component()
            } else {
                by_target()
            };
            Some(match matched {
                Some((index, task)) => ResolvedLaunch::Thumbnail { index, task },
                None => ResolvedLaunch::Icon(*geometry),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// WindowTransition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Driver {
    Thumbnail {
        task: TaskId,
        launch: ThumbnailLaunch,
        animate_carousel: bool,
    },
    Icon {
        launch: IconLaunch,
    },
    Closing {
        transition: ClosingTransition,
    },
}

/// What one tick produced for the caller to apply outside the surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransitionTick {
    /// Visual state for the launching slot.
    pub slot: Option<(TaskId, SlotFrame)>,
    /// The floating icon of an icon launch.
    pub icon: Option<IconState>,
    /// The frame was skipped because the tracking surface is gone.
    pub skipped: bool,
    /// The play clock reached the end of the transition.
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub struct WindowTransition {
    driver: Driver,
    targets: Vec<WindowTarget>,
    tracking: SurfaceHandle,
    play_time: Duration,
    first_frame: bool,
    warned_destroyed: bool,
    done: bool,
}

impl WindowTransition {
    /// Build a launch transition for `resolved`.
    ///
    /// The carousel side is suppressed when the launcher itself is among
    /// the closing targets.
    pub fn launch(
        resolved: ResolvedLaunch,
        carousel: &TaskCarousel,
        layout: &LaunchLayout,
        targets: Vec<WindowTarget>,
        tracking: SurfaceHandle,
    ) -> Option<Self> {
        let config = carousel.config();
        let driver = match resolved {
            ResolvedLaunch::Thumbnail { index, task } => {
                let slot = carousel.slot(index)?;
                if slot.task().id != task {
                    return None;
                }
                let slot_bounds = carousel.slot_bounds(index, layout.slot_top)?;
                let visuals = slot.visuals();
                let geometry = ThumbnailGeometry {
                    device: layout.device,
                    insets: slot.thumbnail().map_or(layout.insets, |t| t.insets),
                    slot_bounds,
                    thumbnail_top: layout.thumbnail_top,
                    slot_scale: visuals.display_scale(),
                    slot_translation_x: visuals.translation_x,
                };
                let animate_carousel = !targets
                    .iter()
                    .any(|t| t.is_launcher && t.mode == TargetMode::Closing);
                Driver::Thumbnail {
                    task,
                    launch: ThumbnailLaunch::new(geometry, config),
                    animate_carousel,
                }
            }
            ResolvedLaunch::Icon(geometry) => Driver::Icon {
                launch: IconLaunch::new(geometry, config),
            },
        };
        tracing::debug!(?resolved, targets = targets.len(), "launch transition built");
        Some(Self::with_driver(driver, targets, tracking))
    }

    /// Build a transition closing `targets` back to the launcher.
    pub fn closing(
        device: Rect,
        mirrored: bool,
        config: &RecentsConfig,
        targets: Vec<WindowTarget>,
        tracking: SurfaceHandle,
    ) -> Self {
        let transition = ClosingTransition::new(device, mirrored, config);
        tracing::debug!(mirrored, targets = targets.len(), "closing transition built");
        Self::with_driver(Driver::Closing { transition }, targets, tracking)
    }

    fn with_driver(driver: Driver, targets: Vec<WindowTarget>, tracking: SurfaceHandle) -> Self {
        Self {
            driver,
            targets,
            tracking,
            play_time: Duration::ZERO,
            first_frame: true,
            warned_destroyed: false,
            done: false,
        }
    }

    pub fn duration(&self) -> Duration {
        match &self.driver {
            Driver::Thumbnail { launch, .. } => launch.duration(),
            Driver::Icon { launch } => launch.duration(),
            Driver::Closing { transition } => transition.duration(),
        }
    }

    pub fn play_time(&self) -> Duration {
        self.play_time
    }

    pub fn is_finished(&self) -> bool {
        self.done
    }

    /// True for a thumbnail launch that also moves the carousel slot.
    pub fn animates_carousel(&self) -> bool {
        matches!(
            self.driver,
            Driver::Thumbnail {
                animate_carousel: true,
                ..
            }
        )
    }

    /// Task whose carousel slot this transition drives, if any.
    pub fn launching_task(&self) -> Option<TaskId> {
        match self.driver {
            Driver::Thumbnail {
                task,
                animate_carousel: true,
                ..
            } => Some(task),
            _ => None,
        }
    }

    pub fn targets(&self) -> &[WindowTarget] {
        &self.targets
    }

    /// Advance the clock by `dt` and emit this frame's transaction.
    pub fn tick(
        &mut self,
        dt: Duration,
        provider: &dyn SurfaceProvider,
        sink: &mut dyn TransactionSink,
    ) -> TransitionTick {
        if self.done {
            return TransitionTick {
                finished: true,
                ..TransitionTick::default()
            };
        }
        let duration = self.duration();
        self.play_time = (self.play_time + dt).min(duration);
        let finished = self.play_time >= duration;

        let Some(frame_number) = provider.next_frame_number(self.tracking) else {
            if !self.warned_destroyed {
                self.warned_destroyed = true;
                tracing::warn!(
                    surface = self.tracking.0,
                    "tracking surface destroyed, skipping transition frames"
                );
            }
            self.done = finished;
            return TransitionTick {
                skipped: true,
                finished,
                ..TransitionTick::default()
            };
        };

        let mut tx = Transaction::new();
        let mut out = TransitionTick {
            finished,
            ..TransitionTick::default()
        };
        let play = self.play_time;

        match self.driver {
            Driver::Thumbnail {
                task,
                launch,
                animate_carousel,
            } => {
                let bounds = launch.frame_at(play);
                for target in &self.targets {
                    if target.is_opening() {
                        tx.apply_frame(target.surface, &bounds.window.positioned(target.position));
                        if animate_carousel {
                            tx.defer_until_frame(target.surface, self.tracking, frame_number);
                        }
                    }
                    if self.first_frame {
                        tx.show(target.surface);
                    }
                }
                if animate_carousel {
                    out.slot = Some((task, bounds.slot));
                }
            }
            Driver::Icon { launch } => {
                let frame = launch.frame_at(play);
                for target in &self.targets {
                    if target.is_opening() {
                        tx.apply_frame(target.surface, &frame.window.positioned(target.position));
                        tx.defer_until_frame(target.surface, self.tracking, frame_number);
                    }
                    if self.first_frame {
                        tx.show(target.surface);
                    }
                }
                out.icon = Some(frame.icon);
            }
            Driver::Closing { transition } => {
                for target in &self.targets {
                    if self.first_frame {
                        let layer = match target.mode {
                            TargetMode::Closing => i32::MAX,
                            TargetMode::Opening => target.stack_order,
                        };
                        tx.set_layer(target.surface, layer).show(target.surface);
                    }
                    if target.mode == TargetMode::Closing {
                        let frame = transition
                            .frame_at(play, &target.source_bounds)
                            .positioned(target.position);
                        tx.apply_frame(target.surface, &frame);
                    }
                }
            }
        }

        self.first_frame = false;
        self.done = finished;
        tracing::trace!(
            play_ms = play.as_millis() as u64,
            frame_number,
            ops = tx.ops().len(),
            "transition frame"
        );
        if !tx.is_empty() {
            sink.apply(tx);
        }
        if finished {
            tracing::debug!("transition finished");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{RecordingSink, SurfaceOp};
    use crate::task::testing::{RecordingLoader, plan};
    use recents_core::geometry::Point;
    use std::cell::Cell;

    const TRACKING: SurfaceHandle = SurfaceHandle(100);

    struct Frames {
        next: Cell<u64>,
        alive_for: Cell<Option<u32>>,
    }

    impl Frames {
        fn alive() -> Self {
            Self {
                next: Cell::new(1),
                alive_for: Cell::new(None),
            }
        }

        fn destroyed() -> Self {
            Self {
                next: Cell::new(1),
                alive_for: Cell::new(Some(0)),
            }
        }
    }

    impl SurfaceProvider for Frames {
        fn next_frame_number(&self, _surface: SurfaceHandle) -> Option<u64> {
            if let Some(left) = self.alive_for.get() {
                if left == 0 {
                    return None;
                }
                self.alive_for.set(Some(left - 1));
            }
            let n = self.next.get();
            self.next.set(n + 1);
            Some(n)
        }
    }

    fn target(task: i32, mode: TargetMode, surface: u64) -> WindowTarget {
        WindowTarget {
            task_id: TaskId(task),
            mode,
            surface: SurfaceHandle(surface),
            position: Point::new(0.0, 0.0),
            source_bounds: Rect::from_size(1080.0, 1920.0),
            stack_order: 3,
            is_launcher: false,
        }
    }

    fn launcher_closing() -> WindowTarget {
        WindowTarget {
            is_launcher: true,
            ..target(-1, TargetMode::Closing, 50)
        }
    }

    fn layout() -> LaunchLayout {
        LaunchLayout {
            device: Rect::from_size(1080.0, 1920.0),
            insets: Insets::new(0.0, 63.0, 0.0, 126.0),
            slot_top: 200.0,
            thumbnail_top: 48.0,
        }
    }

    fn icon_geometry() -> IconGeometry {
        IconGeometry {
            device: Rect::from_size(1080.0, 1920.0),
            icon: Rect::new(100.0, 1500.0, 120.0, 120.0),
            start_scale: 1.0,
        }
    }

    fn carousel(n: i32) -> TaskCarousel {
        let mut carousel = TaskCarousel::new(
            RecentsConfig::default(),
            Arc::new(RecordingLoader::default()),
        );
        carousel.apply_load_plan(plan(1, n));
        carousel.drain_events();
        carousel
    }

    fn icon_source(component: Option<&str>) -> LaunchSource {
        LaunchSource::Icon {
            component: component.map(Arc::from),
            geometry: icon_geometry(),
        }
    }

    #[test]
    fn slot_launch_resolves_to_thumbnail() {
        let carousel = carousel(3);
        assert_eq!(
            resolve_launch(&LaunchSource::Slot(TaskId(2)), &carousel, true, &[]),
            Some(ResolvedLaunch::Thumbnail {
                index: 2,
                task: TaskId(2)
            })
        );
        assert_eq!(
            resolve_launch(&LaunchSource::Slot(TaskId(9)), &carousel, true, &[]),
            None
        );
    }

    #[test]
    fn icon_matches_visible_slot_by_component_in_overview() {
        let carousel = carousel(5);
        let resolved = resolve_launch(&icon_source(Some("pkg/.App1")), &carousel, true, &[]);
        assert_eq!(
            resolved,
            Some(ResolvedLaunch::Thumbnail {
                index: 1,
                task: TaskId(1)
            })
        );

        // Slot 3 exists but is not adjacent to page 0.
        let resolved = resolve_launch(&icon_source(Some("pkg/.App3")), &carousel, true, &[]);
        assert_eq!(resolved, Some(ResolvedLaunch::Icon(icon_geometry())));
    }

    #[test]
    fn icon_matches_opening_target_outside_overview() {
        let carousel = carousel(5);
        let targets = [
            target(-1, TargetMode::Closing, 9),
            target(1, TargetMode::Opening, 10),
        ];
        assert_eq!(
            resolve_launch(&icon_source(None), &carousel, false, &targets),
            Some(ResolvedLaunch::Thumbnail {
                index: 1,
                task: TaskId(1)
            })
        );

        let far = [target(4, TargetMode::Opening, 10)];
        assert_eq!(
            resolve_launch(&icon_source(None), &carousel, false, &far),
            Some(ResolvedLaunch::Icon(icon_geometry()))
        );
    }

    #[test]
    fn first_slot_frame_keeps_neighbour_scale() {
        let mut carousel = carousel(3);
        let before = *carousel.slot(1).unwrap().visuals();
        assert!(before.curve > 0.0);

        let resolved = ResolvedLaunch::Thumbnail {
            index: 1,
            task: TaskId(1),
        };
        let targets = vec![target(1, TargetMode::Opening, 10)];
        let mut transition =
            WindowTransition::launch(resolved, &carousel, &layout(), targets, TRACKING).unwrap();
        assert_eq!(transition.launching_task(), Some(TaskId(1)));

        let mut sink = RecordingSink::default();
        let tick = transition.tick(Duration::ZERO, &Frames::alive(), &mut sink);
        let (task, frame) = tick.slot.unwrap();
        assert!(carousel.apply_slot_frame(task, frame));

        let after = carousel.slot(1).unwrap().visuals();
        assert!((after.display_scale() - before.display_scale()).abs() < 1e-4);
        assert!((after.translation_x - before.translation_x).abs() < 1e-3);
    }

    #[test]
    fn thumbnail_launch_defers_and_shows_on_first_frame() {
        let carousel = carousel(3);
        let targets = vec![target(0, TargetMode::Opening, 10)];
        let resolved = ResolvedLaunch::Thumbnail {
            index: 0,
            task: TaskId(0),
        };
        let mut transition =
            WindowTransition::launch(resolved, &carousel, &layout(), targets, TRACKING).unwrap();
        assert!(transition.animates_carousel());

        let frames = Frames::alive();
        let mut sink = RecordingSink::default();
        let tick = transition.tick(Duration::from_millis(16), &frames, &mut sink);
        assert!(!tick.skipped);
        assert_eq!(tick.slot.map(|(task, _)| task), Some(TaskId(0)));

        let ops = sink.applied[0].ops();
        assert!(matches!(ops[0], SurfaceOp::SetAlpha(SurfaceHandle(10), _)));
        assert!(ops.contains(&SurfaceOp::DeferUntilFrame {
            surface: SurfaceHandle(10),
            barrier: TRACKING,
            frame_number: 1,
        }));
        assert_eq!(ops.last(), Some(&SurfaceOp::Show(SurfaceHandle(10))));

        transition.tick(Duration::from_millis(16), &frames, &mut sink);
        assert!(!sink.applied[1]
            .ops()
            .iter()
            .any(|op| matches!(op, SurfaceOp::Show(_))));
    }

    #[test]
    fn launcher_closing_suppresses_carousel_side() {
        let carousel = carousel(3);
        let targets = vec![target(0, TargetMode::Opening, 10), launcher_closing()];
        let resolved = ResolvedLaunch::Thumbnail {
            index: 0,
            task: TaskId(0),
        };
        let mut transition =
            WindowTransition::launch(resolved, &carousel, &layout(), targets, TRACKING).unwrap();
        assert!(!transition.animates_carousel());

        let mut sink = RecordingSink::default();
        let tick = transition.tick(Duration::from_millis(16), &Frames::alive(), &mut sink);
        assert_eq!(tick.slot, None);
        assert!(!sink.applied[0]
            .ops()
            .iter()
            .any(|op| matches!(op, SurfaceOp::DeferUntilFrame { .. })));
    }

    #[test]
    fn icon_launch_always_defers() {
        let carousel = carousel(0);
        let targets = vec![target(7, TargetMode::Opening, 10), launcher_closing()];
        let mut transition = WindowTransition::launch(
            ResolvedLaunch::Icon(icon_geometry()),
            &carousel,
            &layout(),
            targets,
            TRACKING,
        )
        .unwrap();

        let mut sink = RecordingSink::default();
        let tick = transition.tick(Duration::from_millis(16), &Frames::alive(), &mut sink);
        assert!(tick.icon.is_some());
        assert!(sink.applied[0]
            .ops()
            .iter()
            .any(|op| matches!(op, SurfaceOp::DeferUntilFrame { .. })));
    }

    #[test]
    fn closing_layers_on_first_frame() {
        let config = RecentsConfig::default();
        let targets = vec![
            target(1, TargetMode::Closing, 10),
            target(2, TargetMode::Opening, 11),
        ];
        let mut transition = WindowTransition::closing(
            Rect::from_size(1080.0, 1920.0),
            false,
            &config,
            targets,
            TRACKING,
        );
        let mut sink = RecordingSink::default();
        transition.tick(Duration::from_millis(16), &Frames::alive(), &mut sink);

        let ops = sink.applied[0].ops();
        assert!(ops.contains(&SurfaceOp::SetLayer(SurfaceHandle(10), i32::MAX)));
        assert!(ops.contains(&SurfaceOp::SetLayer(SurfaceHandle(11), 3)));
        assert!(ops.contains(&SurfaceOp::Show(SurfaceHandle(11))));
        assert!(!ops
            .iter()
            .any(|op| matches!(op, SurfaceOp::SetAlpha(SurfaceHandle(11), _))));
    }

    #[test]
    fn destroyed_surface_skips_frames_until_done() {
        let config = RecentsConfig::default();
        let mut transition = WindowTransition::closing(
            Rect::from_size(1080.0, 1920.0),
            true,
            &config,
            vec![target(1, TargetMode::Closing, 10)],
            TRACKING,
        );
        let frames = Frames::destroyed();
        let mut sink = RecordingSink::default();

        let tick = transition.tick(Duration::from_millis(16), &frames, &mut sink);
        assert!(tick.skipped);
        assert!(!tick.finished);
        let tick = transition.tick(Duration::from_millis(400), &frames, &mut sink);
        assert!(tick.skipped && tick.finished);
        assert!(transition.is_finished());
        assert!(sink.applied.is_empty());
    }

    #[test]
    fn finishes_at_duration() {
        let config = RecentsConfig::default();
        let mut transition = WindowTransition::closing(
            Rect::from_size(1080.0, 1920.0),
            false,
            &config,
            vec![target(1, TargetMode::Closing, 10)],
            TRACKING,
        );
        let frames = Frames::alive();
        let mut sink = RecordingSink::default();
        assert!(!transition.tick(Duration::from_millis(200), &frames, &mut sink).finished);
        assert!(transition.tick(Duration::from_millis(200), &frames, &mut sink).finished);
        assert_eq!(transition.play_time(), config.closing_transition_duration);

        let after = transition.tick(Duration::from_millis(16), &frames, &mut sink);
        assert!(after.finished);
        assert_eq!(sink.applied.len(), 2);
    }
}
