#![forbid(unsafe_code)]

//! The task carousel: slot pool, visibility-windowed data loading and
//! single-flight structural mutations.
//!
//! # Scroll model
//!
//! Slots are laid out on a horizontal strip one page stride apart. Slot `i`
//! sits at `page_scroll(i)`: `i * stride`, or `(count - 1 - i) * stride`
//! when the layout is mirrored. A slot appears on screen at
//! `page_scroll(i) + translation_x - scroll_x` relative to the centered
//! position, so `scroll_x == page_scroll(i)` centers slot `i`.
//!
//! # Invariants
//!
//! - After every scroll change, plan application and mutation commit, the
//!   loaded set is exactly the slots within `visible_radius` pages of the
//!   page nearest to the center (clamped to the pool).
//! - A task is loaded at most once while it stays visible; unload is only
//!   issued for tasks currently loaded.
//! - At most one [`PendingAnimation`] is active. Mutations requested while
//!   one runs are either rejected (strict) or queued and run exactly once,
//!   in request order, after it resolves.
//! - The pool is resized in place: growing appends, shrinking trims the
//!   tail. Slot identity survives a reload that keeps the count.
//!
//! # Failure Modes
//!
//! Out-of-range indices and empty pools are reported as [`RecentsError`];
//! nothing here panics on caller input.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use recents_core::animation::{Animation, Easing, Fade};
use recents_core::config::RecentsConfig;
use recents_core::geometry::{Rect, lerp};
use recents_core::transform::SlotFrame;

use crate::error::RecentsError;
use crate::pending::{PendingAnimation, PendingKind, PendingState, SlotProperty, TrackSample};
use crate::task::{LoadPlan, Task, TaskDataLoader, TaskId, ThumbnailData};

/// Scale lost by a slot at the edge of the viewport.
const EDGE_SCALE_DOWN: f32 = 0.03;
/// Fling velocity multiplier per 60Hz frame.
const FLING_DECAY_PER_FRAME: f32 = 0.95;
/// Below this speed (px/s) a fling settles onto the nearest page.
const FLING_STOP_VELOCITY: f32 = 50.0;
const FLING_SETTLE_DURATION: Duration = Duration::from_millis(250);
/// Snap duration for keyboard page moves.
const PAGE_SNAP_DURATION: Duration = Duration::from_millis(750);
const SCROLL_EPSILON: f32 = 0.5;

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

/// Ephemeral visual state of one slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotVisuals {
    pub scale: f32,
    pub translation_x: f32,
    pub translation_y: f32,
    pub alpha: f32,
    pub icon_scale: f32,
    /// Normalized distance from the viewport center: 0 centered, 1 off-screen.
    pub curve: f32,
}

impl SlotVisuals {
    fn reset(alpha: f32) -> Self {
        Self {
            scale: 1.0,
            translation_x: 0.0,
            translation_y: 0.0,
            alpha,
            icon_scale: 1.0,
            curve: 0.0,
        }
    }

    /// Scale including the curved-carousel shrink.
    pub fn display_scale(&self) -> f32 {
        self.scale * self.curve_factor()
    }

    /// Pick the pre-curve scale that displays as `display` at the current curve.
    fn set_display_scale(&mut self, display: f32) {
        self.scale = display / self.curve_factor();
    }

    /// Never below `1 - EDGE_SCALE_DOWN` since the curve stays within [0, 1].
    fn curve_factor(&self) -> f32 {
        1.0 - EDGE_SCALE_DOWN * self.curve.clamp(0.0, 1.0)
    }
}

/// One carousel position bound to a task.
#[derive(Debug, Clone)]
pub struct TaskSlot {
    task: Task,
    visuals: SlotVisuals,
    thumbnail: Option<ThumbnailData>,
}

impl TaskSlot {
    fn new(task: Task, alpha: f32) -> Self {
        Self {
            task,
            visuals: SlotVisuals::reset(alpha),
            thumbnail: None,
        }
    }

    fn bind(&mut self, task: &Task) {
        if self.task.id != task.id {
            self.thumbnail = None;
        }
        self.task = task.clone();
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn visuals(&self) -> &SlotVisuals {
        &self.visuals
    }

    pub fn thumbnail(&self) -> Option<&ThumbnailData> {
        self.thumbnail.as_ref()
    }
}

/// Normalized curve value for a slot `distance` px from the viewport center.
pub fn curve_for_distance(distance: f32, config: &RecentsConfig) -> f32 {
    let reach = config.viewport_width / 2.0 + config.slot_width / 2.0 + config.page_spacing;
    if reach <= 0.0 {
        return 1.0;
    }
    (distance.abs() / reach).min(1.0)
}

// ---------------------------------------------------------------------------
// Events and bookkeeping
// ---------------------------------------------------------------------------

/// Outcome of a structural request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    /// Applied synchronously.
    Applied,
    /// A pending animation was started.
    Started,
    /// Deferred until the active pending animation resolves.
    Queued,
}

/// Side effects for the owner of the carousel to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CarouselEvent {
    HapticFeedback,
    LaunchTask(TaskId),
    /// The underlying task should be removed from the system.
    RemoveTask(TaskId),
    AllTasksRemoved,
    /// A settle target could not be resolved to a slot.
    BackOut,
    PageSettled(usize),
    SlotCountChanged,
}

#[derive(Debug, Clone)]
enum Deferred {
    Plan(Arc<LoadPlan>),
    Dismiss {
        task: TaskId,
        duration: Duration,
        animate: bool,
        remove_task: bool,
    },
    DismissAll,
}

#[derive(Debug, Clone, Copy)]
enum Scroller {
    Idle,
    Snap { fade: Fade, from: f32, to: f32 },
    Fling { velocity: f32 },
}

// ---------------------------------------------------------------------------
// TaskCarousel
// ---------------------------------------------------------------------------

pub struct TaskCarousel {
    config: RecentsConfig,
    loader: Arc<dyn TaskDataLoader>,
    slots: Vec<TaskSlot>,
    /// Tasks whose data is loaded, keyed for deterministic unload order.
    loaded: BTreeMap<TaskId, Task>,
    ignore_reset: HashSet<TaskId>,
    plan_generation: Option<u64>,
    scroll_x: f32,
    scroller: Scroller,
    current_page: usize,
    next_page: usize,
    flinging_fast: bool,
    mirrored: bool,
    content_alpha: f32,
    first_icon_scaled_down: bool,
    pending: Option<PendingAnimation>,
    deferred: VecDeque<Deferred>,
    launch_on_settle: bool,
    events: Vec<CarouselEvent>,
}

impl TaskCarousel {
    pub fn new(config: RecentsConfig, loader: Arc<dyn TaskDataLoader>) -> Self {
        let mirrored = config.is_mirrored();
        Self {
            config,
            loader,
            slots: Vec::new(),
            loaded: BTreeMap::new(),
            ignore_reset: HashSet::new(),
            plan_generation: None,
            scroll_x: 0.0,
            scroller: Scroller::Idle,
            current_page: 0,
            next_page: 0,
            flinging_fast: false,
            mirrored,
            content_alpha: 1.0,
            first_icon_scaled_down: false,
            pending: None,
            deferred: VecDeque::new(),
            launch_on_settle: false,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &RecentsConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[TaskSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&TaskSlot> {
        self.slots.get(index)
    }

    pub fn slot_index(&self, task: TaskId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.task.id == task)
    }

    /// Generation of the last applied plan.
    pub fn plan_generation(&self) -> Option<u64> {
        self.plan_generation
    }

    /// Loaded tasks in slot order.
    pub fn loaded_tasks(&self) -> Vec<TaskId> {
        self.slots
            .iter()
            .map(|slot| slot.task.id)
            .filter(|id| self.loaded.contains_key(id))
            .collect()
    }

    pub fn drain_events(&mut self) -> Vec<CarouselEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: CarouselEvent) {
        self.events.push(event);
    }

    // -- geometry ------------------------------------------------------------

    pub fn scroll_x(&self) -> f32 {
        self.scroll_x
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    /// Scroll offset that centers slot `index`.
    pub fn page_scroll(&self, index: usize) -> f32 {
        let position = if self.mirrored {
            self.slots.len().saturating_sub(index + 1)
        } else {
            index
        };
        position as f32 * self.config.page_stride()
    }

    pub fn max_scroll(&self) -> f32 {
        self.slots.len().saturating_sub(1) as f32 * self.config.page_stride()
    }

    /// The settled page.
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// The page being settled on, or the current page when idle.
    pub fn next_page(&self) -> usize {
        self.next_page
    }

    pub fn nearest_page(&self) -> usize {
        let count = self.slots.len();
        if count == 0 {
            return 0;
        }
        let stride = self.config.page_stride();
        let position = (self.scroll_x / stride).round().clamp(0.0, (count - 1) as f32) as usize;
        if self.mirrored {
            count - 1 - position
        } else {
            position
        }
    }

    /// Layout bounds of slot `index` in screen space, before its own scale
    /// and translation.
    pub fn slot_bounds(&self, index: usize, top: f32) -> Option<Rect> {
        if index >= self.slots.len() {
            return None;
        }
        let left = (self.config.viewport_width - self.config.slot_width) / 2.0
            + self.page_scroll(index)
            - self.scroll_x;
        Some(Rect::new(
            left,
            top,
            self.config.slot_width,
            self.config.slot_height,
        ))
    }

    /// True for the page being settled on and its direct neighbours.
    pub fn is_slot_visible(&self, index: usize) -> bool {
        index < self.slots.len() && index.abs_diff(self.next_page) <= 1
    }

    // -- load plans ----------------------------------------------------------

    /// Bind the pool to `plan`, deferring while a pending animation runs.
    pub fn apply_load_plan(&mut self, plan: Arc<LoadPlan>) -> MutationStatus {
        if self.has_active_pending() {
            tracing::debug!(
                generation = plan.generation,
                "load plan deferred behind pending animation"
            );
            self.deferred.push_back(Deferred::Plan(plan));
            return MutationStatus::Queued;
        }

        let old_count = self.slots.len();
        self.unload_all();
        self.slots.truncate(plan.len());
        for (index, task) in plan.tasks.iter().enumerate() {
            match self.slots.get_mut(index) {
                Some(slot) => slot.bind(task),
                None => self.slots.push(TaskSlot::new(task.clone(), self.content_alpha)),
            }
        }
        self.plan_generation = Some(plan.generation);
        self.clamp_pages();
        self.reset_visuals();

        if old_count != self.slots.len() {
            self.events.push(CarouselEvent::SlotCountChanged);
        }
        tracing::debug!(
            generation = plan.generation,
            slots = self.slots.len(),
            "load plan applied"
        );
        MutationStatus::Applied
    }

    // -- visibility ----------------------------------------------------------

    /// Load data for slots entering the window around the nearest page and
    /// unload slots leaving it.
    pub fn update_visible_set(&mut self) {
        let count = self.slots.len();
        let center = self.nearest_page();
        let radius = self.config.visible_radius;
        let lower = center.saturating_sub(radius);
        let upper = center.saturating_add(radius).min(count.saturating_sub(1));

        for (index, slot) in self.slots.iter().enumerate() {
            let id = slot.task.id;
            if lower <= index && index <= upper {
                if !self.loaded.contains_key(&id) {
                    self.loader.load_task_data(&slot.task);
                    self.loader.on_task_visible(&slot.task);
                    self.loaded.insert(id, slot.task.clone());
                }
            } else if let Some(task) = self.loaded.remove(&id) {
                self.loader.unload_task_data(&task);
                self.loader.on_task_invisible(&task);
            }
        }
    }

    /// Release every loaded task.
    pub fn unload_all(&mut self) {
        for task in std::mem::take(&mut self.loaded).into_values() {
            self.loader.unload_task_data(&task);
            self.loader.on_task_invisible(&task);
        }
    }

    // -- visuals -------------------------------------------------------------

    /// Restore every slot not in the ignore-reset set, then re-run layout
    /// and visibility.
    pub fn reset_visuals(&mut self) {
        let alpha = self.content_alpha;
        for slot in &mut self.slots {
            if !self.ignore_reset.contains(&slot.task.id) {
                slot.visuals = SlotVisuals::reset(alpha);
            }
        }
        self.apply_icon_scale();
        self.curved_layout_pass();
        self.update_visible_set();
    }

    /// Recompute every slot's curve value from the scroll offset. Slots in
    /// the ignore-reset set keep their curve while an external animation
    /// drives their transform.
    pub fn curved_layout_pass(&mut self) {
        for index in 0..self.slots.len() {
            if self.ignore_reset.contains(&self.slots[index].task.id) {
                continue;
            }
            let distance =
                self.page_scroll(index) + self.slots[index].visuals.translation_x - self.scroll_x;
            self.slots[index].visuals.curve = curve_for_distance(distance, &self.config);
        }
    }

    pub fn content_alpha(&self) -> f32 {
        self.content_alpha
    }

    /// Set the alpha of every slot. New slots start at this alpha.
    pub fn set_content_alpha(&mut self, alpha: f32) {
        let alpha = alpha.clamp(0.0, 1.0);
        self.content_alpha = alpha;
        for slot in &mut self.slots {
            slot.visuals.alpha = alpha;
        }
    }

    pub fn set_slot_alpha(&mut self, index: usize, alpha: f32) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                slot.visuals.alpha = alpha;
                true
            }
            None => false,
        }
    }

    pub fn set_first_task_icon_scaled_down(&mut self, scaled_down: bool) {
        self.first_icon_scaled_down = scaled_down;
        self.apply_icon_scale();
    }

    fn apply_icon_scale(&mut self) {
        let scale = if self.first_icon_scaled_down { 0.0 } else { 1.0 };
        if let Some(first) = self.slots.first_mut() {
            first.visuals.icon_scale = scale;
        }
    }

    /// Exclude `task` from visual resets while an external animation owns it.
    pub fn add_ignore_reset(&mut self, task: TaskId) {
        self.ignore_reset.insert(task);
    }

    pub fn remove_ignore_reset(&mut self, task: TaskId) {
        self.ignore_reset.remove(&task);
    }

    /// Push a transition frame onto the slot bound to `task`.
    pub fn apply_slot_frame(&mut self, task: TaskId, frame: SlotFrame) -> bool {
        let Some(slot) = self.slots.iter_mut().find(|slot| slot.task.id == task) else {
            return false;
        };
        slot.visuals.set_display_scale(frame.scale);
        slot.visuals.translation_x = frame.translation_x;
        slot.visuals.translation_y = frame.translation_y;
        slot.visuals.alpha = frame.alpha;
        true
    }

    /// Install fresh thumbnail data and make the slot opaque.
    pub fn update_thumbnail(&mut self, task: TaskId, thumbnail: ThumbnailData) -> bool {
        let Some(slot) = self.slots.iter_mut().find(|slot| slot.task.id == task) else {
            return false;
        };
        slot.thumbnail = Some(thumbnail);
        slot.visuals.alpha = 1.0;
        true
    }

    /// Flip the layout direction, keeping the current page centered.
    pub fn set_mirrored(&mut self, mirrored: bool) {
        if self.mirrored == mirrored {
            return;
        }
        self.mirrored = mirrored;
        let page = self.next_page;
        self.set_current_page(page);
    }

    // -- scrolling -----------------------------------------------------------

    /// Jump to `page` without animation.
    pub fn set_current_page(&mut self, page: usize) {
        self.scroller = Scroller::Idle;
        let page = page.min(self.slots.len().saturating_sub(1));
        self.current_page = page;
        self.next_page = page;
        self.scroll_x = self.page_scroll(page);
        self.curved_layout_pass();
        self.update_visible_set();
    }

    /// Unload everything and return to page 0. Nothing is loaded again until
    /// the next scroll or visibility update.
    pub fn reset(&mut self) {
        self.unload_all();
        self.scroller = Scroller::Idle;
        self.launch_on_settle = false;
        self.current_page = 0;
        self.next_page = 0;
        self.scroll_x = self.page_scroll(0);
        self.curved_layout_pass();
    }

    /// Animate to `page` (clamped). Returns `false` if no movement is needed.
    pub fn snap_to_page(&mut self, page: usize, duration: Duration) -> bool {
        if self.slots.is_empty() {
            return false;
        }
        let page = page.min(self.slots.len() - 1);
        let target = self.page_scroll(page);
        self.next_page = page;
        self.set_flinging_fast(false);
        if (target - self.scroll_x).abs() < SCROLL_EPSILON {
            self.scroll_x = target;
            self.scroller = Scroller::Idle;
            self.current_page = page;
            return false;
        }
        self.scroller = Scroller::Snap {
            fade: Fade::new(duration).easing(Easing::FAST_OUT_SLOW_IN),
            from: self.scroll_x,
            to: target,
        };
        tracing::trace!(page, ?duration, "snap started");
        true
    }

    /// Snap `delta` pages from the next page, wrapping at both ends.
    pub fn snap_relative(&mut self, delta: i32) -> bool {
        let count = self.slots.len() as i64;
        if count == 0 {
            return false;
        }
        let page = (self.next_page as i64 + delta as i64).rem_euclid(count) as usize;
        self.snap_to_page(page, PAGE_SNAP_DURATION)
    }

    /// Drag the strip by `dx` px, cancelling any scroll animation.
    pub fn scroll_by(&mut self, dx: f32) {
        self.scroller = Scroller::Idle;
        self.set_flinging_fast(false);
        self.scroll_x = (self.scroll_x + dx).clamp(0.0, self.max_scroll());
        self.next_page = self.nearest_page();
        self.curved_layout_pass();
        self.update_visible_set();
    }

    /// Release with `velocity` px/s; momentum decays and settles on a page.
    pub fn fling(&mut self, velocity: f32) {
        if self.slots.is_empty() {
            return;
        }
        self.scroller = Scroller::Fling { velocity };
        self.set_flinging_fast(velocity.abs() > self.config.fast_fling_velocity);
    }

    pub fn is_scrolling(&self) -> bool {
        !matches!(self.scroller, Scroller::Idle)
    }

    fn set_flinging_fast(&mut self, fast: bool) {
        if self.flinging_fast != fast {
            self.flinging_fast = fast;
            self.loader.set_flinging_fast(fast);
        }
    }

    /// Launch the slot at the page the current snap settles on.
    pub fn launch_on_settle(&mut self) {
        self.launch_on_settle = true;
    }

    /// Request launch of the slot at `page`, or back out if there is none.
    pub fn launch_page(&mut self, page: usize) {
        match self.slots.get(page) {
            Some(slot) => self.events.push(CarouselEvent::LaunchTask(slot.task.id)),
            None => {
                tracing::debug!(page, "no slot to launch; backing out");
                self.events.push(CarouselEvent::BackOut);
            }
        }
    }

    /// Advance scroll and pending animations by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        self.advance_scroller(dt);
        self.advance_pending(dt);
        self.curved_layout_pass();
        self.update_visible_set();
    }

    fn advance_scroller(&mut self, dt: Duration) {
        match self.scroller {
            Scroller::Idle => {}
            Scroller::Snap { mut fade, from, to } => {
                fade.tick(dt);
                if fade.is_complete() {
                    self.scroll_x = to;
                    self.scroller = Scroller::Idle;
                    self.on_page_settled();
                } else {
                    self.scroll_x = lerp(from, to, fade.value());
                    self.scroller = Scroller::Snap { fade, from, to };
                }
            }
            Scroller::Fling { velocity } => {
                let secs = dt.as_secs_f32();
                let unclamped = self.scroll_x + velocity * secs;
                self.scroll_x = unclamped.clamp(0.0, self.max_scroll());
                let mut velocity = velocity * FLING_DECAY_PER_FRAME.powf(secs * 60.0);
                if unclamped != self.scroll_x {
                    velocity = 0.0;
                }
                if velocity.abs() < FLING_STOP_VELOCITY {
                    let page = self.nearest_page();
                    if !self.snap_to_page(page, FLING_SETTLE_DURATION) {
                        self.on_page_settled();
                    }
                } else {
                    self.set_flinging_fast(velocity.abs() > self.config.fast_fling_velocity);
                    self.scroller = Scroller::Fling { velocity };
                }
            }
        }
    }

    fn on_page_settled(&mut self) {
        self.scroll_x = self.scroll_x.clamp(0.0, self.max_scroll());
        self.current_page = self.next_page.min(self.slots.len().saturating_sub(1));
        self.events.push(CarouselEvent::PageSettled(self.current_page));
        if std::mem::take(&mut self.launch_on_settle) {
            self.launch_page(self.current_page);
        }
    }

    /// Clamp scroll after the pool changed size and re-derive the pages.
    ///
    /// A running snap is retargeted onto the clamped next page and keeps the
    /// time it had left.
    fn clamp_pages(&mut self) {
        let unclamped = self.scroll_x;
        self.scroll_x = self.scroll_x.clamp(0.0, self.max_scroll());
        let last = self.slots.len().saturating_sub(1);
        match self.scroller {
            Scroller::Idle => {
                let page = self.nearest_page();
                self.current_page = page;
                self.next_page = page;
            }
            Scroller::Snap { fade, to, .. } => {
                self.current_page = self.current_page.min(last);
                self.next_page = self.next_page.min(last);
                if self.slots.is_empty() {
                    self.scroller = Scroller::Idle;
                    return;
                }
                let target = self.page_scroll(self.next_page);
                if (target - to).abs() >= SCROLL_EPSILON || unclamped != self.scroll_x {
                    let remaining = fade.duration().saturating_sub(fade.play_time());
                    tracing::debug!(page = self.next_page, ?remaining, "snap retargeted");
                    self.scroller = Scroller::Snap {
                        fade: Fade::new(remaining).easing(Easing::FAST_OUT_SLOW_IN),
                        from: self.scroll_x,
                        to: target,
                    };
                }
            }
            Scroller::Fling { .. } => {
                self.current_page = self.current_page.min(last);
                self.next_page = self.next_page.min(last);
            }
        }
    }

    // -- structural mutations ------------------------------------------------

    pub fn pending_animation(&self) -> Option<&PendingAnimation> {
        self.pending.as_ref()
    }

    pub fn has_active_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(PendingAnimation::is_active)
    }

    /// Number of requests waiting for the active pending animation.
    pub fn queued_mutations(&self) -> usize {
        self.deferred.len()
    }

    /// Animate slot `index` away and remove it on commit.
    pub fn dismiss(
        &mut self,
        index: usize,
        duration: Duration,
        animate: bool,
        remove_task: bool,
    ) -> Result<MutationStatus, RecentsError> {
        let count = self.slots.len();
        if count == 0 {
            return Err(RecentsError::EmptyCarousel);
        }
        let Some(slot) = self.slots.get(index) else {
            return Err(RecentsError::NoSuchSlot { index, count });
        };
        let task = slot.task.id;

        if self.has_active_pending() {
            self.guard_second_mutation()?;
            tracing::warn!(%task, "dismiss queued behind pending animation");
            self.deferred.push_back(Deferred::Dismiss {
                task,
                duration,
                animate,
                remove_task,
            });
            return Ok(MutationStatus::Queued);
        }
        self.start_dismiss(index, duration, animate, remove_task);
        Ok(MutationStatus::Started)
    }

    /// Fade every slot and remove all tasks on commit.
    pub fn dismiss_all(&mut self) -> Result<MutationStatus, RecentsError> {
        if self.slots.is_empty() {
            return Err(RecentsError::EmptyCarousel);
        }
        if self.has_active_pending() {
            self.guard_second_mutation()?;
            tracing::warn!("dismiss-all queued behind pending animation");
            self.deferred.push_back(Deferred::DismissAll);
            return Ok(MutationStatus::Queued);
        }
        self.start_dismiss_all();
        Ok(MutationStatus::Started)
    }

    fn guard_second_mutation(&self) -> Result<(), RecentsError> {
        if self.config.strict_pending_animations {
            tracing::error!("another pending animation is still running");
            return Err(RecentsError::PendingAnimationActive);
        }
        Ok(())
    }

    /// Scroll offset of slot `index` once slot `removed` is gone.
    fn page_scroll_without(&self, index: usize, removed: usize) -> f32 {
        let new_count = self.slots.len().saturating_sub(1);
        let new_index = if index > removed { index - 1 } else { index };
        let position = if self.mirrored {
            new_count.saturating_sub(new_index + 1)
        } else {
            new_index
        };
        position as f32 * self.config.page_stride()
    }

    fn start_dismiss(&mut self, index: usize, duration: Duration, animate: bool, remove_task: bool) {
        let count = self.slots.len();
        let dismissed = self.slots[index].task.id;
        let last_page = if self.mirrored { 0 } else { count - 1 };

        // Removing the last page shrinks the scroll range; if the strip is
        // scrolled past the new end everything shifts by the excess.
        let edge_compensation = if index == last_page && count > 1 {
            let new_max = (count - 2) as f32 * self.config.page_stride();
            (self.scroll_x - new_max).max(0.0)
        } else {
            0.0
        };

        let mut pending = PendingAnimation::new(
            PendingKind::Dismiss {
                task: dismissed,
                remove_task,
                animate,
            },
            duration,
        );
        for (i, slot) in self.slots.iter().enumerate() {
            let visuals = slot.visuals;
            if i == index {
                if animate {
                    pending.add_track(dismissed, SlotProperty::Alpha, visuals.alpha, 0.0, Easing::Accel2);
                    pending.add_track(
                        dismissed,
                        SlotProperty::TranslationY,
                        visuals.translation_y,
                        -self.config.slot_height,
                        Easing::Linear,
                    );
                }
                continue;
            }
            let shift = self.page_scroll_without(i, index) - self.page_scroll(i) + edge_compensation;
            if shift.abs() > f32::EPSILON {
                pending.add_track(
                    slot.task.id,
                    SlotProperty::TranslationX,
                    visuals.translation_x,
                    shift,
                    Easing::Accel,
                );
            }
        }

        tracing::debug!(
            task = %dismissed,
            index,
            animate,
            remove_task,
            tracks = pending.track_count(),
            "dismiss started"
        );
        self.pending = Some(pending);
    }

    fn start_dismiss_all(&mut self) {
        let mut pending = PendingAnimation::new(PendingKind::DismissAll, self.config.dismiss_duration);
        for slot in &self.slots {
            pending.add_track(
                slot.task.id,
                SlotProperty::Alpha,
                slot.visuals.alpha,
                0.0,
                Easing::Accel2,
            );
        }
        tracing::debug!(slots = self.slots.len(), "dismiss-all started");
        self.pending = Some(pending);
    }

    fn advance_pending(&mut self, dt: Duration) {
        let Some(pending) = self.pending.as_mut() else {
            return;
        };
        let resolved = pending.tick(dt);
        let samples = pending.samples();
        self.apply_samples(&samples);
        if let Some(state) = resolved {
            self.finish_pending(state);
        }
    }

    fn apply_samples(&mut self, samples: &[TrackSample]) {
        for sample in samples {
            let Some(slot) = self.slots.iter_mut().find(|slot| slot.task.id == sample.task) else {
                continue;
            };
            match sample.property {
                SlotProperty::TranslationX => slot.visuals.translation_x = sample.value,
                SlotProperty::TranslationY => slot.visuals.translation_y = sample.value,
                SlotProperty::Alpha => slot.visuals.alpha = sample.value,
            }
        }
    }

    /// The animation driving the pending mutation was interrupted.
    pub fn on_pending_animation_interrupted(&mut self) {
        let aborted = self.pending.as_mut().is_some_and(PendingAnimation::abort);
        if aborted {
            self.finish_pending(PendingState::Aborted);
        }
    }

    fn finish_pending(&mut self, state: PendingState) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        match (state, pending.kind()) {
            (PendingState::Committed, PendingKind::Dismiss { task, remove_task, .. }) => {
                if *remove_task {
                    self.events.push(CarouselEvent::RemoveTask(*task));
                }
                self.remove_slot(*task);
                if self.slots.is_empty() {
                    self.events.push(CarouselEvent::AllTasksRemoved);
                }
                tracing::debug!(task = %task, remaining = self.slots.len(), "dismiss committed");
            }
            (PendingState::Committed, PendingKind::DismissAll) => {
                for slot in &self.slots {
                    self.events.push(CarouselEvent::RemoveTask(slot.task.id));
                }
                self.unload_all();
                self.slots.clear();
                self.events.push(CarouselEvent::AllTasksRemoved);
                tracing::debug!("dismiss-all committed");
            }
            (_, kind) => tracing::debug!(?kind, "pending animation aborted"),
        }
        self.clamp_pages();
        self.reset_visuals();
        self.drain_deferred();
    }

    fn remove_slot(&mut self, task: TaskId) -> Option<TaskSlot> {
        let index = self.slot_index(task)?;
        let slot = self.slots.remove(index);
        if let Some(task) = self.loaded.remove(&task) {
            self.loader.unload_task_data(&task);
            self.loader.on_task_invisible(&task);
        }
        Some(slot)
    }

    fn drain_deferred(&mut self) {
        while !self.has_active_pending() {
            let Some(next) = self.deferred.pop_front() else {
                break;
            };
            match next {
                Deferred::Plan(plan) => {
                    self.apply_load_plan(plan);
                }
                Deferred::Dismiss {
                    task,
                    duration,
                    animate,
                    remove_task,
                } => match self.slot_index(task) {
                    Some(index) => self.start_dismiss(index, duration, animate, remove_task),
                    None => tracing::debug!(%task, "queued dismiss dropped; task is gone"),
                },
                Deferred::DismissAll => {
                    if !self.slots.is_empty() {
                        self.start_dismiss_all();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::testing::{LoaderCall, RecordingLoader, plan};

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn carousel(n: i32, strict: bool) -> (TaskCarousel, Arc<RecordingLoader>) {
        let loader = Arc::new(RecordingLoader::default());
        let config = RecentsConfig::default().with_strict_pending_animations(strict);
        let mut carousel = TaskCarousel::new(config, loader.clone());
        carousel.apply_load_plan(plan(1, n));
        loader.take();
        carousel.drain_events();
        (carousel, loader)
    }

    fn task_ids(carousel: &TaskCarousel) -> Vec<TaskId> {
        carousel.slots().iter().map(|slot| slot.task().id).collect()
    }

    fn ids(raw: &[i32]) -> Vec<TaskId> {
        raw.iter().copied().map(TaskId).collect()
    }

    #[test]
    fn initial_plan_loads_window_around_page_zero() {
        let loader = Arc::new(RecordingLoader::default());
        let mut carousel = TaskCarousel::new(RecentsConfig::default(), loader.clone());
        assert_eq!(carousel.apply_load_plan(plan(1, 5)), MutationStatus::Applied);
        assert_eq!(carousel.loaded_tasks(), ids(&[0, 1, 2]));
        assert_eq!(carousel.drain_events(), vec![CarouselEvent::SlotCountChanged]);
        assert_eq!(carousel.plan_generation(), Some(1));
    }

    #[test]
    fn scrolling_unloads_each_task_once() {
        let (mut carousel, loader) = carousel(5, true);
        carousel.set_current_page(2);
        assert_eq!(carousel.loaded_tasks(), ids(&[0, 1, 2, 3, 4]));
        loader.take();

        carousel.set_current_page(0);
        assert_eq!(carousel.loaded_tasks(), ids(&[0, 1, 2]));
        assert_eq!(
            loader.take(),
            vec![
                LoaderCall::Unload(TaskId(3)),
                LoaderCall::Invisible(TaskId(3)),
                LoaderCall::Unload(TaskId(4)),
                LoaderCall::Invisible(TaskId(4)),
            ]
        );
    }

    #[test]
    fn repeated_visibility_update_is_silent() {
        let (mut carousel, loader) = carousel(7, true);
        carousel.set_current_page(3);
        loader.take();
        carousel.update_visible_set();
        carousel.update_visible_set();
        assert!(loader.take().is_empty());
    }

    #[test]
    fn same_count_reload_keeps_page() {
        let (mut carousel, _loader) = carousel(5, true);
        carousel.set_current_page(3);
        carousel.apply_load_plan(plan(2, 5));
        assert_eq!(carousel.current_page(), 3);
        assert!(carousel.drain_events().is_empty());
    }

    #[test]
    fn shrinking_plan_trims_tail() {
        let (mut carousel, _loader) = carousel(5, true);
        carousel.set_current_page(4);
        carousel.apply_load_plan(plan(2, 2));
        assert_eq!(task_ids(&carousel), ids(&[0, 1]));
        assert_eq!(carousel.current_page(), 1);
        assert_eq!(carousel.drain_events(), vec![CarouselEvent::SlotCountChanged]);
    }

    #[test]
    fn snap_retargets_when_plan_shrinks_pool() {
        let (mut carousel, _loader) = carousel(5, true);
        assert!(carousel.snap_to_page(4, ms(750)));
        carousel.tick(ms(100));

        carousel.apply_load_plan(plan(2, 2));
        assert_eq!(carousel.next_page(), 1);
        assert!(carousel.scroll_x() <= carousel.max_scroll());

        carousel.tick(ms(1000));
        assert!(!carousel.is_scrolling());
        assert_eq!(carousel.current_page(), 1);
        assert_eq!(carousel.scroll_x(), carousel.page_scroll(1));
        assert!(carousel.is_slot_visible(1));
        let bounds = carousel.slot_bounds(1, 0.0).unwrap();
        assert!(bounds.left() >= 0.0 && bounds.right() <= carousel.config().viewport_width);
    }

    #[test]
    fn mirrored_page_scroll_runs_backwards() {
        let loader = Arc::new(RecordingLoader::default());
        let config = RecentsConfig::default().with_system_rtl(true);
        let mut carousel = TaskCarousel::new(config, loader);
        carousel.apply_load_plan(plan(1, 3));
        assert_eq!(carousel.page_scroll(0), 2.0 * 768.0);
        assert_eq!(carousel.page_scroll(2), 0.0);
        carousel.set_current_page(0);
        assert_eq!(carousel.nearest_page(), 0);
    }

    #[test]
    fn curve_grows_with_distance() {
        let (mut carousel, _loader) = carousel(3, true);
        carousel.set_current_page(1);
        let curves: Vec<f32> = carousel.slots().iter().map(|s| s.visuals().curve).collect();
        assert_eq!(curves[1], 0.0);
        assert!((curves[0] - 768.0 / 948.0).abs() < 1e-4);
        assert_eq!(curves[0], curves[2]);
        assert!(carousel.slot(0).unwrap().visuals().display_scale() < 1.0);
    }

    #[test]
    fn dismiss_middle_shifts_following_slots() {
        let (mut carousel, _loader) = carousel(5, true);
        carousel.set_current_page(2);
        assert_eq!(
            carousel.dismiss(1, ms(300), true, true),
            Ok(MutationStatus::Started)
        );
        let pending = carousel.pending_animation().unwrap();
        assert!(!pending.has_track(TaskId(0), SlotProperty::TranslationX));
        for id in 2..5 {
            assert!(pending.has_track(TaskId(id), SlotProperty::TranslationX));
        }
        assert!(pending.has_track(TaskId(1), SlotProperty::Alpha));

        carousel.tick(ms(150));
        let shifted = carousel.slot(3).unwrap().visuals().translation_x;
        assert!(shifted < 0.0 && shifted > -768.0);

        carousel.tick(ms(150));
        assert_eq!(task_ids(&carousel), ids(&[0, 2, 3, 4]));
        assert_eq!(carousel.slot(2).unwrap().visuals().translation_x, 0.0);
        assert_eq!(carousel.drain_events(), vec![CarouselEvent::RemoveTask(TaskId(1))]);
    }

    #[test]
    fn dismiss_last_from_center_needs_no_compensation() {
        let (mut carousel, loader) = carousel(5, true);
        carousel.set_current_page(2);
        loader.take();
        carousel.dismiss(4, ms(300), true, true).unwrap();
        assert_eq!(carousel.pending_animation().unwrap().track_count(), 2);

        carousel.tick(ms(300));
        assert_eq!(carousel.len(), 4);
        assert_eq!(carousel.loaded_tasks(), ids(&[0, 1, 2, 3]));
        assert_eq!(
            loader.take(),
            vec![LoaderCall::Unload(TaskId(4)), LoaderCall::Invisible(TaskId(4))]
        );
    }

    #[test]
    fn dismiss_last_at_end_compensates_others() {
        let (mut carousel, _loader) = carousel(3, true);
        carousel.set_current_page(2);
        carousel.dismiss(2, ms(300), true, false).unwrap();
        let pending = carousel.pending_animation().unwrap();
        assert!(pending.has_track(TaskId(0), SlotProperty::TranslationX));
        assert!(pending.has_track(TaskId(1), SlotProperty::TranslationX));

        carousel.tick(ms(300));
        assert_eq!(carousel.scroll_x(), 768.0);
        assert_eq!(carousel.current_page(), 1);
        assert!(carousel.drain_events().is_empty());
    }

    #[test]
    fn strict_mode_rejects_second_mutation() {
        let (mut carousel, _loader) = carousel(3, true);
        carousel.dismiss(0, ms(300), true, true).unwrap();
        assert_eq!(
            carousel.dismiss(1, ms(300), true, true),
            Err(RecentsError::PendingAnimationActive)
        );
        assert_eq!(carousel.dismiss_all(), Err(RecentsError::PendingAnimationActive));
    }

    #[test]
    fn lenient_mode_queues_and_runs_once() {
        let (mut carousel, _loader) = carousel(3, false);
        carousel.dismiss(0, ms(300), true, true).unwrap();
        assert_eq!(
            carousel.dismiss(1, ms(300), true, true),
            Ok(MutationStatus::Queued)
        );
        carousel.tick(ms(300));
        assert_eq!(task_ids(&carousel), ids(&[1, 2]));
        assert!(carousel.has_active_pending());
        assert_eq!(carousel.queued_mutations(), 0);

        carousel.tick(ms(300));
        assert_eq!(task_ids(&carousel), ids(&[2]));
        assert!(!carousel.has_active_pending());
    }

    #[test]
    fn plan_waits_for_pending_animation() {
        let (mut carousel, _loader) = carousel(3, true);
        carousel.dismiss(0, ms(300), true, true).unwrap();
        assert_eq!(carousel.apply_load_plan(plan(2, 4)), MutationStatus::Queued);
        assert_eq!(carousel.plan_generation(), Some(1));

        carousel.tick(ms(300));
        assert_eq!(carousel.plan_generation(), Some(2));
        assert_eq!(carousel.len(), 4);
    }

    #[test]
    fn abort_resets_without_removal() {
        let (mut carousel, _loader) = carousel(3, true);
        carousel.dismiss(1, ms(300), true, true).unwrap();
        carousel.tick(ms(100));
        assert!(carousel.slot(1).unwrap().visuals().alpha < 1.0);

        carousel.on_pending_animation_interrupted();
        assert_eq!(carousel.len(), 3);
        assert!(carousel.pending_animation().is_none());
        let visuals = carousel.slot(1).unwrap().visuals();
        assert_eq!(visuals.alpha, 1.0);
        assert_eq!(visuals.translation_y, 0.0);
        assert!(carousel.drain_events().is_empty());
    }

    #[test]
    fn dismissing_everything_signals_all_removed() {
        let (mut carousel, loader) = carousel(2, true);
        carousel.dismiss_all().unwrap();
        carousel.tick(ms(300));
        assert!(carousel.is_empty());
        assert!(carousel.loaded_tasks().is_empty());
        assert_eq!(
            carousel.drain_events(),
            vec![
                CarouselEvent::RemoveTask(TaskId(0)),
                CarouselEvent::RemoveTask(TaskId(1)),
                CarouselEvent::AllTasksRemoved,
            ]
        );
        assert!(loader.take().contains(&LoaderCall::Unload(TaskId(1))));
    }

    #[test]
    fn dismiss_errors() {
        let (mut carousel, _loader) = carousel(2, true);
        assert_eq!(
            carousel.dismiss(5, ms(300), true, true),
            Err(RecentsError::NoSuchSlot { index: 5, count: 2 })
        );
        let (mut empty, _loader) = self::carousel(0, true);
        assert_eq!(
            empty.dismiss(0, ms(300), true, true),
            Err(RecentsError::EmptyCarousel)
        );
    }

    #[test]
    fn ignore_reset_preserves_visuals() {
        let (mut carousel, _loader) = carousel(3, true);
        carousel.add_ignore_reset(TaskId(1));
        carousel.set_content_alpha(0.5);
        carousel.reset_visuals();
        assert_eq!(carousel.slot(0).unwrap().visuals().alpha, 0.5);
        carousel.set_slot_alpha(1, 0.0);
        carousel.reset_visuals();
        assert_eq!(carousel.slot(1).unwrap().visuals().alpha, 0.0);
        carousel.remove_ignore_reset(TaskId(1));
        carousel.reset_visuals();
        assert_eq!(carousel.slot(1).unwrap().visuals().alpha, 0.5);
    }

    #[test]
    fn first_icon_scale_survives_reload() {
        let (mut carousel, _loader) = carousel(3, true);
        carousel.set_first_task_icon_scaled_down(true);
        carousel.apply_load_plan(plan(2, 3));
        assert_eq!(carousel.slot(0).unwrap().visuals().icon_scale, 0.0);
        assert_eq!(carousel.slot(1).unwrap().visuals().icon_scale, 1.0);
    }

    #[test]
    fn snap_relative_wraps() {
        let (mut carousel, _loader) = carousel(3, true);
        assert!(carousel.snap_relative(-1));
        assert_eq!(carousel.next_page(), 2);
        carousel.tick(ms(750));
        assert_eq!(carousel.current_page(), 2);
        assert_eq!(carousel.drain_events(), vec![CarouselEvent::PageSettled(2)]);
        assert!(carousel.snap_relative(1));
        assert_eq!(carousel.next_page(), 0);
    }

    #[test]
    fn launch_after_settle() {
        let (mut carousel, _loader) = carousel(3, true);
        assert!(carousel.snap_to_page(1, ms(60)));
        carousel.launch_on_settle();
        carousel.tick(ms(30));
        assert!(carousel.drain_events().is_empty());
        carousel.tick(ms(30));
        assert_eq!(
            carousel.drain_events(),
            vec![
                CarouselEvent::PageSettled(1),
                CarouselEvent::LaunchTask(TaskId(1)),
            ]
        );
    }

    #[test]
    fn missing_page_backs_out() {
        let (mut carousel, _loader) = carousel(1, true);
        carousel.launch_page(3);
        assert_eq!(carousel.drain_events(), vec![CarouselEvent::BackOut]);
    }

    #[test]
    fn fast_fling_toggles_throttle_once() {
        let (mut carousel, loader) = carousel(10, true);
        carousel.fling(5000.0);
        for _ in 0..200 {
            carousel.tick(ms(16));
        }
        let throttles: Vec<LoaderCall> = loader
            .take()
            .into_iter()
            .filter(|call| matches!(call, LoaderCall::FlingingFast(_)))
            .collect();
        assert_eq!(
            throttles,
            vec![LoaderCall::FlingingFast(true), LoaderCall::FlingingFast(false)]
        );
        assert!(!carousel.is_scrolling());
        assert_eq!(carousel.scroll_x(), carousel.page_scroll(carousel.current_page()));
        assert!(carousel.current_page() > 0);
    }

    #[test]
    fn thumbnail_update_makes_slot_opaque() {
        let (mut carousel, _loader) = carousel(2, true);
        carousel.set_content_alpha(0.0);
        let thumbnail = ThumbnailData {
            width: 360,
            height: 640,
            insets: recents_core::geometry::Insets::ZERO,
            scale: 0.5,
        };
        assert!(carousel.update_thumbnail(TaskId(1), thumbnail.clone()));
        let slot = carousel.slot(1).unwrap();
        assert_eq!(slot.thumbnail(), Some(&thumbnail));
        assert_eq!(slot.visuals().alpha, 1.0);
        assert!(!carousel.update_thumbnail(TaskId(9), thumbnail));
    }

    #[test]
    fn slot_bounds_follow_scroll() {
        let (mut carousel, _loader) = carousel(3, true);
        let centered = carousel.slot_bounds(0, 100.0).unwrap();
        assert_eq!(centered.x, 180.0);
        carousel.set_current_page(1);
        assert_eq!(carousel.slot_bounds(0, 100.0).unwrap().x, 180.0 - 768.0);
        assert!(carousel.slot_bounds(3, 0.0).is_none());
    }

    #[test]
    fn visible_slot_is_next_page_and_neighbours() {
        let (mut carousel, _loader) = carousel(5, true);
        carousel.set_current_page(2);
        let visible: Vec<bool> = (0..5).map(|i| carousel.is_slot_visible(i)).collect();
        assert_eq!(visible, vec![false, true, true, true, false]);
    }
}
