#![forbid(unsafe_code)]

//! The recents view: composition root for the carousel, quick scrub and
//! the model cache's deliveries.
//!
//! [`RecentsView`] does not own the [`ModelCache`]; operations that need it
//! take it by `&mut`. Side effects for the host (launch a task, remove a
//! task, play haptics) are collected as [`RecentsEvent`]s and handed out by
//! [`RecentsView::drain_events`].
//!
//! # Task stack gating
//!
//! Snapshot updates are accepted only while overview is enabled *and* the
//! view is visible. Entering that state reloads the plan if it went stale.

use std::time::Duration;

use recents_core::config::RecentsConfig;
use recents_core::geometry::Rect;

use crate::carousel::{CarouselEvent, MutationStatus, TaskCarousel};
use crate::error::RecentsError;
use crate::input::{Key, KeyModifiers, NavCommand};
use crate::model_cache::{ModelCache, ModelEvent, RequestId};
use crate::quick_scrub::QuickScrubController;
use crate::surface::{SurfaceHandle, SurfaceProvider, TransactionSink, WindowTarget};
use crate::task::{TaskId, ThumbnailData};
use crate::transition::{
    LaunchLayout, LaunchSource, ResolvedLaunch, TransitionTick, WindowTransition, resolve_launch,
};

/// Side effects for the host to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecentsEvent {
    HapticFeedback,
    LaunchTask(TaskId),
    RemoveTask(TaskId),
    AllTasksRemoved,
    /// Leave recents without launching anything.
    BackOut,
    PageSettled(usize),
    AssistDataReceived(TaskId),
}

pub struct RecentsView {
    config: RecentsConfig,
    carousel: TaskCarousel,
    scrub: QuickScrubController,
    running_task: Option<TaskId>,
    running_task_hidden: bool,
    /// Slot handed to a launch transition; excluded from visual resets.
    launching_task: Option<TaskId>,
    load_request: Option<RequestId>,
    overview_enabled: bool,
    window_visible: bool,
    events: Vec<RecentsEvent>,
}

impl RecentsView {
    pub fn new(config: RecentsConfig, model: &ModelCache) -> Self {
        let carousel = TaskCarousel::new(config.clone(), model.task_loader());
        let scrub = QuickScrubController::new(&config);
        Self {
            config,
            carousel,
            scrub,
            running_task: None,
            running_task_hidden: false,
            launching_task: None,
            load_request: None,
            overview_enabled: false,
            window_visible: false,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &RecentsConfig {
        &self.config
    }

    pub fn carousel(&self) -> &TaskCarousel {
        &self.carousel
    }

    pub fn carousel_mut(&mut self) -> &mut TaskCarousel {
        &mut self.carousel
    }

    pub fn quick_scrub(&self) -> &QuickScrubController {
        &self.scrub
    }

    pub fn running_task(&self) -> Option<TaskId> {
        self.running_task
    }

    pub fn load_request(&self) -> Option<RequestId> {
        self.load_request
    }

    pub fn drain_events(&mut self) -> Vec<RecentsEvent> {
        std::mem::take(&mut self.events)
    }

    // -- model ---------------------------------------------------------------

    /// Handle deliveries from the model cache.
    pub fn pump(&mut self, model: &mut ModelCache) -> Result<(), RecentsError> {
        for event in model.poll() {
            match event {
                ModelEvent::PlanLoaded { request, plan } => {
                    if model.is_valid(request) {
                        let status = self.carousel.apply_load_plan(plan);
                        tracing::trace!(request = request.0, ?status, "load plan delivered");
                    } else {
                        tracing::debug!(
                            request = request.0,
                            generation = model.generation(),
                            "ignoring stale load plan"
                        );
                        self.reload_if_needed(model)?;
                    }
                }
                ModelEvent::AssistDataReceived(task) => {
                    self.events.push(RecentsEvent::AssistDataReceived(task));
                }
            }
        }
        self.route_events();
        Ok(())
    }

    /// Request a plan unless the held one is still current.
    pub fn reload_if_needed(&mut self, model: &mut ModelCache) -> Result<(), RecentsError> {
        if self.load_request.is_some_and(|request| model.is_valid(request)) {
            return Ok(());
        }
        self.load_request = Some(model.request_load(self.running_task)?);
        Ok(())
    }

    /// Show recents with `running` pinned to slot 0. The running task's slot
    /// stays hidden until [`set_running_task_hidden`](Self::set_running_task_hidden)
    /// reveals it.
    pub fn show_task(&mut self, running: TaskId, model: &mut ModelCache) -> Result<(), RecentsError> {
        self.running_task = Some(running);
        self.running_task_hidden = true;
        self.carousel.set_current_page(0);
        let stale = !self.load_request.is_some_and(|request| model.is_valid(request));
        if self.carousel.is_empty() || stale {
            self.load_request = Some(model.request_load(Some(running))?);
        } else {
            self.carousel.update_visible_set();
        }
        self.hide_running_task();
        tracing::debug!(%running, stale, "showing running task");
        Ok(())
    }

    pub fn set_running_task_hidden(&mut self, hidden: bool) {
        self.running_task_hidden = hidden;
        if hidden {
            self.hide_running_task();
        } else if let Some(index) = self.running_task.and_then(|task| self.carousel.slot_index(task)) {
            let alpha = self.carousel.content_alpha();
            self.carousel.set_slot_alpha(index, alpha);
        }
    }

    /// Re-applied after every batch of carousel work, since a plan or a
    /// committed dismiss resets slot alpha.
    fn hide_running_task(&mut self) {
        if !self.running_task_hidden {
            return;
        }
        if let Some(index) = self.running_task.and_then(|task| self.carousel.slot_index(task)) {
            self.carousel.set_slot_alpha(index, 0.0);
        }
    }

    /// Release loaded data, forget the running task and return to page 0.
    pub fn reset(&mut self) {
        self.release_launching_slot();
        self.carousel.reset();
        self.running_task = None;
        self.running_task_hidden = false;
    }

    // -- task stack gating ---------------------------------------------------

    pub fn handles_task_stack_changes(&self) -> bool {
        self.overview_enabled && self.window_visible
    }

    pub fn set_overview_state_enabled(
        &mut self,
        enabled: bool,
        model: &mut ModelCache,
    ) -> Result<(), RecentsError> {
        let before = self.handles_task_stack_changes();
        self.overview_enabled = enabled;
        self.on_gating_changed(before, model)
    }

    pub fn set_window_visible(
        &mut self,
        visible: bool,
        model: &mut ModelCache,
    ) -> Result<(), RecentsError> {
        let before = self.handles_task_stack_changes();
        self.window_visible = visible;
        self.on_gating_changed(before, model)
    }

    fn on_gating_changed(&mut self, before: bool, model: &mut ModelCache) -> Result<(), RecentsError> {
        let now = self.handles_task_stack_changes();
        if now && !before {
            tracing::trace!("task stack changes enabled");
            self.reload_if_needed(model)?;
        }
        Ok(())
    }

    /// A fresh snapshot for `task`. Returns `false` if it was not applied.
    pub fn on_task_snapshot_changed(&mut self, task: TaskId, thumbnail: ThumbnailData) -> bool {
        if !self.handles_task_stack_changes() {
            return false;
        }
        self.carousel.update_thumbnail(task, thumbnail)
    }

    // -- navigation and mutations --------------------------------------------

    /// Handle a key press. Returns `true` if the key was consumed.
    pub fn handle_key(&mut self, key: Key, modifiers: KeyModifiers) -> Result<bool, RecentsError> {
        let Some(command) = NavCommand::from_key(key, modifiers, self.carousel.is_mirrored()) else {
            return Ok(false);
        };
        match command {
            NavCommand::Relative(delta) => {
                self.carousel.snap_relative(delta);
            }
            NavCommand::DismissCurrent => {
                if self.carousel.is_empty() {
                    return Ok(false);
                }
                let page = self.carousel.next_page();
                self.dismiss_task(page, true, true)?;
            }
        }
        Ok(true)
    }

    pub fn dismiss_task(
        &mut self,
        index: usize,
        animate: bool,
        remove_task: bool,
    ) -> Result<MutationStatus, RecentsError> {
        self.carousel
            .dismiss(index, self.config.dismiss_duration, animate, remove_task)
    }

    pub fn dismiss_all_tasks(&mut self) -> Result<MutationStatus, RecentsError> {
        self.carousel.dismiss_all()
    }

    pub fn snap_to_task_after_next(&mut self) {
        self.carousel.snap_relative(1);
    }

    pub fn launch_next_task(&mut self) {
        let page = self.carousel.next_page();
        self.carousel.launch_page(page);
        self.route_events();
    }

    pub fn scroll_by(&mut self, dx: f32) {
        self.carousel.scroll_by(dx);
    }

    pub fn fling(&mut self, velocity: f32) {
        self.carousel.fling(velocity);
    }

    pub fn set_content_alpha(&mut self, alpha: f32) {
        self.carousel.set_content_alpha(alpha);
        self.hide_running_task();
    }

    /// The user flipped the carousel direction preference.
    pub fn set_mirror_preference(&mut self, mirror: bool) {
        self.config.mirror_preference = mirror;
        self.carousel.set_mirrored(self.config.is_mirrored());
    }

    // -- quick scrub ---------------------------------------------------------

    pub fn on_quick_scrub_start(&mut self, from_home: bool) {
        self.scrub.start(from_home, &mut self.carousel);
    }

    pub fn on_quick_scrub_transition_finished(&mut self) {
        self.scrub.on_transition_finished();
    }

    pub fn on_quick_scrub_progress(&mut self, progress: f32) {
        self.scrub.progress(progress, &mut self.carousel);
        self.route_events();
    }

    pub fn on_quick_scrub_end(&mut self) {
        self.scrub.end(&mut self.carousel);
        self.route_events();
    }

    // -- frames --------------------------------------------------------------

    /// Advance the scrub alarm and carousel animations by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        self.scrub.tick(dt, &mut self.carousel);
        self.carousel.tick(dt);
        self.route_events();
    }

    fn route_events(&mut self) {
        for event in self.carousel.drain_events() {
            let routed = match event {
                CarouselEvent::SlotCountChanged => {
                    self.scrub.snap_to_next_task_if_available(&mut self.carousel);
                    continue;
                }
                CarouselEvent::HapticFeedback => RecentsEvent::HapticFeedback,
                CarouselEvent::LaunchTask(task) => RecentsEvent::LaunchTask(task),
                CarouselEvent::RemoveTask(task) => RecentsEvent::RemoveTask(task),
                CarouselEvent::AllTasksRemoved => RecentsEvent::AllTasksRemoved,
                CarouselEvent::BackOut => RecentsEvent::BackOut,
                CarouselEvent::PageSettled(page) => RecentsEvent::PageSettled(page),
            };
            self.events.push(routed);
        }
        self.hide_running_task();
    }

    // -- window transitions --------------------------------------------------

    pub fn resolve_launch(
        &self,
        source: &LaunchSource,
        targets: &[WindowTarget],
    ) -> Option<ResolvedLaunch> {
        resolve_launch(
            source,
            &self.carousel,
            self.handles_task_stack_changes(),
            targets,
        )
    }

    /// Build the transition for a launch from `source`. A slot driven by the
    /// transition is kept out of visual resets until the transition finishes.
    pub fn start_launch(
        &mut self,
        source: &LaunchSource,
        layout: &LaunchLayout,
        targets: Vec<WindowTarget>,
        tracking: SurfaceHandle,
    ) -> Option<WindowTransition> {
        let resolved = self.resolve_launch(source, &targets)?;
        let transition =
            WindowTransition::launch(resolved, &self.carousel, layout, targets, tracking)?;
        if let Some(task) = transition.launching_task() {
            self.release_launching_slot();
            self.carousel.add_ignore_reset(task);
            self.launching_task = Some(task);
        }
        Some(transition)
    }

    fn release_launching_slot(&mut self) {
        if let Some(task) = self.launching_task.take() {
            self.carousel.remove_ignore_reset(task);
        }
    }

    pub fn start_closing(
        &self,
        device: Rect,
        targets: Vec<WindowTarget>,
        tracking: SurfaceHandle,
    ) -> WindowTransition {
        WindowTransition::closing(
            device,
            self.carousel.is_mirrored(),
            &self.config,
            targets,
            tracking,
        )
    }

    /// Tick `transition` and apply its carousel side.
    pub fn tick_transition(
        &mut self,
        transition: &mut WindowTransition,
        dt: Duration,
        provider: &dyn SurfaceProvider,
        sink: &mut dyn TransactionSink,
    ) -> TransitionTick {
        let tick = transition.tick(dt, provider, sink);
        if let Some((task, frame)) = tick.slot {
            self.carousel.apply_slot_frame(task, frame);
        }
        if tick.finished && transition.launching_task() == self.launching_task {
            self.release_launching_slot();
        }
        tick
    }
}
