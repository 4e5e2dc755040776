#![forbid(unsafe_code)]

//! Serialized access to the platform recents-animation controller.
//!
//! The controller handle is the only state shared between the foreground
//! and the background executor. It lives behind one mutex together with
//! its window targets and the input-consumer flag; there is no second lock.
//!
//! Controller commands are dispatched to the background executor and take
//! the lock there, so attaching a new controller and finishing the old one
//! never interleave. Completions are posted back to a mailbox and run when
//! the foreground calls [`RecentsAnimationWrapper::poll`].
//!
//! # Invariants
//!
//! - `enable_input_consumer` before a controller is attached is remembered
//!   and replayed by [`RecentsAnimationWrapper::set_controller`].
//! - `finish` disables input consumption before finishing, and its
//!   completion runs only if a controller was attached.
//!
//! # Failure Modes
//!
//! A poisoned lock is recovered; the state it guards is always consistent
//! between statements. A shut-down executor is reported as
//! [`RecentsError::ExecutorShutdown`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::RecentsError;
use crate::executor::{Mailbox, Spawner};
use crate::surface::WindowTarget;

/// The platform side of a running recents animation.
pub trait AnimationController: Send {
    fn set_input_consumer_enabled(&mut self, enabled: bool);
    fn finish(&mut self, to_home: bool);
}

/// Continuation run on the foreground after a finish completes.
pub type FinishCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct ControllerState {
    controller: Option<Box<dyn AnimationController>>,
    targets: Vec<WindowTarget>,
    input_consumer_enabled: bool,
}

pub struct RecentsAnimationWrapper {
    state: Arc<Mutex<ControllerState>>,
    spawner: Spawner,
    completions: Mailbox<FinishCallback>,
}

fn lock(state: &Mutex<ControllerState>) -> MutexGuard<'_, ControllerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecentsAnimationWrapper {
    pub fn new(spawner: Spawner) -> Self {
        Self {
            state: Arc::new(Mutex::new(ControllerState::default())),
            spawner,
            completions: Mailbox::new(),
        }
    }

    /// Attach a controller and its targets, replacing any previous one.
    pub fn set_controller(
        &self,
        controller: Box<dyn AnimationController>,
        targets: Vec<WindowTarget>,
    ) -> Result<(), RecentsError> {
        let replay = {
            let mut state = lock(&self.state);
            state.controller = Some(controller);
            state.targets = targets;
            state.input_consumer_enabled
        };
        tracing::debug!(replay, "animation controller attached");
        if replay {
            self.enable_input_consumer()?;
        }
        Ok(())
    }

    pub fn has_controller(&self) -> bool {
        lock(&self.state).controller.is_some()
    }

    pub fn targets(&self) -> Vec<WindowTarget> {
        lock(&self.state).targets.clone()
    }

    /// Route input to the controller. Remembered if none is attached yet.
    pub fn enable_input_consumer(&self) -> Result<(), RecentsError> {
        lock(&self.state).input_consumer_enabled = true;
        let state = Arc::clone(&self.state);
        self.spawner.execute(move || {
            let mut state = lock(&state);
            if let Some(controller) = state.controller.as_mut() {
                controller.set_input_consumer_enabled(true);
            }
        })
    }

    /// Finish the animation toward home or the app. `on_complete` is queued
    /// for [`poll`](Self::poll) once the controller has been finished.
    pub fn finish(
        &self,
        to_home: bool,
        on_complete: Option<FinishCallback>,
    ) -> Result<(), RecentsError> {
        let state = Arc::clone(&self.state);
        let completions = self.completions.sender();
        self.spawner.execute(move || {
            let mut state = lock(&state);
            state.input_consumer_enabled = false;
            let Some(mut controller) = state.controller.take() else {
                tracing::debug!(to_home, "finish without a controller");
                return;
            };
            controller.set_input_consumer_enabled(false);
            controller.finish(to_home);
            drop(state);
            tracing::debug!(to_home, "animation controller finished");
            if let Some(callback) = on_complete {
                completions.post(callback);
            }
        })
    }

    /// Run completions delivered since the last call. Returns how many ran.
    pub fn poll(&self) -> usize {
        let callbacks = self.completions.drain();
        let count = callbacks.len();
        for callback in callbacks {
            callback();
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::BackgroundExecutor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        InputConsumer(bool),
        Finish(bool),
    }

    #[derive(Clone, Default)]
    struct MockController {
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl AnimationController for MockController {
        fn set_input_consumer_enabled(&mut self, enabled: bool) {
            self.calls.lock().unwrap().push(Call::InputConsumer(enabled));
        }
        fn finish(&mut self, to_home: bool) {
            self.calls.lock().unwrap().push(Call::Finish(to_home));
        }
    }

    #[test]
    fn enable_before_attach_is_replayed() {
        let wrapper = RecentsAnimationWrapper::new(Spawner::inline());
        wrapper.enable_input_consumer().unwrap();

        let mock = MockController::default();
        wrapper
            .set_controller(Box::new(mock.clone()), Vec::new())
            .unwrap();
        assert_eq!(*mock.calls.lock().unwrap(), vec![Call::InputConsumer(true)]);
    }

    #[test]
    fn finish_disables_input_then_finishes() {
        let wrapper = RecentsAnimationWrapper::new(Spawner::inline());
        let mock = MockController::default();
        wrapper
            .set_controller(Box::new(mock.clone()), Vec::new())
            .unwrap();

        let done = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&done);
        wrapper
            .finish(
                true,
                Some(Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap();

        assert_eq!(
            *mock.calls.lock().unwrap(),
            vec![Call::InputConsumer(false), Call::Finish(true)]
        );
        assert_eq!(done.load(Ordering::SeqCst), 0);
        assert_eq!(wrapper.poll(), 1);
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert!(!wrapper.has_controller());
    }

    #[test]
    fn finish_without_controller_skips_completion() {
        let wrapper = RecentsAnimationWrapper::new(Spawner::inline());
        wrapper.finish(false, Some(Box::new(|| {}))).unwrap();
        assert_eq!(wrapper.poll(), 0);
    }

    #[test]
    fn commands_run_in_order_on_the_worker() {
        let executor = BackgroundExecutor::start("wrapper-test").unwrap();
        let wrapper = RecentsAnimationWrapper::new(executor.spawner());
        let mock = MockController::default();
        wrapper
            .set_controller(Box::new(mock.clone()), Vec::new())
            .unwrap();
        wrapper.enable_input_consumer().unwrap();
        wrapper.finish(false, Some(Box::new(|| {}))).unwrap();
        drop(executor);

        assert_eq!(
            *mock.calls.lock().unwrap(),
            vec![
                Call::InputConsumer(true),
                Call::InputConsumer(false),
                Call::Finish(false)
            ]
        );
        assert_eq!(wrapper.poll(), 1);
    }
}
