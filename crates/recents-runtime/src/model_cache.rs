#![forbid(unsafe_code)]

//! Generation-stamped cache of the recent task list.
//!
//! The cache keeps a task-change counter (the *generation*). Every task
//! stack change bumps it; a [`RequestId`] is the generation observed when a
//! load was requested, and it is valid only while the two are equal.
//!
//! # Invariants
//!
//! - The generation starts at 1 and only ever increases.
//! - Validity is decided by equality with the live counter, never by arrival
//!   order, so a plan built before a bump is stale even if it arrives last.
//! - Every delivered plan, stale or not, becomes the "last served" plan when
//!   it is drained by [`ModelCache::poll`]. Consumers must check
//!   [`ModelCache::is_valid`] before acting on it.
//! - The assist-data cache is cleared on a bump unless the preserve flag was
//!   set by the delivery of assist data, in which case only the flag is
//!   cleared.
//!
//! # Failure Modes
//!
//! If the background executor is gone, [`ModelCache::request_load`] returns
//! [`RecentsError::ExecutorShutdown`] and nothing is delivered.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RecentsError;
use crate::executor::{Mailbox, MailboxSender, Spawner};
use crate::task::{AssistData, LoadPlan, TaskDataLoader, TaskId, TaskSource};

/// Generation observed when a load was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

/// Something the foreground should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// A requested plan is ready. It may already be stale.
    PlanLoaded {
        request: RequestId,
        plan: Arc<LoadPlan>,
    },
    AssistDataReceived(TaskId),
}

enum Delivery {
    Plan {
        request: RequestId,
        plan: Arc<LoadPlan>,
        notify: bool,
    },
    Assist {
        task: TaskId,
        data: AssistData,
    },
}

/// Thread-safe handle for delivering assist data to the cache.
#[derive(Clone)]
pub struct AssistDataSender(MailboxSender<Delivery>);

impl AssistDataSender {
    /// Hand assist data for `task` to the foreground. Callable from any thread.
    pub fn preload_assist_data(&self, task: TaskId, data: AssistData) -> bool {
        self.0.post(Delivery::Assist { task, data })
    }
}

/// Owner of the current load plan and generation counter.
pub struct ModelCache {
    source: Arc<dyn TaskSource>,
    loader: Arc<dyn TaskDataLoader>,
    spawner: Spawner,
    mailbox: Mailbox<Delivery>,
    task_change_id: u64,
    last_plan_id: u64,
    last_plan: Option<Arc<LoadPlan>>,
    assist: HashMap<TaskId, AssistData>,
    preserve_assist_on_next_bump: bool,
}

impl ModelCache {
    /// Create the cache and start an initial preload with no anchor.
    pub fn new(
        source: Arc<dyn TaskSource>,
        loader: Arc<dyn TaskDataLoader>,
        spawner: Spawner,
    ) -> Self {
        let mut cache = Self {
            source,
            loader,
            spawner,
            mailbox: Mailbox::new(),
            task_change_id: 1,
            last_plan_id: 0,
            last_plan: None,
            assist: HashMap::new(),
            preserve_assist_on_next_bump: false,
        };
        if let Err(err) = cache.load(None, false) {
            tracing::warn!(error = %err, "initial task preload not scheduled");
        }
        cache
    }

    /// Request a plan anchored on `anchor`. The result arrives as
    /// [`ModelEvent::PlanLoaded`] from a later [`poll`](Self::poll).
    ///
    /// If nothing changed since the last served plan, that plan is posted
    /// again without background work.
    pub fn request_load(&mut self, anchor: Option<TaskId>) -> Result<RequestId, RecentsError> {
        self.load(anchor, true)
    }

    fn load(&mut self, anchor: Option<TaskId>, notify: bool) -> Result<RequestId, RecentsError> {
        let request = RequestId(self.task_change_id);

        if self.last_plan_id == self.task_change_id
            && let Some(plan) = &self.last_plan
        {
            if notify {
                self.mailbox.sender().post(Delivery::Plan {
                    request,
                    plan: plan.clone(),
                    notify,
                });
            }
            tracing::trace!(generation = request.0, "serving cached load plan");
            return Ok(request);
        }

        let source = self.source.clone();
        let sender = self.mailbox.sender();
        self.spawner.execute(move || {
            let plan = Arc::new(LoadPlan::from_stack(request.0, source.recent_tasks(), anchor));
            sender.post(Delivery::Plan {
                request,
                plan,
                notify,
            });
        })?;
        tracing::debug!(generation = request.0, ?anchor, "load plan requested");
        Ok(request)
    }

    /// Drain deliveries from the background and return the resulting events.
    pub fn poll(&mut self) -> Vec<ModelEvent> {
        let mut events = Vec::new();
        for delivery in self.mailbox.drain() {
            match delivery {
                Delivery::Plan {
                    request,
                    plan,
                    notify,
                } => {
                    if request.0 != self.task_change_id {
                        tracing::debug!(
                            request = request.0,
                            current = self.task_change_id,
                            "stale load plan delivered"
                        );
                    }
                    self.last_plan = Some(plan.clone());
                    self.last_plan_id = request.0;
                    if notify {
                        events.push(ModelEvent::PlanLoaded { request, plan });
                    }
                }
                Delivery::Assist { task, data } => {
                    self.assist.insert(task, data);
                    // A stack change follows assist delivery; keep the data through it.
                    self.preserve_assist_on_next_bump = true;
                    events.push(ModelEvent::AssistDataReceived(task));
                }
            }
        }
        events
    }

    /// The task stack changed: bump the generation.
    pub fn on_task_stack_changed(&mut self) {
        self.task_change_id += 1;
        if self.preserve_assist_on_next_bump {
            self.preserve_assist_on_next_bump = false;
        } else {
            self.assist.clear();
        }
        tracing::trace!(generation = self.task_change_id, "task stack changed");
    }

    /// True iff `request` was issued at the current generation.
    pub fn is_valid(&self, request: RequestId) -> bool {
        request.0 == self.task_change_id
    }

    pub fn generation(&self) -> u64 {
        self.task_change_id
    }

    pub fn last_load_plan(&self) -> Option<&Arc<LoadPlan>> {
        self.last_plan.as_ref()
    }

    pub fn task_loader(&self) -> Arc<dyn TaskDataLoader> {
        self.loader.clone()
    }

    pub fn assist_data_sender(&self) -> AssistDataSender {
        AssistDataSender(self.mailbox.sender())
    }

    pub fn assist_data(&self, task: TaskId) -> Option<&AssistData> {
        self.assist.get(&task)
    }
}
