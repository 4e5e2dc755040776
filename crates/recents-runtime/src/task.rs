#![forbid(unsafe_code)]

//! Tasks, load plans and the collaborators that supply task data.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use recents_core::geometry::Insets;

/// Identity of one running application window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub i32);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// A running task. Equality and hashing use the id only.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    /// Component key of the task's root activity.
    pub component: Arc<str>,
}

impl Task {
    pub fn new(id: i32, component: impl Into<Arc<str>>) -> Self {
        Self {
            id: TaskId(id),
            component: component.into(),
        }
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A generation-stamped snapshot of the task list, in carousel order.
///
/// `tasks[0]` is the anchor (running) task when one was requested and
/// present, otherwise the most recent task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    pub generation: u64,
    pub tasks: Vec<Task>,
}

impl LoadPlan {
    /// Build a plan from a task stack ordered oldest first.
    pub fn from_stack(generation: u64, mut stack: Vec<Task>, anchor: Option<TaskId>) -> Self {
        stack.reverse();
        if let Some(anchor) = anchor
            && let Some(pos) = stack.iter().position(|task| task.id == anchor)
        {
            let task = stack.remove(pos);
            stack.insert(0, task);
        }
        Self {
            generation,
            tasks: stack,
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Snapshot metadata for one task thumbnail. Pixels live with the loader.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailData {
    pub width: u32,
    pub height: u32,
    /// System bar insets baked into the snapshot.
    pub insets: Insets,
    /// Downscale factor the snapshot was taken at.
    pub scale: f32,
}

/// Auxiliary hint data for a task (assist content).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistData {
    pub payload: Vec<u8>,
}

/// Supplies the task stack. Called from the background executor.
pub trait TaskSource: Send + Sync {
    /// Recent tasks, oldest first.
    fn recent_tasks(&self) -> Vec<Task>;
}

/// Loads and releases the heavy per-task data (thumbnails, icons).
pub trait TaskDataLoader: Send + Sync {
    fn load_task_data(&self, task: &Task);
    fn unload_task_data(&self, task: &Task);
    /// High-resolution thumbnail loading may start for `task`.
    fn on_task_visible(&self, task: &Task);
    fn on_task_invisible(&self, task: &Task);
    /// Throttle expensive decoding while the carousel is flung quickly.
    fn set_flinging_fast(&self, flinging_fast: bool);
}
