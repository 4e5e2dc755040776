#![forbid(unsafe_code)]

//! Background execution context and foreground mailbox.
//!
//! [`BackgroundExecutor`] runs boxed jobs in submission order on one worker
//! thread. Jobs never call back into foreground state directly; they post a
//! message to a [`Mailbox`] which the foreground drains on its own schedule.
//!
//! # Modes
//!
//! - **Thread**: a named worker thread fed by an mpsc channel. Dropping the
//!   executor sends `Shutdown` and joins the worker.
//! - **Inline**: jobs run on the submitting thread before `execute` returns.
//!   Results still travel through the mailbox, so the foreground observes
//!   the same ordering it would with a real thread. Used by tests.
//!
//! # Failure Modes
//!
//! Submitting after the worker has exited returns
//! [`RecentsError::ExecutorShutdown`]; the job is dropped.

use std::io;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use crate::error::RecentsError;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Command {
    Run(Job),
    Shutdown,
}

#[derive(Clone)]
enum SpawnerKind {
    Thread(mpsc::Sender<Command>),
    Inline,
}

/// Cloneable handle for submitting jobs to a [`BackgroundExecutor`].
#[derive(Clone)]
pub struct Spawner {
    kind: SpawnerKind,
}

impl std::fmt::Debug for Spawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.kind {
            SpawnerKind::Thread(_) => "thread",
            SpawnerKind::Inline => "inline",
        };
        f.debug_struct("Spawner").field("mode", &mode).finish()
    }
}

impl Spawner {
    /// A spawner that runs every job on the calling thread.
    pub fn inline() -> Self {
        Self {
            kind: SpawnerKind::Inline,
        }
    }

    /// Submit a job. Jobs run one at a time in submission order.
    pub fn execute<F>(&self, job: F) -> Result<(), RecentsError>
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.kind {
            SpawnerKind::Thread(sender) => sender
                .send(Command::Run(Box::new(job)))
                .map_err(|_| RecentsError::ExecutorShutdown),
            SpawnerKind::Inline => {
                job();
                Ok(())
            }
        }
    }
}

/// Owner of the background worker.
pub struct BackgroundExecutor {
    spawner: Spawner,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundExecutor {
    /// Start a worker thread with the given name.
    pub fn start(name: &str) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Command>();
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || worker_loop(rx))?;
        tracing::debug!(worker = name, "background executor started");
        Ok(Self {
            spawner: Spawner {
                kind: SpawnerKind::Thread(tx),
            },
            handle: Some(handle),
        })
    }

    /// An executor that runs jobs on the submitting thread.
    pub fn inline() -> Self {
        Self {
            spawner: Spawner::inline(),
            handle: None,
        }
    }

    pub fn spawner(&self) -> Spawner {
        self.spawner.clone()
    }

    /// Stop accepting work, finish queued jobs and join the worker.
    pub fn shutdown(&mut self) {
        if let SpawnerKind::Thread(sender) = &self.spawner.kind {
            let _ = sender.send(Command::Shutdown);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            tracing::debug!("background executor stopped");
        }
    }
}

impl Drop for BackgroundExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(rx: mpsc::Receiver<Command>) {
    while let Ok(cmd) = rx.recv() {
        match cmd {
            Command::Run(job) => job(),
            Command::Shutdown => return,
        }
    }
}

// ---------------------------------------------------------------------------
// Mailbox
// ---------------------------------------------------------------------------

/// Foreground inbox for results produced on other threads.
pub struct Mailbox<M> {
    tx: mpsc::Sender<M>,
    rx: mpsc::Receiver<M>,
}

impl<M> Default for Mailbox<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> Mailbox<M> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> MailboxSender<M> {
        MailboxSender(self.tx.clone())
    }

    /// Take every message posted so far, oldest first.
    pub fn drain(&self) -> Vec<M> {
        self.rx.try_iter().collect()
    }
}

/// Posting half of a [`Mailbox`].
pub struct MailboxSender<M>(mpsc::Sender<M>);

impl<M> Clone for MailboxSender<M> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<M> MailboxSender<M> {
    /// Post a message. Returns `false` if the mailbox has been dropped.
    pub fn post(&self, msg: M) -> bool {
        self.0.send(msg).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn inline_runs_immediately() {
        let executor = BackgroundExecutor::inline();
        let hits = Arc::new(Mutex::new(0));
        let h = hits.clone();
        executor
            .spawner()
            .execute(move || *h.lock().unwrap() += 1)
            .unwrap();
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn thread_runs_in_order_and_joins() {
        let mut executor = BackgroundExecutor::start("recents-test").unwrap();
        let mailbox = Mailbox::new();
        for i in 0..10 {
            let tx = mailbox.sender();
            executor.spawner().execute(move || {
                tx.post(i);
            })
            .unwrap();
        }
        executor.shutdown();
        assert_eq!(mailbox.drain(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn execute_after_shutdown_fails() {
        let mut executor = BackgroundExecutor::start("recents-test").unwrap();
        let spawner = executor.spawner();
        executor.shutdown();
        assert_eq!(spawner.execute(|| {}), Err(RecentsError::ExecutorShutdown));
    }

    #[test]
    fn mailbox_drain_empties() {
        let mailbox = Mailbox::new();
        mailbox.sender().post("a");
        mailbox.sender().post("b");
        assert_eq!(mailbox.drain(), vec!["a", "b"]);
        assert!(mailbox.drain().is_empty());
    }
}
