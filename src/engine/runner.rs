//! Deadline-bounded parallel task execution.
//!
//! Each task gets its own OS thread, so a task blocked on I/O never holds up
//! its siblings. [`RunningBatch::join`] returns once every task has reported
//! or the deadline passes, whichever comes first.
//!
//! Threads are never killed. When the deadline fires, the batch's
//! [`CompletionToken`] is expired; a task that finishes afterwards sees the
//! expired token and drops its outcome, so nothing it produces reaches a
//! report that has already been handed back.
//!
//! # Callback ordering
//!
//! - `on_complete` fires on the joining thread in real completion order.
//! - `on_timeout` fires once per unfinished task, in submission order, after
//!   the deadline and after every on-time completion has been reported.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Why a task produced no value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("{0}")]
    Failed(String),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error("could not start worker thread: {0}")]
    Spawn(String),

    #[error("worker exited without reporting")]
    Lost,
}

/// Set once when a batch stops waiting; read by tasks before any visible effect.
#[derive(Debug, Clone, Default)]
pub struct CompletionToken(Arc<AtomicBool>);

impl CompletionToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the batch has been joined. Work finishing after this point is discarded.
    pub fn is_expired(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn expire(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// What a task receives when it starts
pub struct TaskInput<A> {
    pub task_id: String,
    pub shared: Arc<A>,
    pub token: CompletionToken,
}

type Work<A, T> = Box<dyn FnOnce(TaskInput<A>) -> Result<T, TaskError> + Send + 'static>;

/// A unit of work with an identifier
pub struct Task<A, T> {
    id: String,
    work: Work<A, T>,
}

impl<A, T> Task<A, T> {
    pub fn new<F>(id: impl Into<String>, work: F) -> Self
    where
        F: FnOnce(TaskInput<A>) -> Result<T, TaskError> + Send + 'static,
    {
        Task {
            id: id.into(),
            work: Box::new(work),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Final state of one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<T> {
    Completed(T),
    Failed(TaskError),
    TimedOut,
}

impl<T> TaskOutcome<T> {
    pub fn is_timed_out(&self) -> bool {
        matches!(self, TaskOutcome::TimedOut)
    }
}

type CompleteCallback<'cb, T> = Box<dyn FnMut(&str, &TaskOutcome<T>) + 'cb>;
type TimeoutCallback<'cb> = Box<dyn FnMut(&str) + 'cb>;

/// Runner configuration: deadline plus optional observers.
pub struct TaskRunner<'cb, T> {
    deadline: Duration,
    on_complete: Option<CompleteCallback<'cb, T>>,
    on_timeout: Option<TimeoutCallback<'cb>>,
}

impl<'cb, T: Send + 'static> TaskRunner<'cb, T> {
    pub fn new(deadline: Duration) -> Self {
        TaskRunner {
            deadline,
            on_complete: None,
            on_timeout: None,
        }
    }

    /// Observe outcomes as they arrive, in completion order
    pub fn on_complete(mut self, callback: impl FnMut(&str, &TaskOutcome<T>) + 'cb) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Observe tasks still pending at the deadline, in submission order
    pub fn on_timeout(mut self, callback: impl FnMut(&str) + 'cb) -> Self {
        self.on_timeout = Some(Box::new(callback));
        self
    }

    /// Spawn every task and start the deadline clock.
    pub fn start<A>(self, tasks: Vec<Task<A, T>>, shared: Arc<A>) -> RunningBatch<'cb, T>
    where
        A: Send + Sync + 'static,
    {
        let token = CompletionToken::new();
        let (tx, rx) = mpsc::channel();
        let started = Instant::now();
        let mut ids = Vec::with_capacity(tasks.len());
        let mut outcomes = Vec::with_capacity(tasks.len());

        for (index, task) in tasks.into_iter().enumerate() {
            let Task { id, work } = task;
            let input = TaskInput {
                task_id: id.clone(),
                shared: Arc::clone(&shared),
                token: token.clone(),
            };
            let worker_token = token.clone();
            let worker_tx = tx.clone();
            let worker_id = id.clone();

            let spawned = thread::Builder::new()
                .name(thread_name(&id))
                .spawn(move || {
                    let outcome = match panic::catch_unwind(AssertUnwindSafe(move || work(input))) {
                        Ok(Ok(value)) => TaskOutcome::Completed(value),
                        Ok(Err(e)) => TaskOutcome::Failed(e),
                        Err(payload) => TaskOutcome::Failed(TaskError::Panicked(panic_message(payload.as_ref()))),
                    };
                    if worker_token.is_expired() {
                        tracing::debug!(task = %worker_id, "late completion dropped");
                        return;
                    }
                    // The batch may have stopped listening between the check and the send.
                    let _ = worker_tx.send((index, outcome));
                });

            let slot = match spawned {
                Ok(_) => None,
                Err(e) => {
                    tracing::error!(task = %id, error = %e, "failed to spawn task thread");
                    Some(TaskOutcome::Failed(TaskError::Spawn(e.to_string())))
                }
            };
            ids.push(id);
            outcomes.push(slot);
        }

        tracing::debug!(tasks = ids.len(), deadline_ms = self.deadline.as_millis() as u64, "batch started");

        RunningBatch {
            ids,
            outcomes,
            rx,
            token,
            started,
            deadline: self.deadline,
            on_complete: self.on_complete,
            on_timeout: self.on_timeout,
        }
    }
}

/// A batch whose tasks are running
pub struct RunningBatch<'cb, T> {
    ids: Vec<String>,
    outcomes: Vec<Option<TaskOutcome<T>>>,
    rx: Receiver<(usize, TaskOutcome<T>)>,
    token: CompletionToken,
    started: Instant,
    deadline: Duration,
    on_complete: Option<CompleteCallback<'cb, T>>,
    on_timeout: Option<TimeoutCallback<'cb>>,
}

impl<'cb, T> RunningBatch<'cb, T> {
    /// Token shared with every task in this batch
    pub fn token(&self) -> &CompletionToken {
        &self.token
    }

    /// Wait for all tasks or the deadline, whichever comes first.
    pub fn join(mut self) -> BatchReport<T> {
        let mut completion_order = Vec::new();

        // Spawn failures are already final.
        for index in 0..self.outcomes.len() {
            if let Some(outcome) = &self.outcomes[index] {
                if let Some(cb) = self.on_complete.as_mut() {
                    cb(&self.ids[index], outcome);
                }
                completion_order.push(self.ids[index].clone());
            }
        }

        let mut pending = self.outcomes.iter().filter(|o| o.is_none()).count();
        let mut disconnected = false;

        while pending > 0 {
            let remaining = self.deadline.saturating_sub(self.started.elapsed());
            match self.rx.recv_timeout(remaining) {
                Ok((index, outcome)) => {
                    self.record(index, outcome, &mut completion_order);
                    pending -= 1;
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        self.token.expire();

        if pending > 0 {
            // Outcomes queued before the token flipped still count.
            while let Ok((index, outcome)) = self.rx.try_recv() {
                self.record(index, outcome, &mut completion_order);
            }
        }

        let mut timed_out = Vec::new();
        for index in 0..self.outcomes.len() {
            if self.outcomes[index].is_some() {
                continue;
            }
            let id = &self.ids[index];
            if disconnected {
                tracing::error!(task = %id, "worker exited without reporting");
                self.outcomes[index] = Some(TaskOutcome::Failed(TaskError::Lost));
                continue;
            }
            tracing::warn!(task = %id, deadline_ms = self.deadline.as_millis() as u64, "task timed out");
            if let Some(cb) = self.on_timeout.as_mut() {
                cb(id);
            }
            self.outcomes[index] = Some(TaskOutcome::TimedOut);
            timed_out.push(id.clone());
        }

        let outcomes = self
            .ids
            .into_iter()
            .zip(self.outcomes)
            .map(|(id, outcome)| (id, outcome.unwrap_or(TaskOutcome::TimedOut)))
            .collect();

        BatchReport {
            outcomes,
            completion_order,
            timed_out,
        }
    }

    fn record(&mut self, index: usize, outcome: TaskOutcome<T>, completion_order: &mut Vec<String>) {
        if let Some(cb) = self.on_complete.as_mut() {
            cb(&self.ids[index], &outcome);
        }
        completion_order.push(self.ids[index].clone());
        self.outcomes[index] = Some(outcome);
    }
}

/// Outcomes of a joined batch
#[derive(Debug)]
pub struct BatchReport<T> {
    outcomes: Vec<(String, TaskOutcome<T>)>,
    completion_order: Vec<String>,
    timed_out: Vec<String>,
}

impl<T> BatchReport<T> {
    /// True iff at least one task timed out
    pub fn is_timed_out(&self) -> bool {
        !self.timed_out.is_empty()
    }

    /// Timed-out task ids, in submission order
    pub fn timed_out(&self) -> &[String] {
        &self.timed_out
    }

    /// Ids of tasks that reported before the deadline, in completion order
    pub fn completion_order(&self) -> &[String] {
        &self.completion_order
    }

    /// One outcome per submitted task, in submission order
    pub fn outcomes(&self) -> &[(String, TaskOutcome<T>)] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<(String, TaskOutcome<T>)> {
        self.outcomes
    }

    pub fn get(&self, id: &str) -> Option<&TaskOutcome<T>> {
        self.outcomes.iter().find(|(task_id, _)| task_id == id).map(|(_, o)| o)
    }
}

/// Thread name for a task. NUL bytes are not allowed in thread names.
fn thread_name(id: &str) -> String {
    format!("task-{}", id.replace('\0', "?"))
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
