// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Single-concurrency task scheduler.
//!
//! Configuration operations (commit, audit, import, user edits, reads) must not run
//! concurrently. Callers ask a [`TaskScheduler`] for permission to run a task at some
//! [`TaskPriority`] and block until it is their turn. At most one task runs at a time;
//! among the waiters, higher priorities go first and equal priorities are served in
//! arrival order. The returned [`ExecutionPermit`] gives the slot back when dropped.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]

use parking_lot::{Condvar, Mutex, MutexGuard};
use priority_queue::PriorityQueue;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracectl::trace_target;
use tracing::{debug, trace, warn};

trace_target!("scheduler", LevelFilter::INFO, &["momgr"]);

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display, strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Normal,
    High,
    Critical,
}

#[derive(Debug, Error, PartialEq)]
pub enum SchedError {
    #[error("Task '{0}' timed out after {1:?} waiting for its turn")]
    Timeout(String, Duration),
}

type TaskId = u64;
/// Ordering key of a waiting task: priority first, then arrival order
type QueueKey = (TaskPriority, Reverse<TaskId>);

#[derive(Default)]
struct SchedState {
    waiting: PriorityQueue<TaskId, QueueKey>,
    names: HashMap<TaskId, String>,
    running: Option<(TaskId, String)>,
    next_id: TaskId,
    paused: bool,
}
impl SchedState {
    fn enqueue(&mut self, priority: TaskPriority, name: &str) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;
        self.waiting.push(id, (priority, Reverse(id)));
        self.names.insert(id, name.to_owned());
        id
    }
    fn withdraw(&mut self, id: TaskId) {
        self.waiting.remove(&id);
        self.names.remove(&id);
    }
    fn is_turn_of(&self, id: TaskId) -> bool {
        !self.paused && self.running.is_none() && self.waiting.peek().map(|(k, _)| *k) == Some(id)
    }
    fn start(&mut self, id: TaskId) -> String {
        self.waiting.remove(&id);
        let name = self.names.remove(&id).unwrap_or_default();
        self.running = Some((id, name.clone()));
        name
    }
}

/// Gate that lets one task run at a time, by priority
pub struct TaskScheduler {
    name: String,
    state: Mutex<SchedState>,
    turn: Condvar,
}

impl TaskScheduler {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            state: Mutex::new(SchedState::default()),
            turn: Condvar::new(),
        }
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn grant(
        &self,
        mut state: MutexGuard<'_, SchedState>,
        id: TaskId,
        priority: TaskPriority,
    ) -> ExecutionPermit<'_> {
        let name = state.start(id);
        trace!("{}: task '{name}' ({priority}) starts", self.name);
        ExecutionPermit {
            scheduler: self,
            id,
            name,
            priority,
        }
    }

    /// Wait until the task `name` may run and return its permit
    pub fn allow_execution(&self, priority: TaskPriority, name: &str) -> ExecutionPermit<'_> {
        let mut state = self.state.lock();
        let id = state.enqueue(priority, name);
        while !state.is_turn_of(id) {
            self.turn.wait(&mut state);
        }
        self.grant(state, id, priority)
    }

    /// Like [`TaskScheduler::allow_execution`] but give up after `timeout`.
    /// A task that gives up leaves the queue.
    pub fn try_allow_execution(
        &self,
        priority: TaskPriority,
        name: &str,
        timeout: Duration,
    ) -> Result<ExecutionPermit<'_>, SchedError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        let id = state.enqueue(priority, name);
        while !state.is_turn_of(id) {
            if self.turn.wait_until(&mut state, deadline).timed_out() && !state.is_turn_of(id) {
                state.withdraw(id);
                // the head of the queue may have changed
                self.turn.notify_all();
                warn!("{}: task '{name}' gave up after {timeout:?}", self.name);
                return Err(SchedError::Timeout(name.to_owned(), timeout));
            }
        }
        Ok(self.grant(state, id, priority))
    }

    /// Grant a permit only if the task can run right now, without waiting
    pub fn try_allow_now(&self, priority: TaskPriority, name: &str) -> Option<ExecutionPermit<'_>> {
        let mut state = self.state.lock();
        if state.paused || state.running.is_some() || !state.waiting.is_empty() {
            return None;
        }
        let id = state.enqueue(priority, name);
        Some(self.grant(state, id, priority))
    }

    fn done_execution(&self, id: TaskId) {
        let mut state = self.state.lock();
        match state.running.take() {
            Some((running, name)) if running == id => {
                trace!("{}: task '{name}' is done", self.name);
            }
            other => {
                warn!("{}: task {id} is not the running one", self.name);
                state.running = other;
            }
        }
        self.turn.notify_all();
    }

    /// Stop granting new permits. The running task, if any, is not affected.
    pub fn pause(&self) {
        self.state.lock().paused = true;
        debug!("{}: paused", self.name);
    }
    pub fn resume(&self) {
        self.state.lock().paused = false;
        self.turn.notify_all();
        debug!("{}: resumed", self.name);
    }
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }
    /// Name of the task currently running, if any
    #[must_use]
    pub fn running_task(&self) -> Option<String> {
        self.state.lock().running.as_ref().map(|(_, name)| name.clone())
    }
    /// Number of tasks waiting for their turn
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.state.lock().waiting.len()
    }
}

/// Permission to run one task. Dropping it lets the next task run.
pub struct ExecutionPermit<'a> {
    scheduler: &'a TaskScheduler,
    id: TaskId,
    name: String,
    priority: TaskPriority,
}
impl ExecutionPermit<'_> {
    #[must_use]
    pub fn task_name(&self) -> &str {
        &self.name
    }
    #[must_use]
    pub fn priority(&self) -> TaskPriority {
        self.priority
    }
}
impl Drop for ExecutionPermit<'_> {
    fn drop(&mut self) {
        self.scheduler.done_execution(self.id);
    }
}
