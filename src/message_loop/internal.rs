//! Lock-protected state shared between a loop's owner and its callers
//!
//! Everything here is plain data mutated under the single per-loop mutex
//! held by [`MessageLoop`](crate::message_loop::api::MessageLoop). The
//! queue interleaves messages with drain checkpoints; FIFO order makes a
//! checkpoint surface only after every message queued before it.

use crate::message_loop::message::Message;
use crate::message_loop::observer::Observer;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::ThreadId;

/// Lifecycle of a message loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Constructed, `run` not entered yet
    Created,
    /// A thread is inside `run`
    Running,
    /// `exit` accepted; remaining messages are still delivered
    ExitRequested,
    /// Terminal; `send` is rejected
    Stopped,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopState::Created => "created",
            LoopState::Running => "running",
            LoopState::ExitRequested => "exit-requested",
            LoopState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Queue entry: a message to dispatch or a drain checkpoint
pub(crate) enum QueueEntry {
    Message(Message),
    Checkpoint(u64),
}

/// State guarded by the loop mutex
pub(crate) struct LoopInner {
    pub(crate) state: LoopState,
    queue: VecDeque<QueueEntry>,
    pending_messages: usize,
    observers: Vec<Arc<dyn Observer>>,
    /// First accepted exit request wins
    pub(crate) exit_code: Option<i32>,
    pub(crate) owner: Option<ThreadId>,
    /// Set once `run` is about to return; sync `exit` waits on it
    pub(crate) returned: bool,
    next_checkpoint: u64,
    reached_checkpoint: u64,
}

impl LoopInner {
    pub(crate) fn new() -> Self {
        Self {
            state: LoopState::Created,
            queue: VecDeque::new(),
            pending_messages: 0,
            observers: Vec::new(),
            exit_code: None,
            owner: None,
            returned: false,
            next_checkpoint: 1,
            reached_checkpoint: 0,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        matches!(self.state, LoopState::Running | LoopState::ExitRequested)
    }

    pub(crate) fn pending_messages(&self) -> usize {
        self.pending_messages
    }

    pub(crate) fn is_queue_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn push_message(&mut self, message: Message) {
        self.queue.push_back(QueueEntry::Message(message));
        self.pending_messages += 1;
    }

    /// Append a checkpoint and return its ticket
    pub(crate) fn push_checkpoint(&mut self) -> u64 {
        let ticket = self.next_checkpoint;
        self.next_checkpoint += 1;
        self.queue.push_back(QueueEntry::Checkpoint(ticket));
        ticket
    }

    /// Remove the head entry
    ///
    /// Checkpoints are resolved here, so they are reached as soon as every
    /// earlier message has been dispatched.
    pub(crate) fn pop(&mut self) -> Option<QueueEntry> {
        let entry = self.queue.pop_front()?;
        match &entry {
            QueueEntry::Message(_) => self.pending_messages -= 1,
            QueueEntry::Checkpoint(ticket) => self.reached_checkpoint = *ticket,
        }
        Some(entry)
    }

    pub(crate) fn checkpoint_reached(&self, ticket: u64) -> bool {
        self.reached_checkpoint >= ticket
    }

    /// Register an observer; the same `Arc` is only kept once
    pub(crate) fn add_observer(&mut self, observer: Arc<dyn Observer>) -> bool {
        if self.observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            return false;
        }
        self.observers.push(observer);
        true
    }

    pub(crate) fn remove_observer(&mut self, observer: &Arc<dyn Observer>) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| !Arc::ptr_eq(o, observer));
        before != self.observers.len()
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Observers in registration order, for dispatch outside the lock
    pub(crate) fn observer_snapshot(&self) -> Vec<Arc<dyn Observer>> {
        self.observers.clone()
    }

    /// Drop queued entries still owned by the loop
    pub(crate) fn discard_queue(&mut self) -> usize {
        let discarded = self.pending_messages;
        self.queue.clear();
        self.pending_messages = 0;
        discarded
    }
}

/// Delivery counters for one loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Messages fully dispatched
    pub dispatched: u64,
    /// Messages some observer reported as handled
    pub handled: u64,
    /// Observer callbacks that panicked
    pub observer_failures: u64,
    /// Sends refused because the loop had stopped
    pub rejected_sends: u64,
}

#[derive(Debug, Default)]
pub(crate) struct LoopCounters {
    dispatched: AtomicU64,
    handled: AtomicU64,
    observer_failures: AtomicU64,
    rejected_sends: AtomicU64,
}

impl LoopCounters {
    pub(crate) fn record_dispatch(&self, handled: bool) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        if handled {
            self.handled.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_observer_failure(&self) {
        self.observer_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected_send(&self) {
        self.rejected_sends.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> LoopStats {
        LoopStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            handled: self.handled.load(Ordering::Relaxed),
            observer_failures: self.observer_failures.load(Ordering::Relaxed),
            rejected_sends: self.rejected_sends.load(Ordering::Relaxed),
        }
    }
}
