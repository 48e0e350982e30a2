//! MessageLoop - a named, thread-owned mailbox with observer fan-out
//!
//! Producers on any thread [`send`](MessageLoop::send) messages; exactly one
//! owner thread sits in [`run`](MessageLoop::run), taking messages in FIFO
//! order and offering each to the registered observers in registration
//! order until one reports it handled.
//!
//! # Synchronisation
//!
//! One mutex guards the queue, the observer list and the lifecycle state.
//! Two condition variables hang off it:
//! - `available` wakes the owner when a message, a drain checkpoint or an
//!   exit request arrives
//! - `progress` wakes `drain` callers when a checkpoint surfaces and
//!   synchronous `exit` callers when `run` returns
//!
//! Observer callbacks always run with the mutex released.
//!
//! # Example
//!
//! ```rust
//! use loopbus::message_loop::api::{Message, MessageLoop, Observer};
//! use std::sync::Arc;
//! use std::thread;
//!
//! struct Printer;
//!
//! impl Observer for Printer {
//!     fn on_message_received(&self, message: &Message) -> bool {
//!         println!("{message}");
//!         true
//!     }
//! }
//!
//! let message_loop = Arc::new(MessageLoop::new("ui"));
//! message_loop.add_observer(Arc::new(Printer));
//! message_loop.send(Message::new("greeting", "main")).unwrap();
//!
//! let owner = {
//!     let message_loop = Arc::clone(&message_loop);
//!     thread::spawn(move || message_loop.run())
//! };
//!
//! message_loop.exit(7, false).unwrap();
//! assert_eq!(owner.join().unwrap().unwrap(), 7);
//! ```

use crate::core::sync::handle_mutex_poison;
use crate::message_loop::config::LoopConfig;
use crate::message_loop::error::{LoopError, LoopResult, SendError};
use crate::message_loop::internal::{LoopCounters, LoopInner, LoopState, LoopStats, QueueEntry};
use crate::message_loop::message::Message;
use crate::message_loop::observer::Observer;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

pub struct MessageLoop {
    id: String,
    config: LoopConfig,
    inner: Mutex<LoopInner>,
    available: Condvar,
    progress: Condvar,
    counters: LoopCounters,
}

impl MessageLoop {
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_config(id, LoopConfig::default())
    }

    pub fn with_config(id: impl Into<String>, config: LoopConfig) -> Self {
        let id = id.into();
        log::debug!("Creating message loop '{}' ({:?})", id, config);
        Self {
            id,
            config,
            inner: Mutex::new(LoopInner::new()),
            available: Condvar::new(),
            progress: Condvar::new(),
            counters: LoopCounters::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    fn lock(&self) -> LoopResult<MutexGuard<'_, LoopInner>> {
        handle_mutex_poison(self.inner.lock(), |message| self.poisoned(message))
    }

    // Infallible accessors read through a poisoned lock; no code path
    // panics while holding it, so the state is still consistent.
    fn lock_recovering(&self) -> MutexGuard<'_, LoopInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn poisoned(&self, message: String) -> LoopError {
        LoopError::Poisoned {
            loop_id: self.id.clone(),
            message,
        }
    }

    fn is_owner_thread(&self, inner: &LoopInner) -> bool {
        inner.owner == Some(thread::current().id())
    }

    /// Register an observer for subsequent dispatches
    ///
    /// Registering the same `Arc` twice keeps a single entry.
    pub fn add_observer(&self, observer: Arc<dyn Observer>) {
        if !self.lock_recovering().add_observer(observer) {
            log::debug!("Observer already registered with loop '{}'", self.id);
        }
    }

    /// Unregister an observer; unknown observers are ignored
    pub fn remove_observer(&self, observer: &Arc<dyn Observer>) {
        self.lock_recovering().remove_observer(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.lock_recovering().observer_count()
    }

    pub fn state(&self) -> LoopState {
        self.lock_recovering().state
    }

    /// True while a thread is inside `run` and the loop has not stopped
    pub fn is_running(&self) -> bool {
        self.lock_recovering().is_running()
    }

    /// Number of accepted messages not yet taken for dispatch
    pub fn count(&self) -> usize {
        self.lock_recovering().pending_messages()
    }

    pub fn stats(&self) -> LoopStats {
        self.counters.snapshot()
    }

    /// Queue a message at the tail
    ///
    /// Fails only once the loop has stopped; the error hands the message
    /// back to the caller.
    pub fn send(&self, message: Message) -> Result<(), SendError> {
        let mut inner = self.lock_recovering();
        if inner.state == LoopState::Stopped {
            drop(inner);
            self.counters.record_rejected_send();
            log::debug!("Loop '{}' rejected '{}': stopped", self.id, message);
            return Err(SendError {
                loop_id: self.id.clone(),
                message,
            });
        }

        log::trace!("Loop '{}' queued '{}'", self.id, message);
        inner.push_message(message);
        drop(inner);
        self.available.notify_one();
        Ok(())
    }

    /// Run the loop on the calling thread until an exit request drains out
    ///
    /// Returns the exit code of the first accepted `exit` call. Messages
    /// queued before or racing with the exit request are still delivered.
    pub fn run(&self) -> LoopResult<i32> {
        let observers = {
            let mut inner = self.lock()?;
            match inner.state {
                LoopState::Stopped => {
                    return Err(LoopError::AlreadyStopped {
                        loop_id: self.id.clone(),
                    })
                }
                LoopState::Running | LoopState::ExitRequested => {
                    return Err(LoopError::AlreadyRunning {
                        loop_id: self.id.clone(),
                    })
                }
                LoopState::Created => {}
            }

            inner.owner = Some(thread::current().id());
            inner.state = if inner.exit_code.is_some() {
                LoopState::ExitRequested
            } else {
                LoopState::Running
            };
            inner.observer_snapshot()
        };

        log::debug!(
            "Loop '{}' entered with {} observers",
            self.id,
            observers.len()
        );
        for observer in &observers {
            self.notify_lifecycle(observer, "on_loop_enter", |o| o.on_loop_enter());
        }

        let (exit_code, observers) = loop {
            let (entry, observers) = {
                let inner = self.lock()?;
                let mut inner = handle_mutex_poison(
                    self.available.wait_while(inner, |i| {
                        i.is_queue_empty() && i.state == LoopState::Running
                    }),
                    |message| self.poisoned(message),
                )?;

                match inner.pop() {
                    Some(QueueEntry::Checkpoint(_)) => (None, Vec::new()),
                    Some(QueueEntry::Message(message)) => {
                        (Some(message), inner.observer_snapshot())
                    }
                    None => {
                        // Queue empty with an exit request pending
                        inner.state = LoopState::Stopped;
                        break (inner.exit_code.unwrap_or_default(), inner.observer_snapshot());
                    }
                }
            };

            match entry {
                Some(message) => self.dispatch(&message, &observers),
                None => self.progress.notify_all(),
            }
        };

        log::debug!("Loop '{}' stopping with exit code {}", self.id, exit_code);
        for observer in &observers {
            self.notify_lifecycle(observer, "on_loop_exit", |o| o.on_loop_exit());
        }

        {
            let mut inner = self.lock()?;
            inner.owner = None;
            inner.returned = true;
        }
        self.progress.notify_all();

        Ok(exit_code)
    }

    fn dispatch(&self, message: &Message, observers: &[Arc<dyn Observer>]) {
        let mut handled = false;
        for observer in observers {
            match panic::catch_unwind(AssertUnwindSafe(|| observer.on_message_received(message))) {
                Ok(true) => {
                    handled = true;
                    break;
                }
                Ok(false) => {}
                Err(cause) => {
                    self.counters.record_observer_failure();
                    log::error!(
                        "Observer panicked on '{}' in loop '{}': {}",
                        message,
                        self.id,
                        panic_message(cause.as_ref())
                    );
                }
            }
        }
        self.counters.record_dispatch(handled);
        log::trace!(
            "Loop '{}' dispatched '{}' (handled: {})",
            self.id,
            message,
            handled
        );
    }

    fn notify_lifecycle(
        &self,
        observer: &Arc<dyn Observer>,
        callback: &str,
        notify: impl FnOnce(&dyn Observer),
    ) {
        if let Err(cause) = panic::catch_unwind(AssertUnwindSafe(|| notify(observer.as_ref()))) {
            self.counters.record_observer_failure();
            log::error!(
                "Observer panicked in {} of loop '{}': {}",
                callback,
                self.id,
                panic_message(cause.as_ref())
            );
        }
    }

    /// Request termination with `exit_code`
    ///
    /// The first accepted request fixes the code; later requests are
    /// accepted but leave it unchanged. With `sync` the caller blocks until
    /// `run` has returned.
    ///
    /// A synchronous request is still recorded when it fails with
    /// [`LoopError::NotRunning`] (no owner yet) or
    /// [`LoopError::WouldDeadlock`] (issued from the owner thread); the loop
    /// exits as soon as it can.
    pub fn exit(&self, exit_code: i32, sync: bool) -> LoopResult<()> {
        let mut inner = self.lock()?;
        if inner.state == LoopState::Stopped {
            return Err(LoopError::AlreadyStopped {
                loop_id: self.id.clone(),
            });
        }

        match inner.exit_code {
            None => {
                inner.exit_code = Some(exit_code);
                log::debug!("Loop '{}' exit requested with code {}", self.id, exit_code);
            }
            Some(existing) => log::debug!(
                "Loop '{}' already exiting with code {}; ignoring code {}",
                self.id,
                existing,
                exit_code
            ),
        }
        if inner.state == LoopState::Running {
            inner.state = LoopState::ExitRequested;
        }
        self.available.notify_one();

        if !sync {
            return Ok(());
        }
        if inner.state == LoopState::Created {
            return Err(LoopError::NotRunning {
                loop_id: self.id.clone(),
            });
        }
        if self.is_owner_thread(&inner) {
            return Err(LoopError::WouldDeadlock {
                loop_id: self.id.clone(),
                operation: "exit",
            });
        }

        let _inner = handle_mutex_poison(
            self.progress.wait_while(inner, |i| !i.returned),
            |message| self.poisoned(message),
        )?;
        Ok(())
    }

    /// Block until every message queued before this call has been dispatched
    ///
    /// Requires a running owner: on a loop that was never started this fails
    /// with [`LoopError::NotRunning`] instead of waiting forever. On a
    /// stopped loop it succeeds immediately since nothing can be pending.
    pub fn drain(&self) -> LoopResult<()> {
        let mut inner = self.lock()?;
        match inner.state {
            LoopState::Stopped => return Ok(()),
            LoopState::Created => {
                return Err(LoopError::NotRunning {
                    loop_id: self.id.clone(),
                })
            }
            LoopState::Running | LoopState::ExitRequested => {}
        }
        if self.is_owner_thread(&inner) {
            return Err(LoopError::WouldDeadlock {
                loop_id: self.id.clone(),
                operation: "drain",
            });
        }

        let ticket = inner.push_checkpoint();
        log::trace!("Loop '{}' draining up to checkpoint {}", self.id, ticket);
        self.available.notify_one();

        let pending =
            |i: &mut LoopInner| !i.checkpoint_reached(ticket) && i.state != LoopState::Stopped;
        match self.config.drain_timeout {
            None => {
                handle_mutex_poison(self.progress.wait_while(inner, pending), |message| {
                    self.poisoned(message)
                })?;
            }
            Some(timeout) => {
                let (_inner, result) = handle_mutex_poison(
                    self.progress.wait_timeout_while(inner, timeout, pending),
                    |message| self.poisoned(message),
                )?;
                if result.timed_out() {
                    return Err(LoopError::DrainTimeout {
                        loop_id: self.id.clone(),
                        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for MessageLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock_recovering();
        f.debug_struct("MessageLoop")
            .field("id", &self.id)
            .field("state", &inner.state)
            .field("pending", &inner.pending_messages())
            .field("observers", &inner.observer_count())
            .finish()
    }
}

impl Drop for MessageLoop {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        let discarded = inner.discard_queue();
        if discarded > 0 {
            log::warn!(
                "Message loop '{}' released with {} undelivered messages",
                self.id,
                discarded
            );
        }
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> &str {
    if let Some(message) = cause.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = cause.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
