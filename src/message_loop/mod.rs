//! Named Message Loops
//!
//! A message loop is a thread-owned mailbox: producers on any thread post
//! [`Message`](api::Message)s, and a single owner thread runs the loop and
//! hands each message to the registered [`Observer`](api::Observer)s.
//!
//! # Overview
//!
//! - **FIFO delivery**: messages are dispatched in the order `send` accepted them
//! - **Short-circuit fan-out**: observers see a message in registration order
//!   until one returns `true`
//! - **Drain**: any non-owner thread can wait until everything queued so far
//!   has been dispatched
//! - **Cooperative exit**: `exit` lets already-queued work finish, then `run`
//!   returns the requested code
//! - **Registry**: [`LoopRegistry`](api::LoopRegistry) maps names to loops
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  ┌────────────┐  ┌────────────┐
//! │ Producer A │  │ Producer B │  │ drain/exit │   any thread
//! └─────┬──────┘  └─────┬──────┘  └─────┬──────┘
//!       │ send          │ send          │ checkpoint / request
//!       ▼               ▼               ▼
//! ┌──────────────────────────────────────────────┐
//! │ MessageLoop "ui"          (one mutex)        │
//! │  ┌───┬───┬───┬───┬───┐                       │
//! │  │ m │ m │ ◆ │ m │...│  ◆ = drain checkpoint │
//! │  └───┴───┴───┴───┴───┘                       │
//! └──────────────────────┬───────────────────────┘
//!                        │ run()                    owner thread
//!                        ▼
//!        Observer 1 ─▶ Observer 2 ─▶ Observer 3   (stop on `true`)
//! ```
//!
//! # Example Usage
//!
//! ```rust
//! use loopbus::message_loop::api::{LoopRegistry, Message, Observer};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::thread;
//!
//! #[derive(Default)]
//! struct Counter(AtomicUsize);
//!
//! impl Observer for Counter {
//!     fn on_message_received(&self, _message: &Message) -> bool {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         false
//!     }
//! }
//!
//! let registry = LoopRegistry::new();
//! let worker = registry.create("worker");
//! let counter = Arc::new(Counter::default());
//! worker.add_observer(counter.clone());
//!
//! let owner = {
//!     let worker = Arc::clone(&worker);
//!     thread::spawn(move || worker.run())
//! };
//!
//! for i in 0..3 {
//!     worker.send(Message::new(format!("job-{i}"), "main")).unwrap();
//! }
//! worker.exit(0, false).unwrap();
//! assert_eq!(owner.join().unwrap().unwrap(), 0);
//! assert_eq!(counter.0.load(Ordering::SeqCst), 3);
//! ```

pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod handle;
pub(crate) mod internal;
pub(crate) mod message;
pub(crate) mod observer;
pub(crate) mod registry;

// Public API module - the only public interface for message loops
pub mod api;

#[cfg(test)]
mod tests;
