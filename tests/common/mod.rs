//! Common test utilities and helpers
//!
//! Observers and thread helpers shared by the integration suites.

#![allow(dead_code)]

use loopbus::message_loop::api::{LoopResult, Message, MessageLoop, Observer};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Records message ids and lifecycle callbacks in arrival order
pub struct Recorder {
    name: String,
    handles: bool,
    seen: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new(name: &str, handles: bool) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            handles,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.seen()
            .into_iter()
            .filter(|entry| !entry.starts_with('@'))
            .collect()
    }
}

impl Observer for Recorder {
    fn on_message_received(&self, message: &Message) -> bool {
        if !message.is_addressed_to(&self.name) {
            return false;
        }
        self.seen.lock().unwrap().push(message.id().to_string());
        self.handles
    }

    fn on_loop_enter(&self) {
        self.seen.lock().unwrap().push("@enter".to_string());
    }

    fn on_loop_exit(&self) {
        self.seen.lock().unwrap().push("@exit".to_string());
    }
}

/// Start `run` on a new owner thread and wait until it is dispatching
pub fn start(message_loop: &Arc<MessageLoop>) -> JoinHandle<LoopResult<i32>> {
    let owner = {
        let message_loop = Arc::clone(message_loop);
        thread::spawn(move || message_loop.run())
    };
    let deadline = Instant::now() + Duration::from_secs(5);
    while !message_loop.is_running() {
        assert!(Instant::now() < deadline, "loop never started");
        thread::sleep(Duration::from_millis(1));
    }
    owner
}
