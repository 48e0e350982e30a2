//! LoopRegistry - named directory of message loops
//!
//! The registry is an explicit context object: the application builds one,
//! shares it (usually as `Arc<LoopRegistry>`) with the components that need
//! to create or look up loops, and drops it when done. One mutex guards the
//! map; it is independent of the per-loop locks.

use crate::message_loop::config::LoopConfig;
use crate::message_loop::error::LoopError;
use crate::message_loop::handle::MessageLoop;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Maps identifiers to live [`MessageLoop`] handles
///
/// # Example
///
/// ```rust
/// use loopbus::message_loop::api::LoopRegistry;
///
/// let registry = LoopRegistry::new();
/// let ui = registry.create("ui");
///
/// assert!(registry.get_instance("ui").is_some());
/// assert_eq!(ui.id(), "ui");
///
/// assert!(registry.destroy("ui"));
/// assert!(registry.get_instance("ui").is_none());
/// ```
#[derive(Debug, Default)]
pub struct LoopRegistry {
    config: LoopConfig,
    loops: Mutex<HashMap<String, Arc<MessageLoop>>>,
}

impl LoopRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose loops all use `config`
    pub fn with_config(config: LoopConfig) -> Self {
        Self {
            config,
            loops: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    // The map holds no invariant a panicking holder could break
    fn loops(&self) -> MutexGuard<'_, HashMap<String, Arc<MessageLoop>>> {
        self.loops.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a loop under `id`
    ///
    /// An existing entry with the same id is replaced, not destroyed:
    /// holders of the old handle keep a working loop that is simply no
    /// longer reachable through the registry.
    pub fn create(&self, id: &str) -> Arc<MessageLoop> {
        let message_loop = Arc::new(MessageLoop::with_config(id, self.config.clone()));
        if let Some(previous) = self.loops().insert(id.to_string(), Arc::clone(&message_loop)) {
            log::warn!(
                "Loop id '{}' reused; previous loop ({}, {} pending) is no longer registered",
                id,
                previous.state(),
                previous.count()
            );
        }
        log::debug!("Registered message loop '{}'", id);
        message_loop
    }

    /// Drain and unregister the loop under `id`
    ///
    /// Returns `false` when no loop is registered under `id`. A loop without
    /// a running owner cannot be drained; that is logged and the entry is
    /// removed anyway, so this never blocks on an idle loop.
    pub fn destroy(&self, id: &str) -> bool {
        // Drain outside the map lock so other loops stay reachable meanwhile
        let Some(message_loop) = self.get_instance(id) else {
            log::debug!("destroy: no message loop registered as '{}'", id);
            return false;
        };

        match message_loop.drain() {
            Ok(()) => log::debug!("Drained message loop '{}' before release", id),
            Err(LoopError::NotRunning { .. }) => log::warn!(
                "Releasing message loop '{}' without a running owner ({} pending)",
                id,
                message_loop.count()
            ),
            Err(e) => log::warn!("Failed to drain message loop '{}': {}", id, e),
        }

        let mut loops = self.loops();
        // Only remove the entry we drained, not a replacement created meanwhile
        if loops
            .get(id)
            .is_some_and(|current| Arc::ptr_eq(current, &message_loop))
        {
            loops.remove(id);
        }
        log::debug!("Unregistered message loop '{}'", id);
        true
    }

    /// Look up a loop by id
    ///
    /// Intended for occasional handle lookup; callers on a hot path should
    /// keep the returned `Arc` instead of calling this repeatedly.
    pub fn get_instance(&self, id: &str) -> Option<Arc<MessageLoop>> {
        self.loops().get(id).cloned()
    }

    /// Registered ids in sorted order
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.loops().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.loops().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops().is_empty()
    }
}
