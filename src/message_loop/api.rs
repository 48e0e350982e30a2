//! Public API for message loops
//!
//! External modules should import from here rather than directly from the
//! internal modules.

// Loop and registry
pub use crate::message_loop::handle::MessageLoop;
pub use crate::message_loop::registry::LoopRegistry;

// Lifecycle and statistics
pub use crate::message_loop::internal::{LoopState, LoopStats};

// Messages and observers
pub use crate::message_loop::message::{Message, Payload};
pub use crate::message_loop::observer::Observer;

// Configuration
pub use crate::message_loop::config::LoopConfig;

// Error handling
pub use crate::message_loop::error::{LoopError, LoopResult, SendError};
