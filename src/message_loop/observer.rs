//! Observer trait for message loop listeners

use crate::message_loop::message::Message;

/// A listener registered with a [`MessageLoop`](crate::message_loop::api::MessageLoop)
///
/// All callbacks run synchronously on the loop owner thread, so a slow
/// observer stalls every message behind it. The loop holds no lock while a
/// callback runs; observers may call back into the loop (`send`,
/// `add_observer`, `remove_observer`, non-blocking `exit`).
///
/// A panic raised by a callback is caught and logged by the loop. For
/// `on_message_received` it counts as "not handled".
pub trait Observer: Send + Sync {
    /// Handle one delivered message
    ///
    /// Returning `true` marks the message as consumed: observers registered
    /// after this one are not offered it.
    fn on_message_received(&self, message: &Message) -> bool;

    /// The loop has started dispatching
    fn on_loop_enter(&self) {}

    /// The loop has stopped accepting messages and is about to return
    fn on_loop_exit(&self) {}
}
