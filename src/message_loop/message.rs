//! Message types carried by a message loop
//!
//! A [`Message`] is immutable once built. It moves into the loop on `send`
//! and is dropped by the loop after dispatch, so producers never manage its
//! lifetime by hand.

use crate::core::time::{Clock, SystemClock};
use std::any::Any;
use std::fmt;

/// Typed data attached to a message
///
/// `KIND` is stored next to the boxed value and checked before any
/// downcast, so a consumer can only recover the payload it asks for by name.
///
/// # Example
///
/// ```rust
/// use loopbus::message_loop::api::{Message, Payload};
///
/// #[derive(Debug)]
/// struct FileChanged {
///     path: String,
/// }
///
/// impl Payload for FileChanged {
///     const KIND: &'static str = "file_changed";
/// }
///
/// let message = Message::new("fs.changed", "watcher").with_payload(FileChanged {
///     path: "/tmp/a.txt".to_string(),
/// });
///
/// assert_eq!(message.payload_kind(), Some("file_changed"));
/// assert_eq!(message.payload::<FileChanged>().unwrap().path, "/tmp/a.txt");
/// ```
pub trait Payload: Any + Send + Sync + fmt::Debug {
    const KIND: &'static str;
}

trait ErasedPayload: Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
}

impl<P: Payload> ErasedPayload for P {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct PayloadSlot {
    kind: &'static str,
    value: Box<dyn ErasedPayload>,
}

/// An addressed, timestamped message
pub struct Message {
    id: String,
    sender: String,
    /// Empty means broadcast
    receiver: String,
    /// Milliseconds since the Unix epoch
    timestamp: u64,
    payload: Option<PayloadSlot>,
}

impl Message {
    /// Create a broadcast message stamped with the system clock
    pub fn new(id: impl Into<String>, sender: impl Into<String>) -> Self {
        Self::to(id, sender, String::new())
    }

    /// Create a message intended for `receiver`
    ///
    /// Routing is advisory: every observer still sees the message and decides
    /// for itself via [`Message::is_addressed_to`].
    pub fn to(
        id: impl Into<String>,
        sender: impl Into<String>,
        receiver: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            sender: sender.into(),
            receiver: receiver.into(),
            timestamp: SystemClock.now_millis(),
            payload: None,
        }
    }

    pub fn with_payload<P: Payload>(mut self, payload: P) -> Self {
        self.payload = Some(PayloadSlot {
            kind: P::KIND,
            value: Box::new(payload),
        });
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Re-stamp with an injected clock instead of the system clock
    pub fn stamped_by(self, clock: &dyn Clock) -> Self {
        let timestamp = clock.now_millis();
        self.with_timestamp(timestamp)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn is_broadcast(&self) -> bool {
        self.receiver.is_empty()
    }

    /// True for broadcasts and for messages whose receiver is `name`
    pub fn is_addressed_to(&self, name: &str) -> bool {
        self.is_broadcast() || self.receiver == name
    }

    pub fn payload_kind(&self) -> Option<&'static str> {
        self.payload.as_ref().map(|slot| slot.kind)
    }

    /// Borrow the payload if it was attached as a `P`
    pub fn payload<P: Payload>(&self) -> Option<&P> {
        let slot = self.payload.as_ref()?;
        if slot.kind != P::KIND {
            return None;
        }
        slot.value.as_any().downcast_ref::<P>()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("sender", &self.sender)
            .field("receiver", &self.receiver)
            .field("timestamp", &self.timestamp)
            .field("payload_kind", &self.payload_kind())
            .field("payload", &self.payload.as_ref().map(|slot| &slot.value))
            .finish()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let receiver = if self.is_broadcast() { "*" } else { &self.receiver };
        write!(f, "{} from {} -> {}", self.id, self.sender, receiver)
    }
}
