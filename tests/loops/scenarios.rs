//! End-to-end loop scenarios

use crate::common::{start, Recorder};
use loopbus::message_loop::api::{
    LoopConfig, LoopError, LoopState, Message, MessageLoop, Observer, Payload,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, PartialEq)]
struct Resize {
    width: u32,
    height: u32,
}

impl Payload for Resize {
    const KIND: &'static str = "ui.resize";
}

#[test]
fn test_send_then_sync_exit_delivers_in_order() {
    let message_loop = Arc::new(MessageLoop::new("L1"));
    let recorder = Recorder::new("ui", false);
    message_loop.add_observer(recorder.clone());

    let owner = start(&message_loop);
    for id in ["A", "B", "C"] {
        message_loop.send(Message::new(id, "main")).unwrap();
    }
    message_loop.exit(42, true).unwrap();

    assert_eq!(owner.join().unwrap().unwrap(), 42);
    assert_eq!(recorder.seen(), vec!["@enter", "A", "B", "C", "@exit"]);
    assert_eq!(message_loop.state(), LoopState::Stopped);
    assert_eq!(message_loop.count(), 0);
}

#[test]
fn test_handled_message_skips_later_observers() {
    let message_loop = Arc::new(MessageLoop::new("chain"));
    let first = Recorder::new("first", false);
    let second = Recorder::new("second", true);
    let third = Recorder::new("third", false);
    message_loop.add_observer(first.clone());
    message_loop.add_observer(second.clone());
    message_loop.add_observer(third.clone());

    let owner = start(&message_loop);
    message_loop.send(Message::new("broadcast", "main")).unwrap();
    message_loop.send(Message::to("direct", "main", "third")).unwrap();
    message_loop.drain().unwrap();
    message_loop.exit(0, true).unwrap();
    owner.join().unwrap().unwrap();

    assert_eq!(first.messages(), vec!["broadcast"]);
    assert_eq!(second.messages(), vec!["broadcast"]);
    assert_eq!(third.messages(), vec!["direct"]);

    let stats = message_loop.stats();
    assert_eq!(stats.dispatched, 2);
    assert_eq!(stats.handled, 1);
}

#[test]
fn test_payload_survives_the_queue() {
    struct Sizes(std::sync::Mutex<Vec<(u32, u32)>>);

    impl Observer for Sizes {
        fn on_message_received(&self, message: &Message) -> bool {
            match message.payload::<Resize>() {
                Some(resize) => {
                    self.0.lock().unwrap().push((resize.width, resize.height));
                    true
                }
                None => false,
            }
        }
    }

    let message_loop = Arc::new(MessageLoop::new("payloads"));
    let sizes = Arc::new(Sizes(std::sync::Mutex::new(Vec::new())));
    message_loop.add_observer(sizes.clone());

    let owner = start(&message_loop);
    message_loop
        .send(Message::new("resize", "window").with_payload(Resize {
            width: 800,
            height: 600,
        }))
        .unwrap();
    message_loop.send(Message::new("plain", "window")).unwrap();
    message_loop.drain().unwrap();
    message_loop.exit(0, true).unwrap();
    owner.join().unwrap().unwrap();

    assert_eq!(*sizes.0.lock().unwrap(), vec![(800, 600)]);
    assert_eq!(message_loop.stats().handled, 1);
}

#[test]
fn test_drain_waits_for_producers_backlog() {
    struct Slow(AtomicUsize);

    impl Observer for Slow {
        fn on_message_received(&self, _message: &Message) -> bool {
            thread::sleep(Duration::from_millis(2));
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    let message_loop = Arc::new(MessageLoop::new("backlog"));
    let slow = Arc::new(Slow(AtomicUsize::new(0)));
    message_loop.add_observer(slow.clone());

    let owner = start(&message_loop);
    thread::scope(|scope| {
        for producer in 0..4 {
            let message_loop = &message_loop;
            scope.spawn(move || {
                for n in 0..10 {
                    message_loop
                        .send(Message::new(format!("{producer}-{n}"), "producer"))
                        .unwrap();
                }
            });
        }
    });

    message_loop.drain().unwrap();
    assert_eq!(slow.0.load(Ordering::SeqCst), 40);
    assert_eq!(message_loop.count(), 0);
    assert!(message_loop.is_running());

    message_loop.exit(0, true).unwrap();
    owner.join().unwrap().unwrap();
}

#[test]
fn test_exit_lifecycle_errors() {
    let message_loop = Arc::new(MessageLoop::new("errors"));

    assert!(matches!(
        message_loop.drain(),
        Err(LoopError::NotRunning { .. })
    ));

    let owner = start(&message_loop);
    message_loop.exit(3, true).unwrap();
    assert_eq!(owner.join().unwrap().unwrap(), 3);

    assert!(matches!(
        message_loop.exit(4, false),
        Err(LoopError::AlreadyStopped { .. })
    ));
    assert!(matches!(
        message_loop.run(),
        Err(LoopError::AlreadyStopped { .. })
    ));
    message_loop.drain().unwrap();

    let rejected = message_loop
        .send(Message::new("late", "main"))
        .unwrap_err()
        .into_message();
    assert_eq!(rejected.id(), "late");
    assert_eq!(message_loop.stats().rejected_sends, 1);
}

#[test]
fn test_drain_timeout_reports_blocked_owner() {
    struct Blocker;

    impl Observer for Blocker {
        fn on_message_received(&self, _message: &Message) -> bool {
            thread::sleep(Duration::from_millis(200));
            true
        }
    }

    let config = LoopConfig::default().with_drain_timeout(Duration::from_millis(20));
    let message_loop = Arc::new(MessageLoop::with_config("blocked", config));
    message_loop.add_observer(Arc::new(Blocker));

    let owner = start(&message_loop);
    message_loop.send(Message::new("slow", "main")).unwrap();

    match message_loop.drain() {
        Err(LoopError::DrainTimeout { timeout_ms, .. }) => assert_eq!(timeout_ms, 20),
        other => panic!("Expected DrainTimeout, got {other:?}"),
    }

    message_loop.exit(0, true).unwrap();
    owner.join().unwrap().unwrap();
}
