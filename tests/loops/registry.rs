//! Registry integration tests

use crate::common::{start, Recorder};
use loopbus::message_loop::api::{LoopConfig, LoopRegistry, Message, Observer};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_loops_shared_between_threads_by_name() {
    let registry = Arc::new(LoopRegistry::new());
    let message_loop = registry.create("events");
    let recorder = Recorder::new("events", false);
    message_loop.add_observer(recorder.clone());
    let owner = start(&message_loop);

    let producer = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            let events = registry.get_instance("events").unwrap();
            events.send(Message::new("from-thread", "producer")).unwrap();
        })
    };
    producer.join().unwrap();

    assert!(registry.destroy("events"));
    assert_eq!(recorder.messages(), vec!["from-thread"]);
    assert!(registry.get_instance("events").is_none());

    message_loop.exit(0, true).unwrap();
    owner.join().unwrap().unwrap();
}

#[test]
fn test_destroy_idle_loop_does_not_block() {
    let registry = LoopRegistry::new();
    let idle = registry.create("idle");
    idle.send(Message::new("never", "main")).unwrap();

    let started = Instant::now();
    assert!(registry.destroy("idle"));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!registry.destroy("idle"));
    assert!(registry.is_empty());
}

#[test]
fn test_registry_drain_timeout_bounds_destroy() {
    struct Stuck;

    impl Observer for Stuck {
        fn on_message_received(&self, _message: &Message) -> bool {
            thread::sleep(Duration::from_millis(500));
            true
        }
    }

    let config = LoopConfig::default().with_drain_timeout(Duration::from_millis(20));
    let registry = LoopRegistry::with_config(config);
    let message_loop = registry.create("stuck");
    message_loop.add_observer(Arc::new(Stuck));
    let owner = start(&message_loop);
    message_loop.send(Message::new("slow", "main")).unwrap();

    let started = Instant::now();
    assert!(registry.destroy("stuck"));
    assert!(started.elapsed() < Duration::from_millis(400));
    assert!(registry.get_instance("stuck").is_none());

    // The unregistered loop keeps working for handle holders
    assert!(message_loop.is_running());
    message_loop.exit(0, true).unwrap();
    owner.join().unwrap().unwrap();
    assert_eq!(message_loop.stats().handled, 1);
}
