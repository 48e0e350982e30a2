//! Producer/consumer demonstration run by the `loopbus` binary
//!
//! One loop named `demo` is created through a registry and served by a
//! dedicated owner thread. Producer threads send numbered ticks while a
//! chain of counting observers checks that each producer's ticks arrive in
//! order. The run ends with drain, synchronous exit and destroy.

use crate::core::error_handling::ContextualError;
use crate::message_loop::api::{
    LoopConfig, LoopError, LoopRegistry, LoopStats, Message, MessageLoop, Observer, Payload,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

pub const DEMO_LOOP_ID: &str = "demo";

const START_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub struct DemoSettings {
    pub producers: usize,
    pub messages_per_producer: usize,
    pub observers: usize,
    pub exit_code: i32,
    pub loop_config: LoopConfig,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            producers: 4,
            messages_per_producer: 250,
            observers: 3,
            exit_code: 0,
            loop_config: LoopConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error(transparent)]
    Loop(#[from] LoopError),

    #[error("Failed to spawn thread '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Message loop '{loop_id}' did not start within {}ms", .timeout.as_millis())]
    StartTimeout { loop_id: String, timeout: Duration },

    #[error("Owner thread of message loop '{loop_id}' panicked")]
    OwnerPanicked { loop_id: String },
}

impl ContextualError for DemoError {
    fn is_user_actionable(&self) -> bool {
        match self {
            DemoError::Loop(e) => e.is_user_actionable(),
            _ => false,
        }
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            DemoError::Loop(e) => e.user_message(),
            _ => None,
        }
    }
}

/// Outcome of one demo run
#[derive(Debug, Clone)]
pub struct DemoReport {
    pub loop_id: String,
    /// Messages accepted by the loop
    pub sent: usize,
    /// Messages seen per observer, in registration order
    pub delivered: Vec<(String, u64)>,
    pub out_of_order: u64,
    pub exit_code: i32,
    pub stats: LoopStats,
    pub elapsed: Duration,
}

impl DemoReport {
    /// Every observer saw every message, in per-producer order
    pub fn is_consistent(&self) -> bool {
        self.out_of_order == 0
            && self
                .delivered
                .iter()
                .all(|(_, count)| *count == self.sent as u64)
    }
}

#[derive(Debug)]
struct Tick {
    producer: usize,
    sequence: usize,
}

impl Payload for Tick {
    const KIND: &'static str = "demo.tick";
}

/// Counts ticks and tracks the last sequence number per producer
struct CountingObserver {
    name: String,
    claims: bool,
    delivered: AtomicU64,
    out_of_order: AtomicU64,
    last_seen: Mutex<HashMap<usize, usize>>,
}

impl CountingObserver {
    fn new(name: String, claims: bool) -> Self {
        Self {
            name,
            claims,
            delivered: AtomicU64::new(0),
            out_of_order: AtomicU64::new(0),
            last_seen: Mutex::new(HashMap::new()),
        }
    }
}

impl Observer for CountingObserver {
    fn on_message_received(&self, message: &Message) -> bool {
        let Some(tick) = message.payload::<Tick>() else {
            return false;
        };
        self.delivered.fetch_add(1, Ordering::Relaxed);

        let mut last_seen = self.last_seen.lock().unwrap_or_else(PoisonError::into_inner);
        let expected = last_seen.get(&tick.producer).map_or(0, |last| last + 1);
        if tick.sequence != expected {
            self.out_of_order.fetch_add(1, Ordering::Relaxed);
            log::warn!(
                "{}: producer {} sent #{} but #{} was expected",
                self.name,
                tick.producer,
                tick.sequence,
                expected
            );
        }
        last_seen.insert(tick.producer, tick.sequence);
        self.claims
    }

    fn on_loop_exit(&self) {
        log::debug!(
            "{} saw {} messages",
            self.name,
            self.delivered.load(Ordering::Relaxed)
        );
    }
}

/// Reports when the owner thread has entered `run`
struct StartSignal {
    ready: Mutex<Option<mpsc::Sender<()>>>,
}

impl Observer for StartSignal {
    fn on_message_received(&self, _message: &Message) -> bool {
        false
    }

    fn on_loop_enter(&self) {
        let sender = self.ready.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(sender) = sender {
            // The receiver may have given up waiting
            let _ = sender.send(());
        }
    }
}

fn produce(message_loop: &MessageLoop, producer: usize, messages: usize) -> usize {
    let sender = format!("producer-{producer}");
    for sequence in 0..messages {
        let message = Message::new(format!("tick-{producer}-{sequence}"), sender.as_str())
            .with_payload(Tick { producer, sequence });
        if let Err(e) = message_loop.send(message) {
            log::warn!("{}: {}", sender, e);
            return sequence;
        }
    }
    messages
}

/// Sum accepted sends; a panicked producer is logged and counted as zero
fn accepted_total(results: impl IntoIterator<Item = thread::Result<usize>>) -> usize {
    results
        .into_iter()
        .enumerate()
        .map(|(producer, result)| {
            result.unwrap_or_else(|cause| {
                let reason = cause
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| cause.downcast_ref::<String>().map(String::as_str))
                    .unwrap_or("non-string panic payload");
                log::error!("producer-{} panicked: {}", producer, reason);
                0
            })
        })
        .sum()
}

/// Run the demonstration and report what each observer saw
pub fn run_demo(settings: &DemoSettings) -> Result<DemoReport, DemoError> {
    let started = Instant::now();
    let registry = LoopRegistry::with_config(settings.loop_config.clone());
    let message_loop = registry.create(DEMO_LOOP_ID);

    let (ready_tx, ready_rx) = mpsc::channel();
    message_loop.add_observer(Arc::new(StartSignal {
        ready: Mutex::new(Some(ready_tx)),
    }));

    let observers: Vec<Arc<CountingObserver>> = (0..settings.observers)
        .map(|index| {
            let claims = index + 1 == settings.observers;
            Arc::new(CountingObserver::new(format!("observer-{index}"), claims))
        })
        .collect();
    for observer in &observers {
        message_loop.add_observer(observer.clone());
    }

    let owner_name = format!("loop-{DEMO_LOOP_ID}");
    let owner = thread::Builder::new()
        .name(owner_name.clone())
        .spawn({
            let message_loop = Arc::clone(&message_loop);
            move || message_loop.run()
        })
        .map_err(|source| DemoError::Spawn {
            name: owner_name,
            source,
        })?;

    if ready_rx.recv_timeout(START_TIMEOUT).is_err() {
        message_loop.exit(settings.exit_code, false)?;
        return Err(DemoError::StartTimeout {
            loop_id: DEMO_LOOP_ID.to_string(),
            timeout: START_TIMEOUT,
        });
    }
    log::info!(
        "Loop '{}' running with {} producers x {} messages",
        DEMO_LOOP_ID,
        settings.producers,
        settings.messages_per_producer
    );

    let sent: usize = thread::scope(|scope| {
        let workers: Vec<_> = (0..settings.producers)
            .map(|producer| {
                let message_loop = &message_loop;
                scope.spawn(move || produce(message_loop, producer, settings.messages_per_producer))
            })
            .collect();
        accepted_total(workers.into_iter().map(|worker| worker.join()))
    });

    if let Err(e) = message_loop.drain() {
        message_loop.exit(settings.exit_code, false)?;
        return Err(e.into());
    }
    log::debug!("Loop '{}' drained after {} messages", DEMO_LOOP_ID, sent);

    message_loop.exit(settings.exit_code, true)?;
    let exit_code = owner.join().map_err(|_| DemoError::OwnerPanicked {
        loop_id: DEMO_LOOP_ID.to_string(),
    })??;

    let stats = message_loop.stats();
    registry.destroy(DEMO_LOOP_ID);

    Ok(DemoReport {
        loop_id: DEMO_LOOP_ID.to_string(),
        sent,
        delivered: observers
            .iter()
            .map(|o| (o.name.clone(), o.delivered.load(Ordering::Relaxed)))
            .collect(),
        out_of_order: observers
            .iter()
            .map(|o| o.out_of_order.load(Ordering::Relaxed))
            .sum(),
        exit_code,
        stats,
        elapsed: started.elapsed(),
    })
}
