//! Monitor Broadcast
//!
//! Fans a textual feed of executed commands out to diagnostic subscribers.
//!
//! ## Concurrency
//! Subscribers live in a single `Mutex<Vec<Sender>>`. Publishing snapshots
//! the list under the lock and sends outside it, so a slow subscriber never
//! holds up registration. Subscribers whose receiver is gone are pruned on
//! the next publish. Each subscriber has a bounded queue; events that do
//! not fit are dropped for that subscriber only.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::protocol::Request;

/// Events buffered per subscriber before new ones are dropped
pub const DEFAULT_MONITOR_CAPACITY: usize = 4096;

/// Shared registry of monitor subscribers
#[derive(Clone)]
pub struct Monitor {
    subscribers: Arc<Mutex<Vec<Sender<String>>>>,
    capacity: usize,
}

impl Default for Monitor {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MONITOR_CAPACITY)
    }
}

impl Monitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose subscribers each buffer at most `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
            capacity: capacity.max(1),
        }
    }

    /// Add a subscriber; it sees every command executed after this call
    ///
    /// A subscriber that falls `capacity` events behind misses new events
    /// until it catches up.
    pub fn subscribe(&self) -> Receiver<String> {
        let (tx, rx) = channel::bounded(self.capacity);
        self.subscribers.lock().push(tx);
        tracing::debug!("Monitor subscriber added");
        rx
    }

    /// Current number of subscribers (including ones not yet pruned)
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Publish an executed request to every subscriber
    pub fn publish(&self, request: &Request) {
        let snapshot: Vec<Sender<String>> = {
            let subscribers = self.subscribers.lock();
            if subscribers.is_empty() {
                return;
            }
            subscribers.clone()
        };

        let line = format_event(request, SystemTime::now());
        let mut gone: Vec<&Sender<String>> = Vec::new();
        let mut lagging = 0usize;
        for tx in &snapshot {
            match tx.try_send(line.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => lagging += 1,
                Err(TrySendError::Disconnected(_)) => gone.push(tx),
            }
        }
        if lagging > 0 {
            tracing::trace!("Dropped monitor event for {} lagging subscriber(s)", lagging);
        }

        if !gone.is_empty() {
            let mut subscribers = self.subscribers.lock();
            subscribers.retain(|tx| !gone.iter().any(|g| g.same_channel(tx)));
            tracing::debug!("Pruned {} disconnected monitor subscriber(s)", gone.len());
        }
    }
}

/// `<secs>.<micros> [<client>] "NAME" "arg" ...`
fn format_event(request: &Request, at: SystemTime) -> String {
    let since_epoch = at.duration_since(UNIX_EPOCH).unwrap_or_default();
    let mut line = format!(
        "{}.{:06} [{}] \"{}\"",
        since_epoch.as_secs(),
        since_epoch.subsec_micros(),
        request.host,
        escape(request.name.as_bytes())
    );
    for arg in &request.args {
        line.push_str(" \"");
        line.push_str(&escape(arg));
        line.push('"');
    }
    line
}

fn escape(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
}
