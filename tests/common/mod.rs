#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use taskcoord::{Event, EventKind, Handle, Subscribe};

/// Records every event it sees.
#[derive(Default)]
pub struct Probe {
    events: Mutex<Vec<Event>>,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn kinds_for(&self, task: &str) -> Vec<EventKind> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.task.as_deref() == Some(task))
            .map(|e| e.kind)
            .collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind == kind).count()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

impl Subscribe for Probe {
    fn on_event(&self, event: &Event) {
        self.events.lock().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "probe"
    }
}

/// Panics on the first event of `kind`.
pub struct Faulty(pub EventKind);

impl Subscribe for Faulty {
    fn on_event(&self, event: &Event) {
        if event.kind == self.0 {
            panic!("subscriber broke on {}", event.kind.as_label());
        }
    }

    fn name(&self) -> &'static str {
        "faulty"
    }
}

pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Polls until `cond` holds, for at most two seconds.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        sleep_ms(5).await;
    }
    panic!("condition not reached in time");
}

pub async fn until_executing(handle: &Handle) {
    eventually(|| handle.stage() == taskcoord::Stage::Executing).await;
}
