//! In-memory capture of tracing events for tests.
//!
//! [`capture_logs`] installs a thread-local subscriber, so tests using it
//! should run on a current-thread runtime (the `#[tokio::test]` default).

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

/// One event seen by the capture layer.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    /// Event level.
    pub level: Level,
    /// Emitting target (module path).
    pub target: String,
    /// The `message` field.
    pub message: String,
    /// Other fields, rendered with `Debug` (strings unquoted).
    pub fields: BTreeMap<&'static str, String>,
}

impl CapturedEvent {
    /// Value of the named field, if recorded.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Shared handle to the captured events.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedLogs {
    /// Snapshot of all captured events.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }

    /// Events carrying `user_id = <user_id>`.
    pub fn for_user(&self, user_id: &str) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.field("user_id") == Some(user_id))
            .cloned()
            .collect()
    }

    /// Whether an event at `level` contains `message_contains`.
    pub fn has_event(&self, level: Level, message_contains: &str) -> bool {
        self.events
            .lock()
            .iter()
            .any(|e| e.level == level && e.message.contains(message_contains))
    }

    /// Number of events at `level`.
    pub fn count_at_level(&self, level: Level) -> usize {
        self.events.lock().iter().filter(|e| e.level == level).count()
    }

    /// Forget everything captured so far.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

struct CaptureLayer {
    logs: CapturedLogs,
}

#[derive(Default)]
struct EventFields {
    message: String,
    rest: BTreeMap<&'static str, String>,
}

impl EventFields {
    fn put(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = value,
            name => {
                let _ = self.rest.insert(name, value);
            }
        }
    }
}

impl Visit for EventFields {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_owned());
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = EventFields::default();
        event.record(&mut fields);
        let meta = event.metadata();
        self.logs.events.lock().push(CapturedEvent {
            level: *meta.level(),
            target: meta.target().to_owned(),
            message: fields.message,
            fields: fields.rest,
        });
    }
}

/// Install a capturing subscriber for the current thread.
///
/// Keep the returned guard alive for the duration of the test.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let layer = CaptureLayer { logs: logs.clone() };
    let guard = tracing_subscriber::registry()
        .with(layer)
        .with(LevelFilter::TRACE)
        .set_default();
    (logs, guard)
}
