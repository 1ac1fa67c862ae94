//! In-process log capture.
//!
//! A tracing layer mirrors every event into a bounded ring so the admin
//! logs page can show recent history and stream new lines over SSE.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: String,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    /// One display line, the shape shown on the logs page and over SSE
    pub fn format(&self) -> String {
        format!(
            "{} {:>5} [{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.level,
            self.target,
            self.message
        )
    }
}

/// Bounded history of recent entries plus a broadcast channel for live
/// followers. Readers that lag are cut off by the channel, not buffered.
pub struct LogBuffer {
    tx: broadcast::Sender<LogEntry>,
    recent: parking_lot::RwLock<VecDeque<LogEntry>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            tx,
            recent: parking_lot::RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, entry: LogEntry) {
        {
            let mut recent = self.recent.write();
            if recent.len() == self.capacity {
                recent.pop_front();
            }
            recent.push_back(entry.clone());
        }
        // No receivers is fine, history still accumulates
        let _ = self.tx.send(entry);
    }

    /// Up to `count` most recent entries, oldest first
    pub fn get_recent(&self, count: usize) -> Vec<LogEntry> {
        let recent = self.recent.read();
        recent
            .iter()
            .skip(recent.len().saturating_sub(count))
            .cloned()
            .collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.tx.subscribe()
    }
}

pub type SharedLogBuffer = Arc<LogBuffer>;

pub fn create_log_buffer(capacity: usize) -> SharedLogBuffer {
    Arc::new(LogBuffer::new(capacity))
}

/// Tracing layer feeding the buffer
pub struct LogCaptureLayer {
    buffer: SharedLogBuffer,
}

impl LogCaptureLayer {
    pub fn new(buffer: SharedLogBuffer) -> Self {
        Self { buffer }
    }
}

impl<S> Layer<S> for LogCaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = MessageVisitor::default();
        event.record(&mut message);

        self.buffer.push(LogEntry {
            timestamp: chrono::Utc::now(),
            level: event.metadata().level().to_string(),
            target: event.metadata().target().to_string(),
            message: message.0,
        });
    }
}

/// Pulls the `message` field out of an event, falling back to the first
/// recorded field for events without one.
#[derive(Default)]
struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        } else if self.0.is_empty() {
            self.0 = format!("{}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.0 = value.to_string();
        } else if self.0.is_empty() {
            self.0 = format!("{}={}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(message: &str) -> LogEntry {
        LogEntry {
            timestamp: chrono::Utc::now(),
            level: "INFO".to_string(),
            target: "test".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_recent_keeps_insertion_order() {
        let buffer = LogBuffer::new(10);
        buffer.push(entry("first"));
        buffer.push(entry("second"));

        let recent = buffer.get_recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "first");
        assert_eq!(recent[1].message, "second");
    }

    #[test]
    fn test_ring_drops_oldest_at_capacity() {
        let buffer = LogBuffer::new(2);
        for i in 1..=5 {
            buffer.push(entry(&format!("line {}", i)));
        }

        let recent = buffer.get_recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "line 4");
        assert_eq!(recent[1].message, "line 5");
    }

    #[tokio::test]
    async fn test_subscribers_see_new_entries() {
        let buffer = LogBuffer::new(4);
        let mut rx = buffer.subscribe();

        buffer.push(entry("hello"));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.message, "hello");
        assert!(received.format().contains("[test] hello"));
    }
}
