//! User-facing notification seam.
//!
//! Components raise operator-visible notices through this trait instead of
//! logging directly, so surfaces (and tests) can observe them.

use std::sync::Mutex;

/// Sink for operator-visible messages.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Production notifier: routes notices to the log stream.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::info!("📢 {message}");
    }
}

/// Collects notices in memory for assertions.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    messages: Mutex<Vec<String>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        match self.messages.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, message: &str) {
        match self.messages.lock() {
            Ok(mut guard) => guard.push(message.to_string()),
            Err(poisoned) => poisoned.into_inner().push(message.to_string()),
        }
    }
}
