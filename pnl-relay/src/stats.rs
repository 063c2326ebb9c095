//! Process-wide processing counters, owned by the service state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessingStats {
    pub last_processed: Option<DateTime<Utc>>,
    pub total_processed: u64,
    pub last_error: Option<String>,
    pub last_filename: Option<String>,
}

/// Shared handle; clones see the same counters.
#[derive(Debug, Clone, Default)]
pub struct StatsHandle {
    inner: Arc<Mutex<ProcessingStats>>,
}

impl StatsHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ProcessingStats> {
        // counters stay usable even if a writer panicked mid-update
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record_success(&self, filename: &str, at: DateTime<Utc>) {
        let mut s = self.lock();
        s.last_processed = Some(at);
        s.total_processed += 1;
        s.last_error = None;
        s.last_filename = Some(filename.to_string());
    }

    pub fn record_failure(&self, message: impl Into<String>) {
        self.lock().last_error = Some(message.into());
    }

    pub fn snapshot(&self) -> ProcessingStats {
        self.lock().clone()
    }
}
