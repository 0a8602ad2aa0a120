//! Transient success/error notices.
//!
//! Each notice lives for a fixed TTL after it is posted; expired notices are
//! skipped on read and dropped by [`NoticeBoard::cleanup_expired`].

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// When the notice was posted
    pub posted_at: Instant,
}

/// Thread-safe list of notices with a shared TTL.
pub struct NoticeBoard {
    entries: Mutex<Vec<Notice>>,
    ttl: Duration,
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            ttl,
        }
    }

    pub fn post(&self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Success => info!(notice = %message, "Notice posted"),
            NoticeLevel::Error => error!(notice = %message, "Error notice posted"),
        }
        let mut entries = self.entries.lock();
        entries.retain(|notice| notice.posted_at.elapsed() < self.ttl);
        entries.push(Notice {
            level,
            message,
            posted_at: Instant::now(),
        });
    }

    pub fn success(&self, message: impl Into<String>) {
        self.post(NoticeLevel::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.post(NoticeLevel::Error, message);
    }

    /// Notices still within their TTL, oldest first.
    pub fn active(&self) -> Vec<Notice> {
        self.entries
            .lock()
            .iter()
            .filter(|notice| notice.posted_at.elapsed() < self.ttl)
            .cloned()
            .collect()
    }

    /// Removes expired notices.
    pub fn cleanup_expired(&self) {
        self.entries
            .lock()
            .retain(|notice| notice.posted_at.elapsed() < self.ttl);
    }

    /// Number of stored notices (including expired ones).
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}
