//! Severity-filtered diagnostics queue consumed by the host.
//!
//! Every message is also emitted as a `tracing` event. Only messages at or
//! above the configured threshold are retained for the host to poll; the
//! rest are dropped immediately.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use serde::Deserialize;
use tracing::{debug, error, warn};

/// Message severity. `None` suppresses everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Verbose state-machine chatter.
    Debug = 0,
    /// Recoverable problems.
    Warning = 1,
    /// Failed operations.
    Error = 2,
    /// Threshold that retains nothing.
    None = 3,
}

impl TryFrom<i32> for Severity {
    type Error = i32;

    fn try_from(value: i32) -> std::result::Result<Self, i32> {
        match value {
            0 => Ok(Severity::Debug),
            1 => Ok(Severity::Warning),
            2 => Ok(Severity::Error),
            3 => Ok(Severity::None),
            other => Err(other),
        }
    }
}

/// A retained diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    /// Severity the message was reported with.
    pub severity: Severity,
    /// Message text.
    pub text: String,
}

#[derive(Debug)]
struct Inner {
    threshold: Severity,
    queue: VecDeque<ErrorMessage>,
}

/// Shared handle to a diagnostics queue.
///
/// Clones share the same queue. [`Diagnostics::global`] is the process-wide
/// instance cameras report to unless given their own.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    inner: Arc<Mutex<Inner>>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(Severity::Warning)
    }
}

impl Diagnostics {
    /// Create an independent queue with the given threshold.
    #[must_use]
    pub fn new(threshold: Severity) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                threshold,
                queue: VecDeque::new(),
            })),
        }
    }

    /// The process-wide queue.
    pub fn global() -> Self {
        static GLOBAL: OnceLock<Diagnostics> = OnceLock::new();
        GLOBAL.get_or_init(Self::default).clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the minimum severity that is retained.
    pub fn set_threshold(&self, threshold: Severity) {
        self.lock().threshold = threshold;
    }

    /// Current threshold.
    pub fn threshold(&self) -> Severity {
        self.lock().threshold
    }

    /// Report a message.
    pub fn push<T: Into<String>>(&self, severity: Severity, text: T) {
        let text = text.into();
        match severity {
            Severity::Debug => debug!("{text}"),
            Severity::Warning => warn!("{text}"),
            Severity::Error => error!("{text}"),
            Severity::None => return,
        }

        let mut inner = self.lock();
        if inner.threshold != Severity::None && severity >= inner.threshold {
            inner.queue.push_back(ErrorMessage { severity, text });
        }
    }

    /// Report a debug message.
    pub fn debug<T: Into<String>>(&self, text: T) {
        self.push(Severity::Debug, text);
    }

    /// Report a warning.
    pub fn warning<T: Into<String>>(&self, text: T) {
        self.push(Severity::Warning, text);
    }

    /// Report an error.
    pub fn error<T: Into<String>>(&self, text: T) {
        self.push(Severity::Error, text);
    }

    /// Remove and return the oldest retained message.
    pub fn pop(&self) -> Option<ErrorMessage> {
        self.lock().queue.pop_front()
    }

    /// Number of retained messages.
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Whether no messages are retained.
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Drop every retained message.
    pub fn clear(&self) {
        self.lock().queue.clear();
    }
}

/// Set the threshold of the process-wide queue.
pub fn set_error_level(threshold: Severity) {
    Diagnostics::global().set_threshold(threshold);
}

/// Pop the oldest message from the process-wide queue.
pub fn pop_error_message() -> Option<ErrorMessage> {
    Diagnostics::global().pop()
}

/// Number of messages in the process-wide queue.
pub fn error_message_count() -> usize {
    Diagnostics::global().len()
}
