//! Toast queue shared by the front ends.

use std::collections::VecDeque;
use std::sync::Mutex;
use storyteller_core::{Notifier, Toast};

/// Collects toasts until the front end displays them.
#[derive(Debug, Default)]
pub struct ToastQueue {
    pending: Mutex<VecDeque<Toast>>,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every pending toast, oldest first.
    pub fn drain(&self) -> Vec<Toast> {
        match self.pending.lock() {
            Ok(mut pending) => pending.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl Notifier for ToastQueue {
    fn notify(&self, toast: Toast) {
        tracing::debug!(title = %toast.title, "toast");
        if let Ok(mut pending) = self.pending.lock() {
            pending.push_back(toast);
        }
    }
}
