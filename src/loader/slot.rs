//! Single-assignment result cell with any number of waiters.

use std::sync::OnceLock;

use tokio::sync::Notify;

#[derive(Debug)]
pub struct Slot<T> {
    value: OnceLock<T>,
    notify: Notify,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot {
            value: OnceLock::new(),
            notify: Notify::new(),
        }
    }
}

impl<T> Slot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` if the slot is still empty and wakes every waiter.
    /// Returns false when the slot was already completed.
    pub fn complete(&self, value: T) -> bool {
        let stored = self.value.set(value).is_ok();
        self.notify.notify_waiters();
        stored
    }

    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    pub fn is_completed(&self) -> bool {
        self.value.get().is_some()
    }

    pub async fn wait(&self) -> &T {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // register before checking so a completion in between is not missed
            notified.as_mut().enable();
            if let Some(value) = self.value.get() {
                return value;
            }
            notified.await;
        }
    }
}
