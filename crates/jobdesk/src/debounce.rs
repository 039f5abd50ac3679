//! Debounced value coordinator.
//!
//! Holds an immediate value, updated on every keystroke, and a debounced
//! value that only follows once input has been quiet for the full delay.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

pub struct Debouncer<T> {
    delay: Duration,
    immediate: T,
    sender: Arc<watch::Sender<T>>,
    pending: Option<JoinHandle<()>>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T, delay: Duration) -> Self {
        let (sender, _) = watch::channel(initial.clone());
        Self {
            delay,
            immediate: initial,
            sender: Arc::new(sender),
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// The latest value, for echoing back into the input.
    pub fn immediate(&self) -> &T {
        &self.immediate
    }

    /// The value query construction should use.
    pub fn debounced(&self) -> T {
        self.sender.borrow().clone()
    }

    /// Receiver notified each time the debounced value changes.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }

    /// Records a new value and restarts the timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn set(&mut self, value: T) {
        self.cancel();
        self.immediate = value.clone();

        let sender = Arc::clone(&self.sender);
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            publish(&sender, value);
        }));
    }

    /// Sets both values at once, dropping any pending update.
    pub fn reset(&mut self, value: T) {
        self.cancel();
        self.immediate = value.clone();
        publish(&self.sender, value);
    }

    /// Drops the pending update. Returns true if one was still waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                let waiting = !handle.is_finished();
                handle.abort();
                waiting
            }
            None => false,
        }
    }

    /// Waits until the pending update, if any, has been published.
    pub async fn wait(&mut self) {
        if let Some(handle) = self.pending.take() {
            // An aborted task simply has nothing to publish.
            let _ = handle.await;
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

fn publish<T: PartialEq>(sender: &watch::Sender<T>, value: T) {
    sender.send_if_modified(|current| {
        if *current == value {
            return false;
        }
        *current = value;
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_millis(100);

    #[tokio::test(start_paused = true)]
    async fn test_rapid_input_publishes_once() {
        let mut debouncer = Debouncer::new(String::new(), DEFAULT_DEBOUNCE);
        let mut rx = debouncer.subscribe();

        for term in ["i", "in", "inv", "invo"] {
            debouncer.set(term.to_string());
            tokio::time::sleep(STEP).await;
        }
        assert_eq!(debouncer.immediate(), "invo");
        assert!(!rx.has_changed().unwrap());

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), "invo");

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_full_window() {
        let mut debouncer = Debouncer::new(String::new(), DEFAULT_DEBOUNCE);
        debouncer.set("abc".to_string());

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(debouncer.debounced(), "");
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(debouncer.debounced(), "abc");
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_update() {
        let debouncer = {
            let mut debouncer = Debouncer::new(0u32, DEFAULT_DEBOUNCE);
            debouncer.set(7);
            debouncer
        };
        let rx = debouncer.subscribe();
        drop(debouncer);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(*rx.borrow(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_is_immediate() {
        let mut debouncer = Debouncer::new(String::from("old"), DEFAULT_DEBOUNCE);
        debouncer.set("typing".to_string());
        debouncer.reset(String::new());

        assert_eq!(debouncer.immediate(), "");
        assert_eq!(debouncer.debounced(), "");
        assert!(!debouncer.is_pending());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(debouncer.debounced(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_publishes_latest_value() {
        let mut debouncer = Debouncer::new(String::new(), DEFAULT_DEBOUNCE);
        debouncer.set("a".to_string());
        debouncer.set("ab".to_string());

        debouncer.wait().await;
        assert_eq!(debouncer.debounced(), "ab");
        assert!(!debouncer.is_pending());

        // Nothing pending: returns immediately.
        debouncer.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_value_does_not_notify() {
        let mut debouncer = Debouncer::new(String::from("x"), DEFAULT_DEBOUNCE);
        let rx = debouncer.subscribe();
        debouncer.set("x".to_string());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!rx.has_changed().unwrap());
    }
}
