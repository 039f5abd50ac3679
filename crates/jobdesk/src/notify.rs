//! Notification side channel for mutation outcomes.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Success,
    /// Rendered as destructive.
    Error,
}

/// A user-visible notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub tone: Tone,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    /// Job the notification is about, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl Notification {
    pub fn success(title: &str, description: impl Into<String>) -> Self {
        Self::new(Tone::Success, title, description.into())
    }

    pub fn error(title: &str, description: impl Into<String>) -> Self {
        Self::new(Tone::Error, title, description.into())
    }

    fn new(tone: Tone, title: &str, description: String) -> Self {
        Self {
            tone,
            title: title.to_string(),
            description,
            timestamp: Utc::now(),
            job_id: None,
        }
    }

    pub fn for_job(mut self, job_id: &str) -> Self {
        self.job_id = Some(job_id.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.tone == Tone::Error
    }
}

/// Broadcasts notifications and keeps the most recent ones.
#[derive(Clone)]
pub struct Notifier {
    sender: Arc<broadcast::Sender<Notification>>,
    recent: Arc<Mutex<VecDeque<Notification>>>,
    capacity: usize,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
            recent: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn send(&self, notification: Notification) {
        match notification.tone {
            Tone::Success => log::info!("{}: {}", notification.title, notification.description),
            Tone::Error => log::warn!("{}: {}", notification.title, notification.description),
        }

        {
            let mut recent = match self.recent.lock() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    log::warn!("Notification buffer lock was poisoned, recovering");
                    poisoned.into_inner()
                }
            };
            if recent.len() == self.capacity {
                recent.pop_front();
            }
            recent.push_back(notification.clone());
        }

        // No active receivers is fine
        let _ = self.sender.send(notification);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Oldest first.
    pub fn recent(&self) -> Vec<Notification> {
        match self.recent.lock() {
            Ok(guard) => guard.iter().cloned().collect(),
            Err(poisoned) => {
                log::warn!("Notification buffer lock was poisoned, recovering");
                poisoned.into_inner().iter().cloned().collect()
            }
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_notifications() {
        let notifier = Notifier::new(8);
        let mut rx = notifier.subscribe();

        notifier.send(
            Notification::success("Job started", "Job \"a\" has been started successfully.")
                .for_job("a"),
        );

        let received = rx.recv().await.unwrap();
        assert_eq!(received.tone, Tone::Success);
        assert_eq!(received.job_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_send_without_subscribers() {
        let notifier = Notifier::default();
        notifier.send(Notification::error("Failed to delete job", "boom"));
        assert_eq!(notifier.recent().len(), 1);
        assert!(notifier.recent()[0].is_error());
    }

    #[test]
    fn test_recent_is_bounded() {
        let notifier = Notifier::new(2);
        for i in 0..3 {
            notifier.send(Notification::success("n", i.to_string()));
        }
        let descriptions: Vec<_> = notifier
            .recent()
            .into_iter()
            .map(|n| n.description)
            .collect();
        assert_eq!(descriptions, vec!["1", "2"]);
    }
}
