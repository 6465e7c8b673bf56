//! Emergency contact alerts.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::AlertError;

/// Outcome of a best-effort fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Delivers alert messages to emergency contacts.
#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    /// Deliver `message` to a single contact.
    async fn send(&self, contact: &str, message: &str) -> Result<(), AlertError>;

    /// Send to every contact; a failed send is logged and does not stop the rest.
    async fn notify(&self, contacts: &[String], message: &str) -> DispatchReport {
        let mut report = DispatchReport::default();
        for contact in contacts {
            match self.send(contact, message).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("Failed to alert {}: {}", contact, e);
                    report.failed += 1;
                }
            }
        }
        info!(
            "Alert fan-out: {} delivered, {} failed",
            report.delivered, report.failed
        );
        report
    }
}

/// Dispatcher that records alerts in the service log.
#[derive(Debug, Default)]
pub struct LogDispatcher;

#[async_trait]
impl AlertDispatcher for LogDispatcher {
    async fn send(&self, contact: &str, message: &str) -> Result<(), AlertError> {
        info!(contact = %contact, "ALERT: {}", message);
        Ok(())
    }
}

/// Emergency contacts registered by the user
#[derive(Debug, Default)]
pub struct ContactBook {
    contacts: RwLock<Vec<String>>,
}

impl ContactBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a contact; returns the number of contacts afterwards.
    pub async fn add(&self, phone: &str) -> Result<usize, AlertError> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(AlertError::InvalidContact(
                "Please enter a phone number".to_string(),
            ));
        }

        let mut contacts = self.contacts.write().await;
        if !contacts.iter().any(|c| c == phone) {
            contacts.push(phone.to_string());
        }
        Ok(contacts.len())
    }

    pub async fn all(&self) -> Vec<String> {
        self.contacts.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Fails for contacts starting with "bad", records the rest
    #[derive(Default)]
    struct FlakyDispatcher {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AlertDispatcher for FlakyDispatcher {
        async fn send(&self, contact: &str, _message: &str) -> Result<(), AlertError> {
            if contact.starts_with("bad") {
                return Err(AlertError::InvalidContact(contact.to_string()));
            }
            self.sent.lock().unwrap().push(contact.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_fan_out() {
        let dispatcher = FlakyDispatcher::default();
        let contacts = vec![
            "bad-1".to_string(),
            "+15195550100".to_string(),
            "bad-2".to_string(),
            "+15195550101".to_string(),
        ];

        let report = dispatcher.notify(&contacts, "help").await;
        assert_eq!(
            report,
            DispatchReport {
                delivered: 2,
                failed: 2
            }
        );
        assert_eq!(dispatcher.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_contact_book() {
        let book = ContactBook::new();
        assert_eq!(book.add(" +15195550100 ").await.unwrap(), 1);
        assert_eq!(book.add("+15195550100").await.unwrap(), 1);
        assert_eq!(book.add("+15195550199").await.unwrap(), 2);
        assert!(matches!(
            book.add("   ").await,
            Err(AlertError::InvalidContact(_))
        ));
        assert_eq!(book.all().await, vec!["+15195550100", "+15195550199"]);
    }

    #[tokio::test]
    async fn test_log_dispatcher_delivers() {
        let report = LogDispatcher
            .notify(&["+15195550100".to_string()], "test")
            .await;
        assert_eq!(report.delivered, 1);
    }
}
