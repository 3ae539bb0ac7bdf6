//! Domain notifications published by the registration and credential flows.
//!
//! Delivery is fan-out to zero or more registered handlers. Dispatch is
//! awaited, so a slow handler delays the caller's response, but a failing
//! handler is logged and never retried; publication is best-effort once the
//! triggering operation has completed.

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::db::user;

/// Events emitted by the core.
#[derive(Debug, Clone)]
pub enum Notification {
    UserRegistered {
        user: user::Model,
        confirmation_token: String,
    },
    PasswordReset {
        user: user::Model,
        reset_token: String,
    },
}

#[derive(Debug, thiserror::Error)]
#[error("Notification handler failed: {0}")]
pub struct NotificationHandlerError(pub String);

/// A subscriber to published notifications (e.g. an email sender).
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    async fn handle(&self, notification: &Notification) -> Result<(), NotificationHandlerError>;
}

/// Dispatches notifications to every registered handler in order.
#[derive(Default)]
pub struct NotificationPublisher {
    handlers: Vec<Arc<dyn NotificationHandler>>,
}

impl NotificationPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handlers(handlers: Vec<Arc<dyn NotificationHandler>>) -> Self {
        Self { handlers }
    }

    pub fn register(&mut self, handler: Arc<dyn NotificationHandler>) {
        self.handlers.push(handler);
    }

    /// Deliver a notification to all handlers, awaiting each in turn.
    pub async fn publish(&self, notification: Notification) {
        for handler in &self.handlers {
            if let Err(err) = handler.handle(&notification).await {
                tracing::error!("Failed to deliver notification: {:?}", err);
            }
        }
    }
}
