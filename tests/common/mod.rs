// Common test utilities for integration tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};

use iam_core::config::IamSettings;
use iam_core::notifications::{
    Notification, NotificationHandler, NotificationHandlerError, NotificationPublisher,
};
use iam_core::services::{AuthService, TokenService, UserService};
use iam_core::stores::CredentialStore;

/// Captures every published notification for later assertions.
pub struct RecordingHandler {
    pub notifications: Mutex<Vec<Notification>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self {
            notifications: Mutex::new(Vec::new()),
        }
    }

    /// The reset token carried by the most recent PasswordReset event.
    pub fn last_reset_token(&self) -> Option<String> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|n| match n {
                Notification::PasswordReset { reset_token, .. } => Some(reset_token.clone()),
                _ => None,
            })
    }

    /// The confirmation token carried by the most recent UserRegistered event.
    pub fn last_confirmation_token(&self) -> Option<String> {
        self.notifications
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|n| match n {
                Notification::UserRegistered {
                    confirmation_token, ..
                } => Some(confirmation_token.clone()),
                _ => None,
            })
    }
}

#[async_trait]
impl NotificationHandler for RecordingHandler {
    async fn handle(&self, notification: &Notification) -> Result<(), NotificationHandlerError> {
        self.notifications.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct TestHarness {
    pub db: DatabaseConnection,
    pub store: Arc<CredentialStore>,
    pub auth: AuthService,
    pub users: Arc<UserService>,
    pub tokens: Arc<TokenService>,
    pub recorder: Arc<RecordingHandler>,
}

/// Creates an in-memory IAM stack with migrations applied.
pub async fn setup(settings: IamSettings) -> TestHarness {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let store = Arc::new(CredentialStore::new(&settings));
    let tokens = Arc::new(TokenService::new(settings.jwt.clone()));
    let recorder = Arc::new(RecordingHandler::new());
    let publisher = Arc::new(NotificationPublisher::with_handlers(vec![
        recorder.clone() as Arc<dyn NotificationHandler>,
    ]));

    let users = Arc::new(UserService::new(
        db.clone(),
        store.clone(),
        publisher.clone(),
    ));
    let auth = AuthService::new(db.clone(), store.clone(), tokens.clone(), publisher);

    TestHarness {
        db,
        store,
        auth,
        users,
        tokens,
        recorder,
    }
}

pub async fn setup_default() -> TestHarness {
    setup(IamSettings::default()).await
}
