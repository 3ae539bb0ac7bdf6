use std::sync::Arc;

use sea_orm::{DatabaseConnection, TransactionTrait};

use crate::errors::InternalError;
use crate::notifications::{Notification, NotificationPublisher};
use crate::stores::CredentialStore;
use crate::types::db::user;
use crate::types::identity::{NewUser, WriteOutcome};
use crate::types::responses::RegisterResponse;

/// User registration and account lookup.
pub struct UserService {
    db: DatabaseConnection,
    credential_store: Arc<CredentialStore>,
    publisher: Arc<NotificationPublisher>,
}

impl UserService {
    pub fn new(
        db: DatabaseConnection,
        credential_store: Arc<CredentialStore>,
        publisher: Arc<NotificationPublisher>,
    ) -> Self {
        Self {
            db,
            credential_store,
            publisher,
        }
    }

    /// Register a new account and assign it to a role as one atomic unit.
    ///
    /// User creation and role assignment share a transaction: a missing role
    /// or a rejected assignment rolls back the freshly created user. The
    /// email-confirmation token and the UserRegistered notification happen
    /// after commit — registration is complete once the transaction commits,
    /// and notification delivery is best-effort.
    ///
    /// Password-less registration (`password = None`) is for federated
    /// accounts.
    pub async fn register(
        &self,
        new_user: NewUser,
        role_name: &str,
        password: Option<&str>,
    ) -> Result<RegisterResponse, InternalError> {
        tracing::info!("Registering user {}", new_user.username);
        let username = new_user.username.clone();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| InternalError::database("begin_registration", e))?;

        let user = match self
            .credential_store
            .create_user(&txn, new_user, password)
            .await?
        {
            WriteOutcome::Rejected(errors) => {
                tracing::warn!("Failed to register user {}", username);
                // Transaction dropped here rolls back
                return Ok(RegisterResponse::IdentityError(errors));
            }
            WriteOutcome::Succeeded(user) => user,
        };

        if !self.credential_store.role_exists(&txn, role_name).await? {
            tracing::warn!(
                "Registration of user {} aborted: role {} does not exist",
                username,
                role_name
            );
            return Ok(RegisterResponse::NotFound);
        }

        if let WriteOutcome::Rejected(errors) = self
            .credential_store
            .add_to_role(&txn, &user, role_name)
            .await?
        {
            tracing::warn!("Failed to add user {} to role {}", username, role_name);
            return Ok(RegisterResponse::IdentityError(errors));
        }

        txn.commit()
            .await
            .map_err(|e| InternalError::database("commit_registration", e))?;

        let confirmation_token = self
            .credential_store
            .generate_confirm_token(&self.db, &user)
            .await?;

        tracing::info!("User {} has successfully registered", username);

        self.publisher
            .publish(Notification::UserRegistered {
                user: user.clone(),
                confirmation_token,
            })
            .await;

        Ok(RegisterResponse::Success { user })
    }

    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<user::Model>, InternalError> {
        self.credential_store.find_by_id(&self.db, id).await
    }

    pub async fn get_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<user::Model>, InternalError> {
        self.credential_store.find_by_email(&self.db, email).await
    }

    pub async fn get_all_users(&self) -> Result<Vec<user::Model>, InternalError> {
        self.credential_store.get_all_users(&self.db).await
    }

    /// Administrative deletion, delegated straight to the store.
    pub async fn delete_user(&self, user: &user::Model) -> Result<(), InternalError> {
        self.credential_store.delete_user(&self.db, user).await
    }
}
