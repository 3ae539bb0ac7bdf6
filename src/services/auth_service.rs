use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::errors::InternalError;
use crate::notifications::{Notification, NotificationPublisher};
use crate::services::TokenService;
use crate::stores::CredentialStore;
use crate::types::identity::{SignInCheck, WriteOutcome};
use crate::types::responses::{
    ChangePasswordResponse, ConfirmEmailResponse, LoginResponse, PasswordResetTokenResponse,
};

/// Authentication service: the login/lockout and credential-lifecycle state
/// machine.
///
/// Every operation is a short bounded sequence of store round-trips ending in
/// a closed response variant. The service holds no per-call state and is safe
/// to share across concurrent requests; infrastructure failures propagate
/// untranslated through the error channel.
pub struct AuthService {
    db: DatabaseConnection,
    credential_store: Arc<CredentialStore>,
    token_service: Arc<TokenService>,
    publisher: Arc<NotificationPublisher>,
}

impl AuthService {
    pub fn new(
        db: DatabaseConnection,
        credential_store: Arc<CredentialStore>,
        token_service: Arc<TokenService>,
        publisher: Arc<NotificationPublisher>,
    ) -> Self {
        Self {
            db,
            credential_store,
            token_service,
            publisher,
        }
    }

    /// Attempt a password login.
    ///
    /// Outcome precedence mirrors the sign-in check: an unknown username is
    /// NotFound before anything else; a locked account never reports plain
    /// Failure, and a correct password on a locked account still reports
    /// LockedOut.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, InternalError> {
        tracing::info!("Attempting to log user {} in", username);

        let Some(user) = self.credential_store.find_by_username(&self.db, username).await? else {
            tracing::warn!(
                "An attempt was made to login with username {} which does not exist",
                username
            );
            return Ok(LoginResponse::NotFound);
        };

        let check = self
            .credential_store
            .check_password_sign_in(&self.db, &user, password, true)
            .await?;

        match check {
            SignInCheck::LockedOut => {
                tracing::warn!(
                    "An attempt was made to login with username {} which is currently locked out",
                    username
                );
                Ok(LoginResponse::LockedOut)
            }
            SignInCheck::RequiresTwoFactor => {
                tracing::warn!(
                    "An attempt was made to login with username {} which requires two factor authentication",
                    username
                );
                Ok(LoginResponse::RequiresTwoFactor)
            }
            SignInCheck::NotAllowed => {
                tracing::warn!(
                    "An attempt was made to login with username {} which is not allowed to sign in",
                    username
                );
                Ok(LoginResponse::NotAllowed)
            }
            SignInCheck::Failed => Ok(LoginResponse::Failure),
            SignInCheck::Success => {
                tracing::info!("User {} has successfully logged in", username);

                let roles = self.credential_store.get_roles(&self.db, &user).await?;
                let access_token = self.token_service.generate_access_token(&user, &roles)?;

                Ok(LoginResponse::Success { user, access_token })
            }
        }
    }

    /// Change a password by proving knowledge of the current one.
    pub async fn change_password(
        &self,
        username: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<ChangePasswordResponse, InternalError> {
        tracing::info!("Attempting to change user {} password", username);

        let Some(user) = self.credential_store.find_by_username(&self.db, username).await? else {
            tracing::warn!(
                "An attempt was made to change password of user {} which does not exist",
                username
            );
            return Ok(ChangePasswordResponse::NotFound);
        };

        match self
            .credential_store
            .change_password(&self.db, &user, current_password, new_password)
            .await?
        {
            WriteOutcome::Rejected(errors) => {
                tracing::warn!(
                    "An attempt to change user {} password using the current password has failed",
                    username
                );
                Ok(ChangePasswordResponse::IdentityError(errors))
            }
            WriteOutcome::Succeeded(()) => {
                tracing::info!(
                    "User {} has successfully changed their password",
                    username
                );
                Ok(ChangePasswordResponse::Success)
            }
        }
    }

    /// Change a password by presenting a previously minted reset token.
    pub async fn reset_password_with_token(
        &self,
        username: &str,
        token: &str,
        new_password: &str,
    ) -> Result<ChangePasswordResponse, InternalError> {
        tracing::info!(
            "Attempting to change user {} password using a password reset token",
            username
        );

        let Some(user) = self.credential_store.find_by_username(&self.db, username).await? else {
            tracing::warn!(
                "An attempt was made to change password of user {} which does not exist",
                username
            );
            return Ok(ChangePasswordResponse::NotFound);
        };

        match self
            .credential_store
            .reset_password(&self.db, &user, token, new_password)
            .await?
        {
            WriteOutcome::Rejected(errors) => {
                tracing::warn!(
                    "An attempt to change user {} password using a reset token has failed",
                    username
                );
                Ok(ChangePasswordResponse::IdentityError(errors))
            }
            WriteOutcome::Succeeded(()) => {
                tracing::info!(
                    "User {} has successfully changed their password using a reset token",
                    username
                );
                Ok(ChangePasswordResponse::Success)
            }
        }
    }

    /// Mint a password-reset token and publish a PasswordReset notification.
    ///
    /// No throttling or resend suppression happens here; callers that need
    /// rate limiting apply it themselves.
    pub async fn generate_password_reset_token(
        &self,
        username: &str,
    ) -> Result<PasswordResetTokenResponse, InternalError> {
        tracing::info!("Attempting to reset user {} password", username);

        let Some(user) = self.credential_store.find_by_username(&self.db, username).await? else {
            tracing::warn!(
                "An attempt was made to reset password of user {} which does not exist",
                username
            );
            return Ok(PasswordResetTokenResponse::NotFound);
        };

        let token = self
            .credential_store
            .generate_reset_token(&self.db, &user)
            .await?;

        tracing::info!(
            "Successfully generated password reset token for user {}",
            username
        );

        self.publisher
            .publish(Notification::PasswordReset {
                user,
                reset_token: token.clone(),
            })
            .await;

        Ok(PasswordResetTokenResponse::Success { token })
    }

    /// Confirm an account's email address with a confirmation token.
    pub async fn confirm_email(
        &self,
        username: &str,
        token: &str,
    ) -> Result<ConfirmEmailResponse, InternalError> {
        tracing::info!("Attempting to confirm email for user {}", username);

        let Some(user) = self.credential_store.find_by_username(&self.db, username).await? else {
            tracing::warn!(
                "An attempt was made to confirm email for {} which does not exist",
                username
            );
            return Ok(ConfirmEmailResponse::NotFound);
        };

        match self
            .credential_store
            .confirm_email(&self.db, &user, token)
            .await?
        {
            WriteOutcome::Rejected(errors) => {
                tracing::warn!("An attempt to confirm email for {} has failed", username);
                Ok(ConfirmEmailResponse::IdentityError(errors))
            }
            WriteOutcome::Succeeded(()) => {
                tracing::info!("Successfully confirmed email for {}", username);
                Ok(ConfirmEmailResponse::Success)
            }
        }
    }
}
