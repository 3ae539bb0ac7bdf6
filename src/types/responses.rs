//! Closed response types for the public service operations.
//!
//! Every business outcome is a variant; callers match exhaustively instead of
//! inspecting error types. Infrastructure failures never appear here — they
//! propagate as `InternalError`.

use crate::types::db::user;
use crate::types::identity::IdentityError;

/// Outcome of a password login attempt.
#[derive(Debug)]
pub enum LoginResponse {
    /// No account with the supplied username
    NotFound,
    /// Account is locked out; correctness of the password is irrelevant
    LockedOut,
    /// Password verified but a second factor is required
    RequiresTwoFactor,
    /// Account is not currently allowed to sign in (e.g. unconfirmed email)
    NotAllowed,
    /// Wrong password
    Failure,
    Success {
        user: user::Model,
        access_token: String,
    },
}

/// Outcome of a password change or token-based password reset.
#[derive(Debug)]
pub enum ChangePasswordResponse {
    NotFound,
    IdentityError(Vec<IdentityError>),
    Success,
}

/// Outcome of minting a password-reset token.
#[derive(Debug)]
pub enum PasswordResetTokenResponse {
    NotFound,
    Success { token: String },
}

/// Outcome of an email confirmation.
#[derive(Debug)]
pub enum ConfirmEmailResponse {
    NotFound,
    IdentityError(Vec<IdentityError>),
    Success,
}

/// Outcome of a registration.
#[derive(Debug)]
pub enum RegisterResponse {
    /// The requested role does not exist; nothing was persisted
    NotFound,
    IdentityError(Vec<IdentityError>),
    Success { user: user::Model },
}

/// Outcome of a federated login.
#[derive(Debug)]
pub enum SocialLoginResponse {
    /// No profile fetcher is registered under the requested provider name
    ProviderUnsupported,
    Success {
        user: user::Model,
        access_token: String,
    },
}
