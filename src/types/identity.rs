//! Identity outcome currency shared by the credential store and the services.

/// A single business-rule violation reported by a store write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityError {
    /// Stable machine-readable code
    pub code: String,
    /// Human-readable description
    pub description: String,
}

impl IdentityError {
    pub fn new(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
        }
    }

    /// Create a DuplicateUserName violation
    pub fn duplicate_username(username: &str) -> Self {
        Self::new(
            "DuplicateUserName",
            format!("Username '{username}' is already taken."),
        )
    }

    /// Create a DuplicateEmail violation
    pub fn duplicate_email(email: &str) -> Self {
        Self::new("DuplicateEmail", format!("Email '{email}' is already taken."))
    }

    /// Create an InvalidUserName violation
    pub fn invalid_username() -> Self {
        Self::new(
            "InvalidUserName",
            "Username is empty or contains disallowed characters.",
        )
    }

    /// Create a PasswordTooShort violation
    pub fn password_too_short(required_length: usize) -> Self {
        Self::new(
            "PasswordTooShort",
            format!("Passwords must be at least {required_length} characters."),
        )
    }

    /// Create a PasswordRequiresUniqueChars violation
    pub fn password_requires_unique_chars(required_unique_chars: usize) -> Self {
        Self::new(
            "PasswordRequiresUniqueChars",
            format!("Passwords must use at least {required_unique_chars} different characters."),
        )
    }

    /// Create a PasswordRequiresDigit violation
    pub fn password_requires_digit() -> Self {
        Self::new(
            "PasswordRequiresDigit",
            "Passwords must have at least one digit ('0'-'9').",
        )
    }

    /// Create a PasswordRequiresUpper violation
    pub fn password_requires_upper() -> Self {
        Self::new(
            "PasswordRequiresUpper",
            "Passwords must have at least one uppercase letter ('A'-'Z').",
        )
    }

    /// Create a PasswordRequiresLower violation
    pub fn password_requires_lower() -> Self {
        Self::new(
            "PasswordRequiresLower",
            "Passwords must have at least one lowercase letter ('a'-'z').",
        )
    }

    /// Create a PasswordRequiresNonAlphanumeric violation
    pub fn password_requires_non_alphanumeric() -> Self {
        Self::new(
            "PasswordRequiresNonAlphanumeric",
            "Passwords must have at least one non-alphanumeric character.",
        )
    }

    /// Create a PasswordMismatch violation
    pub fn password_mismatch() -> Self {
        Self::new("PasswordMismatch", "Incorrect password.")
    }

    /// Create an InvalidToken violation
    pub fn invalid_token() -> Self {
        Self::new("InvalidToken", "Invalid token.")
    }

    /// Create an InvalidRoleName violation
    pub fn invalid_role_name(role_name: &str) -> Self {
        Self::new(
            "InvalidRoleName",
            format!("Role '{role_name}' does not exist."),
        )
    }

    /// Create a UserAlreadyInRole violation
    pub fn user_already_in_role(role_name: &str) -> Self {
        Self::new(
            "UserAlreadyInRole",
            format!("User is already in role '{role_name}'."),
        )
    }

    /// Create a DuplicateRoleName violation
    pub fn duplicate_role_name(role_name: &str) -> Self {
        Self::new(
            "DuplicateRoleName",
            format!("Role name '{role_name}' is already taken."),
        )
    }
}

/// Outcome of a credential-store write.
///
/// Business-rule violations are data, not errors: infrastructure failures
/// travel in the surrounding `Result` while rejections carry the full list
/// of violated rules.
#[derive(Debug)]
pub enum WriteOutcome<T> {
    Succeeded(T),
    Rejected(Vec<IdentityError>),
}

impl<T> WriteOutcome<T> {
    pub fn rejected(error: IdentityError) -> Self {
        WriteOutcome::Rejected(vec![error])
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, WriteOutcome::Succeeded(_))
    }
}

/// Result of a password sign-in check, including lockout bookkeeping.
///
/// Mutually exclusive; precedence is lockout, then two-factor, then
/// sign-in-not-allowed, then plain failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInCheck {
    Success,
    Failed,
    LockedOut,
    RequiresTwoFactor,
    NotAllowed,
}

/// Input to user creation.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub two_factor_enabled: bool,

    /// Federated profiles created together with the account.
    pub profiles: Vec<NewSocialMediaProfile>,
}

/// A federated profile to attach at account creation.
#[derive(Debug, Clone)]
pub struct NewSocialMediaProfile {
    pub provider: String,
    pub provider_user_id: String,
    pub name: String,
    pub email: String,
    pub profile_picture_url: Option<String>,
}
