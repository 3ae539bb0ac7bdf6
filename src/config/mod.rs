use serde::Deserialize;
use uuid::Uuid;

/// Root configuration for the IAM core.
///
/// Deserialized from whatever structured settings source the host application
/// uses, then injected as an immutable value at construction time. Services
/// and stores never read configuration from global state.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IamSettings {
    pub connection_string: String,

    /// Secret mixed into Argon2 password hashing as a keyed parameter.
    pub password_pepper: String,

    pub jwt: JwtTokenSettings,
    pub password: PasswordSettings,
    pub user: UserSettings,
    pub lockout: LockoutSettings,
    pub tokens: TokenSettings,
}

impl Default for IamSettings {
    fn default() -> Self {
        Self {
            connection_string: String::new(),
            password_pepper: Uuid::new_v4().to_string(),
            jwt: JwtTokenSettings::default(),
            password: PasswordSettings::default(),
            user: UserSettings::default(),
            lockout: LockoutSettings::default(),
            tokens: TokenSettings::default(),
        }
    }
}

/// Settings for issued access tokens.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JwtTokenSettings {
    pub issuer: String,
    pub audience: String,
    pub key: String,
    pub lifespan_in_days: i64,
}

impl Default for JwtTokenSettings {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            audience: String::new(),
            key: Uuid::new_v4().to_string(),
            lifespan_in_days: 1,
        }
    }
}

/// Password policy enforced by the credential store on every password set.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PasswordSettings {
    pub required_length: usize,
    pub required_unique_chars: usize,
    pub require_digit: bool,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_non_alphanumeric: bool,
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self {
            required_length: 6,
            required_unique_chars: 1,
            require_digit: true,
            require_uppercase: true,
            require_lowercase: true,
            require_non_alphanumeric: true,
        }
    }
}

/// Account-level policy settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub allowed_username_characters: String,
    pub require_unique_email: bool,

    /// When set, accounts with an unconfirmed email cannot sign in
    /// (login reports NotAllowed until the email is confirmed).
    pub require_confirmed_email: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            allowed_username_characters:
                "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-._@+".to_string(),
            require_unique_email: true,
            require_confirmed_email: false,
        }
    }
}

/// Lockout thresholds applied by the sign-in check.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LockoutSettings {
    pub max_failed_access_attempts: i32,
    pub lockout_minutes: i64,
}

impl Default for LockoutSettings {
    fn default() -> Self {
        Self {
            max_failed_access_attempts: 5,
            lockout_minutes: 5,
        }
    }
}

/// Settings for password-reset and email-confirmation tokens.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    /// HMAC key for hashing minted tokens before storage.
    pub secret: String,
    pub lifespan_minutes: i64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            secret: Uuid::new_v4().to_string(),
            lifespan_minutes: 24 * 60,
        }
    }
}
