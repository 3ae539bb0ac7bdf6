use thiserror::Error;

/// Infrastructure error type for store and service operations.
///
/// Business-rule outcomes never appear here; they are modeled as closed
/// response variants. Anything in this enum is a fault of the deployment
/// (database unreachable, misconfigured keys, provider outage) and is
/// propagated to the caller untranslated.
#[derive(Error, Debug)]
pub enum InternalError {
    #[error("Database error: {operation} failed: {source}")]
    Database {
        operation: &'static str,
        source: sea_orm::DbErr,
    },

    #[error("Crypto error: {operation} failed: {message}")]
    Crypto {
        operation: &'static str,
        message: String,
    },

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Profile fetch from {provider} failed: {message}")]
    ProfileFetch { provider: String, message: String },

    #[error("Federated account registration failed: {message}")]
    FederatedRegistration { message: String },
}

impl InternalError {
    pub fn database(operation: &'static str, source: sea_orm::DbErr) -> Self {
        InternalError::Database { operation, source }
    }

    pub fn crypto(operation: &'static str, message: impl Into<String>) -> Self {
        InternalError::Crypto {
            operation,
            message: message.into(),
        }
    }
}
