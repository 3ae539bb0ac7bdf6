use std::fmt;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::config::JwtTokenSettings;
use crate::errors::InternalError;
use crate::types::claims::AccessClaims;
use crate::types::db::user;

/// Issues signed, time-limited access tokens for authenticated users.
pub struct TokenService {
    settings: JwtTokenSettings,
}

impl TokenService {
    pub fn new(settings: JwtTokenSettings) -> Self {
        Self { settings }
    }

    /// Build and sign an access token for a user.
    ///
    /// Claim set is deterministic: subject is the username, `uid` the stable
    /// user id, issuer/audience/lifespan from settings. Email and phone are
    /// included only when present and non-empty; one `roles` entry per role,
    /// in the order the caller fetched them from the store.
    pub fn generate_access_token(
        &self,
        user: &user::Model,
        roles: &[String],
    ) -> Result<String, InternalError> {
        let now = Utc::now().timestamp();

        let claims = AccessClaims {
            sub: user.username.clone(),
            uid: user.id.clone(),
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
            iat: now,
            exp: now + self.settings.lifespan_in_days * 24 * 60 * 60,
            email: user.email.clone().filter(|e| !e.is_empty()),
            phone: user.phone_number.clone().filter(|p| !p.is_empty()),
            roles: roles.to_vec(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.settings.key.as_bytes()),
        )?;

        Ok(token)
    }

    /// Decode and validate a previously issued access token.
    pub fn decode_access_token(&self, token: &str) -> Result<AccessClaims, InternalError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.settings.issuer]);
        validation.set_audience(&[&self.settings.audience]);

        let token_data = decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.settings.key.as_bytes()),
            &validation,
        )?;

        Ok(token_data.claims)
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.settings.issuer)
            .field("audience", &self.settings.audience)
            .field("key", &"<redacted>")
            .field("lifespan_in_days", &self.settings.lifespan_in_days)
            .finish()
    }
}
