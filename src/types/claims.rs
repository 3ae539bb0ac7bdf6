use serde::{Deserialize, Serialize};

/// Claim set carried by issued access tokens.
///
/// Optional claims are omitted from the encoded token entirely rather than
/// serialized as null/empty, so decoders see exactly the claims that were set.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (username)
    pub sub: String,

    /// Stable user id
    pub uid: String,

    pub iss: String,
    pub aud: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// One entry per role, in store order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}
