//! Federated-profile fetching seam.
//!
//! One fetcher per provider, keyed by exact provider name in the
//! SocialAuthService registry. Concrete HTTP implementations live with the
//! consuming application; this crate only defines the contract and data shape.

use async_trait::async_trait;

use crate::errors::InternalError;

/// Profile data returned by a provider for a verified access token.
#[derive(Debug, Clone)]
pub struct FetchedProfile {
    pub provider: String,
    pub provider_user_id: String,
    pub name: String,
    pub email: String,
    pub profile_picture_url: Option<String>,
}

/// Fetches a remote profile from one social provider.
#[async_trait]
pub trait SocialProfileFetcher: Send + Sync {
    /// Registry key; matched case-sensitively against login requests.
    fn provider_name(&self) -> &str;

    /// Fetch the remote profile for `provider_user_id` using the supplied
    /// access token. Provider/network failures are infrastructure errors.
    async fn fetch_profile(
        &self,
        provider_user_id: &str,
        access_token: &str,
    ) -> Result<FetchedProfile, InternalError>;
}
