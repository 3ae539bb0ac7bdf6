use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::errors::InternalError;
use crate::services::{TokenService, UserService};
use crate::social::SocialProfileFetcher;
use crate::stores::CredentialStore;
use crate::types::identity::{NewSocialMediaProfile, NewUser};
use crate::types::responses::{RegisterResponse, SocialLoginResponse};

/// Federated login over a registry of per-provider profile fetchers.
///
/// The profile email is the account-linking key: a fetched profile whose
/// email matches an existing local account logs into that account with no
/// password check (the provider already verified the access token). Unknown
/// emails get a fresh password-less account with the profile attached.
pub struct SocialAuthService {
    db: DatabaseConnection,
    user_service: Arc<UserService>,
    credential_store: Arc<CredentialStore>,
    token_service: Arc<TokenService>,
    profile_fetchers: HashMap<String, Arc<dyn SocialProfileFetcher>>,
}

impl SocialAuthService {
    pub fn new(
        db: DatabaseConnection,
        user_service: Arc<UserService>,
        credential_store: Arc<CredentialStore>,
        token_service: Arc<TokenService>,
        fetchers: Vec<Arc<dyn SocialProfileFetcher>>,
    ) -> Self {
        let profile_fetchers = fetchers
            .into_iter()
            .map(|f| (f.provider_name().to_owned(), f))
            .collect();

        Self {
            db,
            user_service,
            credential_store,
            token_service,
            profile_fetchers,
        }
    }

    /// Log in via an external provider, creating a local account if needed.
    ///
    /// Provider names match the registry case-sensitively; an unknown name
    /// returns ProviderUnsupported without any outbound call. Fetch failures
    /// and registration failures for the new local account are
    /// infrastructure errors.
    pub async fn external_login(
        &self,
        provider: &str,
        provider_user_id: &str,
        provider_access_token: &str,
        default_role: &str,
    ) -> Result<SocialLoginResponse, InternalError> {
        let Some(fetcher) = self.profile_fetchers.get(provider) else {
            tracing::warn!(
                "External login requested for unsupported provider {}",
                provider
            );
            return Ok(SocialLoginResponse::ProviderUnsupported);
        };

        let profile = fetcher
            .fetch_profile(provider_user_id, provider_access_token)
            .await?;

        tracing::info!(
            "Fetched {} profile for external login of {}",
            provider,
            profile.email
        );

        let existing = self.user_service.get_user_by_email(&profile.email).await?;

        let user = match existing {
            Some(user) => user,
            None => {
                let new_user = NewUser {
                    username: profile.email.clone(),
                    email: Some(profile.email.clone()),
                    profiles: vec![NewSocialMediaProfile {
                        provider: provider.to_owned(),
                        provider_user_id: profile.provider_user_id.clone(),
                        name: profile.name.clone(),
                        email: profile.email.clone(),
                        profile_picture_url: profile.profile_picture_url.clone(),
                    }],
                    ..NewUser::default()
                };

                match self
                    .user_service
                    .register(new_user, default_role, None)
                    .await?
                {
                    RegisterResponse::Success { user } => user,
                    RegisterResponse::NotFound => {
                        return Err(InternalError::FederatedRegistration {
                            message: format!("default role '{default_role}' does not exist"),
                        });
                    }
                    RegisterResponse::IdentityError(errors) => {
                        return Err(InternalError::FederatedRegistration {
                            message: format!("account creation rejected: {errors:?}"),
                        });
                    }
                }
            }
        };

        let roles = self.credential_store.get_roles(&self.db, &user).await?;
        let access_token = self.token_service.generate_access_token(&user, &roles)?;

        Ok(SocialLoginResponse::Success { user, access_token })
    }
}
