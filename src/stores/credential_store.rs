use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};
use uuid::Uuid;

use crate::config::{IamSettings, LockoutSettings, UserSettings};
use crate::errors::InternalError;
use crate::services::crypto;
use crate::types::db::{role, social_media_profile, user, user_role};
use crate::types::identity::{IdentityError, NewUser, SignInCheck, WriteOutcome};
use crate::validators::{PasswordValidator, UsernameValidator};

/// CredentialStore manages user accounts, credentials, roles and lockout state.
///
/// Methods take a `ConnectionTrait` so services can run them against the plain
/// connection or compose several inside one transaction. Business-rule
/// violations come back as `WriteOutcome::Rejected` with one entry per
/// violated rule; only infrastructure faults use the error channel.
pub struct CredentialStore {
    password_pepper: String,
    token_secret: String,
    token_lifespan_minutes: i64,
    lockout: LockoutSettings,
    user_settings: UserSettings,
    username_validator: UsernameValidator,
    password_validator: PasswordValidator,
}

impl CredentialStore {
    pub fn new(settings: &IamSettings) -> Self {
        Self {
            password_pepper: settings.password_pepper.clone(),
            token_secret: settings.tokens.secret.clone(),
            token_lifespan_minutes: settings.tokens.lifespan_minutes,
            lockout: settings.lockout.clone(),
            user_settings: settings.user.clone(),
            username_validator: UsernameValidator::new(&settings.user),
            password_validator: PasswordValidator::new(settings.password.clone()),
        }
    }

    pub async fn find_by_username(
        &self,
        conn: &impl ConnectionTrait,
        username: &str,
    ) -> Result<Option<user::Model>, InternalError> {
        user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(conn)
            .await
            .map_err(|e| InternalError::database("find_by_username", e))
    }

    pub async fn find_by_id(
        &self,
        conn: &impl ConnectionTrait,
        id: &str,
    ) -> Result<Option<user::Model>, InternalError> {
        user::Entity::find_by_id(id.to_owned())
            .one(conn)
            .await
            .map_err(|e| InternalError::database("find_by_id", e))
    }

    pub async fn find_by_email(
        &self,
        conn: &impl ConnectionTrait,
        email: &str,
    ) -> Result<Option<user::Model>, InternalError> {
        user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(conn)
            .await
            .map_err(|e| InternalError::database("find_by_email", e))
    }

    pub async fn get_all_users(
        &self,
        conn: &impl ConnectionTrait,
    ) -> Result<Vec<user::Model>, InternalError> {
        user::Entity::find()
            .all(conn)
            .await
            .map_err(|e| InternalError::database("get_all_users", e))
    }

    /// Create a user, optionally with a password.
    ///
    /// Password-less creation is for federated accounts; any profiles on the
    /// `NewUser` are inserted with the new account, owner id set once here.
    /// Violations (username alphabet, duplicates, password policy) are all
    /// collected before anything is written.
    pub async fn create_user(
        &self,
        conn: &impl ConnectionTrait,
        new_user: NewUser,
        password: Option<&str>,
    ) -> Result<WriteOutcome<user::Model>, InternalError> {
        let mut violations = self.username_validator.validate(&new_user.username);

        if let Some(password) = password {
            violations.extend(self.password_validator.validate(password));
        }

        if self
            .find_by_username(conn, &new_user.username)
            .await?
            .is_some()
        {
            violations.push(IdentityError::duplicate_username(&new_user.username));
        }

        if self.user_settings.require_unique_email {
            if let Some(email) = new_user.email.as_deref() {
                if self.find_by_email(conn, email).await?.is_some() {
                    violations.push(IdentityError::duplicate_email(email));
                }
            }
        }

        if !violations.is_empty() {
            return Ok(WriteOutcome::Rejected(violations));
        }

        let password_hash = match password {
            Some(password) => Some(self.hash_password(password)?),
            None => None,
        };

        let now = Utc::now().timestamp();
        let user_id = Uuid::new_v4().to_string();

        let inserted = user::ActiveModel {
            id: Set(user_id.clone()),
            username: Set(new_user.username.clone()),
            email: Set(new_user.email.clone()),
            email_confirmed: Set(false),
            phone_number: Set(new_user.phone_number.clone()),
            password_hash: Set(password_hash),
            access_failed_count: Set(0),
            lockout_end: Set(None),
            two_factor_enabled: Set(new_user.two_factor_enabled),
            reset_token_hash: Set(None),
            reset_token_expires_at: Set(None),
            confirm_token_hash: Set(None),
            confirm_token_expires_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await;

        let user = match inserted {
            Ok(user) => user,
            // Concurrent create can slip past the pre-check; the unique
            // constraint is the authority
            Err(e) if e.to_string().contains("UNIQUE") => {
                return Ok(WriteOutcome::rejected(IdentityError::duplicate_username(
                    &new_user.username,
                )));
            }
            Err(e) => return Err(InternalError::database("insert_user", e)),
        };

        for profile in &new_user.profiles {
            social_media_profile::ActiveModel {
                id: Set(Uuid::new_v4().to_string()),
                user_id: Set(user.id.clone()),
                provider: Set(profile.provider.clone()),
                provider_user_id: Set(profile.provider_user_id.clone()),
                name: Set(profile.name.clone()),
                email: Set(profile.email.clone()),
                profile_picture_url: Set(profile.profile_picture_url.clone()),
                created_at: Set(now),
            }
            .insert(conn)
            .await
            .map_err(|e| InternalError::database("insert_social_media_profile", e))?;
        }

        Ok(WriteOutcome::Succeeded(user))
    }

    /// Verify the current password, then set the new one.
    pub async fn change_password(
        &self,
        conn: &impl ConnectionTrait,
        user: &user::Model,
        current_password: &str,
        new_password: &str,
    ) -> Result<WriteOutcome<()>, InternalError> {
        let current_matches = match user.password_hash.as_deref() {
            Some(hash) => self.verify_password(hash, current_password)?,
            None => false,
        };

        if !current_matches {
            return Ok(WriteOutcome::rejected(IdentityError::password_mismatch()));
        }

        let violations = self.password_validator.validate(new_password);
        if !violations.is_empty() {
            return Ok(WriteOutcome::Rejected(violations));
        }

        self.set_password(conn, user, new_password).await?;

        Ok(WriteOutcome::Succeeded(()))
    }

    /// Set the password after validating a previously minted reset token.
    ///
    /// The presented token is the only proof; an empty, mismatched or expired
    /// token is a single InvalidToken violation. A successful reset consumes
    /// the token.
    pub async fn reset_password(
        &self,
        conn: &impl ConnectionTrait,
        user: &user::Model,
        token: &str,
        new_password: &str,
    ) -> Result<WriteOutcome<()>, InternalError> {
        if !self.presented_token_matches(
            token,
            user.reset_token_hash.as_deref(),
            user.reset_token_expires_at,
        ) {
            return Ok(WriteOutcome::rejected(IdentityError::invalid_token()));
        }

        let violations = self.password_validator.validate(new_password);
        if !violations.is_empty() {
            return Ok(WriteOutcome::Rejected(violations));
        }

        let password_hash = self.hash_password(new_password)?;
        let now = Utc::now().timestamp();

        let mut active = user.clone().into_active_model();
        active.password_hash = Set(Some(password_hash));
        active.reset_token_hash = Set(None);
        active.reset_token_expires_at = Set(None);
        active.updated_at = Set(now);
        active
            .update(conn)
            .await
            .map_err(|e| InternalError::database("reset_password", e))?;

        Ok(WriteOutcome::Succeeded(()))
    }

    /// Mint a single-purpose, time-limited password-reset token.
    ///
    /// Only the HMAC hash and expiry are stored; the plain token exists
    /// solely in the return value. Minting again replaces any earlier token.
    pub async fn generate_reset_token(
        &self,
        conn: &impl ConnectionTrait,
        user: &user::Model,
    ) -> Result<String, InternalError> {
        let token = crypto::generate_opaque_token();
        let token_hash = crypto::hmac_sha256_token(&self.token_secret, &token);
        let now = Utc::now().timestamp();

        let mut active = user.clone().into_active_model();
        active.reset_token_hash = Set(Some(token_hash));
        active.reset_token_expires_at = Set(Some(now + self.token_lifespan_minutes * 60));
        active.updated_at = Set(now);
        active
            .update(conn)
            .await
            .map_err(|e| InternalError::database("store_reset_token", e))?;

        Ok(token)
    }

    /// Mint a single-purpose, time-limited email-confirmation token.
    pub async fn generate_confirm_token(
        &self,
        conn: &impl ConnectionTrait,
        user: &user::Model,
    ) -> Result<String, InternalError> {
        let token = crypto::generate_opaque_token();
        let token_hash = crypto::hmac_sha256_token(&self.token_secret, &token);
        let now = Utc::now().timestamp();

        let mut active = user.clone().into_active_model();
        active.confirm_token_hash = Set(Some(token_hash));
        active.confirm_token_expires_at = Set(Some(now + self.token_lifespan_minutes * 60));
        active.updated_at = Set(now);
        active
            .update(conn)
            .await
            .map_err(|e| InternalError::database("store_confirm_token", e))?;

        Ok(token)
    }

    /// Mark the email confirmed after validating a confirmation token.
    pub async fn confirm_email(
        &self,
        conn: &impl ConnectionTrait,
        user: &user::Model,
        token: &str,
    ) -> Result<WriteOutcome<()>, InternalError> {
        if !self.presented_token_matches(
            token,
            user.confirm_token_hash.as_deref(),
            user.confirm_token_expires_at,
        ) {
            return Ok(WriteOutcome::rejected(IdentityError::invalid_token()));
        }

        let mut active = user.clone().into_active_model();
        active.email_confirmed = Set(true);
        active.confirm_token_hash = Set(None);
        active.confirm_token_expires_at = Set(None);
        active.updated_at = Set(Utc::now().timestamp());
        active
            .update(conn)
            .await
            .map_err(|e| InternalError::database("confirm_email", e))?;

        Ok(WriteOutcome::Succeeded(()))
    }

    /// Verify a password and maintain lockout state.
    ///
    /// An in-force lockout short-circuits to LockedOut before the password is
    /// examined. A failed check increments the failure counter (when
    /// `lockout_on_failure`) and the attempt that reaches the threshold
    /// starts the lockout window and already reports LockedOut. A correct
    /// password still yields RequiresTwoFactor or NotAllowed before Success,
    /// and Success clears the failure counter.
    pub async fn check_password_sign_in(
        &self,
        conn: &impl ConnectionTrait,
        user: &user::Model,
        password: &str,
        lockout_on_failure: bool,
    ) -> Result<SignInCheck, InternalError> {
        let now = Utc::now().timestamp();

        if user.lockout_end.is_some_and(|end| end > now) {
            return Ok(SignInCheck::LockedOut);
        }

        let password_matches = match user.password_hash.as_deref() {
            Some(hash) => self.verify_password(hash, password)?,
            None => false,
        };

        if !password_matches {
            if lockout_on_failure {
                let failed_count = user.access_failed_count + 1;

                if failed_count >= self.lockout.max_failed_access_attempts {
                    let mut active = user.clone().into_active_model();
                    active.access_failed_count = Set(0);
                    active.lockout_end = Set(Some(now + self.lockout.lockout_minutes * 60));
                    active.updated_at = Set(now);
                    active
                        .update(conn)
                        .await
                        .map_err(|e| InternalError::database("start_lockout", e))?;

                    return Ok(SignInCheck::LockedOut);
                }

                let mut active = user.clone().into_active_model();
                active.access_failed_count = Set(failed_count);
                active.updated_at = Set(now);
                active
                    .update(conn)
                    .await
                    .map_err(|e| InternalError::database("record_failed_access", e))?;
            }

            return Ok(SignInCheck::Failed);
        }

        if user.two_factor_enabled {
            return Ok(SignInCheck::RequiresTwoFactor);
        }

        if self.user_settings.require_confirmed_email && !user.email_confirmed {
            return Ok(SignInCheck::NotAllowed);
        }

        if user.access_failed_count != 0 || user.lockout_end.is_some() {
            let mut active = user.clone().into_active_model();
            active.access_failed_count = Set(0);
            active.lockout_end = Set(None);
            active.updated_at = Set(now);
            active
                .update(conn)
                .await
                .map_err(|e| InternalError::database("reset_failed_access", e))?;
        }

        Ok(SignInCheck::Success)
    }

    pub async fn role_exists(
        &self,
        conn: &impl ConnectionTrait,
        role_name: &str,
    ) -> Result<bool, InternalError> {
        let role = role::Entity::find()
            .filter(role::Column::Name.eq(role_name))
            .one(conn)
            .await
            .map_err(|e| InternalError::database("role_exists", e))?;

        Ok(role.is_some())
    }

    pub async fn create_role(
        &self,
        conn: &impl ConnectionTrait,
        role_name: &str,
    ) -> Result<WriteOutcome<role::Model>, InternalError> {
        if self.role_exists(conn, role_name).await? {
            return Ok(WriteOutcome::rejected(IdentityError::duplicate_role_name(
                role_name,
            )));
        }

        let role = role::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            name: Set(role_name.to_owned()),
            created_at: Set(Utc::now().timestamp()),
        }
        .insert(conn)
        .await
        .map_err(|e| InternalError::database("insert_role", e))?;

        Ok(WriteOutcome::Succeeded(role))
    }

    pub async fn add_to_role(
        &self,
        conn: &impl ConnectionTrait,
        user: &user::Model,
        role_name: &str,
    ) -> Result<WriteOutcome<()>, InternalError> {
        let role = role::Entity::find()
            .filter(role::Column::Name.eq(role_name))
            .one(conn)
            .await
            .map_err(|e| InternalError::database("find_role_by_name", e))?;

        let Some(role) = role else {
            return Ok(WriteOutcome::rejected(IdentityError::invalid_role_name(
                role_name,
            )));
        };

        let existing = user_role::Entity::find_by_id((user.id.clone(), role.id.clone()))
            .one(conn)
            .await
            .map_err(|e| InternalError::database("find_user_role", e))?;

        if existing.is_some() {
            return Ok(WriteOutcome::rejected(IdentityError::user_already_in_role(
                role_name,
            )));
        }

        user_role::ActiveModel {
            user_id: Set(user.id.clone()),
            role_id: Set(role.id),
        }
        .insert(conn)
        .await
        .map_err(|e| InternalError::database("insert_user_role", e))?;

        Ok(WriteOutcome::Succeeded(()))
    }

    /// Role names for a user, in store order.
    pub async fn get_roles(
        &self,
        conn: &impl ConnectionTrait,
        user: &user::Model,
    ) -> Result<Vec<String>, InternalError> {
        let links = user_role::Entity::find()
            .filter(user_role::Column::UserId.eq(&user.id))
            .all(conn)
            .await
            .map_err(|e| InternalError::database("get_user_roles", e))?;

        let mut roles = Vec::with_capacity(links.len());
        for link in links {
            let role = role::Entity::find_by_id(link.role_id)
                .one(conn)
                .await
                .map_err(|e| InternalError::database("get_role_by_id", e))?;
            if let Some(role) = role {
                roles.push(role.name);
            }
        }

        Ok(roles)
    }

    /// Administrative deletion; never called by the core services.
    pub async fn delete_user(
        &self,
        conn: &impl ConnectionTrait,
        user: &user::Model,
    ) -> Result<(), InternalError> {
        user::Entity::delete_by_id(user.id.clone())
            .exec(conn)
            .await
            .map_err(|e| InternalError::database("delete_user", e))?;

        Ok(())
    }

    fn argon2(&self) -> Result<Argon2<'_>, InternalError> {
        Argon2::new_with_secret(
            self.password_pepper.as_bytes(),
            Algorithm::Argon2id,
            Version::V0x13,
            Params::default(),
        )
        .map_err(|e| InternalError::crypto("argon2_init", e.to_string()))
    }

    fn hash_password(&self, password: &str) -> Result<String, InternalError> {
        let salt = SaltString::generate(&mut rand_core::OsRng);
        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| InternalError::crypto("hash_password", e.to_string()))?;

        Ok(hash.to_string())
    }

    fn verify_password(
        &self,
        stored_hash: &str,
        password: &str,
    ) -> Result<bool, InternalError> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| InternalError::crypto("parse_password_hash", e.to_string()))?;

        match self.argon2()?.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(InternalError::crypto("verify_password", e.to_string())),
        }
    }

    async fn set_password(
        &self,
        conn: &impl ConnectionTrait,
        user: &user::Model,
        new_password: &str,
    ) -> Result<(), InternalError> {
        let password_hash = self.hash_password(new_password)?;

        let mut active = user.clone().into_active_model();
        active.password_hash = Set(Some(password_hash));
        active.updated_at = Set(Utc::now().timestamp());
        active
            .update(conn)
            .await
            .map_err(|e| InternalError::database("set_password", e))?;

        Ok(())
    }

    fn presented_token_matches(
        &self,
        presented: &str,
        stored_hash: Option<&str>,
        expires_at: Option<i64>,
    ) -> bool {
        let (Some(stored_hash), Some(expires_at)) = (stored_hash, expires_at) else {
            return false;
        };

        if presented.is_empty() || expires_at < Utc::now().timestamp() {
            return false;
        }

        crypto::hmac_sha256_token(&self.token_secret, presented) == stored_hash
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("password_pepper", &"<redacted>")
            .field("token_secret", &"<redacted>")
            .field("token_lifespan_minutes", &self.token_lifespan_minutes)
            .field("lockout", &self.lockout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, DatabaseConnection};

    const VALID_PASSWORD: &str = "P@sSw0rd1!";
    const OTHER_PASSWORD: &str = "P@sSw0rd2!";

    async fn setup_test_db() -> (DatabaseConnection, CredentialStore) {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let settings = IamSettings::default();
        let store = CredentialStore::new(&settings);

        (db, store)
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: Some(format!("{username}@example.com")),
            ..NewUser::default()
        }
    }

    async fn create_user(
        db: &DatabaseConnection,
        store: &CredentialStore,
        username: &str,
    ) -> user::Model {
        match store
            .create_user(db, new_user(username), Some(VALID_PASSWORD))
            .await
            .expect("create_user failed")
        {
            WriteOutcome::Succeeded(user) => user,
            WriteOutcome::Rejected(errors) => panic!("unexpected rejection: {errors:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_user_hashes_password() {
        let (db, store) = setup_test_db().await;

        let user = create_user(&db, &store, "alice").await;

        let hash = user.password_hash.expect("password hash missing");
        assert_ne!(hash, VALID_PASSWORD);
        assert!(hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn test_create_user_without_password_stores_no_hash() {
        let (db, store) = setup_test_db().await;

        let outcome = store
            .create_user(&db, new_user("federated"), None)
            .await
            .expect("create_user failed");

        match outcome {
            WriteOutcome::Succeeded(user) => assert!(user.password_hash.is_none()),
            WriteOutcome::Rejected(errors) => panic!("unexpected rejection: {errors:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_username() {
        let (db, store) = setup_test_db().await;

        create_user(&db, &store, "duplicate").await;

        let mut second = new_user("duplicate");
        second.email = Some("other@example.com".to_string());
        let outcome = store
            .create_user(&db, second, Some(VALID_PASSWORD))
            .await
            .expect("create_user failed");

        match outcome {
            WriteOutcome::Rejected(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].code, "DuplicateUserName");
            }
            WriteOutcome::Succeeded(_) => panic!("expected DuplicateUserName rejection"),
        }
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_email_when_unique_email_required() {
        let (db, store) = setup_test_db().await;

        create_user(&db, &store, "first").await;

        let mut second = new_user("second");
        second.email = Some("first@example.com".to_string());
        let outcome = store
            .create_user(&db, second, Some(VALID_PASSWORD))
            .await
            .expect("create_user failed");

        match outcome {
            WriteOutcome::Rejected(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].code, "DuplicateEmail");
            }
            WriteOutcome::Succeeded(_) => panic!("expected DuplicateEmail rejection"),
        }
    }

    #[tokio::test]
    async fn test_create_user_allows_duplicate_email_when_uniqueness_disabled() {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let mut settings = IamSettings::default();
        settings.user.require_unique_email = false;
        let store = CredentialStore::new(&settings);

        create_user(&db, &store, "first").await;

        let mut second = new_user("second");
        second.email = Some("first@example.com".to_string());
        let outcome = store
            .create_user(&db, second, Some(VALID_PASSWORD))
            .await
            .expect("create_user failed");

        assert!(outcome.is_succeeded());
    }

    #[tokio::test]
    async fn test_create_user_rejects_invalid_username() {
        let (db, store) = setup_test_db().await;

        let outcome = store
            .create_user(&db, new_user("no spaces allowed"), Some(VALID_PASSWORD))
            .await
            .expect("create_user failed");

        match outcome {
            WriteOutcome::Rejected(errors) => {
                assert_eq!(errors[0].code, "InvalidUserName");
            }
            WriteOutcome::Succeeded(_) => panic!("expected InvalidUserName rejection"),
        }
    }

    #[tokio::test]
    async fn test_create_user_reports_each_password_violation() {
        let (db, store) = setup_test_db().await;

        let cases = [
            ("aB(1", "PasswordTooShort"),
            ("aB(def", "PasswordRequiresDigit"),
            ("a2345@", "PasswordRequiresUpper"),
            ("A2345@", "PasswordRequiresLower"),
            ("aB3456", "PasswordRequiresNonAlphanumeric"),
        ];

        for (i, (password, expected_code)) in cases.iter().enumerate() {
            let outcome = store
                .create_user(&db, new_user(&format!("user{i}")), Some(password))
                .await
                .expect("create_user failed");

            match outcome {
                WriteOutcome::Rejected(errors) => {
                    assert_eq!(errors.len(), 1, "{password}");
                    assert_eq!(errors[0].code, *expected_code, "{password}");
                }
                WriteOutcome::Succeeded(_) => panic!("expected rejection for {password}"),
            }
        }
    }

    #[tokio::test]
    async fn test_create_user_inserts_attached_profiles() {
        let (db, store) = setup_test_db().await;

        let mut input = new_user("federated");
        input.profiles.push(crate::types::identity::NewSocialMediaProfile {
            provider: "Facebook".to_string(),
            provider_user_id: "fb-123".to_string(),
            name: "Fede Rated".to_string(),
            email: "federated@example.com".to_string(),
            profile_picture_url: Some("https://example.com/p.jpg".to_string()),
        });

        let outcome = store.create_user(&db, input, None).await.expect("create_user failed");
        let user = match outcome {
            WriteOutcome::Succeeded(user) => user,
            WriteOutcome::Rejected(errors) => panic!("unexpected rejection: {errors:?}"),
        };

        let profiles = social_media_profile::Entity::find()
            .filter(social_media_profile::Column::UserId.eq(&user.id))
            .all(&db)
            .await
            .expect("Failed to query profiles");

        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].provider, "Facebook");
        assert_eq!(profiles[0].provider_user_id, "fb-123");
        assert_eq!(profiles[0].user_id, user.id);
    }

    #[tokio::test]
    async fn test_check_password_sign_in_succeeds_with_correct_password() {
        let (db, store) = setup_test_db().await;
        let user = create_user(&db, &store, "alice").await;

        let check = store
            .check_password_sign_in(&db, &user, VALID_PASSWORD, true)
            .await
            .expect("sign-in check failed");

        assert_eq!(check, SignInCheck::Success);
    }

    #[tokio::test]
    async fn test_check_password_sign_in_fails_with_wrong_password() {
        let (db, store) = setup_test_db().await;
        let user = create_user(&db, &store, "alice").await;

        let check = store
            .check_password_sign_in(&db, &user, OTHER_PASSWORD, true)
            .await
            .expect("sign-in check failed");

        assert_eq!(check, SignInCheck::Failed);
    }

    #[tokio::test]
    async fn test_failed_attempts_accumulate_into_lockout() {
        let (db, store) = setup_test_db().await;
        let mut user = create_user(&db, &store, "alice").await;

        for _ in 0..4 {
            let check = store
                .check_password_sign_in(&db, &user, OTHER_PASSWORD, true)
                .await
                .expect("sign-in check failed");
            assert_eq!(check, SignInCheck::Failed);

            user = store
                .find_by_username(&db, "alice")
                .await
                .expect("lookup failed")
                .expect("user vanished");
        }

        // Fifth failure reaches the threshold and starts the lockout window
        let check = store
            .check_password_sign_in(&db, &user, OTHER_PASSWORD, true)
            .await
            .expect("sign-in check failed");
        assert_eq!(check, SignInCheck::LockedOut);

        // While locked, even the correct password reports LockedOut
        let user = store
            .find_by_username(&db, "alice")
            .await
            .expect("lookup failed")
            .expect("user vanished");
        let check = store
            .check_password_sign_in(&db, &user, VALID_PASSWORD, true)
            .await
            .expect("sign-in check failed");
        assert_eq!(check, SignInCheck::LockedOut);
    }

    #[tokio::test]
    async fn test_success_resets_failure_counter() {
        let (db, store) = setup_test_db().await;
        let user = create_user(&db, &store, "alice").await;

        store
            .check_password_sign_in(&db, &user, OTHER_PASSWORD, true)
            .await
            .expect("sign-in check failed");

        let user = store
            .find_by_username(&db, "alice")
            .await
            .expect("lookup failed")
            .expect("user vanished");
        assert_eq!(user.access_failed_count, 1);

        store
            .check_password_sign_in(&db, &user, VALID_PASSWORD, true)
            .await
            .expect("sign-in check failed");

        let user = store
            .find_by_username(&db, "alice")
            .await
            .expect("lookup failed")
            .expect("user vanished");
        assert_eq!(user.access_failed_count, 0);
    }

    #[tokio::test]
    async fn test_two_factor_takes_precedence_over_success() {
        let (db, store) = setup_test_db().await;

        let mut input = new_user("mfa-user");
        input.two_factor_enabled = true;
        let user = match store
            .create_user(&db, input, Some(VALID_PASSWORD))
            .await
            .expect("create_user failed")
        {
            WriteOutcome::Succeeded(user) => user,
            WriteOutcome::Rejected(errors) => panic!("unexpected rejection: {errors:?}"),
        };

        let check = store
            .check_password_sign_in(&db, &user, VALID_PASSWORD, true)
            .await
            .expect("sign-in check failed");

        assert_eq!(check, SignInCheck::RequiresTwoFactor);
    }

    #[tokio::test]
    async fn test_unconfirmed_email_is_not_allowed_when_policy_enabled() {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let mut settings = IamSettings::default();
        settings.user.require_confirmed_email = true;
        let store = CredentialStore::new(&settings);

        let user = create_user(&db, &store, "unconfirmed").await;

        let check = store
            .check_password_sign_in(&db, &user, VALID_PASSWORD, true)
            .await
            .expect("sign-in check failed");
        assert_eq!(check, SignInCheck::NotAllowed);

        // Wrong password on the same account is still a plain failure
        let check = store
            .check_password_sign_in(&db, &user, OTHER_PASSWORD, true)
            .await
            .expect("sign-in check failed");
        assert_eq!(check, SignInCheck::Failed);
    }

    #[tokio::test]
    async fn test_change_password_rejects_wrong_current_password() {
        let (db, store) = setup_test_db().await;
        let user = create_user(&db, &store, "alice").await;

        let outcome = store
            .change_password(&db, &user, OTHER_PASSWORD, "N3w!pass")
            .await
            .expect("change_password failed");

        match outcome {
            WriteOutcome::Rejected(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].code, "PasswordMismatch");
            }
            WriteOutcome::Succeeded(_) => panic!("expected PasswordMismatch rejection"),
        }
    }

    #[tokio::test]
    async fn test_change_password_sets_new_credential() {
        let (db, store) = setup_test_db().await;
        let user = create_user(&db, &store, "alice").await;

        let outcome = store
            .change_password(&db, &user, VALID_PASSWORD, OTHER_PASSWORD)
            .await
            .expect("change_password failed");
        assert!(outcome.is_succeeded());

        let user = store
            .find_by_username(&db, "alice")
            .await
            .expect("lookup failed")
            .expect("user vanished");

        let check = store
            .check_password_sign_in(&db, &user, OTHER_PASSWORD, true)
            .await
            .expect("sign-in check failed");
        assert_eq!(check, SignInCheck::Success);
    }

    #[tokio::test]
    async fn test_reset_token_round_trip() {
        let (db, store) = setup_test_db().await;
        let user = create_user(&db, &store, "alice").await;

        let token = store
            .generate_reset_token(&db, &user)
            .await
            .expect("token generation failed");
        assert!(!token.is_empty());

        let user = store
            .find_by_username(&db, "alice")
            .await
            .expect("lookup failed")
            .expect("user vanished");

        // Only the hash is stored
        assert_ne!(user.reset_token_hash.as_deref(), Some(token.as_str()));

        let outcome = store
            .reset_password(&db, &user, &token, OTHER_PASSWORD)
            .await
            .expect("reset_password failed");
        assert!(outcome.is_succeeded());

        // Token is consumed
        let user = store
            .find_by_username(&db, "alice")
            .await
            .expect("lookup failed")
            .expect("user vanished");
        assert!(user.reset_token_hash.is_none());

        let check = store
            .check_password_sign_in(&db, &user, OTHER_PASSWORD, true)
            .await
            .expect("sign-in check failed");
        assert_eq!(check, SignInCheck::Success);
    }

    #[tokio::test]
    async fn test_reset_password_rejects_bad_tokens() {
        let (db, store) = setup_test_db().await;
        let user = create_user(&db, &store, "alice").await;

        store
            .generate_reset_token(&db, &user)
            .await
            .expect("token generation failed");

        let user = store
            .find_by_username(&db, "alice")
            .await
            .expect("lookup failed")
            .expect("user vanished");

        for bad_token in ["", "abc123"] {
            let outcome = store
                .reset_password(&db, &user, bad_token, OTHER_PASSWORD)
                .await
                .expect("reset_password failed");

            match outcome {
                WriteOutcome::Rejected(errors) => {
                    assert_eq!(errors.len(), 1, "token {bad_token:?}");
                    assert_eq!(errors[0].code, "InvalidToken", "token {bad_token:?}");
                }
                WriteOutcome::Succeeded(_) => panic!("expected InvalidToken for {bad_token:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_reset_password_rejects_token_when_none_was_minted() {
        let (db, store) = setup_test_db().await;
        let user = create_user(&db, &store, "alice").await;

        let outcome = store
            .reset_password(&db, &user, "anything", OTHER_PASSWORD)
            .await
            .expect("reset_password failed");

        match outcome {
            WriteOutcome::Rejected(errors) => assert_eq!(errors[0].code, "InvalidToken"),
            WriteOutcome::Succeeded(_) => panic!("expected InvalidToken rejection"),
        }
    }

    #[tokio::test]
    async fn test_confirm_email_round_trip() {
        let (db, store) = setup_test_db().await;
        let user = create_user(&db, &store, "alice").await;
        assert!(!user.email_confirmed);

        let token = store
            .generate_confirm_token(&db, &user)
            .await
            .expect("token generation failed");

        let user = store
            .find_by_username(&db, "alice")
            .await
            .expect("lookup failed")
            .expect("user vanished");

        let outcome = store
            .confirm_email(&db, &user, &token)
            .await
            .expect("confirm_email failed");
        assert!(outcome.is_succeeded());

        let user = store
            .find_by_username(&db, "alice")
            .await
            .expect("lookup failed")
            .expect("user vanished");
        assert!(user.email_confirmed);
        assert!(user.confirm_token_hash.is_none());
    }

    #[tokio::test]
    async fn test_confirm_email_rejects_wrong_token() {
        let (db, store) = setup_test_db().await;
        let user = create_user(&db, &store, "alice").await;

        store
            .generate_confirm_token(&db, &user)
            .await
            .expect("token generation failed");

        let user = store
            .find_by_username(&db, "alice")
            .await
            .expect("lookup failed")
            .expect("user vanished");

        let outcome = store
            .confirm_email(&db, &user, "not-the-token")
            .await
            .expect("confirm_email failed");

        match outcome {
            WriteOutcome::Rejected(errors) => assert_eq!(errors[0].code, "InvalidToken"),
            WriteOutcome::Succeeded(_) => panic!("expected InvalidToken rejection"),
        }
    }

    #[tokio::test]
    async fn test_role_membership_round_trip() {
        let (db, store) = setup_test_db().await;
        let user = create_user(&db, &store, "alice").await;

        assert!(!store.role_exists(&db, "admin").await.expect("role_exists failed"));

        let outcome = store.create_role(&db, "admin").await.expect("create_role failed");
        assert!(outcome.is_succeeded());
        assert!(store.role_exists(&db, "admin").await.expect("role_exists failed"));

        let outcome = store
            .add_to_role(&db, &user, "admin")
            .await
            .expect("add_to_role failed");
        assert!(outcome.is_succeeded());

        let roles = store.get_roles(&db, &user).await.expect("get_roles failed");
        assert_eq!(roles, vec!["admin".to_string()]);

        // Adding twice is a violation
        let outcome = store
            .add_to_role(&db, &user, "admin")
            .await
            .expect("add_to_role failed");
        match outcome {
            WriteOutcome::Rejected(errors) => {
                assert_eq!(errors[0].code, "UserAlreadyInRole");
            }
            WriteOutcome::Succeeded(_) => panic!("expected UserAlreadyInRole rejection"),
        }
    }

    #[tokio::test]
    async fn test_add_to_role_rejects_unknown_role() {
        let (db, store) = setup_test_db().await;
        let user = create_user(&db, &store, "alice").await;

        let outcome = store
            .add_to_role(&db, &user, "missing")
            .await
            .expect("add_to_role failed");

        match outcome {
            WriteOutcome::Rejected(errors) => assert_eq!(errors[0].code, "InvalidRoleName"),
            WriteOutcome::Succeeded(_) => panic!("expected InvalidRoleName rejection"),
        }
    }

    #[tokio::test]
    async fn test_debug_redacts_secrets() {
        let (_db, store) = setup_test_db().await;

        let output = format!("{store:?}");
        assert!(output.contains("<redacted>"));
        assert!(!output.contains(&store.password_pepper));
        assert!(!output.contains(&store.token_secret));
    }
}
