use std::collections::HashSet;

use crate::config::UserSettings;
use crate::types::identity::IdentityError;

/// Username rule check: non-empty and drawn entirely from the configured
/// allowed-character set.
pub struct UsernameValidator {
    allowed_characters: HashSet<char>,
}

impl UsernameValidator {
    pub fn new(settings: &UserSettings) -> Self {
        Self {
            allowed_characters: settings.allowed_username_characters.chars().collect(),
        }
    }

    /// Validate a username against the configured rules.
    ///
    /// Returns one violation per unmet rule; an empty list means the
    /// username is acceptable.
    pub fn validate(&self, username: &str) -> Vec<IdentityError> {
        let valid = !username.is_empty()
            && username.chars().all(|c| self.allowed_characters.contains(&c));

        if valid {
            Vec::new()
        } else {
            vec![IdentityError::invalid_username()]
        }
    }
}
