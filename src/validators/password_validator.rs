use std::collections::HashSet;

use crate::config::PasswordSettings;
use crate::types::identity::IdentityError;

/// Password policy check.
///
/// Rules: minimum length, minimum count of distinct characters, and the
/// four toggleable character-class requirements. All rules are evaluated on
/// every call rather than short-circuiting, so callers get one violation per
/// unmet rule in a single pass. The credential store runs the same validator
/// before any password set; it is also usable standalone (e.g. at a UI
/// layer) for early feedback.
pub struct PasswordValidator {
    settings: PasswordSettings,
}

impl PasswordValidator {
    pub fn new(settings: PasswordSettings) -> Self {
        Self { settings }
    }

    /// Validate a candidate password, returning every violated rule.
    pub fn validate(&self, password: &str) -> Vec<IdentityError> {
        let mut violations = Vec::new();

        if password.chars().count() < self.settings.required_length {
            violations.push(IdentityError::password_too_short(
                self.settings.required_length,
            ));
        }

        let distinct: HashSet<char> = password.chars().collect();
        if distinct.len() < self.settings.required_unique_chars {
            violations.push(IdentityError::password_requires_unique_chars(
                self.settings.required_unique_chars,
            ));
        }

        if self.settings.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            violations.push(IdentityError::password_requires_digit());
        }

        if self.settings.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            violations.push(IdentityError::password_requires_upper());
        }

        if self.settings.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
            violations.push(IdentityError::password_requires_lower());
        }

        if self.settings.require_non_alphanumeric
            && !password.chars().any(|c| !c.is_alphanumeric())
        {
            violations.push(IdentityError::password_requires_non_alphanumeric());
        }

        violations
    }
}
