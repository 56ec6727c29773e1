//! Validation helpers for authentication requests.

use lazy_static::lazy_static;
use regex::Regex;
use validator::{Validate, ValidationError, ValidationErrors};

use super::models::{ChangePasswordRequest, LoginRequest, RegisterRequest};

lazy_static! {
    // Email validation: basic RFC 5322 compliant pattern
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    )
    .expect("EMAIL_REGEX should be a valid regex pattern");
}

/// Minimum password length requirement
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length to prevent DoS
const MAX_PASSWORD_LENGTH: usize = 128;

/// Validate email format
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_email"))
    }
}

/// Validate password strength
/// Requirements:
/// - At least 8 characters
/// - At most 128 characters (to prevent DoS)
/// - Contains at least one uppercase letter
/// - Contains at least one lowercase letter
/// - Contains at least one digit
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::new("password_too_short"));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::new("password_too_long"));
    }

    let has_uppercase = password.chars().any(|c| c.is_uppercase());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_digit = password.chars().any(|c| c.is_numeric());

    if !has_uppercase {
        return Err(ValidationError::new("password_missing_uppercase"));
    }

    if !has_lowercase {
        return Err(ValidationError::new("password_missing_lowercase"));
    }

    if !has_digit {
        return Err(ValidationError::new("password_missing_digit"));
    }

    Ok(())
}

/// Validate user name (non-empty, reasonable length)
pub fn validate_user_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::new("name_empty"));
    }

    if trimmed.len() > 255 {
        return Err(ValidationError::new("name_too_long"));
    }

    Ok(())
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(err) = validate_user_name(&self.name) {
            errors.add("name", err);
        }

        if let Err(err) = validate_email(&self.email) {
            errors.add("email", err);
        }

        if let Err(err) = validate_password(&self.password) {
            errors.add("password", err);
        }

        if self.password != self.confirm_password {
            errors.add("confirmPassword", ValidationError::new("password_mismatch"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(err) = validate_email(&self.email) {
            errors.add("email", err);
        }

        // Password must not be empty (we don't validate strength for login)
        if self.password.is_empty() {
            errors.add("password", ValidationError::new("password_empty"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Validate for ChangePasswordRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.current_password.is_empty() {
            errors.add("currentPassword", ValidationError::new("password_empty"));
        }

        if let Err(err) = validate_password(&self.new_password) {
            errors.add("newPassword", err);
        }

        if self.new_password != self.confirm_password {
            errors.add("confirmPassword", ValidationError::new("password_mismatch"));
        }

        // Ensure new password is different from current
        if self.current_password == self.new_password {
            errors.add("newPassword", ValidationError::new("password_unchanged"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
