//! Password hashing and the account password policy
//!
//! Hashes are Argon2id PHC strings (`$argon2id$v=19$...`) stored in the
//! `password_hash` column of `users`.

use crate::error::{BoardnotesError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Shortest accepted password, in characters
pub const MIN_PASSWORD_LEN: usize = 6;

/// Longest accepted password, in characters
pub const MAX_PASSWORD_LEN: usize = 72;

/// Characters that satisfy the symbol rule
pub const PASSWORD_SYMBOLS: &str = "!@#$%^&*()-_=+[]{};:'\",.<>/?\\|`~";

/// Hash a password with Argon2id and a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| BoardnotesError::Storage(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC hash
///
/// Returns `Ok(false)` on mismatch and an error only when the stored hash is
/// malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| BoardnotesError::Storage(format!("Invalid password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Apply the password policy, reporting every violated rule at once
///
/// # Examples
///
/// ```
/// use boardnotes::auth::password::validate_password;
///
/// assert!(validate_password("Abcdef1!").is_ok());
///
/// let err = validate_password("abc").unwrap_err();
/// assert!(err.to_string().contains("uppercase"));
/// assert!(err.to_string().contains("digit"));
/// ```
pub fn validate_password(password: &str) -> Result<()> {
    let mut problems = Vec::new();

    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        problems.push(format!(
            "be between {} and {} characters long",
            MIN_PASSWORD_LEN, MAX_PASSWORD_LEN
        ));
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        problems.push("contain a lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        problems.push("contain an uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        problems.push("contain a digit".to_string());
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        problems.push("contain a symbol".to_string());
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(BoardnotesError::Validation(format!("Password must {}", problems.join(", "))).into())
    }
}

/// Trim and lowercase an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalize an email address and reject obviously invalid ones
pub fn validate_email(email: &str) -> Result<String> {
    let email = normalize_email(email);
    if email.is_empty() || !email.contains('@') {
        return Err(BoardnotesError::Validation("Please enter a valid email address".to_string()).into());
    }
    Ok(email)
}
