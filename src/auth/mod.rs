//! Accounts, sessions and rate limiting
//!
//! [`signup`] and [`login`] work on the storage layer only; binding the
//! resulting account to a browser session happens in the HTTP handlers via
//! [`session::bind_account`].

pub mod password;
pub mod rate_limit;
pub mod session;

pub use rate_limit::Cooldown;
pub use session::SessionContext;

use crate::error::{BoardnotesError, Result};
use crate::storage::{Account, SqliteStorage};

/// Register a new account
///
/// Every password rule violation is reported in one
/// [`BoardnotesError::Validation`]; a taken email is a
/// [`BoardnotesError::Conflict`].
pub fn signup(storage: &SqliteStorage, email: &str, password: &str) -> Result<Account> {
    let email = password::validate_email(email)?;
    password::validate_password(password)?;

    let hash = password::hash_password(password)?;
    storage.create_account(&email, &hash)
}

/// Check credentials
///
/// Unknown emails and wrong passwords fail identically with
/// [`BoardnotesError::Authentication`].
pub fn login(storage: &SqliteStorage, email: &str, password: &str) -> Result<Account> {
    let email = password::normalize_email(email);

    let Some((account, hash)) = storage.find_account_by_email(&email)? else {
        return Err(BoardnotesError::Authentication.into());
    };

    match password::verify_password(password, &hash) {
        Ok(true) => {
            tracing::info!(account_id = %account.id, "Account logged in");
            Ok(account)
        }
        Ok(false) => Err(BoardnotesError::Authentication.into()),
        Err(e) => {
            tracing::error!(account_id = %account.id, "Stored password hash is unusable: {}", e);
            Err(BoardnotesError::Authentication.into())
        }
    }
}
