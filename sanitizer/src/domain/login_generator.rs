//! Generation of replacement logins that are not already in use.
//!
//! The check against the store is not locked. Uniqueness holds only while a
//! single sanitizer process is the sole writer.

use synthetic_data::SyntheticValueProvider;
use thiserror::Error;
use tracing::debug;

use crate::domain::UserLookup;
use crate::domain::ports::{RecordStore, RecordStoreError};

/// Total number of candidates drawn before giving up.
pub const MAX_LOGIN_ATTEMPTS: usize = 30;

/// Collisions tolerated before candidates are also tried with a numeric
/// suffix.
pub const COLLISIONS_BEFORE_SUFFIX: usize = 3;

/// Errors raised while generating a login.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoginGenerationError {
    /// Every candidate collided with an existing login.
    #[error("unable to find a fake username that is not already in use after {attempts} attempts")]
    Exhausted {
        /// Number of candidates drawn.
        attempts: usize,
    },
    /// The record store failed during a lookup.
    #[error("login lookup failed: {0}")]
    Store(#[from] RecordStoreError),
}

/// Returns a login that no user held at the time of the check.
///
/// Candidates come from `provider`. Once more than
/// [`COLLISIONS_BEFORE_SUFFIX`] candidates have collided, each further
/// colliding candidate is retried with a numeric suffix before the next draw.
///
/// # Errors
///
/// Returns [`LoginGenerationError::Exhausted`] after
/// [`MAX_LOGIN_ATTEMPTS`] draws without a free login, or
/// [`LoginGenerationError::Store`] when a lookup fails.
pub fn generate_unused_login<S>(
    store: &S,
    provider: &mut dyn SyntheticValueProvider,
) -> Result<String, LoginGenerationError>
where
    S: RecordStore + ?Sized,
{
    for attempt in 1..=MAX_LOGIN_ATTEMPTS {
        let candidate = provider.username();
        if is_unused(store, &candidate)? {
            return Ok(candidate);
        }

        let collisions = attempt - 1;
        if collisions > COLLISIONS_BEFORE_SUFFIX {
            let suffixed = provider.numeric_suffix(&candidate);
            if is_unused(store, &suffixed)? {
                return Ok(suffixed);
            }
        }
        debug!(attempt, candidate = %candidate, "login candidate already in use");
    }

    Err(LoginGenerationError::Exhausted {
        attempts: MAX_LOGIN_ATTEMPTS,
    })
}

fn is_unused<S>(store: &S, login: &str) -> Result<bool, RecordStoreError>
where
    S: RecordStore + ?Sized,
{
    Ok(store
        .find_user(&UserLookup::Login(login.to_owned()))?
        .is_none())
}

#[cfg(test)]
#[path = "login_generator_tests.rs"]
mod tests;
