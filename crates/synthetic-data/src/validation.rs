//! Login validation mirroring the record store's constraints.
//!
//! # Validation Rules
//!
//! - Length between 1 and [`LOGIN_MAX`] characters
//! - Allowed characters: lower-case ASCII letters, digits, `.`, `_`, `-`

use crate::provider::LOGIN_SUFFIX_DIGITS;

/// Maximum allowed length for a login, including any numeric suffix.
pub const LOGIN_MAX: usize = 60;

/// Maximum length of a normalised candidate, leaving room for a suffix.
const CANDIDATE_MAX: usize = LOGIN_MAX - LOGIN_SUFFIX_DIGITS;

/// Validates a login against store constraints.
///
/// # Examples
///
/// ```
/// use synthetic_data::is_valid_login;
///
/// assert!(is_valid_login("ada.lovelace"));
/// assert!(is_valid_login("grace_hopper-1906"));
/// assert!(!is_valid_login(""));
/// assert!(!is_valid_login("O'Brien"));
/// ```
#[must_use]
pub fn is_valid_login(login: &str) -> bool {
    let length = login.chars().count();
    if !(1..=LOGIN_MAX).contains(&length) {
        return false;
    }
    login.chars().all(is_valid_login_char)
}

const fn is_valid_login_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-')
}

/// Normalises a raw username into a valid login candidate.
///
/// Letters are lower-cased, disallowed characters are dropped, and the result
/// is truncated so a numeric suffix still fits within [`LOGIN_MAX`]. Returns
/// `None` when nothing usable remains.
///
/// # Examples
///
/// ```
/// use synthetic_data::normalise_login;
///
/// assert_eq!(normalise_login("O'Connor.Sean"), Some("oconnor.sean".to_owned()));
/// assert_eq!(normalise_login("!!!"), None);
/// ```
#[must_use]
pub fn normalise_login(raw: &str) -> Option<String> {
    let normalised: String = raw
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| is_valid_login_char(*c))
        .take(CANDIDATE_MAX)
        .collect();

    if normalised.is_empty() {
        None
    } else {
        Some(normalised)
    }
}
