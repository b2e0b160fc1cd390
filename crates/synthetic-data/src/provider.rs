//! Synthetic value generation.
//!
//! This module defines the provider trait consumed by the sanitizer and a
//! `fake`-backed implementation. The same seed always produces the same
//! sequence of values.

use fake::Fake;
use fake::faker::internet::raw::{DomainSuffix, IPv4, Password, SafeEmail, UserAgent, Username};
use fake::faker::lorem::raw::Word;
use fake::faker::name::raw::{FirstName, Name};
use fake::locales::EN;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::validation::normalise_login;

/// Number of digits appended by [`SyntheticValueProvider::numeric_suffix`].
pub const LOGIN_SUFFIX_DIGITS: usize = 5;

/// Maximum number of attempts to turn a generated username into a login.
const MAX_USERNAME_ATTEMPTS: usize = 10;

/// Minimum generated password length.
const PASSWORD_MIN: usize = 12;

/// Maximum generated password length (exclusive).
const PASSWORD_MAX: usize = 24;

/// Source of plausible-looking replacement values.
///
/// Each call is independent; no uniqueness is guaranteed across calls.
/// Extension hooks receive the same provider the sanitizer uses so custom
/// fields can be filled from the same stream.
pub trait SyntheticValueProvider: Send {
    /// A full personal name.
    fn name(&mut self) -> String;

    /// A given name on its own.
    fn first_name(&mut self) -> String;

    /// An email address on a reserved example domain.
    fn safe_email(&mut self) -> String;

    /// An absolute website URL.
    fn url(&mut self) -> String;

    /// A dotted-quad IPv4 address.
    fn ipv4(&mut self) -> String;

    /// A browser user-agent string.
    fn user_agent(&mut self) -> String;

    /// A plaintext password.
    fn password(&mut self) -> String;

    /// A login candidate satisfying [`crate::is_valid_login`].
    fn username(&mut self) -> String;

    /// Appends [`LOGIN_SUFFIX_DIGITS`] random digits to `value`.
    fn numeric_suffix(&mut self, value: &str) -> String;
}

/// Provider backed by the `fake` crate and a ChaCha RNG.
///
/// # Example
///
/// ```
/// use synthetic_data::{FakeProvider, SyntheticValueProvider};
///
/// let mut first = FakeProvider::seeded(7);
/// let mut second = FakeProvider::seeded(7);
///
/// assert_eq!(first.name(), second.name());
/// ```
#[derive(Debug, Clone)]
pub struct FakeProvider {
    rng: ChaCha8Rng,
}

impl FakeProvider {
    /// Creates a provider whose output is fully determined by `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Creates a provider seeded from thread-local entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::seeded(rand::rng().random())
    }

    fn digits(&mut self, count: usize) -> String {
        (0..count)
            .map(|_| char::from(b'0' + self.rng.random_range(0..10_u8)))
            .collect()
    }
}

impl SyntheticValueProvider for FakeProvider {
    fn name(&mut self) -> String {
        Name(EN).fake_with_rng(&mut self.rng)
    }

    fn first_name(&mut self) -> String {
        FirstName(EN).fake_with_rng(&mut self.rng)
    }

    fn safe_email(&mut self) -> String {
        SafeEmail(EN).fake_with_rng(&mut self.rng)
    }

    fn url(&mut self) -> String {
        let word: String = Word(EN).fake_with_rng(&mut self.rng);
        let suffix: String = DomainSuffix(EN).fake_with_rng(&mut self.rng);
        format!("https://www.{}.{suffix}/", word.to_ascii_lowercase())
    }

    fn ipv4(&mut self) -> String {
        IPv4(EN).fake_with_rng(&mut self.rng)
    }

    fn user_agent(&mut self) -> String {
        UserAgent(EN).fake_with_rng(&mut self.rng)
    }

    fn password(&mut self) -> String {
        Password(EN, PASSWORD_MIN..PASSWORD_MAX).fake_with_rng(&mut self.rng)
    }

    fn username(&mut self) -> String {
        for _ in 0..MAX_USERNAME_ATTEMPTS {
            let raw: String = Username(EN).fake_with_rng(&mut self.rng);
            if let Some(login) = normalise_login(&raw) {
                return login;
            }
        }
        let digits = self.digits(LOGIN_SUFFIX_DIGITS);
        format!("user{digits}")
    }

    fn numeric_suffix(&mut self, value: &str) -> String {
        let digits = self.digits(LOGIN_SUFFIX_DIGITS);
        format!("{value}{digits}")
    }
}
