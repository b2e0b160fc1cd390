//! Resolution of the `--keep` specification into user identifiers.
//!
//! Each comma-separated token is classified once: digits are taken as an
//! identifier without a lookup, tokens containing `@` are matched by email,
//! and anything else is matched by login. Resolution completes before any
//! record is rewritten.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;
use tracing::warn;

use crate::domain::ports::{RecordStore, RecordStoreError};
use crate::domain::{UserId, UserLookup};

/// What to do with a token that matches no user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NotFoundPolicy {
    /// Abort the run before any record is touched.
    #[default]
    Strict,
    /// Warn and leave the token out of the exclusion set.
    Lenient,
}

/// Users that must not be rewritten.
///
/// Built once per run and immutable afterwards.
///
/// # Example
///
/// ```
/// use gdpr_sanitizer::domain::{ExclusionSet, UserId};
///
/// let set: ExclusionSet = [UserId::new(3), UserId::new(1), UserId::new(3)]
///     .into_iter()
///     .collect();
///
/// assert_eq!(set.len(), 2);
/// assert_eq!(set.to_string(), "1,3");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet(BTreeSet<UserId>);

impl ExclusionSet {
    /// An empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Whether `id` is excluded.
    #[must_use]
    pub fn contains(&self, id: UserId) -> bool {
        self.0.contains(&id)
    }

    /// Number of excluded users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is excluded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate excluded identifiers in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = UserId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<UserId> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = UserId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for ExclusionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for id in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{id}")?;
            first = false;
        }
        Ok(())
    }
}

/// Errors raised while resolving users to keep.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExclusionError {
    /// No user has the given email address.
    #[error("user email to keep not found: '{email}'")]
    EmailNotFound {
        /// Token as supplied.
        email: String,
    },
    /// No user has the given login.
    #[error("username to keep not found: '{login}'")]
    LoginNotFound {
        /// Token as supplied.
        login: String,
    },
    /// A numeric token does not fit a user identifier.
    #[error("user id to keep is out of range: '{token}'")]
    IdOutOfRange {
        /// Token as supplied.
        token: String,
    },
    /// The record store failed during a lookup.
    #[error("failed to resolve users to keep: {0}")]
    Store(#[from] RecordStoreError),
}

enum KeepToken<'a> {
    Id(UserId),
    Email(&'a str),
    Login(&'a str),
}

impl<'a> KeepToken<'a> {
    fn classify(token: &'a str) -> Result<Self, ExclusionError> {
        if token.bytes().all(|b| b.is_ascii_digit()) {
            return token
                .parse::<u64>()
                .map(|raw| Self::Id(UserId::new(raw)))
                .map_err(|_| ExclusionError::IdOutOfRange {
                    token: token.to_owned(),
                });
        }
        if token.contains('@') {
            Ok(Self::Email(token))
        } else {
            Ok(Self::Login(token))
        }
    }
}

/// Turns a raw `--keep` value into an [`ExclusionSet`].
///
/// # Example
///
/// ```
/// use gdpr_sanitizer::domain::{ExclusionResolver, NotFoundPolicy, UserId};
/// use gdpr_sanitizer::outbound::InMemoryRecordStore;
///
/// let store = InMemoryRecordStore::single_site();
/// let resolver = ExclusionResolver::new(&store, NotFoundPolicy::Strict);
/// let set = resolver.resolve("4, 2,4").expect("numeric tokens need no lookup");
///
/// assert!(set.contains(UserId::new(2)));
/// assert_eq!(set.len(), 2);
/// ```
pub struct ExclusionResolver<'a, S: ?Sized> {
    store: &'a S,
    policy: NotFoundPolicy,
}

impl<'a, S> ExclusionResolver<'a, S>
where
    S: RecordStore + ?Sized,
{
    /// Create a resolver reading from `store`.
    pub const fn new(store: &'a S, policy: NotFoundPolicy) -> Self {
        Self { store, policy }
    }

    /// Resolve every token in `spec`.
    ///
    /// Tokens are trimmed and empty tokens are ignored, so an empty or
    /// whitespace-only spec yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`ExclusionError`] when a token cannot be resolved under the
    /// strict policy, or when a store lookup fails under either policy.
    pub fn resolve(&self, spec: &str) -> Result<ExclusionSet, ExclusionError> {
        let mut ids = BTreeSet::new();
        for token in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match self.resolve_token(token) {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(ExclusionError::Store(source)) => return Err(ExclusionError::Store(source)),
                Err(error) => match self.policy {
                    NotFoundPolicy::Strict => return Err(error),
                    NotFoundPolicy::Lenient => {
                        warn!(token, %error, "user to keep not found, skipping");
                    }
                },
            }
        }
        Ok(ExclusionSet(ids))
    }

    fn resolve_token(&self, token: &str) -> Result<UserId, ExclusionError> {
        match KeepToken::classify(token)? {
            KeepToken::Id(id) => Ok(id),
            KeepToken::Email(email) => self
                .lookup(UserLookup::Email(email.to_owned()))?
                .ok_or_else(|| ExclusionError::EmailNotFound {
                    email: email.to_owned(),
                }),
            KeepToken::Login(login) => self
                .lookup(UserLookup::Login(login.to_owned()))?
                .ok_or_else(|| ExclusionError::LoginNotFound {
                    login: login.to_owned(),
                }),
        }
    }

    fn lookup(&self, lookup: UserLookup) -> Result<Option<UserId>, RecordStoreError> {
        Ok(self.store.find_user(&lookup)?.map(|user| user.id))
    }
}

#[cfg(test)]
#[path = "exclusion_tests.rs"]
mod tests;
