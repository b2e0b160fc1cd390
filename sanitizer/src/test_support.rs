//! Test helpers shared by unit and integration tests.
//!
//! Enabled for the crate's own tests and, through the `test-support`
//! feature, for integration tests under `tests/`.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use synthetic_data::{LOGIN_SUFFIX_DIGITS, SyntheticValueProvider};

use crate::domain::{CommentId, CommentRecord, CommentStatus, PostId, SiteId, UserId, UserRecord};

/// Deterministic provider producing numbered values.
///
/// Every call yields a value that differs from all previous ones, so
/// rewritten fields never equal fixture originals. Usernames can be scripted
/// to force collisions.
#[derive(Debug, Default, Clone)]
pub struct SequenceProvider {
    scripted_usernames: VecDeque<String>,
    counter: u64,
    username_calls: usize,
    suffix_calls: usize,
}

impl SequenceProvider {
    /// Provider without scripted usernames.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider that returns `usernames` first, then numbered usernames.
    #[must_use]
    pub fn with_usernames<I, T>(usernames: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            scripted_usernames: usernames.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Number of username draws so far.
    #[must_use]
    pub const fn username_calls(&self) -> usize {
        self.username_calls
    }

    /// Number of suffix transforms so far.
    #[must_use]
    pub const fn suffix_calls(&self) -> usize {
        self.suffix_calls
    }

    fn next(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }
}

impl SyntheticValueProvider for SequenceProvider {
    fn name(&mut self) -> String {
        format!("Synthetic Person {}", self.next())
    }

    fn first_name(&mut self) -> String {
        format!("Given{}", self.next())
    }

    fn safe_email(&mut self) -> String {
        format!("person{}@example.org", self.next())
    }

    fn url(&mut self) -> String {
        format!("https://www.site{}.example/", self.next())
    }

    fn ipv4(&mut self) -> String {
        let n = self.next().min(254);
        format!("192.0.2.{n}")
    }

    fn user_agent(&mut self) -> String {
        format!("SyntheticAgent/{}.0", self.next())
    }

    fn password(&mut self) -> String {
        format!("pw-{}-synthetic", self.next())
    }

    fn username(&mut self) -> String {
        self.username_calls += 1;
        match self.scripted_usernames.pop_front() {
            Some(username) => username,
            None => format!("synthetic.user{}", self.next()),
        }
    }

    fn numeric_suffix(&mut self, value: &str) -> String {
        self.suffix_calls += 1;
        let n = self.next();
        format!("{value}{n:0width$}", width = LOGIN_SUFFIX_DIGITS)
    }
}

/// Builds a user record with derived, recognisable field values.
#[must_use]
pub fn sample_user(id: u64, login: &str, sites: &[u64]) -> UserRecord {
    UserRecord {
        id: UserId::new(id),
        login: login.to_owned(),
        nicename: format!("{login}-nice"),
        display_name: format!("{login} display"),
        email: format!("{login}@real.example.com"),
        url: format!("https://{login}.real.example.com"),
        password_hash: format!("hash-of-{login}"),
        sites: sites.iter().copied().map(SiteId::new).collect::<BTreeSet<_>>(),
        meta: BTreeMap::new(),
    }
}

/// Builds a comment record with derived, recognisable author values.
#[must_use]
pub fn sample_comment(id: u64, post_id: u64, status: CommentStatus) -> CommentRecord {
    CommentRecord {
        id: CommentId::new(id),
        post_id: PostId::new(post_id),
        author: format!("Real Author {id}"),
        author_email: format!("author{id}@real.example.com"),
        author_url: format!("https://author{id}.real.example.com"),
        author_ip: format!("203.0.113.{id}"),
        agent: format!("RealBrowser/{id}"),
        status,
        meta: BTreeMap::new(),
    }
}
