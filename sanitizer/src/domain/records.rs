//! User and comment records plus their typed update payloads.
//!
//! Identifiers are immutable newtypes. The primary user update deliberately
//! has no login field: logins change only through the dedicated login update
//! on the record store.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw numeric identifier.
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Access the raw numeric identifier.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id! {
    /// Stable user identifier.
    UserId
}

numeric_id! {
    /// Stable comment identifier.
    CommentId
}

numeric_id! {
    /// Identifier of the content a comment belongs to.
    PostId
}

numeric_id! {
    /// Partition ("site") identifier in a multi-site deployment.
    SiteId
}

/// Moderation status of a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    /// Visible comment.
    Published,
    /// Comment flagged as spam.
    Spam,
    /// Comment moved to the trash.
    Trashed,
}

impl CommentStatus {
    /// Order in which statuses are enumerated during a comment pass.
    pub const ENUMERATION_ORDER: [Self; 3] = [Self::Published, Self::Trashed, Self::Spam];
}

impl fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Published => "published",
            Self::Spam => "spam",
            Self::Trashed => "trashed",
        };
        f.write_str(label)
    }
}

/// A user profile as held by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Unique, immutable identifier.
    pub id: UserId,
    /// Unique login name.
    pub login: String,
    /// URL-friendly name.
    pub nicename: String,
    /// Name shown publicly.
    pub display_name: String,
    /// Contact email address.
    pub email: String,
    /// Personal website.
    #[serde(default)]
    pub url: String,
    /// Stored password hash.
    #[serde(default)]
    pub password_hash: String,
    /// Sites the user belongs to in a multi-site deployment.
    #[serde(default)]
    pub sites: BTreeSet<SiteId>,
    /// Custom profile metadata.
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

/// A comment as held by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    /// Unique, immutable identifier.
    pub id: CommentId,
    /// Parent content; never modified.
    pub post_id: PostId,
    /// Author display name.
    pub author: String,
    /// Author email address.
    #[serde(default)]
    pub author_email: String,
    /// Author website.
    #[serde(default)]
    pub author_url: String,
    /// Author IP address.
    #[serde(default)]
    pub author_ip: String,
    /// Author user-agent string.
    #[serde(default)]
    pub agent: String,
    /// Moderation status.
    pub status: CommentStatus,
    /// Custom comment metadata.
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

/// Lookup key for a single user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    /// Match by identifier.
    Id(UserId),
    /// Match by exact login.
    Login(String),
    /// Match by exact email address.
    Email(String),
}

/// Primary user fields written by a profile update.
///
/// The login is absent on purpose; see
/// [`RecordStore::update_user_login`](crate::domain::ports::RecordStore::update_user_login).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfileUpdate {
    /// New plaintext password; the store is responsible for hashing it.
    pub password: String,
    /// New nicename.
    pub nicename: String,
    /// New email address.
    pub email: String,
    /// New website.
    pub url: String,
    /// New display name.
    pub display_name: String,
    /// Metadata entries to write; existing keys are overwritten.
    pub meta: BTreeMap<String, String>,
}

/// Proposed replacement for a user record.
///
/// Pre-update hooks may edit the profile fields and add metadata. The login
/// is fixed once generated so its uniqueness check stays valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserReplacement {
    /// Primary fields persisted through the profile update.
    pub profile: UserProfileUpdate,
    login: String,
}

impl UserReplacement {
    /// Combine a profile update with a login already checked for uniqueness.
    #[must_use]
    pub const fn new(profile: UserProfileUpdate, login: String) -> Self {
        Self { profile, login }
    }

    /// The replacement login.
    #[must_use]
    pub fn login(&self) -> &str {
        &self.login
    }
}

/// Author fields written by a comment update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentUpdate {
    /// New author display name.
    pub author: String,
    /// New author email address.
    pub author_email: String,
    /// New author website.
    pub author_url: String,
    /// New author IP address.
    pub author_ip: String,
    /// New author user-agent string.
    pub agent: String,
    /// Metadata entries to write; existing keys are overwritten.
    pub meta: BTreeMap<String, String>,
}
