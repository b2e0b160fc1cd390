//! In-memory record store backed by a site snapshot.
//!
//! Users are shared across sites; each site owns its posts and comments.
//! The current site is tracked as a stack so nested
//! [`RecordStore::enter_partition`] calls unwind in order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::domain::ports::{RecordStore, RecordStoreError};
use crate::domain::{
    CommentId, CommentRecord, CommentStatus, CommentUpdate, ExclusionSet, PostId, SiteId, UserId,
    UserLookup, UserProfileUpdate, UserRecord,
};

/// Site used as the default partition of a single-site store.
pub const MAIN_SITE: SiteId = SiteId::new(1);

/// Serialisable export of a whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Whether the export came from a multi-site install.
    #[serde(default)]
    pub multisite: bool,
    /// Every user, regardless of site membership.
    #[serde(default)]
    pub users: Vec<UserRecord>,
    /// Per-site content.
    #[serde(default)]
    pub sites: Vec<SiteSnapshot>,
}

/// Content owned by one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSnapshot {
    /// Site identifier.
    pub id: SiteId,
    /// Content that comments may belong to.
    #[serde(default)]
    pub posts: Vec<PostId>,
    /// Comments on this site's content.
    #[serde(default)]
    pub comments: Vec<CommentRecord>,
}

/// A snapshot is internally inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// A multi-site snapshot lists no sites.
    #[error("multi-site snapshot has no sites")]
    NoSites,
    /// A single-site snapshot lists more than one site.
    #[error("single-site snapshot lists {count} sites")]
    TooManySites {
        /// Number of sites listed.
        count: usize,
    },
    /// A site appears twice.
    #[error("duplicate site {site}")]
    DuplicateSite {
        /// Repeated site.
        site: SiteId,
    },
    /// A user identifier appears twice.
    #[error("duplicate user id {id}")]
    DuplicateUser {
        /// Repeated identifier.
        id: UserId,
    },
    /// A login is held by two users.
    #[error("duplicate login '{login}'")]
    DuplicateLogin {
        /// Repeated login.
        login: String,
    },
    /// A comment identifier appears twice within one site.
    #[error("duplicate comment {id} on site {site}")]
    DuplicateComment {
        /// Site holding the comment.
        site: SiteId,
        /// Repeated identifier.
        id: CommentId,
    },
}

#[derive(Debug, Default)]
struct SiteState {
    posts: BTreeSet<PostId>,
    comments: BTreeMap<CommentId, CommentRecord>,
}

#[derive(Debug)]
struct StoreState {
    users: BTreeMap<UserId, UserRecord>,
    sites: BTreeMap<SiteId, SiteState>,
    default_site: SiteId,
    context: Vec<SiteId>,
}

impl StoreState {
    fn with_sites(sites: impl IntoIterator<Item = SiteId>) -> Self {
        let sites: BTreeMap<_, _> = sites
            .into_iter()
            .map(|site| (site, SiteState::default()))
            .collect();
        let default_site = sites.keys().next().copied().unwrap_or(MAIN_SITE);
        Self {
            users: BTreeMap::new(),
            sites,
            default_site,
            context: Vec::new(),
        }
    }

    fn current_site(&self) -> SiteId {
        self.context.last().copied().unwrap_or(self.default_site)
    }

    fn current(&self) -> Result<&SiteState, RecordStoreError> {
        let site = self.current_site();
        self.sites
            .get(&site)
            .ok_or_else(|| RecordStoreError::unknown_partition(site.get()))
    }

    fn current_mut(&mut self) -> Result<&mut SiteState, RecordStoreError> {
        let site = self.current_site();
        self.sites
            .get_mut(&site)
            .ok_or_else(|| RecordStoreError::unknown_partition(site.get()))
    }

    fn user_mut(&mut self, id: UserId) -> Result<&mut UserRecord, RecordStoreError> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| RecordStoreError::missing_record(format!("user {id}")))
    }
}

/// [`RecordStore`] adapter holding every record in memory.
///
/// # Example
///
/// ```
/// use gdpr_sanitizer::domain::ports::RecordStore;
/// use gdpr_sanitizer::domain::{UserId, UserLookup};
/// use gdpr_sanitizer::outbound::{InMemoryRecordStore, StoreSnapshot};
///
/// let snapshot: StoreSnapshot = serde_json::from_str(
///     r#"{
///         "multisite": true,
///         "users": [{
///             "id": 7,
///             "login": "ada",
///             "nicename": "ada",
///             "displayName": "Ada",
///             "email": "ada@example.org",
///             "sites": [2]
///         }],
///         "sites": [{ "id": 1 }, { "id": 2 }]
///     }"#,
/// )
/// .expect("valid snapshot");
/// let store = InMemoryRecordStore::from_snapshot(snapshot).expect("consistent snapshot");
///
/// let found = store
///     .find_user(&UserLookup::Login("ada".to_owned()))
///     .expect("lookup");
/// assert_eq!(found.map(|user| user.id), Some(UserId::new(7)));
/// ```
#[derive(Debug)]
pub struct InMemoryRecordStore {
    multisite: bool,
    state: Mutex<StoreState>,
}

impl InMemoryRecordStore {
    /// An empty single-site store whose only site is [`MAIN_SITE`].
    #[must_use]
    pub fn single_site() -> Self {
        Self {
            multisite: false,
            state: Mutex::new(StoreState::with_sites([MAIN_SITE])),
        }
    }

    /// An empty multi-site store; the lowest site is the default partition.
    #[must_use]
    pub fn multisite(sites: impl IntoIterator<Item = SiteId>) -> Self {
        Self {
            multisite: true,
            state: Mutex::new(StoreState::with_sites(sites)),
        }
    }

    /// Add or replace a user.
    #[must_use]
    pub fn with_user(mut self, user: UserRecord) -> Self {
        self.state_mut().users.insert(user.id, user);
        self
    }

    /// Add content to `site`, creating the site if needed.
    #[must_use]
    pub fn with_post(mut self, site: SiteId, post: PostId) -> Self {
        self.state_mut()
            .sites
            .entry(site)
            .or_default()
            .posts
            .insert(post);
        self
    }

    /// Add a comment and its parent content to `site`, creating the site if
    /// needed.
    #[must_use]
    pub fn with_comment(mut self, site: SiteId, comment: CommentRecord) -> Self {
        let entry = self.state_mut().sites.entry(site).or_default();
        entry.posts.insert(comment.post_id);
        entry.comments.insert(comment.id, comment);
        self
    }

    /// Build a store from an export.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] when the export is inconsistent.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, SnapshotError> {
        if snapshot.multisite && snapshot.sites.is_empty() {
            return Err(SnapshotError::NoSites);
        }
        if !snapshot.multisite && snapshot.sites.len() > 1 {
            return Err(SnapshotError::TooManySites {
                count: snapshot.sites.len(),
            });
        }

        let site_ids: Vec<SiteId> = if snapshot.sites.is_empty() {
            vec![MAIN_SITE]
        } else {
            snapshot.sites.iter().map(|site| site.id).collect()
        };
        let mut state = StoreState::with_sites([]);
        state.default_site = site_ids.iter().min().copied().unwrap_or(MAIN_SITE);
        for site in site_ids {
            if state.sites.insert(site, SiteState::default()).is_some() {
                return Err(SnapshotError::DuplicateSite { site });
            }
        }

        let mut logins = BTreeSet::new();
        for user in snapshot.users {
            if !logins.insert(user.login.clone()) {
                return Err(SnapshotError::DuplicateLogin { login: user.login });
            }
            let id = user.id;
            if state.users.insert(id, user).is_some() {
                return Err(SnapshotError::DuplicateUser { id });
            }
        }

        for site in snapshot.sites {
            let entry = state.sites.entry(site.id).or_default();
            entry.posts.extend(site.posts);
            for comment in site.comments {
                let id = comment.id;
                if entry.comments.insert(id, comment).is_some() {
                    return Err(SnapshotError::DuplicateComment { site: site.id, id });
                }
            }
        }

        Ok(Self {
            multisite: snapshot.multisite,
            state: Mutex::new(state),
        })
    }

    /// Export every record.
    #[must_use]
    pub fn to_snapshot(&self) -> StoreSnapshot {
        let state = self.state();
        StoreSnapshot {
            multisite: self.multisite,
            users: state.users.values().cloned().collect(),
            sites: state
                .sites
                .iter()
                .map(|(id, site)| SiteSnapshot {
                    id: *id,
                    posts: site.posts.iter().copied().collect(),
                    comments: site.comments.values().cloned().collect(),
                })
                .collect(),
        }
    }

    /// A user by identifier, regardless of the current site.
    #[must_use]
    pub fn user(&self, id: UserId) -> Option<UserRecord> {
        self.state().users.get(&id).cloned()
    }

    /// Every user, ordered by identifier.
    #[must_use]
    pub fn users(&self) -> Vec<UserRecord> {
        self.state().users.values().cloned().collect()
    }

    /// A comment on `site`, regardless of the current site.
    #[must_use]
    pub fn comment(&self, site: SiteId, id: CommentId) -> Option<CommentRecord> {
        self.state()
            .sites
            .get(&site)
            .and_then(|entry| entry.comments.get(&id).cloned())
    }

    /// Remove a comment, as a concurrent moderator would.
    pub fn remove_comment(&self, site: SiteId, id: CommentId) -> Option<CommentRecord> {
        self.state()
            .sites
            .get_mut(&site)
            .and_then(|entry| entry.comments.remove(&id))
    }

    /// Remove content while leaving its comments orphaned.
    pub fn remove_post(&self, site: SiteId, post: PostId) -> bool {
        self.state()
            .sites
            .get_mut(&site)
            .is_some_and(|entry| entry.posts.remove(&post))
    }

    /// Number of partitions entered and not yet restored.
    #[must_use]
    pub fn context_depth(&self) -> usize {
        self.state().context.len()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&mut self) -> &mut StoreState {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner)
    }
}

/// SHA-256 digest of a plaintext password, hex encoded.
#[must_use]
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

impl RecordStore for InMemoryRecordStore {
    fn is_multisite(&self) -> bool {
        self.multisite
    }

    fn list_partitions(&self) -> Result<Vec<SiteId>, RecordStoreError> {
        Ok(self.state().sites.keys().copied().collect())
    }

    fn enter_partition(&self, site: SiteId) -> Result<(), RecordStoreError> {
        let mut state = self.state();
        if !state.sites.contains_key(&site) {
            return Err(RecordStoreError::unknown_partition(site.get()));
        }
        state.context.push(site);
        Ok(())
    }

    fn restore_default_partition(&self) {
        self.state().context.pop();
    }

    fn list_comments(
        &self,
        status: CommentStatus,
    ) -> Result<Vec<CommentRecord>, RecordStoreError> {
        let state = self.state();
        Ok(state
            .current()?
            .comments
            .values()
            .filter(|comment| comment.status == status)
            .cloned()
            .collect())
    }

    fn update_comment(
        &self,
        id: CommentId,
        update: &CommentUpdate,
    ) -> Result<(), RecordStoreError> {
        let mut state = self.state();
        let site = state.current_mut()?;
        let comment = site
            .comments
            .get_mut(&id)
            .ok_or_else(|| RecordStoreError::missing_record(format!("comment {id}")))?;
        if !site.posts.contains(&comment.post_id) {
            return Err(RecordStoreError::missing_record(format!(
                "post {} of comment {id}",
                comment.post_id
            )));
        }

        comment.author.clone_from(&update.author);
        comment.author_email.clone_from(&update.author_email);
        comment.author_url.clone_from(&update.author_url);
        comment.author_ip.clone_from(&update.author_ip);
        comment.agent.clone_from(&update.agent);
        comment
            .meta
            .extend(update.meta.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    fn list_users(&self, exclude: &ExclusionSet) -> Result<Vec<UserRecord>, RecordStoreError> {
        let state = self.state();
        let site = state.current_site();
        Ok(state
            .users
            .values()
            .filter(|user| !exclude.contains(user.id))
            .filter(|user| !self.multisite || user.sites.contains(&site))
            .cloned()
            .collect())
    }

    fn find_user(&self, lookup: &UserLookup) -> Result<Option<UserRecord>, RecordStoreError> {
        let state = self.state();
        let found = match lookup {
            UserLookup::Id(id) => state.users.get(id),
            UserLookup::Login(login) => state.users.values().find(|user| &user.login == login),
            UserLookup::Email(email) => state.users.values().find(|user| &user.email == email),
        };
        Ok(found.cloned())
    }

    fn update_user_primary_fields(
        &self,
        id: UserId,
        update: &UserProfileUpdate,
    ) -> Result<(), RecordStoreError> {
        let mut state = self.state();
        let user = state.user_mut(id)?;
        user.password_hash = hash_password(&update.password);
        user.nicename.clone_from(&update.nicename);
        user.email.clone_from(&update.email);
        user.url.clone_from(&update.url);
        user.display_name.clone_from(&update.display_name);
        user.meta
            .extend(update.meta.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    fn update_user_login(&self, id: UserId, login: &str) -> Result<(), RecordStoreError> {
        let mut state = self.state();
        let taken = state
            .users
            .values()
            .any(|user| user.id != id && user.login == login);
        if taken {
            return Err(RecordStoreError::query(format!(
                "login '{login}' already in use"
            )));
        }
        state.user_mut(id)?.login = login.to_owned();
        Ok(())
    }
}
