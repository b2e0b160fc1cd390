//! Port abstraction for the user and comment record store.
//!
//! Adapters expose partition switching as a paired enter/restore call. The
//! domain never calls these directly; it goes through
//! [`PartitionGuard`](crate::domain::PartitionGuard), which restores the
//! previous context on drop.

use crate::domain::{
    CommentId, CommentRecord, CommentStatus, CommentUpdate, ExclusionSet, SiteId, UserId,
    UserLookup, UserProfileUpdate, UserRecord,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by record store adapters.
    pub enum RecordStoreError {
        /// Backing storage could not be reached.
        Connection {
            /// Adapter-supplied detail.
            message: String
        } => "record store connection failed: {message}",
        /// Query or mutation failed during execution.
        Query {
            /// Adapter-supplied detail.
            message: String
        } => "record store query failed: {message}",
        /// The record targeted by an update is absent.
        MissingRecord {
            /// Description of the absent record.
            message: String
        } => "record not found: {message}",
        /// The requested partition does not exist.
        UnknownPartition {
            /// Raw identifier of the requested site.
            site: u64
        } => "site {site} does not exist",
    }
}

impl RecordStoreError {
    /// Returns `true` when the error reports an absent record.
    #[must_use]
    pub const fn is_missing_record(&self) -> bool {
        matches!(self, Self::MissingRecord { .. })
    }
}

/// Port for reading and rewriting user and comment records.
///
/// All reads and updates apply to the partition most recently entered with
/// [`RecordStore::enter_partition`], or to the default partition when none
/// is active. User records are shared across partitions; membership only
/// affects [`RecordStore::list_users`].
#[cfg_attr(test, mockall::automock)]
pub trait RecordStore: Send + Sync {
    /// Whether the store holds more than one partition.
    fn is_multisite(&self) -> bool;

    /// Enumerate every partition.
    fn list_partitions(&self) -> Result<Vec<SiteId>, RecordStoreError>;

    /// Switch to `site`, remembering the previous context.
    fn enter_partition(&self, site: SiteId) -> Result<(), RecordStoreError>;

    /// Return to the context active before the matching
    /// [`RecordStore::enter_partition`].
    fn restore_default_partition(&self);

    /// List comments with the given status in the current partition.
    fn list_comments(&self, status: CommentStatus)
    -> Result<Vec<CommentRecord>, RecordStoreError>;

    /// Rewrite the author fields of a comment in the current partition.
    ///
    /// Returns [`RecordStoreError::MissingRecord`] when the comment or its
    /// parent content no longer exists.
    fn update_comment(&self, id: CommentId, update: &CommentUpdate)
    -> Result<(), RecordStoreError>;

    /// List users of the current partition, skipping excluded identifiers.
    fn list_users(&self, exclude: &ExclusionSet) -> Result<Vec<UserRecord>, RecordStoreError>;

    /// Find a single user.
    fn find_user(&self, lookup: &UserLookup) -> Result<Option<UserRecord>, RecordStoreError>;

    /// Write the primary profile fields. Never changes the login.
    fn update_user_primary_fields(
        &self,
        id: UserId,
        update: &UserProfileUpdate,
    ) -> Result<(), RecordStoreError>;

    /// Change a user's login.
    fn update_user_login(&self, id: UserId, login: &str) -> Result<(), RecordStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_record_is_detected() {
        assert!(RecordStoreError::missing_record("comment 4").is_missing_record());
        assert!(!RecordStoreError::query("boom").is_missing_record());
    }

    #[test]
    fn unknown_partition_formats_site() {
        let err = RecordStoreError::unknown_partition(9_u64);
        assert_eq!(err.to_string(), "site 9 does not exist");
    }
}
