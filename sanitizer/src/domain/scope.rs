//! Partition scope of a run and the guard that enters a partition.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::domain::SiteId;
use crate::domain::ports::{RecordStore, RecordStoreError};

/// Which partitions a run touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteScope {
    /// Single-partition store; every call runs in the implicit default
    /// partition.
    SingleSite,
    /// Every partition of a multi-site store.
    AllSites,
    /// One partition of a multi-site store.
    Site(SiteId),
}

/// Errors raised while validating a requested site.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// A site was requested on a single-partition store.
    #[error("site parameter only valid on multi-site installs")]
    NotMultisite,
    /// The requested site is not a number.
    #[error("site must be a number, got '{value}'")]
    NotANumber {
        /// Value as supplied.
        value: String,
    },
    /// The requested site does not exist.
    #[error("site not found: {site}")]
    SiteNotFound {
        /// Requested site.
        site: SiteId,
    },
    /// The record store failed while listing partitions.
    #[error("failed to list sites: {0}")]
    Store(#[from] RecordStoreError),
}

impl SiteScope {
    /// Validate an optional `--site` value against `store`.
    ///
    /// Checks run in order: the store must be multi-site, the value must be
    /// numeric, and the site must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError`] for any failed check, before anything is
    /// modified.
    pub fn resolve<S>(store: &S, requested: Option<&str>) -> Result<Self, ScopeError>
    where
        S: RecordStore + ?Sized,
    {
        let multisite = store.is_multisite();
        let Some(raw) = requested else {
            return Ok(if multisite {
                Self::AllSites
            } else {
                Self::SingleSite
            });
        };

        if !multisite {
            return Err(ScopeError::NotMultisite);
        }
        let trimmed = raw.trim();
        let site = trimmed
            .parse::<u64>()
            .map(SiteId::new)
            .map_err(|_| ScopeError::NotANumber {
                value: raw.to_owned(),
            })?;
        if !store.list_partitions()?.contains(&site) {
            return Err(ScopeError::SiteNotFound { site });
        }
        Ok(Self::Site(site))
    }

    /// Partitions to visit; `None` means "stay in the default partition".
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError`] when listing partitions fails.
    pub fn partitions<S>(self, store: &S) -> Result<Vec<Option<SiteId>>, RecordStoreError>
    where
        S: RecordStore + ?Sized,
    {
        match self {
            Self::SingleSite => Ok(vec![None]),
            Self::Site(site) => Ok(vec![Some(site)]),
            Self::AllSites => Ok(store.list_partitions()?.into_iter().map(Some).collect()),
        }
    }

    /// The single requested site, if any.
    #[must_use]
    pub const fn site(self) -> Option<SiteId> {
        match self {
            Self::Site(site) => Some(site),
            Self::SingleSite | Self::AllSites => None,
        }
    }
}

impl fmt::Display for SiteScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleSite => f.write_str("single site"),
            Self::AllSites => f.write_str("all sites"),
            Self::Site(site) => write!(f, "site {site}"),
        }
    }
}

/// Keeps a partition entered for its lifetime.
///
/// Dropping the guard restores the previous partition, including when the
/// holder returns early with an error.
pub struct PartitionGuard<'a, S>
where
    S: RecordStore + ?Sized,
{
    store: &'a S,
    site: Option<SiteId>,
}

impl<'a, S> PartitionGuard<'a, S>
where
    S: RecordStore + ?Sized,
{
    /// Enter `site`, or stay in the default partition when `site` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError`] when the store refuses the switch; no
    /// restore is issued in that case.
    pub fn enter(store: &'a S, site: Option<SiteId>) -> Result<Self, RecordStoreError> {
        if let Some(id) = site {
            store.enter_partition(id)?;
            debug!(site = %id, "entered site");
        }
        Ok(Self { store, site })
    }

    /// Partition held by this guard.
    #[must_use]
    pub const fn site(&self) -> Option<SiteId> {
        self.site
    }
}

impl<S> Drop for PartitionGuard<'_, S>
where
    S: RecordStore + ?Sized,
{
    fn drop(&mut self) {
        if let Some(id) = self.site {
            self.store.restore_default_partition();
            debug!(site = %id, "restored previous site");
        }
    }
}

impl<S> fmt::Debug for PartitionGuard<'_, S>
where
    S: RecordStore + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionGuard")
            .field("site", &self.site)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use mockall::Sequence;
    use rstest::rstest;

    use super::*;
    use crate::domain::ports::MockRecordStore;

    fn multisite(sites: &'static [u64]) -> MockRecordStore {
        let mut store = MockRecordStore::new();
        store.expect_is_multisite().return_const(true);
        store
            .expect_list_partitions()
            .returning(|| Ok(sites.iter().copied().map(SiteId::new).collect()));
        store
    }

    fn single_site() -> MockRecordStore {
        let mut store = MockRecordStore::new();
        store.expect_is_multisite().return_const(false);
        store.expect_list_partitions().never();
        store
    }

    #[rstest]
    fn no_site_on_single_site_store_is_unscoped() {
        let scope = SiteScope::resolve(&single_site(), None).expect("scope");
        assert_eq!(scope, SiteScope::SingleSite);
    }

    #[rstest]
    fn no_site_on_multisite_store_covers_all_sites() {
        let scope = SiteScope::resolve(&multisite(&[1, 2]), None).expect("scope");
        assert_eq!(scope, SiteScope::AllSites);
    }

    #[rstest]
    #[case("9")]
    #[case("abc")]
    fn site_on_single_site_store_is_rejected(#[case] raw: &str) {
        let err = SiteScope::resolve(&single_site(), Some(raw)).expect_err("rejected");
        assert_eq!(err, ScopeError::NotMultisite);
        assert_eq!(
            err.to_string(),
            "site parameter only valid on multi-site installs"
        );
    }

    #[rstest]
    #[case("abc")]
    #[case("3a")]
    #[case("-3")]
    #[case("")]
    fn non_numeric_site_is_rejected(#[case] raw: &str) {
        let err = SiteScope::resolve(&multisite(&[1, 3]), Some(raw)).expect_err("rejected");
        assert_eq!(
            err,
            ScopeError::NotANumber {
                value: raw.to_owned()
            }
        );
    }

    #[rstest]
    fn unknown_site_is_rejected() {
        let err = SiteScope::resolve(&multisite(&[1, 3]), Some("9")).expect_err("rejected");
        assert_eq!(
            err,
            ScopeError::SiteNotFound {
                site: SiteId::new(9)
            }
        );
    }

    #[rstest]
    fn known_site_is_accepted() {
        let scope = SiteScope::resolve(&multisite(&[1, 3]), Some(" 3 ")).expect("scope");
        assert_eq!(scope, SiteScope::Site(SiteId::new(3)));
        assert_eq!(scope.site(), Some(SiteId::new(3)));
    }

    #[rstest]
    fn all_sites_expands_to_every_partition() {
        let store = multisite(&[1, 2, 5]);
        let partitions = SiteScope::AllSites.partitions(&store).expect("partitions");
        assert_eq!(
            partitions,
            vec![
                Some(SiteId::new(1)),
                Some(SiteId::new(2)),
                Some(SiteId::new(5))
            ]
        );
    }

    #[rstest]
    fn single_site_stays_in_default_partition() {
        let partitions = SiteScope::SingleSite
            .partitions(&single_site())
            .expect("partitions");
        assert_eq!(partitions, vec![None]);
    }

    #[rstest]
    fn guard_restores_partition_on_drop() {
        let mut seq = Sequence::new();
        let mut store = MockRecordStore::new();
        store
            .expect_enter_partition()
            .withf(|site| *site == SiteId::new(4))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        store
            .expect_restore_default_partition()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        {
            let guard = PartitionGuard::enter(&store, Some(SiteId::new(4))).expect("entered");
            assert_eq!(guard.site(), Some(SiteId::new(4)));
        }

        store.checkpoint();
    }

    #[rstest]
    fn guard_restores_partition_on_error_path() {
        fn failing_work(store: &MockRecordStore) -> Result<(), RecordStoreError> {
            let _guard = PartitionGuard::enter(store, Some(SiteId::new(2)))?;
            Err(RecordStoreError::query("list failed"))
        }

        let mut store = MockRecordStore::new();
        store.expect_enter_partition().times(1).returning(|_| Ok(()));
        store
            .expect_restore_default_partition()
            .times(1)
            .return_const(());

        let result = failing_work(&store);

        assert_eq!(result, Err(RecordStoreError::query("list failed")));
        store.checkpoint();
    }

    #[rstest]
    fn refused_switch_is_not_restored() {
        let mut store = MockRecordStore::new();
        store
            .expect_enter_partition()
            .returning(|site| Err(RecordStoreError::unknown_partition(site.get())));
        store.expect_restore_default_partition().never();

        let result = PartitionGuard::enter(&store, Some(SiteId::new(7)));

        assert!(result.is_err());
    }

    #[rstest]
    fn default_partition_guard_never_switches() {
        let mut store = MockRecordStore::new();
        store.expect_enter_partition().never();
        store.expect_restore_default_partition().never();

        let guard = PartitionGuard::enter(&store, None).expect("no switch");

        assert_eq!(guard.site(), None);
    }
}
