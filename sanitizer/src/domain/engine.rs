//! The sanitization run: a user pass followed by a comment pass.
//!
//! A run is prepared first ([`RunPlan::prepare`]) so every input error
//! surfaces before the first write. The engine then enumerates each
//! partition in scope under a [`PartitionGuard`], rewrites records one at a
//! time, and reports counts. Nothing is rolled back when a later record
//! fails.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use synthetic_data::SyntheticValueProvider;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::ports::{NoOpProgress, ProgressReporter, RecordStore, RecordStoreError};
use crate::domain::{
    CommentRecord, CommentStatus, CommentUpdate, ExclusionError, ExclusionResolver, ExclusionSet,
    HookFailure, LoginGenerationError, NotFoundPolicy, PartitionGuard, ScopeError, SanitizerHooks,
    SiteId, SiteScope, UserProfileUpdate, UserRecord, UserReplacement, generate_unused_login,
};

/// Raw run options as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Comma-separated identifiers, logins or emails of users to keep.
    pub keep: Option<String>,
    /// Policy for `keep` tokens that match no user.
    pub policy: NotFoundPolicy,
    /// Raw site identifier limiting the run to one partition.
    pub site: Option<String>,
}

/// Input validation failed; nothing was modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// The requested site is invalid.
    #[error(transparent)]
    Scope(#[from] ScopeError),
    /// A user to keep could not be resolved.
    #[error(transparent)]
    Exclusion(#[from] ExclusionError),
}

/// Validated inputs for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    /// Partitions the run touches.
    pub scope: SiteScope,
    /// Users left untouched.
    pub exclusions: ExclusionSet,
}

impl RunPlan {
    /// Validate `options` against `store`.
    ///
    /// The site is checked before users to keep are resolved. Both complete
    /// before any record is rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`InputError`] when the site or a user to keep is invalid.
    pub fn prepare<S>(store: &S, options: &RunOptions) -> Result<Self, InputError>
    where
        S: RecordStore + ?Sized,
    {
        let scope = SiteScope::resolve(store, options.site.as_deref())?;
        let exclusions = match options.keep.as_deref() {
            Some(spec) => ExclusionResolver::new(store, options.policy).resolve(spec)?,
            None => ExclusionSet::new(),
        };
        Ok(Self { scope, exclusions })
    }
}

/// Counts reported after a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Users whose fields were rewritten.
    pub users_updated: usize,
    /// Comments whose author fields were rewritten.
    pub comments_updated: usize,
    /// Comments that disappeared before they could be rewritten.
    pub comments_skipped: usize,
    /// Partitions the run touched.
    pub scope: SiteScope,
    /// Users left untouched.
    pub exclusions: ExclusionSet,
}

/// A run aborted part-way; earlier writes remain.
#[derive(Debug, Error)]
pub enum SanitizeError {
    /// The record store failed.
    #[error(transparent)]
    Store(#[from] RecordStoreError),
    /// No unused login could be generated.
    #[error(transparent)]
    Login(#[from] LoginGenerationError),
    /// An extension hook failed.
    #[error(transparent)]
    Hook(#[from] HookFailure),
}

/// Rewrites PII in a record store.
pub struct SanitizationEngine<S>
where
    S: RecordStore + ?Sized,
{
    store: Arc<S>,
    provider: Box<dyn SyntheticValueProvider>,
    hooks: SanitizerHooks,
    progress: Box<dyn ProgressReporter>,
}

impl<S> SanitizationEngine<S>
where
    S: RecordStore + ?Sized,
{
    /// Create an engine without hooks or progress output.
    pub fn new(store: Arc<S>, provider: Box<dyn SyntheticValueProvider>) -> Self {
        Self {
            store,
            provider,
            hooks: SanitizerHooks::new(),
            progress: Box::new(NoOpProgress),
        }
    }

    /// Replace the registered hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: SanitizerHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the progress reporter.
    #[must_use]
    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Store the engine writes to.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Rewrite every user not excluded by `plan`, then every comment.
    ///
    /// # Errors
    ///
    /// Returns [`SanitizeError`] on the first store, login generation or
    /// hook failure. Records rewritten before the failure stay rewritten.
    pub fn run(&mut self, plan: &RunPlan) -> Result<RunResult, SanitizeError> {
        info!(scope = %plan.scope, excluded = plan.exclusions.len(), "sanitization started");
        let users_updated = self.rewrite_users(plan)?;
        let (comments_updated, comments_skipped) = self.rewrite_comments(plan.scope)?;
        info!(
            users_updated,
            comments_updated, comments_skipped, "sanitization finished"
        );

        Ok(RunResult {
            users_updated,
            comments_updated,
            comments_skipped,
            scope: plan.scope,
            exclusions: plan.exclusions.clone(),
        })
    }

    fn rewrite_users(&mut self, plan: &RunPlan) -> Result<usize, SanitizeError> {
        let users = self.collect_users(plan)?;
        if users.is_empty() {
            warn!("no users changed (did you exclude them all?)");
            return Ok(0);
        }

        self.progress.start("Rewriting users...", users.len());
        for user in &users {
            self.rewrite_user(user)?;
            self.progress.tick();
        }
        self.progress.finish();
        Ok(users.len())
    }

    fn collect_users(&self, plan: &RunPlan) -> Result<Vec<UserRecord>, RecordStoreError> {
        let mut seen = BTreeSet::new();
        let mut users = Vec::new();
        for site in plan.scope.partitions(&*self.store)? {
            let _guard = PartitionGuard::enter(&*self.store, site)?;
            for user in self.store.list_users(&plan.exclusions)? {
                if plan.exclusions.contains(user.id) {
                    continue;
                }
                if seen.insert(user.id) {
                    users.push(user);
                }
            }
        }
        Ok(users)
    }

    fn rewrite_user(&mut self, original: &UserRecord) -> Result<(), SanitizeError> {
        let values = self.provider.as_mut();
        let profile = UserProfileUpdate {
            password: values.password(),
            nicename: values.name(),
            email: values.safe_email(),
            url: values.url(),
            display_name: values.first_name(),
            meta: BTreeMap::new(),
        };
        let login = generate_unused_login(&*self.store, values)?;
        let mut replacement = UserReplacement::new(profile, login);

        self.hooks
            .run_pre_update_user(original, &mut replacement, values)?;
        self.store
            .update_user_primary_fields(original.id, &replacement.profile)?;
        self.store
            .update_user_login(original.id, replacement.login())?;
        self.hooks
            .run_post_update_user(original, &replacement, values)?;

        debug!(user_id = %original.id, "user rewritten");
        Ok(())
    }

    fn rewrite_comments(&mut self, scope: SiteScope) -> Result<(usize, usize), SanitizeError> {
        let batches = self.collect_comments(scope)?;
        let total = batches.iter().map(|(_, comments)| comments.len()).sum();

        self.progress.start("Rewriting comments...", total);
        let store = Arc::clone(&self.store);
        let mut updated = 0;
        let mut skipped = 0;
        for (site, comments) in &batches {
            let _guard = PartitionGuard::enter(&*store, *site)?;
            for comment in comments {
                if self.rewrite_comment(comment)? {
                    updated += 1;
                } else {
                    skipped += 1;
                }
                self.progress.tick();
            }
        }
        self.progress.finish();
        Ok((updated, skipped))
    }

    fn collect_comments(
        &self,
        scope: SiteScope,
    ) -> Result<Vec<(Option<SiteId>, Vec<CommentRecord>)>, RecordStoreError> {
        let mut batches = Vec::new();
        for site in scope.partitions(&*self.store)? {
            let _guard = PartitionGuard::enter(&*self.store, site)?;
            let mut seen = BTreeSet::new();
            let mut comments = Vec::new();
            for status in CommentStatus::ENUMERATION_ORDER {
                for comment in self.store.list_comments(status)? {
                    if seen.insert(comment.id) {
                        comments.push(comment);
                    }
                }
            }
            debug!(site = ?site, count = comments.len(), "comments gathered");
            batches.push((site, comments));
        }
        Ok(batches)
    }

    /// Returns `false` when the comment vanished before the update.
    fn rewrite_comment(&mut self, original: &CommentRecord) -> Result<bool, SanitizeError> {
        let values = self.provider.as_mut();
        let mut update = CommentUpdate {
            author: values.name(),
            author_email: values.safe_email(),
            author_url: values.url(),
            author_ip: values.ipv4(),
            agent: values.user_agent(),
            meta: BTreeMap::new(),
        };

        self.hooks
            .run_pre_update_comment(original, &mut update, values)?;
        match self.store.update_comment(original.id, &update) {
            Ok(()) => {}
            Err(error) if error.is_missing_record() => {
                warn!(comment_id = %original.id, %error, "comment disappeared, skipping");
                return Ok(false);
            }
            Err(error) => return Err(error.into()),
        }
        self.hooks
            .run_post_update_comment(original, &update, values)?;

        debug!(comment_id = %original.id, "comment rewritten");
        Ok(true)
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
