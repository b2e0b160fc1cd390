//! Extension hooks run around each record update.
//!
//! Hooks are registered on [`SanitizerHooks`] before the engine is built and
//! run synchronously in registration order. Pre-update hooks may edit the
//! replacement (for example to add anonymised custom metadata); post-update
//! hooks see what was written. The first failing hook stops the run.

use std::fmt;

use synthetic_data::SyntheticValueProvider;
use thiserror::Error;

use crate::domain::{CommentRecord, CommentUpdate, UserRecord, UserReplacement};

/// Error type returned by hook callbacks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

type PreUserHook = Box<
    dyn FnMut(
            &UserRecord,
            &mut UserReplacement,
            &mut dyn SyntheticValueProvider,
        ) -> Result<(), HookError>
        + Send,
>;
type PostUserHook = Box<
    dyn FnMut(
            &UserRecord,
            &UserReplacement,
            &mut dyn SyntheticValueProvider,
        ) -> Result<(), HookError>
        + Send,
>;
type PreCommentHook = Box<
    dyn FnMut(
            &CommentRecord,
            &mut CommentUpdate,
            &mut dyn SyntheticValueProvider,
        ) -> Result<(), HookError>
        + Send,
>;
type PostCommentHook = Box<
    dyn FnMut(
            &CommentRecord,
            &CommentUpdate,
            &mut dyn SyntheticValueProvider,
        ) -> Result<(), HookError>
        + Send,
>;

/// The four places hooks can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// Before a user's fields are written.
    PreUpdateUser,
    /// After a user's fields and login are written.
    PostUpdateUser,
    /// Before a comment's author fields are written.
    PreUpdateComment,
    /// After a comment's author fields are written.
    PostUpdateComment,
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::PreUpdateUser => "pre-update-user",
            Self::PostUpdateUser => "post-update-user",
            Self::PreUpdateComment => "pre-update-comment",
            Self::PostUpdateComment => "post-update-comment",
        };
        f.write_str(label)
    }
}

/// A hook returned an error.
#[derive(Debug, Error)]
#[error("{point} hook failed: {source}")]
pub struct HookFailure {
    /// Where the failing hook was registered.
    pub point: HookPoint,
    /// Error returned by the hook.
    #[source]
    pub source: HookError,
}

/// Typed hook lists injected into the sanitization engine.
///
/// # Example
///
/// ```
/// use gdpr_sanitizer::domain::SanitizerHooks;
///
/// let hooks = SanitizerHooks::new().on_pre_update_user(|_original, replacement, values| {
///     replacement
///         .profile
///         .meta
///         .insert("billing_phone".to_owned(), values.password());
///     Ok(())
/// });
///
/// assert_eq!(hooks.len(), 1);
/// ```
#[derive(Default)]
pub struct SanitizerHooks {
    pre_user: Vec<PreUserHook>,
    post_user: Vec<PostUserHook>,
    pre_comment: Vec<PreCommentHook>,
    post_comment: Vec<PostCommentHook>,
}

impl SanitizerHooks {
    /// No hooks registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook run before each user update.
    #[must_use]
    pub fn on_pre_update_user<F>(mut self, hook: F) -> Self
    where
        F: FnMut(
                &UserRecord,
                &mut UserReplacement,
                &mut dyn SyntheticValueProvider,
            ) -> Result<(), HookError>
            + Send
            + 'static,
    {
        self.pre_user.push(Box::new(hook));
        self
    }

    /// Register a hook run after each user update.
    #[must_use]
    pub fn on_post_update_user<F>(mut self, hook: F) -> Self
    where
        F: FnMut(
                &UserRecord,
                &UserReplacement,
                &mut dyn SyntheticValueProvider,
            ) -> Result<(), HookError>
            + Send
            + 'static,
    {
        self.post_user.push(Box::new(hook));
        self
    }

    /// Register a hook run before each comment update.
    #[must_use]
    pub fn on_pre_update_comment<F>(mut self, hook: F) -> Self
    where
        F: FnMut(
                &CommentRecord,
                &mut CommentUpdate,
                &mut dyn SyntheticValueProvider,
            ) -> Result<(), HookError>
            + Send
            + 'static,
    {
        self.pre_comment.push(Box::new(hook));
        self
    }

    /// Register a hook run after each comment update.
    #[must_use]
    pub fn on_post_update_comment<F>(mut self, hook: F) -> Self
    where
        F: FnMut(
                &CommentRecord,
                &CommentUpdate,
                &mut dyn SyntheticValueProvider,
            ) -> Result<(), HookError>
            + Send
            + 'static,
    {
        self.post_comment.push(Box::new(hook));
        self
    }

    /// Total number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pre_user.len()
            + self.post_user.len()
            + self.pre_comment.len()
            + self.post_comment.len()
    }

    /// Whether no hooks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn run_pre_update_user(
        &mut self,
        original: &UserRecord,
        replacement: &mut UserReplacement,
        values: &mut dyn SyntheticValueProvider,
    ) -> Result<(), HookFailure> {
        for hook in &mut self.pre_user {
            hook(original, replacement, values).map_err(|source| HookFailure {
                point: HookPoint::PreUpdateUser,
                source,
            })?;
        }
        Ok(())
    }

    pub(crate) fn run_post_update_user(
        &mut self,
        original: &UserRecord,
        replacement: &UserReplacement,
        values: &mut dyn SyntheticValueProvider,
    ) -> Result<(), HookFailure> {
        for hook in &mut self.post_user {
            hook(original, replacement, values).map_err(|source| HookFailure {
                point: HookPoint::PostUpdateUser,
                source,
            })?;
        }
        Ok(())
    }

    pub(crate) fn run_pre_update_comment(
        &mut self,
        original: &CommentRecord,
        update: &mut CommentUpdate,
        values: &mut dyn SyntheticValueProvider,
    ) -> Result<(), HookFailure> {
        for hook in &mut self.pre_comment {
            hook(original, update, values).map_err(|source| HookFailure {
                point: HookPoint::PreUpdateComment,
                source,
            })?;
        }
        Ok(())
    }

    pub(crate) fn run_post_update_comment(
        &mut self,
        original: &CommentRecord,
        update: &CommentUpdate,
        values: &mut dyn SyntheticValueProvider,
    ) -> Result<(), HookFailure> {
        for hook in &mut self.post_comment {
            hook(original, update, values).map_err(|source| HookFailure {
                point: HookPoint::PostUpdateComment,
                source,
            })?;
        }
        Ok(())
    }
}

impl fmt::Debug for SanitizerHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SanitizerHooks")
            .field("pre_user", &self.pre_user.len())
            .field("post_user", &self.post_user.len())
            .field("pre_comment", &self.pre_comment.len())
            .field("post_comment", &self.post_comment.len())
            .finish()
    }
}
