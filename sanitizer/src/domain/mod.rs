//! Sanitization domain: records, exclusion resolution, login generation,
//! hooks and the run engine.
//!
//! Purpose: keep every rule about what gets rewritten, and in which order,
//! independent of the storage that holds the records. Adapters implement
//! [`ports::RecordStore`]; the engine only talks to that port.
//!
//! Public surface:
//! - Record types (`UserRecord`, `CommentRecord`) and their typed updates.
//! - `ExclusionResolver` turning `--keep` into an `ExclusionSet`.
//! - `generate_unused_login` for collision-free logins.
//! - `SiteScope` and `PartitionGuard` for multi-site runs.
//! - `SanitizerHooks` extension points.
//! - `SanitizationEngine`, `RunPlan` and `RunResult`.

mod engine;
mod exclusion;
mod hooks;
mod login_generator;
pub mod ports;
mod records;
mod scope;

pub use self::engine::{
    InputError, RunOptions, RunPlan, RunResult, SanitizationEngine, SanitizeError,
};
pub use self::exclusion::{ExclusionError, ExclusionResolver, ExclusionSet, NotFoundPolicy};
pub use self::hooks::{HookError, HookFailure, HookPoint, SanitizerHooks};
pub use self::login_generator::{
    COLLISIONS_BEFORE_SUFFIX, LoginGenerationError, MAX_LOGIN_ATTEMPTS, generate_unused_login,
};
pub use self::records::{
    CommentId, CommentRecord, CommentStatus, CommentUpdate, PostId, SiteId, UserId, UserLookup,
    UserProfileUpdate, UserRecord, UserReplacement,
};
pub use self::scope::{PartitionGuard, ScopeError, SiteScope};
