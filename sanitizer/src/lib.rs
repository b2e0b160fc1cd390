//! Rewrites personally identifying information in user profiles and
//! comments with synthetic values.
//!
//! The [`domain`] module holds the sanitization rules and the record store
//! port, [`outbound`] the snapshot-backed store adapter, and [`cli`] the
//! command wiring used by the `gdpr-sanitizer` binary.

pub mod cli;
pub mod domain;
pub mod outbound;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
