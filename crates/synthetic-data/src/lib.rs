//! Synthetic replacement values for anonymising personal data.
//!
//! This crate provides the value source used when personally identifying
//! fields are overwritten. It is independent of any record store so that the
//! sanitizer and its extension hooks can share a single generator.
//!
//! # Overview
//!
//! The crate supports:
//!
//! - A [`SyntheticValueProvider`] trait covering names, emails, URLs, IPv4
//!   addresses, user agents, passwords, and login candidates
//! - A `fake`-backed [`FakeProvider`], seeded for reproducible runs or drawn
//!   from thread entropy
//! - Login validation and normalisation helpers
//!
//! # Example
//!
//! ```
//! use synthetic_data::{FakeProvider, SyntheticValueProvider, is_valid_login};
//!
//! let mut provider = FakeProvider::seeded(42);
//! let login = provider.username();
//!
//! assert!(is_valid_login(&login));
//! assert!(provider.safe_email().contains('@'));
//! ```

mod provider;
mod validation;

pub use provider::{FakeProvider, LOGIN_SUFFIX_DIGITS, SyntheticValueProvider};
pub use validation::{LOGIN_MAX, is_valid_login, normalise_login};
