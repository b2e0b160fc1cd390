//! Sanitizer settings loaded via OrthoConfig.

use std::path::PathBuf;

use ortho_config::OrthoConfig;
use serde::Deserialize;

/// Settings read from the environment and configuration files.
///
/// Command-line flags take precedence over every value here.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "GDPR_SANITIZER")]
pub struct SanitizerSettings {
    /// Warn about users to keep that do not exist instead of aborting.
    #[ortho_config(default = false)]
    pub skip_not_found: bool,
    /// Path to the JSON site snapshot to rewrite.
    pub store_path: Option<PathBuf>,
    /// Seed for reproducible synthetic values.
    pub seed: Option<u64>,
}
