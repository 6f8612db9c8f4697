use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::facturx::InvoiceMetadata;
use crate::pdfa::{OutputIntent, PdfAConformance};

/// Environment variable overriding [`PackagerConfig::icc_profile`].
pub const ENV_ICC_PROFILE: &str = "FACTURX_ICC_PROFILE";
/// Environment variable overriding [`PackagerConfig::conformance`].
pub const ENV_CONFORMANCE: &str = "FACTURX_CONFORMANCE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid packager configuration")]
    Json(#[from] serde_json::Error),

    #[error("{var}={value:?}: {reason}")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Packager configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PackagerConfig {
    /// ICC profile of the output intent
    #[serde(default = "default_icc_profile")]
    pub icc_profile: PathBuf,

    /// Declared PDF/A level
    #[serde(default)]
    pub conformance: PdfAConformance,

    #[serde(default)]
    pub output_intent: OutputIntent,

    /// Values of the Factur-X XMP schema
    #[serde(default)]
    pub invoice: InvoiceMetadata,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            icc_profile: default_icc_profile(),
            conformance: PdfAConformance::default(),
            output_intent: OutputIntent::default(),
            invoice: InvoiceMetadata::default(),
        }
    }
}

impl PackagerConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overridden by `FACTURX_ICC_PROFILE` and `FACTURX_CONFORMANCE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = lookup(ENV_ICC_PROFILE).filter(|v| !v.trim().is_empty()) {
            self.icc_profile = PathBuf::from(path);
        }
        if let Some(value) = lookup(ENV_CONFORMANCE).filter(|v| !v.trim().is_empty()) {
            self.conformance = value.parse().map_err(|reason| ConfigError::Env {
                var: ENV_CONFORMANCE,
                value,
                reason,
            })?;
        }
        Ok(self)
    }
}

fn default_icc_profile() -> PathBuf {
    PathBuf::from("sRGB2014.icc")
}
