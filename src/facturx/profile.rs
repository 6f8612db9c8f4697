use serde::{Deserialize, Serialize};

/// ZUGFeRD / Factur-X conformance profile of the embedded XML.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZugferdProfile {
    /// Minimal machine-readable data (no line items).
    Minimum,
    /// Basic data without line items.
    BasicWl,
    /// Basic with line items.
    Basic,
    /// Full EN 16931 European norm.
    EN16931,
    /// Extended profile (beyond EN 16931).
    #[default]
    Extended,
    /// XRechnung profile (German public sector).
    XRechnung,
}

impl ZugferdProfile {
    pub const ALL: [ZugferdProfile; 6] = [
        Self::Minimum,
        Self::BasicWl,
        Self::Basic,
        Self::EN16931,
        Self::Extended,
        Self::XRechnung,
    ];

    /// The XMP `ConformanceLevel` value.
    pub fn conformance_level(&self) -> &'static str {
        match self {
            Self::Minimum => "MINIMUM",
            Self::BasicWl => "BASIC WL",
            Self::Basic => "BASIC",
            Self::EN16931 => "EN 16931",
            Self::Extended => "EXTENDED",
            Self::XRechnung => "XRECHNUNG",
        }
    }

    /// Inverse of [`ZugferdProfile::conformance_level`]. Case-insensitive.
    pub fn from_conformance_level(level: &str) -> Option<Self> {
        let level = level.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.conformance_level().eq_ignore_ascii_case(level))
    }
}
