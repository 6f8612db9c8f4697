//! Factur-X / ZUGFeRD metadata.
//!
//! A hybrid invoice declares its embedded XML through four descriptive XMP
//! properties under the `fx` namespace, plus a PDF/A extension schema entry
//! listing those same four properties so validators accept the namespace.
//!
//! # Example
//!
//! ```
//! use facturx_packager::facturx::{InvoiceMetadata, ZugferdProfile, extend_metadata};
//! use facturx_packager::xmp::XmpMeta;
//!
//! let mut meta = XmpMeta::new();
//! let invoice = InvoiceMetadata::for_profile(ZugferdProfile::EN16931);
//! extend_metadata(&mut meta, &invoice).unwrap();
//!
//! assert_eq!(
//!     meta.get_property(&invoice.namespace_uri, "ConformanceLevel").unwrap(),
//!     Some("EN 16931")
//! );
//! ```

mod extension;
mod profile;

pub use extension::{
    ExtensionSchema, SchemaProperty, append_extension_schema, extend_metadata,
    registered_property_names,
};
pub use profile::ZugferdProfile;

use serde::{Deserialize, Serialize};

/// File name of the embedded XML. Written both as the `DocumentFileName`
/// property and as the attachment name; the two must never differ.
pub const PAYLOAD_FILENAME: &str = "factur-x.xml";

/// Namespace URI of the Factur-X descriptive properties.
pub const FACTURX_NAMESPACE: &str = "urn:ferd:pdfa:CrossIndustryDocument:invoice:1p0#";

/// Values written into the `fx` schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceMetadata {
    pub namespace_uri: String,
    pub prefix: String,
    /// Display name of the extension schema entry.
    pub schema_name: String,
    /// Hybrid document type in capitals, e.g. `INVOICE` or `ORDER`.
    pub document_type: String,
    pub version: String,
    pub conformance_level: String,
}

impl Default for InvoiceMetadata {
    fn default() -> Self {
        Self {
            namespace_uri: FACTURX_NAMESPACE.into(),
            prefix: "fx".into(),
            schema_name: "Factur-X PDFA Extension Schema".into(),
            document_type: "INVOICE".into(),
            version: "1.0".into(),
            conformance_level: ZugferdProfile::Extended.conformance_level().into(),
        }
    }
}

impl InvoiceMetadata {
    pub fn for_profile(profile: ZugferdProfile) -> Self {
        Self {
            conformance_level: profile.conformance_level().into(),
            ..Self::default()
        }
    }

    /// The profile named by `conformance_level`, if it is a known one.
    pub fn profile(&self) -> Option<ZugferdProfile> {
        ZugferdProfile::from_conformance_level(&self.conformance_level)
    }
}
