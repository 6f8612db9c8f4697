//! # facturx-packager
//!
//! Packages an ordinary PDF and an optional Factur-X/ZUGFeRD invoice XML into
//! a PDF/A-3 hybrid invoice: the pages are copied into a fresh document with
//! an ICC output intent, the XMP packet declares the PDF/A level and the
//! Factur-X extension schema, and the XML is embedded as an associated file.
//!
//! ## Quick Start
//!
//! ```no_run
//! use facturx_packager::{PackagedDocument, Packager, PackagerConfig};
//!
//! let config = PackagerConfig::from_env().unwrap();
//! let packager = Packager::from_config(&config);
//!
//! let pdf = std::fs::read("invoice.pdf").unwrap();
//! let xml = std::fs::read("factur-x.xml").unwrap();
//! let result = packager.package(&pdf, Some(xml.as_slice()));
//!
//! let bytes = result.into_document().unwrap();
//! let doc = PackagedDocument::load(&bytes).unwrap();
//! assert_eq!(doc.invoice_xml().unwrap(), xml);
//! ```
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`request`] | Input validation |
//! | [`pdfa`] | PDF/A-3 shell, page transplant, file attachment |
//! | [`xmp`] | XMP metadata tree, parser and serializer |
//! | [`facturx`] | Factur-X extension schema and profiles |
//! | [`color`] | ICC profile loading |
//! | [`packager`] | The end-to-end packaging call |
//! | [`inspect`] | Read-back of packaged documents |

pub mod color;
pub mod config;
pub mod error;
pub mod facturx;
pub mod inspect;
pub mod outcome;
pub mod packager;
pub mod pdfa;
pub mod request;
pub mod xmp;

pub use crate::color::{ColorProfileSource, IccProfileFile, InMemoryProfile, ProfileError};
pub use crate::config::{ConfigError, PackagerConfig};
pub use crate::error::{PackagingError, PackagingStage};
pub use crate::facturx::{InvoiceMetadata, PAYLOAD_FILENAME, ZugferdProfile};
pub use crate::inspect::{AttachmentInfo, InspectError, PackagedDocument};
pub use crate::outcome::{FailureKind, PackagingResult};
pub use crate::packager::Packager;
pub use crate::pdfa::{OutputIntent, PdfAConformance};
pub use crate::request::PackagingRequest;
