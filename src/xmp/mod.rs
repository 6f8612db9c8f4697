//! XMP metadata tree.
//!
//! [`XmpMeta`] is an explicit hierarchical store: top-level properties keyed
//! by schema namespace, each holding a simple value, a struct of named fields
//! or a Bag/Seq/Alt array. Every tree carries its own namespace registry, so
//! registrations made while packaging one document never leak into another.
//!
//! The tree serializes to an RDF/XML packet ([`XmpMeta::serialize`]) and can
//! be read back from one ([`XmpMeta::parse`]).

mod namespace;
mod parse;
mod tree;
mod writer;

pub use namespace::NamespaceRegistry;
pub use tree::{ArrayForm, PropertyOptions, XmpField, XmpMeta, XmpNode};

use thiserror::Error;

/// Namespace URIs used by PDF/A metadata.
pub mod ns {
    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const X: &str = "adobe:ns:meta/";
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const DC: &str = "http://purl.org/dc/elements/1.1/";
    pub const XMP: &str = "http://ns.adobe.com/xap/1.0/";
    pub const PDF: &str = "http://ns.adobe.com/pdf/1.3/";
    pub const PDFA_ID: &str = "http://www.aiim.org/pdfa/ns/id/";
    pub const PDFA_EXTENSION: &str = "http://www.aiim.org/pdfa/ns/extension/";
    pub const PDFA_SCHEMA: &str = "http://www.aiim.org/pdfa/ns/schema#";
    pub const PDFA_PROPERTY: &str = "http://www.aiim.org/pdfa/ns/property#";
    pub const PDFA_TYPE: &str = "http://www.aiim.org/pdfa/ns/type#";
    pub const PDFA_FIELD: &str = "http://www.aiim.org/pdfa/ns/field#";
}

/// Errors raised by the metadata tree.
#[derive(Debug, Error)]
pub enum XmpError {
    #[error("invalid namespace URI `{0}`")]
    InvalidNamespace(String),

    #[error("invalid namespace prefix `{0}`")]
    InvalidPrefix(String),

    /// The URI is already bound to a different prefix.
    #[error("namespace {uri} is already registered as `{existing}`, cannot bind it to `{requested}`")]
    NamespaceConflict {
        uri: String,
        existing: String,
        requested: String,
    },

    /// The prefix is already bound to a different URI (e.g. a reserved one).
    #[error("prefix `{prefix}` is already bound to {existing}, cannot bind it to {requested}")]
    PrefixConflict {
        prefix: String,
        existing: String,
        requested: String,
    },

    #[error("namespace {0} is not registered")]
    UnknownNamespace(String),

    #[error("prefix `{0}` is not registered")]
    UnknownPrefix(String),

    #[error("invalid property path `{0}`")]
    InvalidPath(String),

    #[error("no property at `{0}`")]
    NotFound(String),

    #[error("{path}: index {index} out of range, array has {len} items")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("{0}: a simple property needs a value")]
    MissingValue(String),

    #[error("{0}")]
    Parse(String),

    #[error("{0}")]
    Write(String),
}
