//! Read-back of packaged documents.
//!
//! [`PackagedDocument`] loads a PDF and reports what a reader or validator
//! would find in it: pages, the XMP packet, the embedded-files name tree, the
//! catalog's associated files and the invoice XML itself.

use lopdf::{Dictionary, Document, Object, ObjectId};
use thiserror::Error;

use crate::facturx::{FACTURX_NAMESPACE, PAYLOAD_FILENAME, ZugferdProfile};
use crate::xmp::{XmpError, XmpMeta};

const MAX_TREE_DEPTH: usize = 32;

#[derive(Debug, Error)]
pub enum InspectError {
    #[error("failed to load PDF")]
    Load(#[source] lopdf::Error),

    #[error("malformed document: {0}")]
    Structure(String),

    #[error("invalid XMP metadata")]
    Metadata(#[from] XmpError),

    #[error("no Factur-X/ZUGFeRD XML found: {0}")]
    NoInvoice(String),
}

fn structure(e: impl std::fmt::Display) -> InspectError {
    InspectError::Structure(e.to_string())
}

/// An embedded file as seen through its file specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentInfo {
    pub filespec: ObjectId,
    pub file_name: Option<String>,
    pub description: Option<String>,
    pub mime_type: Option<String>,
    pub relationship: Option<String>,
    /// `/Params /Size`.
    pub size: Option<i64>,
    /// `/Params /ModDate`, in PDF date syntax.
    pub modified: Option<String>,
    pub content: Vec<u8>,
}

/// A loaded PDF, for inspection.
pub struct PackagedDocument {
    doc: Document,
}

impl PackagedDocument {
    pub fn load(bytes: &[u8]) -> Result<Self, InspectError> {
        let doc = Document::load_mem(bytes).map_err(InspectError::Load)?;
        Ok(Self { doc })
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Decoded content of every page, in page order.
    pub fn page_contents(&self) -> Result<Vec<Vec<u8>>, InspectError> {
        self.doc
            .get_pages()
            .values()
            .map(|&id| self.doc.get_page_content(id).map_err(structure))
            .collect()
    }

    /// Number of `/OutputIntents` entries in the catalog.
    pub fn output_intent_count(&self) -> usize {
        self.catalog()
            .ok()
            .and_then(|c| c.get(b"OutputIntents").ok())
            .and_then(|o| self.resolve(o).as_array().ok())
            .map_or(0, Vec::len)
    }

    /// The raw XMP packet referenced by the catalog, if any.
    pub fn xmp_packet(&self) -> Result<Option<String>, InspectError> {
        let Ok(obj) = self.catalog()?.get(b"Metadata") else {
            return Ok(None);
        };
        let stream = self.resolve(obj).as_stream().map_err(structure)?;
        let bytes = stream_bytes(stream);
        String::from_utf8(bytes).map(Some).map_err(structure)
    }

    /// The parsed XMP metadata, if any.
    pub fn metadata(&self) -> Result<Option<XmpMeta>, InspectError> {
        match self.xmp_packet()? {
            Some(packet) => Ok(Some(XmpMeta::parse(&packet)?)),
            None => Ok(None),
        }
    }

    /// The profile named by the Factur-X `ConformanceLevel` XMP property.
    pub fn declared_profile(&self) -> Result<Option<ZugferdProfile>, InspectError> {
        let Some(meta) = self.metadata()? else {
            return Ok(None);
        };
        if !meta.namespaces().contains(FACTURX_NAMESPACE) {
            return Ok(None);
        }
        Ok(meta
            .get_property(FACTURX_NAMESPACE, "ConformanceLevel")?
            .and_then(ZugferdProfile::from_conformance_level))
    }

    /// Entries of the `/Names /EmbeddedFiles` tree, in tree order.
    pub fn embedded_files(&self) -> Result<Vec<(String, ObjectId)>, InspectError> {
        let catalog = self.catalog()?;
        let Ok(names) = catalog.get(b"Names") else {
            return Ok(Vec::new());
        };
        let names = self.resolve(names).as_dict().map_err(structure)?;
        let Ok(tree) = names.get(b"EmbeddedFiles") else {
            return Ok(Vec::new());
        };
        let tree = self.resolve(tree).as_dict().map_err(structure)?;

        let mut out = Vec::new();
        self.collect_names(tree, &mut out, 0)?;
        Ok(out)
    }

    /// Object ids referenced from the catalog's `/AF` array.
    pub fn associated_files(&self) -> Result<Vec<ObjectId>, InspectError> {
        let Ok(af) = self.catalog()?.get(b"AF") else {
            return Ok(Vec::new());
        };
        self.resolve(af)
            .as_array()
            .map_err(structure)?
            .iter()
            .map(|o| o.as_reference().map_err(structure))
            .collect()
    }

    pub fn attachment(&self, filespec: ObjectId) -> Result<AttachmentInfo, InspectError> {
        let fs = self.doc.get_dictionary(filespec).map_err(structure)?;
        let ef = fs.get(b"EF").map_err(structure)?;
        let ef = self.resolve(ef).as_dict().map_err(structure)?;
        let file = ef
            .get(b"UF")
            .or_else(|_| ef.get(b"F"))
            .map_err(structure)?;
        let stream = self.resolve(file).as_stream().map_err(structure)?;
        let params = stream
            .dict
            .get(b"Params")
            .ok()
            .and_then(|p| self.resolve(p).as_dict().ok());

        Ok(AttachmentInfo {
            filespec,
            file_name: fs
                .get(b"UF")
                .or_else(|_| fs.get(b"F"))
                .ok()
                .and_then(|o| lopdf::decode_text_string(o).ok()),
            description: fs
                .get(b"Desc")
                .ok()
                .and_then(|o| lopdf::decode_text_string(o).ok()),
            mime_type: stream.dict.get(b"Subtype").ok().and_then(name_string),
            relationship: fs.get(b"AFRelationship").ok().and_then(name_string),
            size: params
                .and_then(|p| p.get(b"Size").ok())
                .and_then(|s| s.as_i64().ok()),
            modified: params
                .and_then(|p| p.get(b"ModDate").ok())
                .and_then(|o| lopdf::decode_text_string(o).ok()),
            content: stream_bytes(stream),
        })
    }

    /// The embedded invoice XML, looked up in the name tree first and in the
    /// catalog's `/AF` array second.
    pub fn invoice_xml(&self) -> Result<Vec<u8>, InspectError> {
        for (name, id) in self.embedded_files()? {
            if is_invoice_filename(&name) {
                return Ok(self.attachment(id)?.content);
            }
        }
        for id in self.associated_files()? {
            let info = self.attachment(id)?;
            if info.file_name.as_deref().is_some_and(is_invoice_filename) {
                return Ok(info.content);
            }
        }
        Err(InspectError::NoInvoice(format!(
            "{PAYLOAD_FILENAME} is neither in EmbeddedFiles nor in AF"
        )))
    }

    fn catalog(&self) -> Result<&Dictionary, InspectError> {
        self.doc.catalog().map_err(structure)
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).unwrap_or(obj),
            other => other,
        }
    }

    fn collect_names(
        &self,
        node: &Dictionary,
        out: &mut Vec<(String, ObjectId)>,
        depth: usize,
    ) -> Result<(), InspectError> {
        if depth > MAX_TREE_DEPTH {
            return Err(structure("EmbeddedFiles name tree is too deep"));
        }
        if let Ok(names) = node.get(b"Names") {
            for pair in self.resolve(names).as_array().map_err(structure)?.chunks(2) {
                let [key, value] = pair else {
                    return Err(structure("odd number of EmbeddedFiles entries"));
                };
                let name = lopdf::decode_text_string(key).unwrap_or_default();
                out.push((name, value.as_reference().map_err(structure)?));
            }
        }
        if let Ok(kids) = node.get(b"Kids") {
            for kid in self.resolve(kids).as_array().map_err(structure)? {
                let kid = self.resolve(kid).as_dict().map_err(structure)?;
                self.collect_names(kid, out, depth + 1)?;
            }
        }
        Ok(())
    }
}

fn stream_bytes(stream: &lopdf::Stream) -> Vec<u8> {
    // decompressed_content() fails on unfiltered streams
    stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone())
}

fn name_string(obj: &Object) -> Option<String> {
    obj.as_name()
        .ok()
        .map(|n| String::from_utf8_lossy(n).into_owned())
}

fn is_invoice_filename(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower == PAYLOAD_FILENAME || lower.contains("factur-x") || lower.contains("zugferd")
}
