use chrono::{DateTime, FixedOffset, Local};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::pdf_date;
use super::shell::ConformantShell;
use crate::facturx::PAYLOAD_FILENAME;

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("attachment payload is empty")]
    EmptyPayload,

    #[error("invalid attachment file name `{0}`")]
    InvalidFileName(String),

    #[error("invalid MIME type `{0}`")]
    InvalidMimeType(String),

    #[error("unknown AFRelationship `{0}`")]
    InvalidRelationship(String),

    #[error("an embedded file named `{0}` already exists")]
    DuplicateName(String),

    #[error("malformed document structure: {0}")]
    Structure(String),
}

/// `/AFRelationship` of an associated file (ISO 32000-2, 14.13).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfRelationship {
    Source,
    Data,
    Alternative,
    Supplement,
    EncryptedPayload,
    FormData,
    Schema,
    Unspecified,
}

impl AfRelationship {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "Source",
            Self::Data => "Data",
            Self::Alternative => "Alternative",
            Self::Supplement => "Supplement",
            Self::EncryptedPayload => "EncryptedPayload",
            Self::FormData => "FormData",
            Self::Schema => "Schema",
            Self::Unspecified => "Unspecified",
        }
    }
}

impl fmt::Display for AfRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AfRelationship {
    type Err = AttachmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::Source,
            Self::Data,
            Self::Alternative,
            Self::Supplement,
            Self::EncryptedPayload,
            Self::FormData,
            Self::Schema,
            Self::Unspecified,
        ]
        .into_iter()
        .find(|r| r.as_str() == s)
        .ok_or_else(|| AttachmentError::InvalidRelationship(s.to_string()))
    }
}

/// Description of a file to embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedFileSpec {
    pub description: String,
    pub file_name: String,
    pub mime_type: String,
    pub relationship: AfRelationship,
    pub modified: DateTime<FixedOffset>,
}

impl EmbeddedFileSpec {
    /// The Factur-X invoice XML: `factur-x.xml`, `application/xml`, an
    /// alternative representation of the visible document.
    pub fn invoice(modified: DateTime<FixedOffset>) -> Self {
        Self {
            description: "ZUGFeRD invoice".into(),
            file_name: PAYLOAD_FILENAME.into(),
            mime_type: "application/xml".into(),
            relationship: AfRelationship::Alternative,
            modified,
        }
    }

    /// [`EmbeddedFileSpec::invoice`] stamped with the current local time.
    pub fn invoice_now() -> Self {
        Self::invoice(Local::now().into())
    }

    fn validate(&self) -> Result<(), AttachmentError> {
        if self.file_name.trim().is_empty() || self.file_name.contains(['/', '\\']) {
            return Err(AttachmentError::InvalidFileName(self.file_name.clone()));
        }
        let valid_mime = self.mime_type.split_once('/').is_some_and(|(kind, sub)| {
            !kind.is_empty()
                && !sub.is_empty()
                && !self.mime_type.contains(|c: char| c.is_whitespace() || c == '#')
        });
        if !valid_mime {
            return Err(AttachmentError::InvalidMimeType(self.mime_type.clone()));
        }
        Ok(())
    }
}

/// Object id of a file specification dictionary inside a shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSpecHandle(ObjectId);

impl FileSpecHandle {
    pub fn id(self) -> ObjectId {
        self.0
    }
}

/// Add the embedded file stream and its file specification to the shell.
/// The file is not reachable until it is attached and/or associated.
pub fn build_embedded_file_spec(
    shell: &mut ConformantShell,
    bytes: &[u8],
    spec: &EmbeddedFileSpec,
) -> Result<FileSpecHandle, AttachmentError> {
    if bytes.is_empty() {
        return Err(AttachmentError::EmptyPayload);
    }
    spec.validate()?;

    let doc = shell.document_mut();
    let stream_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "EmbeddedFile",
            "Subtype" => Object::Name(spec.mime_type.as_bytes().to_vec()),
            "Params" => dictionary! {
                "Size" => bytes.len() as i64,
                "ModDate" => Object::string_literal(pdf_date(&spec.modified)),
            },
        },
        bytes.to_vec(),
    ));

    let filespec_id = doc.add_object(dictionary! {
        "Type" => "Filespec",
        "F" => Object::string_literal(spec.file_name.as_str()),
        "UF" => lopdf::text_string(&spec.file_name),
        "Desc" => lopdf::text_string(&spec.description),
        "AFRelationship" => Object::Name(spec.relationship.as_str().as_bytes().to_vec()),
        "EF" => dictionary! {
            "F" => Object::Reference(stream_id),
            "UF" => Object::Reference(stream_id),
        },
    });
    Ok(FileSpecHandle(filespec_id))
}

/// Register `handle` under `name` in the catalog's `/Names /EmbeddedFiles`
/// tree. The tree's `/Names` array is kept sorted; a name already present is
/// rejected.
pub fn attach_file(
    shell: &mut ConformantShell,
    name: &str,
    handle: FileSpecHandle,
) -> Result<(), AttachmentError> {
    let catalog_id = shell.catalog_id();
    let doc = shell.document_mut();
    ensure_filespec(doc, handle)?;

    let names_id = child_dictionary(doc, catalog_id, b"Names")?;
    let tree_id = child_dictionary(doc, names_id, b"EmbeddedFiles")?;
    let tree = dict_mut(doc, tree_id)?;
    if tree.has(b"Kids") {
        return Err(AttachmentError::Structure(
            "EmbeddedFiles name trees with /Kids are not supported".into(),
        ));
    }

    let mut entries = match tree.get(b"Names") {
        Ok(Object::Array(entries)) => entries.clone(),
        Ok(_) => {
            return Err(AttachmentError::Structure(
                "EmbeddedFiles /Names is not an array".into(),
            ));
        }
        Err(_) => Vec::new(),
    };

    let key_object = lopdf::text_string(name);
    let key = key_object
        .as_str()
        .map_err(|e| AttachmentError::Structure(e.to_string()))?;
    let mut insert_at = entries.len();
    for (i, pair) in entries.chunks(2).enumerate() {
        let existing = pair[0].as_str().unwrap_or_default();
        if existing == key {
            return Err(AttachmentError::DuplicateName(name.to_string()));
        }
        if existing > key && insert_at == entries.len() {
            insert_at = i * 2;
        }
    }
    entries.insert(insert_at, Object::Reference(handle.id()));
    entries.insert(insert_at, key_object.clone());
    tree.set("Names", Object::Array(entries));
    Ok(())
}

/// Append an indirect reference to `handle` to the catalog's `/AF` array.
/// The array holds the reference, never a copy of the dictionary.
pub fn append_associated_file(
    shell: &mut ConformantShell,
    handle: FileSpecHandle,
) -> Result<(), AttachmentError> {
    let catalog_id = shell.catalog_id();
    let doc = shell.document_mut();
    ensure_filespec(doc, handle)?;

    let reference = Object::Reference(handle.id());
    let existing = dict_mut(doc, catalog_id)?.get(b"AF").ok().cloned();
    let array = match existing {
        None => {
            dict_mut(doc, catalog_id)?.set("AF", Object::Array(vec![reference]));
            return Ok(());
        }
        Some(Object::Array(_)) => dict_mut(doc, catalog_id)?.get_mut(b"AF"),
        Some(Object::Reference(id)) => doc.get_object_mut(id),
        Some(_) => {
            return Err(AttachmentError::Structure("catalog /AF is not an array".into()));
        }
    }
    .and_then(Object::as_array_mut)
    .map_err(|e| AttachmentError::Structure(format!("catalog /AF: {e}")))?;

    let already = array
        .iter()
        .any(|o| o.as_reference().ok() == Some(handle.id()));
    if !already {
        array.push(reference);
    }
    Ok(())
}

/// Build a file specification, attach it under its file name and list it as
/// an associated file of the document. Both registrations point at the same
/// object.
pub fn embed_file(
    shell: &mut ConformantShell,
    bytes: &[u8],
    spec: &EmbeddedFileSpec,
) -> Result<FileSpecHandle, AttachmentError> {
    let handle = build_embedded_file_spec(shell, bytes, spec)?;
    attach_file(shell, &spec.file_name, handle)?;
    append_associated_file(shell, handle)?;
    tracing::debug!(
        file_name = %spec.file_name,
        size = bytes.len(),
        relationship = %spec.relationship,
        "file_embedded"
    );
    Ok(handle)
}

fn dict_mut(doc: &mut Document, id: ObjectId) -> Result<&mut Dictionary, AttachmentError> {
    doc.get_object_mut(id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| AttachmentError::Structure(format!("object {} {}: {e}", id.0, id.1)))
}

fn ensure_filespec(doc: &Document, handle: FileSpecHandle) -> Result<(), AttachmentError> {
    let id = handle.id();
    let is_filespec = doc
        .get_dictionary(id)
        .ok()
        .and_then(|d| d.get(b"Type").ok())
        .and_then(|t| t.as_name().ok())
        == Some(b"Filespec".as_slice());
    if is_filespec {
        Ok(())
    } else {
        Err(AttachmentError::Structure(format!(
            "object {} {} is not a file specification",
            id.0, id.1
        )))
    }
}

/// The indirect dictionary at `parent[key]`, created empty when absent. A
/// direct dictionary is moved into its own object.
fn child_dictionary(
    doc: &mut Document,
    parent: ObjectId,
    key: &[u8],
) -> Result<ObjectId, AttachmentError> {
    let existing = dict_mut(doc, parent)?.get(key).ok().cloned();
    let id = match existing {
        Some(Object::Reference(id)) => {
            dict_mut(doc, id)?;
            return Ok(id);
        }
        Some(Object::Dictionary(dict)) => doc.add_object(dict),
        None => doc.add_object(Dictionary::new()),
        Some(_) => {
            return Err(AttachmentError::Structure(format!(
                "/{} is not a dictionary",
                String::from_utf8_lossy(key)
            )));
        }
    };
    dict_mut(doc, parent)?.set(key.to_vec(), Object::Reference(id));
    Ok(id)
}
