use chrono::{DateTime, FixedOffset, Local, SecondsFormat};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::pdf_date;
use crate::color::{ColorProfileSource, IccProfile, ProfileError};
use crate::xmp::{PropertyOptions, XmpError, XmpMeta, ns};

const PRODUCER: &str = concat!("facturx-packager ", env!("CARGO_PKG_VERSION"));

/// Declared PDF/A-3 conformance level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PdfAConformance {
    /// Level A: accessible, requires a logical structure tree.
    #[serde(rename = "PDF/A-3A")]
    PdfA3A,
    /// Level B: reliable visual reproduction.
    #[serde(rename = "PDF/A-3B")]
    PdfA3B,
    /// Level U: level B plus Unicode text mapping.
    #[default]
    #[serde(rename = "PDF/A-3U")]
    PdfA3U,
}

impl PdfAConformance {
    /// `pdfaid:part`.
    pub fn part(self) -> u8 {
        3
    }

    /// `pdfaid:conformance`.
    pub fn level(self) -> &'static str {
        match self {
            Self::PdfA3A => "A",
            Self::PdfA3B => "B",
            Self::PdfA3U => "U",
        }
    }
}

impl fmt::Display for PdfAConformance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PDF/A-{}{}", self.part(), self.level())
    }
}

impl FromStr for PdfAConformance {
    type Err = String;

    /// Accepts `PDF/A-3U`, `PDFA-3U`, `3u` and similar spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();
        match norm.trim_start_matches("PDFA") {
            "3A" => Ok(Self::PdfA3A),
            "3B" => Ok(Self::PdfA3B),
            "3U" => Ok(Self::PdfA3U),
            _ => Err(format!("unknown PDF/A conformance `{s}`")),
        }
    }
}

/// Output intent parameters; the ICC data comes from a [`ColorProfileSource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputIntent {
    /// `/OutputConditionIdentifier`.
    pub identifier: String,
    /// `/OutputCondition`; omitted when empty.
    pub condition: String,
    /// `/RegistryName`.
    pub registry: String,
    /// `/Info`.
    pub info: Option<String>,
}

impl Default for OutputIntent {
    fn default() -> Self {
        Self {
            identifier: "Custom".into(),
            condition: String::new(),
            registry: "http://www.color.org".into(),
            info: Some("sRGB2014".into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("output intent colour profile rejected")]
    Profile(#[from] ProfileError),

    #[error("output intent needs a condition identifier")]
    MissingIdentifier,

    #[error("{0} needs a logical structure tree, which copied pages do not carry")]
    UnsupportedConformance(PdfAConformance),
}

#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error("failed to write the XMP packet")]
    Metadata(#[from] XmpError),

    #[error("malformed document: {0}")]
    Structure(String),

    #[error("failed to serialize the PDF: {0}")]
    Write(String),
}

/// An output document under construction, declared PDF/A-3 from the start.
///
/// Owned by a single packaging call. The XMP tree is created lazily by
/// [`ConformantShell::metadata_tree`] and written out by
/// [`ConformantShell::finalize`].
pub struct ConformantShell {
    doc: Document,
    catalog_id: ObjectId,
    pages_id: ObjectId,
    conformance: PdfAConformance,
    created: DateTime<FixedOffset>,
    metadata: Option<XmpMeta>,
    fingerprint: Sha256,
}

impl ConformantShell {
    /// Create an empty PDF/A-3 document with a catalog, an empty page tree and
    /// the output intent.
    pub fn create(
        conformance: PdfAConformance,
        intent: &OutputIntent,
        profile: &dyn ColorProfileSource,
    ) -> Result<Self, ShellError> {
        if conformance == PdfAConformance::PdfA3A {
            return Err(ShellError::UnsupportedConformance(conformance));
        }
        if intent.identifier.trim().is_empty() {
            return Err(ShellError::MissingIdentifier);
        }
        let icc = IccProfile::parse(profile.profile_bytes()?)?;

        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Object::Array(vec![]),
                "Count" => 0,
            }),
        );

        let icc_id = doc.add_object(Stream::new(
            dictionary! { "N" => icc.components() },
            icc.data().to_vec(),
        ));

        let mut oi = dictionary! {
            "Type" => "OutputIntent",
            "S" => "GTS_PDFA1",
            "OutputConditionIdentifier" => Object::string_literal(intent.identifier.as_str()),
            "RegistryName" => Object::string_literal(intent.registry.as_str()),
            "DestOutputProfile" => Object::Reference(icc_id),
        };
        if !intent.condition.is_empty() {
            oi.set("OutputCondition", Object::string_literal(intent.condition.as_str()));
        }
        if let Some(info) = &intent.info {
            oi.set("Info", Object::string_literal(info.as_str()));
        }
        let oi_id = doc.add_object(oi);

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
            "OutputIntents" => Object::Array(vec![Object::Reference(oi_id)]),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let created: DateTime<FixedOffset> = Local::now().into();
        let info_id = doc.add_object(dictionary! {
            "Producer" => Object::string_literal(PRODUCER),
            "CreationDate" => Object::string_literal(pdf_date(&created)),
            "ModDate" => Object::string_literal(pdf_date(&created)),
        });
        doc.trailer.set("Info", Object::Reference(info_id));

        tracing::debug!(
            %conformance,
            components = icc.components(),
            icc_len = icc.data().len(),
            "shell_created"
        );

        Ok(Self {
            doc,
            catalog_id,
            pages_id,
            conformance,
            created,
            metadata: None,
            fingerprint: Sha256::new(),
        })
    }

    pub fn conformance(&self) -> PdfAConformance {
        self.conformance
    }

    /// Creation timestamp, shared by the info dictionary and the XMP dates.
    pub fn created(&self) -> DateTime<FixedOffset> {
        self.created
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub(crate) fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub(crate) fn catalog_id(&self) -> ObjectId {
        self.catalog_id
    }

    pub fn page_count(&self) -> usize {
        self.doc
            .get_dictionary(self.pages_id)
            .ok()
            .and_then(|pages| pages.get(b"Kids").ok())
            .and_then(|kids| kids.as_array().ok())
            .map_or(0, Vec::len)
    }

    /// Hang already-imported page objects under the shell's page tree, in order.
    pub(crate) fn adopt_pages(&mut self, page_ids: &[ObjectId]) -> Result<(), String> {
        for &id in page_ids {
            self.doc
                .get_object_mut(id)
                .and_then(Object::as_dict_mut)
                .map_err(|e| format!("page {} {}: {e}", id.0, id.1))?
                .set("Parent", Object::Reference(self.pages_id));
        }

        let pages = self
            .doc
            .get_object_mut(self.pages_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| format!("page tree: {e}"))?;
        let mut kids = pages
            .get(b"Kids")
            .and_then(Object::as_array)
            .cloned()
            .unwrap_or_default();
        kids.extend(page_ids.iter().map(|&id| Object::Reference(id)));
        let count = kids.len() as i64;
        pages.set("Kids", Object::Array(kids));
        pages.set("Count", count);
        Ok(())
    }

    /// Feed bytes into the trailer `/ID` fingerprint.
    pub fn add_fingerprint(&mut self, bytes: &[u8]) {
        self.fingerprint.update((bytes.len() as u64).to_be_bytes());
        self.fingerprint.update(bytes);
    }

    /// The document's XMP tree, created on first access and seeded with the
    /// PDF/A identification, format, producer and date properties.
    pub fn metadata_tree(&mut self) -> Result<&mut XmpMeta, XmpError> {
        if self.metadata.is_none() {
            self.metadata = Some(base_metadata(self.conformance, &self.created)?);
        }
        self.metadata
            .as_mut()
            .ok_or_else(|| XmpError::NotFound("document metadata".into()))
    }

    /// Write the XMP stream and trailer ID, drop unreachable objects and
    /// serialize.
    pub fn finalize(mut self) -> Result<Vec<u8>, FinalizeError> {
        let meta = match self.metadata.take() {
            Some(meta) => meta,
            None => base_metadata(self.conformance, &self.created)?,
        };
        let packet = meta.serialize()?;

        let metadata_id = self.doc.add_object(
            Stream::new(
                dictionary! {
                    "Type" => "Metadata",
                    "Subtype" => "XML",
                },
                packet.into_bytes(),
            )
            .with_compression(false),
        );
        self.doc
            .get_object_mut(self.catalog_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| FinalizeError::Structure(format!("catalog: {e}")))?
            .set("Metadata", Object::Reference(metadata_id));

        let digest = self.fingerprint.finalize();
        let id = Object::String(digest[..16].to_vec(), StringFormat::Hexadecimal);
        self.doc.trailer.set("ID", Object::Array(vec![id.clone(), id]));

        let pruned = self.doc.prune_objects();
        self.doc.renumber_objects();
        tracing::debug!(pruned = pruned.len(), objects = self.doc.objects.len(), "shell_finalized");

        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|e| FinalizeError::Write(e.to_string()))?;
        Ok(out)
    }
}

fn base_metadata(
    conformance: PdfAConformance,
    created: &DateTime<FixedOffset>,
) -> Result<XmpMeta, XmpError> {
    let mut meta = XmpMeta::new();
    let simple = PropertyOptions::Simple;
    let date = created.to_rfc3339_opts(SecondsFormat::Secs, false);

    meta.set_property(ns::PDFA_ID, "part", Some(&conformance.part().to_string()), simple)?;
    meta.set_property(ns::PDFA_ID, "conformance", Some(conformance.level()), simple)?;
    meta.set_property(ns::DC, "format", Some("application/pdf"), simple)?;
    meta.set_property(ns::PDF, "Producer", Some(PRODUCER), simple)?;
    meta.set_property(ns::XMP, "CreateDate", Some(&date), simple)?;
    meta.set_property(ns::XMP, "ModifyDate", Some(&date), simple)?;
    meta.set_property(ns::XMP, "MetadataDate", Some(&date), simple)?;
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::InMemoryProfile;

    fn profile() -> InMemoryProfile {
        InMemoryProfile::new(crate::color::icc_fixture())
    }

    #[test]
    fn conformance_parses_common_spellings() {
        assert_eq!("PDF/A-3U".parse::<PdfAConformance>(), Ok(PdfAConformance::PdfA3U));
        assert_eq!("pdfa-3b".parse::<PdfAConformance>(), Ok(PdfAConformance::PdfA3B));
        assert_eq!("3a".parse::<PdfAConformance>(), Ok(PdfAConformance::PdfA3A));
        assert!("PDF/A-2B".parse::<PdfAConformance>().is_err());
        assert_eq!(PdfAConformance::PdfA3U.to_string(), "PDF/A-3U");
    }

    #[test]
    fn new_shell_declares_output_intent() {
        let shell =
            ConformantShell::create(PdfAConformance::PdfA3U, &OutputIntent::default(), &profile())
                .unwrap();
        assert_eq!(shell.page_count(), 0);

        let doc = shell.document();
        let catalog = doc.catalog().unwrap();
        let intents = catalog.get(b"OutputIntents").unwrap().as_array().unwrap();
        assert_eq!(intents.len(), 1);
        let oi = doc
            .get_dictionary(intents[0].as_reference().unwrap())
            .unwrap();
        assert_eq!(oi.get(b"S").unwrap().as_name().unwrap(), b"GTS_PDFA1");
        assert_eq!(
            oi.get(b"OutputConditionIdentifier").unwrap().as_str().unwrap(),
            b"Custom"
        );
        assert_eq!(oi.get(b"Info").unwrap().as_str().unwrap(), b"sRGB2014");
        assert!(oi.get(b"OutputCondition").is_err());

        let icc = doc
            .get_object(oi.get(b"DestOutputProfile").unwrap().as_reference().unwrap())
            .unwrap()
            .as_stream()
            .unwrap();
        assert_eq!(icc.dict.get(b"N").unwrap().as_i64().unwrap(), 3);
    }

    #[test]
    fn bad_parameters_are_rejected() {
        let garbage = InMemoryProfile::new(vec![1u8; 200]);
        assert!(matches!(
            ConformantShell::create(PdfAConformance::PdfA3U, &OutputIntent::default(), &garbage),
            Err(ShellError::Profile(_))
        ));
        assert!(matches!(
            ConformantShell::create(PdfAConformance::PdfA3A, &OutputIntent::default(), &profile()),
            Err(ShellError::UnsupportedConformance(_))
        ));
        let intent = OutputIntent {
            identifier: " ".into(),
            ..OutputIntent::default()
        };
        assert!(matches!(
            ConformantShell::create(PdfAConformance::PdfA3B, &intent, &profile()),
            Err(ShellError::MissingIdentifier)
        ));
    }

    #[test]
    fn metadata_tree_is_seeded_once() {
        let mut shell =
            ConformantShell::create(PdfAConformance::PdfA3B, &OutputIntent::default(), &profile())
                .unwrap();
        let meta = shell.metadata_tree().unwrap();
        assert_eq!(meta.get_property(ns::PDFA_ID, "conformance").unwrap(), Some("B"));
        meta.set_property(ns::DC, "format", Some("x"), PropertyOptions::Simple)
            .unwrap();
        assert_eq!(
            shell.metadata_tree().unwrap().get_property(ns::DC, "format").unwrap(),
            Some("x")
        );
    }

    #[test]
    fn finalized_shell_loads_back() {
        let mut shell =
            ConformantShell::create(PdfAConformance::PdfA3U, &OutputIntent::default(), &profile())
                .unwrap();
        shell.add_fingerprint(b"source");
        let bytes = shell.finalize().unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));

        let doc = Document::load_mem(&bytes).unwrap();
        let catalog = doc.catalog().unwrap();
        let metadata = doc
            .get_object(catalog.get(b"Metadata").unwrap().as_reference().unwrap())
            .unwrap()
            .as_stream()
            .unwrap();
        assert!(metadata.dict.get(b"Filter").is_err());
        let packet = String::from_utf8(metadata.content.clone()).unwrap();
        assert!(packet.contains("pdfaid:part>3<"));

        let ids = doc.trailer.get(b"ID").unwrap().as_array().unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].as_str().unwrap().len(), 16);
    }
}
