use serde::Serialize;
use std::error::Error as _;
use std::fmt;
use thiserror::Error;

use crate::outcome::FailureKind;
use crate::pdfa::{AttachmentError, FinalizeError, ShellError, TransplantError};
use crate::xmp::XmpError;

/// Steps of a packaging call, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackagingStage {
    Validating,
    BuildingShell,
    Transplanting,
    ExtendingMetadata,
    Embedding,
    Finalizing,
}

impl fmt::Display for PackagingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validating => "validating the request",
            Self::BuildingShell => "building the PDF/A-3 shell",
            Self::Transplanting => "copying pages",
            Self::ExtendingMetadata => "extending the metadata",
            Self::Embedding => "embedding the XML payload",
            Self::Finalizing => "finalizing the document",
        })
    }
}

/// A panic caught inside a packaging call.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PanicMessage(pub String);

/// Failure of a packaging call.
///
/// `Display` is a fixed one-line description of the failing stage; the
/// component error is available through [`std::error::Error::source`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PackagingError {
    /// The source PDF was missing, empty or only whitespace.
    #[error("input PDF is empty")]
    EmptySource,

    /// The output shell could not be created, usually a rejected ICC profile.
    #[error("failed to create the PDF/A-3 output document")]
    ShellCreation(#[source] ShellError),

    /// The source bytes are not a readable, unencrypted PDF.
    #[error("failed to read the source document")]
    SourceDocumentUnreadable(#[source] TransplantError),

    /// A namespace or property write into the XMP tree was rejected.
    #[error("failed to build the document metadata")]
    MetadataConstruction(#[source] XmpError),

    /// The payload could not be embedded or associated.
    #[error("failed to embed the XML payload")]
    Attachment(#[source] AttachmentError),

    /// Writing the finished document failed.
    #[error("failed to serialize the output document")]
    Serialization(#[source] FinalizeError),

    /// A panic inside the PDF toolkit, caught at the packaging boundary.
    #[error("unexpected failure while {stage}")]
    Unexpected {
        stage: PackagingStage,
        #[source]
        source: PanicMessage,
    },
}

impl PackagingError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::EmptySource => FailureKind::EmptySource,
            Self::ShellCreation(_) => FailureKind::ShellCreation,
            Self::SourceDocumentUnreadable(_) => FailureKind::SourceDocumentUnreadable,
            Self::MetadataConstruction(_) => FailureKind::MetadataConstruction,
            Self::Attachment(_) => FailureKind::Attachment,
            Self::Serialization(_) => FailureKind::Serialization,
            Self::Unexpected { .. } => FailureKind::Unexpected,
        }
    }

    /// The stage that failed.
    pub fn stage(&self) -> PackagingStage {
        match self {
            Self::EmptySource => PackagingStage::Validating,
            Self::ShellCreation(_) => PackagingStage::BuildingShell,
            Self::SourceDocumentUnreadable(_) => PackagingStage::Transplanting,
            Self::MetadataConstruction(_) => PackagingStage::ExtendingMetadata,
            Self::Attachment(_) => PackagingStage::Embedding,
            Self::Serialization(_) => PackagingStage::Finalizing,
            Self::Unexpected { stage, .. } => *stage,
        }
    }

    /// The user-visible message: the stage description, the proximate cause
    /// and, if there is one, the cause's own cause. One per line; deeper
    /// causes are not reported.
    pub fn user_message(&self) -> String {
        let mut lines = vec![self.to_string()];
        if let Some(cause) = self.source() {
            lines.push(cause.to_string());
            if let Some(nested) = cause.source() {
                lines.push(nested.to_string());
            }
        }
        lines.retain(|line| !line.trim().is_empty());
        lines.join("\n")
    }
}
