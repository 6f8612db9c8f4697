use serde::Serialize;

use crate::error::PackagingError;

/// Classification of a failed packaging call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    EmptySource,
    ShellCreation,
    SourceDocumentUnreadable,
    MetadataConstruction,
    Attachment,
    Serialization,
    Unexpected,
}

/// Result of a packaging call: either the finished document or a failure
/// message, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PackagingResult {
    Packaged { document: Vec<u8> },
    Failed { kind: FailureKind, message: String },
}

impl PackagingResult {
    pub fn is_packaged(&self) -> bool {
        matches!(self, Self::Packaged { .. })
    }

    pub fn document(&self) -> Option<&[u8]> {
        match self {
            Self::Packaged { document } => Some(document),
            Self::Failed { .. } => None,
        }
    }

    pub fn into_document(self) -> Option<Vec<u8>> {
        match self {
            Self::Packaged { document } => Some(document),
            Self::Failed { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Packaged { .. } => None,
            Self::Failed { kind, .. } => Some(*kind),
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Packaged { .. } => None,
            Self::Failed { message, .. } => Some(message),
        }
    }
}

impl From<PackagingError> for PackagingResult {
    fn from(err: PackagingError) -> Self {
        Self::Failed {
            kind: err.kind(),
            message: err.user_message(),
        }
    }
}

impl From<Result<Vec<u8>, PackagingError>> for PackagingResult {
    fn from(result: Result<Vec<u8>, PackagingError>) -> Self {
        match result {
            Ok(document) => Self::Packaged { document },
            Err(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_serializes_with_kind_and_message() {
        let result = PackagingResult::from(PackagingError::EmptySource);
        assert!(!result.is_packaged());
        assert_eq!(result.document(), None);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["kind"], "empty_source");
        assert_eq!(json["message"], "input PDF is empty");
    }

    #[test]
    fn success_carries_only_the_document() {
        let result = PackagingResult::from(Ok::<_, PackagingError>(vec![1u8, 2, 3]));
        assert_eq!(result.document(), Some(&[1u8, 2, 3][..]));
        assert_eq!(result.error_message(), None);
        assert_eq!(result.failure_kind(), None);
        assert_eq!(result.into_document(), Some(vec![1, 2, 3]));
    }
}
