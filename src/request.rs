use crate::error::PackagingError;

/// Input of a packaging call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackagingRequest {
    /// The PDF whose pages make up the visible document.
    pub source: Vec<u8>,
    /// The invoice XML to embed, if any.
    pub payload: Option<Vec<u8>>,
}

/// A request that passed validation. Borrowed from the [`PackagingRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedRequest<'a> {
    pub source: &'a [u8],
    /// `None` when the payload was absent, empty or blank.
    pub payload: Option<&'a [u8]>,
}

impl PackagingRequest {
    pub fn new(source: impl Into<Vec<u8>>) -> Self {
        Self {
            source: source.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Reject an empty or whitespace-only source. An empty or whitespace-only
    /// payload is not an error; it is treated as absent.
    pub fn validate(&self) -> Result<ValidatedRequest<'_>, PackagingError> {
        validate(&self.source, self.payload.as_deref())
    }
}

pub(crate) fn validate<'a>(
    source: &'a [u8],
    payload: Option<&'a [u8]>,
) -> Result<ValidatedRequest<'a>, PackagingError> {
    if is_blank(source) {
        return Err(PackagingError::EmptySource);
    }
    Ok(ValidatedRequest {
        source,
        payload: payload.filter(|p| !is_blank(p)),
    })
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_or_blank_source_is_rejected() {
        for source in [&b""[..], b"   ", b"\r\n\t"] {
            assert!(matches!(
                PackagingRequest::new(source).validate(),
                Err(PackagingError::EmptySource)
            ));
        }
    }

    #[test]
    fn empty_payload_counts_as_absent() {
        let req = PackagingRequest::new(b"%PDF-1.7".to_vec()).with_payload(Vec::new());
        assert_eq!(req.validate().unwrap().payload, None);

        let req = PackagingRequest::new(b"%PDF-1.7".to_vec()).with_payload(b" \n".to_vec());
        assert_eq!(req.validate().unwrap().payload, None);

        let req = PackagingRequest::new(b"%PDF-1.7".to_vec()).with_payload(b"<Invoice/>".to_vec());
        assert_eq!(req.validate().unwrap().payload, Some(&b"<Invoice/>"[..]));
    }
}
