use super::XmpError;
use super::ns;

/// Bidirectional URI ↔ prefix table for one metadata tree.
///
/// Every URI maps to exactly one prefix and every prefix to exactly one URI.
/// Registering an existing pair again is a no-op; any other overlap is rejected.
#[derive(Debug, Clone)]
pub struct NamespaceRegistry {
    entries: Vec<(String, String)>,
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        Self::with_standard()
    }
}

impl NamespaceRegistry {
    /// An empty registry. Only useful for tests; real trees start from
    /// [`NamespaceRegistry::with_standard`].
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registry pre-seeded with the RDF/XMP core and the PDF/A schemas.
    pub fn with_standard() -> Self {
        let entries = [
            (ns::RDF, "rdf"),
            (ns::X, "x"),
            (ns::XML, "xml"),
            (ns::DC, "dc"),
            (ns::XMP, "xmp"),
            (ns::PDF, "pdf"),
            (ns::PDFA_ID, "pdfaid"),
            (ns::PDFA_EXTENSION, "pdfaExtension"),
            (ns::PDFA_SCHEMA, "pdfaSchema"),
            (ns::PDFA_PROPERTY, "pdfaProperty"),
            (ns::PDFA_TYPE, "pdfaType"),
            (ns::PDFA_FIELD, "pdfaField"),
        ]
        .into_iter()
        .map(|(uri, prefix)| (uri.to_string(), prefix.to_string()))
        .collect();
        Self { entries }
    }

    pub fn register(&mut self, uri: &str, prefix: &str) -> Result<(), XmpError> {
        if uri.is_empty() {
            return Err(XmpError::InvalidNamespace(uri.to_string()));
        }
        if !is_ncname(prefix) || prefix.eq_ignore_ascii_case("xmlns") {
            return Err(XmpError::InvalidPrefix(prefix.to_string()));
        }

        if let Some(existing) = self.prefix_for(uri) {
            if existing == prefix {
                return Ok(());
            }
            return Err(XmpError::NamespaceConflict {
                uri: uri.to_string(),
                existing: existing.to_string(),
                requested: prefix.to_string(),
            });
        }
        if let Some(existing) = self.uri_for(prefix) {
            return Err(XmpError::PrefixConflict {
                prefix: prefix.to_string(),
                existing: existing.to_string(),
                requested: uri.to_string(),
            });
        }

        self.entries.push((uri.to_string(), prefix.to_string()));
        Ok(())
    }

    /// Register `uri`, picking a free prefix when `preferred` is already bound
    /// elsewhere. Used when reading packets whose authors chose their own
    /// prefixes. Returns the prefix the URI ends up bound to.
    pub(crate) fn register_lenient(&mut self, uri: &str, preferred: &str) -> Result<String, XmpError> {
        if let Some(existing) = self.prefix_for(uri) {
            return Ok(existing.to_string());
        }
        if self.uri_for(preferred).is_none() && is_ncname(preferred) {
            self.register(uri, preferred)?;
            return Ok(preferred.to_string());
        }
        let mut n = 1;
        loop {
            let candidate = format!("ns{n}");
            if self.uri_for(&candidate).is_none() {
                self.register(uri, &candidate)?;
                return Ok(candidate);
            }
            n += 1;
        }
    }

    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(u, _)| u == uri)
            .map(|(_, p)| p.as_str())
    }

    pub fn uri_for(&self, prefix: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, p)| p == prefix)
            .map(|(u, _)| u.as_str())
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.prefix_for(uri).is_some()
    }
}

/// XML NCName check, restricted to the ASCII subset XMP prefixes use in practice.
fn is_ncname(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
