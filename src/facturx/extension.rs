use crate::xmp::{ArrayForm, PropertyOptions, XmpError, XmpMeta, XmpNode, ns};

use super::{InvoiceMetadata, PAYLOAD_FILENAME};

const SCHEMAS_BAG: &str = "pdfaExtension:schemas";

/// One row of an extension schema's `pdfaSchema:property` sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaProperty {
    pub name: String,
    pub value_type: String,
    /// `internal` or `external`.
    pub category: String,
    pub description: String,
}

impl SchemaProperty {
    /// A `Text` property in the `external` category.
    pub fn external_text(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_type: "Text".into(),
            category: "external".into(),
            description: description.into(),
        }
    }
}

/// A PDF/A extension schema description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSchema {
    pub schema: String,
    pub namespace_uri: String,
    pub prefix: String,
    /// Declared in order; written as an `rdf:Seq`.
    pub properties: Vec<SchemaProperty>,
}

/// (name, value, description) for each descriptive property, in declaration order.
fn descriptive_properties(invoice: &InvoiceMetadata) -> [(&'static str, &str, &'static str); 4] {
    [
        (
            "DocumentType",
            invoice.document_type.as_str(),
            "The type of the hybrid document in capital letters, e.g. INVOICE or ORDER",
        ),
        (
            "Version",
            invoice.version.as_str(),
            "The actual version of the standard applying to the embedded XML document",
        ),
        (
            "ConformanceLevel",
            invoice.conformance_level.as_str(),
            "The conformance level of the embedded XML document",
        ),
        (
            "DocumentFileName",
            PAYLOAD_FILENAME,
            "The name of the embedded XML document",
        ),
    ]
}

impl ExtensionSchema {
    /// The schema entry describing the Factur-X descriptive properties.
    pub fn for_invoice(invoice: &InvoiceMetadata) -> Self {
        Self {
            schema: invoice.schema_name.clone(),
            namespace_uri: invoice.namespace_uri.clone(),
            prefix: invoice.prefix.clone(),
            properties: descriptive_properties(invoice)
                .into_iter()
                .map(|(name, _, description)| SchemaProperty::external_text(name, description))
                .collect(),
        }
    }
}

/// Write the Factur-X descriptive properties and append their extension
/// schema entry.
///
/// The namespace is registered first, so nothing is written when it collides
/// with an existing binding. Both the properties and the schema rows come from
/// one declaration list and therefore always name the same properties in the
/// same order.
pub fn extend_metadata(meta: &mut XmpMeta, invoice: &InvoiceMetadata) -> Result<(), XmpError> {
    meta.register_namespace(&invoice.namespace_uri, &invoice.prefix)?;

    for (name, value, _) in descriptive_properties(invoice) {
        meta.set_property(&invoice.namespace_uri, name, Some(value), PropertyOptions::Simple)?;
    }

    append_extension_schema(meta, &ExtensionSchema::for_invoice(invoice))?;
    Ok(())
}

/// Append `schema` to the `pdfaExtension:schemas` bag, creating the bag if
/// needed. Existing entries are left untouched. Returns the 1-based index of
/// the new entry.
pub fn append_extension_schema(
    meta: &mut XmpMeta,
    schema: &ExtensionSchema,
) -> Result<usize, XmpError> {
    let ext = ns::PDFA_EXTENSION;
    meta.set_property(ext, SCHEMAS_BAG, None, PropertyOptions::Array(ArrayForm::Bag))?;

    let index = meta.count_array_items(ext, SCHEMAS_BAG)? + 1;
    let entry = format!("{SCHEMAS_BAG}[{index}]");
    meta.set_property(ext, &entry, None, PropertyOptions::Struct)?;
    meta.set_struct_field(ext, &entry, ns::PDFA_SCHEMA, "schema", &schema.schema)?;
    meta.set_struct_field(ext, &entry, ns::PDFA_SCHEMA, "namespaceURI", &schema.namespace_uri)?;
    meta.set_struct_field(ext, &entry, ns::PDFA_SCHEMA, "prefix", &schema.prefix)?;

    let seq = format!("{entry}/pdfaSchema:property");
    meta.set_property(ext, &seq, None, PropertyOptions::Array(ArrayForm::Seq))?;
    for (i, property) in schema.properties.iter().enumerate() {
        let row = format!("{seq}[{}]", i + 1);
        meta.set_property(ext, &row, None, PropertyOptions::Struct)?;
        meta.set_struct_field(ext, &row, ns::PDFA_PROPERTY, "name", &property.name)?;
        meta.set_struct_field(ext, &row, ns::PDFA_PROPERTY, "valueType", &property.value_type)?;
        meta.set_struct_field(ext, &row, ns::PDFA_PROPERTY, "category", &property.category)?;
        meta.set_struct_field(ext, &row, ns::PDFA_PROPERTY, "description", &property.description)?;
    }

    Ok(index)
}

/// Property names, in order, of the first extension schema entry declaring
/// `namespace_uri`. `None` when no entry declares it.
pub fn registered_property_names(meta: &XmpMeta, namespace_uri: &str) -> Option<Vec<String>> {
    let schemas = meta.node(ns::PDFA_EXTENSION, SCHEMAS_BAG).ok()??.items()?;

    let entry = schemas.iter().find(|entry| {
        field(entry, ns::PDFA_SCHEMA, "namespaceURI").and_then(XmpNode::as_simple)
            == Some(namespace_uri)
    })?;
    let rows = field(entry, ns::PDFA_SCHEMA, "property")?.items()?;

    Some(
        rows.iter()
            .filter_map(|row| field(row, ns::PDFA_PROPERTY, "name")?.as_simple())
            .map(str::to_string)
            .collect(),
    )
}

fn field<'a>(node: &'a XmpNode, namespace: &str, name: &str) -> Option<&'a XmpNode> {
    node.fields()?
        .iter()
        .find(|f| f.namespace == namespace && f.name == name)
        .map(|f| &f.value)
}
