mod common;

use common::{INVOICE_XML, packager, pdf_with_pages};
use facturx_packager::facturx::{
    ExtensionSchema, FACTURX_NAMESPACE, SchemaProperty, append_extension_schema, extend_metadata,
    registered_property_names,
};
use facturx_packager::xmp::{XmpMeta, XmpNode, ns};
use facturx_packager::{
    FailureKind, InvoiceMetadata, PackagedDocument, PdfAConformance, ZugferdProfile,
};

fn packaged_metadata(packager: &facturx_packager::Packager) -> XmpMeta {
    let bytes = packager
        .package(&pdf_with_pages(1), Some(INVOICE_XML))
        .into_document()
        .expect("packaging succeeds");
    PackagedDocument::load(&bytes)
        .unwrap()
        .metadata()
        .unwrap()
        .expect("XMP packet present")
}

/// Indented outline of a node, field names without prefixes.
fn outline(node: &XmpNode, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    match node {
        XmpNode::Simple(value) => {
            out.push(' ');
            out.push_str(value);
            out.push('\n');
        }
        XmpNode::Struct(fields) => {
            out.push('\n');
            for field in fields {
                out.push_str(&format!("{pad}{}:", field.name));
                outline(&field.value, depth + 1, out);
            }
        }
        XmpNode::Array(_, items) => {
            out.push('\n');
            for (i, item) in items.iter().enumerate() {
                out.push_str(&format!("{pad}[{}]", i + 1));
                outline(item, depth + 1, out);
            }
        }
    }
}

fn extension_outline(meta: &XmpMeta) -> String {
    let schemas = meta
        .node(ns::PDFA_EXTENSION, "pdfaExtension:schemas")
        .unwrap()
        .expect("extension schemas present");
    let mut out = String::from("schemas");
    outline(schemas, 0, &mut out);
    out
}

// ---------------------------------------------------------------------------
// Packaged output
// ---------------------------------------------------------------------------

#[test]
fn facturx_extension_schema() {
    let meta = packaged_metadata(&packager());
    insta::assert_snapshot!(extension_outline(&meta));
}

#[test]
fn descriptive_properties_match_schema_rows() {
    let meta = packaged_metadata(&packager());

    let declared = registered_property_names(&meta, FACTURX_NAMESPACE).unwrap();
    let written: Vec<String> = meta
        .property_names(FACTURX_NAMESPACE)
        .into_iter()
        .map(str::to_string)
        .collect();
    assert_eq!(declared, written);
    assert_eq!(
        declared,
        ["DocumentType", "Version", "ConformanceLevel", "DocumentFileName"]
    );

    assert_eq!(meta.get_property(FACTURX_NAMESPACE, "DocumentType").unwrap(), Some("INVOICE"));
    assert_eq!(meta.get_property(FACTURX_NAMESPACE, "Version").unwrap(), Some("1.0"));
    assert_eq!(
        meta.get_property(FACTURX_NAMESPACE, "ConformanceLevel").unwrap(),
        Some("EXTENDED")
    );
    assert_eq!(
        meta.get_property(FACTURX_NAMESPACE, "DocumentFileName").unwrap(),
        Some("factur-x.xml")
    );
}

#[test]
fn pdfa_identification_and_document_properties() {
    let meta = packaged_metadata(&packager().with_conformance(PdfAConformance::PdfA3B));

    assert_eq!(meta.get_property(ns::PDFA_ID, "part").unwrap(), Some("3"));
    assert_eq!(meta.get_property(ns::PDFA_ID, "conformance").unwrap(), Some("B"));
    assert_eq!(meta.get_property(ns::DC, "format").unwrap(), Some("application/pdf"));

    let producer = meta.get_property(ns::PDF, "Producer").unwrap().unwrap();
    assert!(producer.starts_with("facturx-packager"));

    let created = meta.get_property(ns::XMP, "CreateDate").unwrap().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(created).is_ok(), "{created}");
    assert_eq!(meta.get_property(ns::XMP, "ModifyDate").unwrap(), Some(created));
}

#[test]
fn profile_level_is_declared() {
    let packager = packager()
        .with_invoice_metadata(InvoiceMetadata::for_profile(ZugferdProfile::EN16931));
    let meta = packaged_metadata(&packager);

    assert_eq!(
        meta.get_property(FACTURX_NAMESPACE, "ConformanceLevel").unwrap(),
        Some("EN 16931")
    );
}

#[test]
fn reserved_prefix_fails_metadata_construction() {
    let invoice = InvoiceMetadata {
        prefix: "pdf".into(),
        ..InvoiceMetadata::default()
    };
    let result = packager()
        .with_invoice_metadata(invoice)
        .package(&pdf_with_pages(1), Some(INVOICE_XML));

    assert_eq!(result.failure_kind(), Some(FailureKind::MetadataConstruction));
    assert!(result.document().is_none());
}

// ---------------------------------------------------------------------------
// Extending an existing tree
// ---------------------------------------------------------------------------

#[test]
fn extending_keeps_existing_schemas() {
    let mut meta = XmpMeta::new();
    meta.register_namespace("http://example.com/ns/acme/1.0/", "acme")
        .unwrap();
    let acme = ExtensionSchema {
        schema: "ACME archive schema".into(),
        namespace_uri: "http://example.com/ns/acme/1.0/".into(),
        prefix: "acme".into(),
        properties: vec![SchemaProperty::external_text("Batch", "Archive batch number")],
    };
    assert_eq!(append_extension_schema(&mut meta, &acme).unwrap(), 1);

    extend_metadata(&mut meta, &InvoiceMetadata::default()).unwrap();

    assert_eq!(
        meta.count_array_items(ns::PDFA_EXTENSION, "pdfaExtension:schemas")
            .unwrap(),
        2
    );
    assert_eq!(
        registered_property_names(&meta, "http://example.com/ns/acme/1.0/").unwrap(),
        ["Batch"]
    );
    assert_eq!(
        registered_property_names(&meta, FACTURX_NAMESPACE).unwrap().len(),
        4
    );

    // Survives a serialize/parse cycle.
    let reparsed = XmpMeta::parse(&meta.serialize().unwrap()).unwrap();
    assert_eq!(
        reparsed
            .count_array_items(ns::PDFA_EXTENSION, "pdfaExtension:schemas")
            .unwrap(),
        2
    );
}
