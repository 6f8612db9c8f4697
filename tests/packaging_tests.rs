mod common;

use common::{INVOICE_XML, packager, page_text, pdf_with_pages};
use facturx_packager::xmp::{XmpField, XmpMeta, ns};
use facturx_packager::{
    FailureKind, PAYLOAD_FILENAME, PackagedDocument, PackagingRequest, ZugferdProfile,
};

fn package(pages: usize, payload: Option<&[u8]>) -> PackagedDocument {
    let result = packager().package(&pdf_with_pages(pages), payload);
    let bytes = result.into_document().expect("packaging succeeds");
    PackagedDocument::load(&bytes).expect("output loads")
}

// ---------------------------------------------------------------------------
// Successful packaging
// ---------------------------------------------------------------------------

#[test]
fn one_page_with_invoice() {
    let doc = package(1, Some(INVOICE_XML));

    assert_eq!(doc.page_count(), 1);
    assert_eq!(doc.output_intent_count(), 1);

    let meta = doc.metadata().unwrap().expect("XMP packet present");
    assert_eq!(meta.get_property(ns::PDFA_ID, "part").unwrap(), Some("3"));
    assert_eq!(meta.get_property(ns::PDFA_ID, "conformance").unwrap(), Some("U"));

    let names = doc.embedded_files().unwrap();
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].0, PAYLOAD_FILENAME);

    let info = doc.attachment(names[0].1).unwrap();
    assert_eq!(info.content, INVOICE_XML);
    assert_eq!(info.size, Some(INVOICE_XML.len() as i64));
    assert_eq!(info.mime_type.as_deref(), Some("application/xml"));
    assert_eq!(info.relationship.as_deref(), Some("Alternative"));
    assert_eq!(info.description.as_deref(), Some("ZUGFeRD invoice"));
    assert_eq!(info.file_name.as_deref(), Some(PAYLOAD_FILENAME));
    assert!(info.modified.as_deref().is_some_and(|d| d.starts_with("D:")));

    assert_eq!(doc.declared_profile().unwrap(), Some(ZugferdProfile::Extended));
}

#[test]
fn associated_file_aliases_the_name_tree_entry() {
    let doc = package(2, Some(INVOICE_XML));

    let names = doc.embedded_files().unwrap();
    let af = doc.associated_files().unwrap();
    assert_eq!(af.len(), 1);
    assert_eq!(af[0], names[0].1, "AF and EmbeddedFiles must share one filespec");
}

#[test]
fn pages_keep_their_content_and_order() {
    let doc = package(5, Some(INVOICE_XML));

    let contents = doc.page_contents().unwrap();
    assert_eq!(contents.len(), 5);
    for (i, content) in contents.iter().enumerate() {
        assert_eq!(content, &page_text(i + 1), "page {}", i + 1);
    }
}

#[test]
fn invoice_xml_is_found_by_name() {
    let xml: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?><rsm:CrossIndustryInvoice/>"#;
    let doc = package(1, Some(xml));
    assert_eq!(doc.invoice_xml().unwrap(), xml);
}

#[test]
fn request_and_direct_call_agree() {
    let request = PackagingRequest::new(pdf_with_pages(2)).with_payload(INVOICE_XML);
    let result = packager().package_request(&request);

    let doc = PackagedDocument::load(result.document().unwrap()).unwrap();
    assert_eq!(doc.page_count(), 2);
    assert_eq!(doc.invoice_xml().unwrap(), INVOICE_XML);
}

// ---------------------------------------------------------------------------
// No payload
// ---------------------------------------------------------------------------

#[test]
fn empty_payload_skips_the_attachment() {
    for payload in [None, Some(&b""[..]), Some(&b"  \n"[..])] {
        let doc = package(3, payload);

        assert_eq!(doc.page_count(), 3);
        assert!(doc.embedded_files().unwrap().is_empty());
        assert!(doc.associated_files().unwrap().is_empty());
        assert!(doc.invoice_xml().is_err());

        // The Factur-X schema is declared whether or not a payload was embedded.
        let meta = doc.metadata().unwrap().unwrap();
        assert_eq!(
            meta.get_property(facturx_packager::facturx::FACTURX_NAMESPACE, "DocumentType")
                .unwrap(),
            Some("INVOICE")
        );
    }
}

#[test]
fn source_without_pages_still_packages() {
    let doc = package(0, Some(INVOICE_XML));
    assert_eq!(doc.page_count(), 0);
    assert_eq!(doc.invoice_xml().unwrap(), INVOICE_XML);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn empty_source_is_rejected() {
    let result = packager().package(b"", Some(INVOICE_XML));
    assert!(!result.is_packaged());
    assert_eq!(result.failure_kind(), Some(FailureKind::EmptySource));
    assert!(result.error_message().unwrap().contains("empty"));
}

#[test]
fn garbage_source_is_unreadable() {
    let result = packager().package(b"this is not a PDF", Some(INVOICE_XML));
    assert_eq!(
        result.failure_kind(),
        Some(FailureKind::SourceDocumentUnreadable)
    );
    assert!(result.document().is_none());
    assert!(
        result
            .error_message()
            .unwrap()
            .starts_with("failed to read the source document")
    );
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn repeated_calls_are_independent() {
    let packager = packager();
    let pdf = pdf_with_pages(2);

    let first = packager.package(&pdf, Some(INVOICE_XML)).into_document().unwrap();
    let second = packager.package(&pdf, Some(INVOICE_XML)).into_document().unwrap();

    for bytes in [&first, &second] {
        let doc = PackagedDocument::load(bytes).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.embedded_files().unwrap().len(), 1);
        assert_eq!(doc.associated_files().unwrap().len(), 1);
    }

    let id = |bytes: &[u8]| {
        PackagedDocument::load(bytes)
            .unwrap()
            .document()
            .trailer
            .get(b"ID")
            .and_then(|id| id.as_array())
            .map(|ids| ids.iter().map(|s| s.as_str().unwrap().to_vec()).collect::<Vec<_>>())
            .unwrap()
    };
    assert_eq!(id(first.as_slice()), id(second.as_slice()));

    let (a, b) = (
        PackagedDocument::load(&first).unwrap(),
        PackagedDocument::load(&second).unwrap(),
    );
    assert_eq!(a.page_contents().unwrap(), b.page_contents().unwrap());
    assert_eq!(a.invoice_xml().unwrap(), b.invoice_xml().unwrap());

    let (meta_a, meta_b) = (a.metadata().unwrap().unwrap(), b.metadata().unwrap().unwrap());
    assert_eq!(undated_properties(&meta_a), undated_properties(&meta_b));
    assert!(undated_properties(&meta_a).len() < meta_a.properties().len());
}

/// Top-level XMP properties without the `xmp:*Date` timestamps.
fn undated_properties(meta: &XmpMeta) -> Vec<XmpField> {
    meta.properties()
        .iter()
        .filter(|p| !(p.namespace == ns::XMP && p.name.ends_with("Date")))
        .cloned()
        .collect()
}

#[test]
fn packaged_output_can_be_packaged_again() {
    let once = packager()
        .package(&pdf_with_pages(2), Some(INVOICE_XML))
        .into_document()
        .unwrap();
    let twice = packager()
        .package(&once, Some(INVOICE_XML))
        .into_document()
        .unwrap();

    let doc = PackagedDocument::load(&twice).unwrap();
    assert_eq!(doc.page_count(), 2);
    assert_eq!(doc.embedded_files().unwrap().len(), 1);
    assert_eq!(doc.output_intent_count(), 1);
}
