mod common;

use std::sync::Arc;

use common::{INVOICE_XML, icc_profile, pdf_with_pages};
use facturx_packager::{
    ColorProfileSource, FailureKind, IccProfileFile, PackagedDocument, Packager, PackagerConfig,
    PdfAConformance,
};

#[test]
fn profile_file_is_read_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sRGB2014.icc");
    std::fs::write(&path, icc_profile()).unwrap();

    let file = Arc::new(IccProfileFile::new(&path));
    let packager = Packager::new(Arc::clone(&file));
    assert!(!file.is_loaded());

    assert!(packager.package(&pdf_with_pages(1), Some(INVOICE_XML)).is_packaged());
    assert!(file.is_loaded());

    // Served from memory from now on.
    std::fs::remove_file(&path).unwrap();
    assert!(packager.package(&pdf_with_pages(1), Some(INVOICE_XML)).is_packaged());
}

#[test]
fn missing_profile_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("late.icc");

    let file = Arc::new(IccProfileFile::new(&path));
    let packager = Packager::new(Arc::clone(&file));

    let result = packager.package(&pdf_with_pages(1), Some(INVOICE_XML));
    assert_eq!(result.failure_kind(), Some(FailureKind::ShellCreation));
    let message = result.error_message().unwrap();
    assert!(message.starts_with("failed to create the PDF/A-3 output document"));
    assert!(message.contains("late.icc"), "{message}");
    assert!(!file.is_loaded());

    std::fs::write(&path, icc_profile()).unwrap();
    assert!(packager.package(&pdf_with_pages(1), Some(INVOICE_XML)).is_packaged());
    assert!(file.is_loaded());
}

#[test]
fn empty_profile_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.icc");
    std::fs::write(&path, b"").unwrap();

    let file = IccProfileFile::new(&path);
    assert!(file.profile_bytes().is_err());

    let result = Packager::new(file).package(&pdf_with_pages(1), None);
    assert_eq!(result.failure_kind(), Some(FailureKind::ShellCreation));
}

#[test]
fn packager_from_json_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("display.icc");
    std::fs::write(&path, icc_profile()).unwrap();

    let json = serde_json::json!({
        "icc_profile": path,
        "conformance": "PDF/A-3B",
        "output_intent": { "identifier": "sRGB IEC61966-2.1" },
        "invoice": { "conformance_level": "BASIC" },
    })
    .to_string();
    let config = PackagerConfig::from_json(&json).unwrap();
    let packager = Packager::from_config(&config);
    assert_eq!(packager.conformance(), PdfAConformance::PdfA3B);

    let bytes = packager
        .package(&pdf_with_pages(1), Some(INVOICE_XML))
        .into_document()
        .unwrap();
    let meta = PackagedDocument::load(&bytes).unwrap().metadata().unwrap().unwrap();
    assert_eq!(
        meta.get_property(facturx_packager::xmp::ns::PDFA_ID, "conformance")
            .unwrap(),
        Some("B")
    );
    assert_eq!(
        meta.get_property(facturx_packager::facturx::FACTURX_NAMESPACE, "ConformanceLevel")
            .unwrap(),
        Some("BASIC")
    );
}

#[test]
fn packagers_from_one_config_share_the_profile_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.icc");
    std::fs::write(&path, icc_profile()).unwrap();

    let config = PackagerConfig {
        icc_profile: path.clone(),
        ..PackagerConfig::default()
    };
    let first = Packager::from_config(&config);
    assert!(first.package(&pdf_with_pages(1), Some(INVOICE_XML)).is_packaged());
    assert!(IccProfileFile::shared(&path).is_loaded());

    // A packager built later never touches the file.
    std::fs::remove_file(&path).unwrap();
    let second = Packager::from_config(&config);
    assert!(second.package(&pdf_with_pages(1), Some(INVOICE_XML)).is_packaged());
}
