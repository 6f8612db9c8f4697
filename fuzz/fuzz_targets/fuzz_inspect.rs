#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as packaged PDF: must not panic.
    if let Ok(doc) = facturx_packager::PackagedDocument::load(data) {
        let _ = doc.invoice_xml();
        let _ = doc.metadata();
    }
});
