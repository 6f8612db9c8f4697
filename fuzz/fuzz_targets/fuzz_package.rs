#![no_main]

use facturx_packager::{InMemoryProfile, Packager};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as source PDF: every call must end in a result.
    let mut p = vec![0u8; 132];
    p[0..4].copy_from_slice(&132u32.to_be_bytes());
    p[12..16].copy_from_slice(b"mntr");
    p[16..20].copy_from_slice(b"RGB ");
    p[36..40].copy_from_slice(b"acsp");

    let result = Packager::new(InMemoryProfile::new(p)).package(data, Some(&b"<Invoice/>"[..]));
    assert_ne!(result.document().is_some(), result.error_message().is_some());
});
