#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary text as XMP packet: must not panic.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = facturx_packager::xmp::XmpMeta::parse(s);
    }
});
