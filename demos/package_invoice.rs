//! Package a PDF and an invoice XML into a Factur-X PDF/A-3 document.
//!
//! ```text
//! FACTURX_ICC_PROFILE=/usr/share/color/icc/sRGB2014.icc \
//! RUST_LOG=debug cargo run --example package_invoice -- invoice.pdf factur-x.xml out.pdf
//! ```

use facturx_packager::{PackagedDocument, Packager, PackagerConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [pdf_path, xml_path, out_path] = args.as_slice() else {
        eprintln!("usage: package_invoice <source.pdf> <invoice.xml> <output.pdf>");
        std::process::exit(2);
    };

    let config = PackagerConfig::from_env().expect("configuration should be valid");
    let packager = Packager::from_config(&config);
    println!(
        "Packaging {pdf_path} as {} ({} profile)",
        packager.conformance(),
        packager.invoice_metadata().conformance_level
    );

    let pdf = std::fs::read(pdf_path).expect("source PDF should be readable");
    let xml = std::fs::read(xml_path).expect("invoice XML should be readable");

    let result = packager.package(&pdf, Some(xml.as_slice()));
    let Some(bytes) = result.document() else {
        eprintln!("Packaging failed:");
        eprintln!("{}", result.error_message().unwrap_or_default());
        std::process::exit(1);
    };
    std::fs::write(out_path, bytes).expect("output should be writable");

    // Read back what was written
    let doc = PackagedDocument::load(bytes).expect("output should load");
    println!("Wrote {out_path}: {} bytes, {} pages", bytes.len(), doc.page_count());
    for (name, id) in doc.embedded_files().expect("name tree") {
        let info = doc.attachment(id).expect("attachment");
        println!(
            "  {name}: {} bytes, {}, /AFRelationship {}",
            info.content.len(),
            info.mime_type.as_deref().unwrap_or("?"),
            info.relationship.as_deref().unwrap_or("?"),
        );
    }
}
