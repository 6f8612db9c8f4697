#![allow(dead_code)]

use lopdf::{Document, Object, Stream, dictionary};

use facturx_packager::{InMemoryProfile, Packager};

pub const INVOICE_XML: &[u8] = b"<Invoice/>";

/// Header-only RGB display profile, enough for the output intent.
pub fn icc_profile() -> Vec<u8> {
    let mut p = vec![0u8; 132];
    p[0..4].copy_from_slice(&132u32.to_be_bytes());
    p[8..12].copy_from_slice(&0x0210_0000u32.to_be_bytes());
    p[12..16].copy_from_slice(b"mntr");
    p[16..20].copy_from_slice(b"RGB ");
    p[20..24].copy_from_slice(b"XYZ ");
    p[36..40].copy_from_slice(b"acsp");
    p
}

pub fn packager() -> Packager {
    Packager::new(InMemoryProfile::new(icc_profile()))
}

pub fn page_text(n: usize) -> Vec<u8> {
    format!("BT /F1 12 Tf 100 700 Td (Page {n}) Tj ET").into_bytes()
}

/// Create a PDF with `pages` pages in memory using lopdf. Page `n` shows
/// [`page_text`]`(n)`.
pub fn pdf_with_pages(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => Object::Reference(font_id),
        },
    });

    let mut kids = Vec::with_capacity(pages);
    for n in 1..=pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, page_text(n)));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Contents" => Object::Reference(content_id),
            "Resources" => Object::Reference(resources_id),
        });
        kids.push(Object::Reference(page_id));
    }
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => pages as i64,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).expect("save test PDF");
    output
}
