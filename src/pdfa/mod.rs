//! PDF/A-3 document assembly on top of `lopdf`.
//!
//! A [`ConformantShell`] is a fresh document declared as PDF/A-3 and bound to
//! one output intent. Pages are copied into it from a source document with
//! [`copy_all_pages`], files are attached with [`embed_file`], and
//! [`ConformantShell::finalize`] writes the XMP packet and serializes it.

mod attach;
mod shell;
mod transplant;

pub use attach::{
    AfRelationship, AttachmentError, EmbeddedFileSpec, FileSpecHandle, append_associated_file,
    attach_file, build_embedded_file_spec, embed_file,
};
pub use shell::{ConformantShell, FinalizeError, OutputIntent, PdfAConformance, ShellError};
pub use transplant::{TransplantError, copy_all_pages, copy_pages, open_document};

use chrono::{DateTime, FixedOffset};

/// Format a timestamp in PDF date syntax, e.g. `D:20250301143000+01'00'`.
pub fn pdf_date(dt: &DateTime<FixedOffset>) -> String {
    let offset = dt.offset().local_minus_utc();
    let sign = if offset < 0 { '-' } else { '+' };
    let offset = offset.abs();
    format!(
        "D:{}{sign}{:02}'{:02}'",
        dt.format("%Y%m%d%H%M%S"),
        offset / 3600,
        (offset % 3600) / 60
    )
}
