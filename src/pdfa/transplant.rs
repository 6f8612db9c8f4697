use lopdf::{Dictionary, Document, Object, ObjectId};
use std::ops::RangeInclusive;
use thiserror::Error;

use super::shell::ConformantShell;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `/Parent` chains.
const MAX_TREE_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum TransplantError {
    #[error("source is not a readable PDF")]
    Parse(#[source] lopdf::Error),

    #[error("source PDF is encrypted")]
    Encrypted,

    #[error("page range {start}..={end} is outside the source's {count} pages")]
    Range { start: u32, end: u32, count: usize },

    #[error("malformed page tree: {0}")]
    Structure(String),
}

/// Parse a source document.
pub fn open_document(bytes: &[u8]) -> Result<Document, TransplantError> {
    let doc = Document::load_mem(bytes).map_err(TransplantError::Parse)?;
    if doc.is_encrypted() {
        return Err(TransplantError::Encrypted);
    }
    Ok(doc)
}

/// Copy every page of `source`, in order, into `shell`. Returns the number of
/// pages copied, which is zero for a document without pages.
pub fn copy_all_pages(
    source: Document,
    shell: &mut ConformantShell,
) -> Result<usize, TransplantError> {
    let count = source.get_pages().len() as u32;
    if count == 0 {
        return Ok(0);
    }
    copy_pages(source, 1..=count, shell)
}

/// Copy pages `range` (1-based, inclusive) of `source` into `shell`.
///
/// All source objects are imported under fresh object numbers; content
/// streams and resources are carried over byte for byte. Attributes the pages
/// inherited from the source page tree are set on each page directly, since
/// the pages are re-parented under the shell's page tree. Objects only the
/// source catalog reached are dropped when the shell is finalized.
pub fn copy_pages(
    mut source: Document,
    range: RangeInclusive<u32>,
    shell: &mut ConformantShell,
) -> Result<usize, TransplantError> {
    let pages = source.get_pages();
    let (start, end) = (*range.start(), *range.end());
    if start == 0 || start > end || end as usize > pages.len() {
        return Err(TransplantError::Range {
            start,
            end,
            count: pages.len(),
        });
    }
    let selected: Vec<ObjectId> = pages
        .range(start..=end)
        .map(|(_, &id)| id)
        .collect();

    for &id in &selected {
        materialise_inherited(&mut source, id)?;
    }

    let dst = shell.document_mut();
    source.renumber_objects_with(dst.max_id + 1);
    let renumbered = source.get_pages();
    let page_ids: Vec<ObjectId> = renumbered
        .range(start..=end)
        .map(|(_, &id)| id)
        .collect();
    if source.max_id > dst.max_id {
        dst.max_id = source.max_id;
    }
    dst.objects.extend(source.objects);

    shell
        .adopt_pages(&page_ids)
        .map_err(TransplantError::Structure)?;

    tracing::debug!(pages = page_ids.len(), "pages_copied");
    Ok(page_ids.len())
}

fn materialise_inherited(doc: &mut Document, page_id: ObjectId) -> Result<(), TransplantError> {
    let page = doc.get_dictionary(page_id).map_err(|e| structure(page_id, e))?;
    let missing: Vec<(&[u8], Object)> = INHERITABLE
        .iter()
        .filter(|key| !page.has(key))
        .filter_map(|&key| inherited(doc, page, key).map(|value| (key, value)))
        .collect();

    if !page.has(b"MediaBox") && !missing.iter().any(|(key, _)| *key == b"MediaBox") {
        return Err(TransplantError::Structure(format!(
            "page {} {} has no MediaBox",
            page_id.0, page_id.1
        )));
    }

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| structure(page_id, e))?;
    for (key, value) in missing {
        page.set(key.to_vec(), value);
    }
    Ok(())
}

fn inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

fn structure(id: ObjectId, e: lopdf::Error) -> TransplantError {
    TransplantError::Structure(format!("page {} {}: {e}", id.0, id.1))
}
