//! PDF merge
//!
//! Combines multiple PDFs into a single document, in input order.

use std::collections::BTreeMap;

use lopdf::{Document, Object, ObjectId};
use tracing::debug;

use crate::error::PdfSuiteError;

/// Merge multiple PDFs into one
///
/// The algorithm:
/// 1. If empty, return error
/// 2. If single document, return it as-is
/// 3. Use the first document as the destination
/// 4. For each further document:
///    a. Offset its object ids past the destination's highest id
///    b. Import all objects with remapped references
///    c. Append its pages to the destination page list
/// 5. Point every page at the destination page tree, compress and save
pub fn merge_documents(documents: Vec<Vec<u8>>) -> Result<Vec<u8>, PdfSuiteError> {
    let mut documents = documents.into_iter();
    let Some(first) = documents.next() else {
        return Err(PdfSuiteError::OperationError(
            "No documents to merge".into(),
        ));
    };
    let rest: Vec<Vec<u8>> = documents.collect();
    if rest.is_empty() {
        return Ok(first);
    }

    let mut dest = Document::load_mem(&first)
        .map_err(|e| PdfSuiteError::ParseError(format!("Failed to load document 0: {}", e)))?;
    let mut dest_max_id = dest.max_id;
    let mut dest_page_refs = page_references(&dest);

    for (i, bytes) in rest.iter().enumerate() {
        let source = Document::load_mem(bytes).map_err(|e| {
            PdfSuiteError::ParseError(format!("Failed to load document {}: {}", i + 1, e))
        })?;
        let source_pages = page_references(&source);
        let id_offset = dest_max_id;
        debug!(document = i + 1, pages = source_pages.len(), id_offset, "Merging document");

        let remapped: BTreeMap<ObjectId, Object> = source
            .objects
            .into_iter()
            .map(|(old_id, object)| ((old_id.0 + id_offset, old_id.1), remap_object_refs(object, id_offset)))
            .collect();
        dest.objects.extend(remapped);

        dest_page_refs.extend(
            source_pages
                .into_iter()
                .map(|(num, gen)| (num + id_offset, gen)),
        );
        dest_max_id = (source.max_id + id_offset).max(dest_max_id);
    }

    update_page_tree(&mut dest, &dest_page_refs)?;
    dest.max_id = dest_max_id;

    // Orphaned page trees and catalogs from the sources
    dest.prune_objects();
    dest.compress();

    let mut buffer = Vec::new();
    dest.save_to(&mut buffer)
        .map_err(|e| PdfSuiteError::OperationError(format!("Failed to save merged PDF: {}", e)))?;

    Ok(buffer)
}

/// Page object ids in page order
fn page_references(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().values().copied().collect()
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Replace the destination's page list and re-parent every page to it
fn update_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> Result<(), PdfSuiteError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| PdfSuiteError::OperationError("No Root in trailer".into()))?;

    let pages_id = doc
        .get_dictionary(catalog_id)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| PdfSuiteError::OperationError("No Pages in catalog".into()))?;

    match doc.objects.get_mut(&pages_id) {
        Some(Object::Dictionary(pages_dict)) => {
            let kids = page_refs
                .iter()
                .map(|&id| Object::Reference(id))
                .collect::<Vec<_>>();
            pages_dict.set("Kids", Object::Array(kids));
            pages_dict.set("Count", Object::Integer(page_refs.len() as i64));
        }
        _ => {
            return Err(PdfSuiteError::OperationError(
                "Invalid pages dictionary".into(),
            ))
        }
    }

    // Imported pages may inherit MediaBox/Resources from their old parent
    for page_id in page_refs {
        let inherited = inherited_attributes(doc, *page_id);
        if let Some(Object::Dictionary(page)) = doc.objects.get_mut(page_id) {
            for (key, value) in inherited {
                if !page.has(&key) {
                    page.set(key, value);
                }
            }
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    Ok(())
}

/// Inheritable page attributes found on a page's ancestors
fn inherited_attributes(doc: &Document, page_id: ObjectId) -> Vec<(Vec<u8>, Object)> {
    const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];
    let mut found: Vec<(Vec<u8>, Object)> = Vec::new();
    let mut current = doc
        .get_dictionary(page_id)
        .and_then(|page| page.get(b"Parent"))
        .and_then(Object::as_reference)
        .ok();

    for _ in 0..32 {
        let Some(id) = current else { break };
        let Ok(node) = doc.get_dictionary(id) else {
            break;
        };
        for key in INHERITABLE {
            if found.iter().all(|(k, _)| k.as_slice() != key) {
                if let Ok(value) = node.get(key) {
                    found.push((key.to_vec(), value.clone()));
                }
            }
        }
        current = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    found
}
