//! Detached page copies.
//!
//! A [`Page`] is produced by [`PdfDocument::copy_pages`](super::PdfDocument::copy_pages)
//! and consumed by [`PdfDocument::append_page`](super::PdfDocument::append_page).
//! It carries the page dictionary and the ids of every object reachable
//! from it. The objects themselves live in a pool shared by all pages of
//! one copy, so a font or image used by many pages is cloned once.
//! Appending assigns fresh ids in the destination, reusing the ids of
//! objects an earlier page from the same source already brought in.

use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::{PdfForgeError, Result};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Upper bound on page tree depth when resolving inherited attributes.
const MAX_TREE_DEPTH: usize = 64;

/// Identifies the document a page was copied from.
pub(super) type SourceKey = u64;

/// Destination ids of objects already imported, keyed by source document and source id.
pub(super) type ImportMap = HashMap<(SourceKey, ObjectId), ObjectId>;

/// A page copied out of a source document.
#[derive(Debug, Clone)]
pub struct Page {
    /// Document the page was copied from.
    source: SourceKey,
    /// Id of the page dictionary in the source document.
    root: ObjectId,
    /// Page dictionary with `/Parent` removed and inherited attributes resolved.
    dictionary: Dictionary,
    /// Source ids of the objects reachable from the page.
    dependencies: Vec<ObjectId>,
    /// Objects copied for this page and its siblings, keyed by source id.
    pool: Arc<BTreeMap<ObjectId, Object>>,
}

/// Copy the pages `page_ids` out of `source`, in order.
pub(super) fn copy_pages(
    source: &Document,
    key: SourceKey,
    page_ids: &[ObjectId],
) -> Result<Vec<Page>> {
    let mut pool = BTreeMap::new();
    let mut copies = Vec::with_capacity(page_ids.len());

    for &page_id in page_ids {
        let dictionary = detach(source, page_id)?;
        let dependencies = collect_dependencies(source, &dictionary, page_id, &mut pool);
        copies.push((page_id, dictionary, dependencies));
    }

    let pool = Arc::new(pool);
    Ok(copies
        .into_iter()
        .map(|(root, dictionary, dependencies)| Page {
            source: key,
            root,
            dictionary,
            dependencies,
            pool: Arc::clone(&pool),
        })
        .collect())
}

/// Clone a page dictionary without its `/Parent`, with inherited attributes resolved.
fn detach(source: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let original = source.get_dictionary(page_id).map_err(|e| {
        PdfForgeError::document_operation(format!(
            "Page object {page_id:?} is not a dictionary: {e}"
        ))
    })?;

    let mut dictionary = original.clone();
    dictionary.remove(b"Parent");

    for key in INHERITABLE_KEYS {
        if !dictionary.has(key)
            && let Some(value) = inherited_attribute(source, original, key)
        {
            dictionary.set(key.to_vec(), value);
        }
    }

    Ok(dictionary)
}

impl Page {
    /// Move this page into `dest` under the page tree node `parent`.
    ///
    /// Objects recorded in `imported` for the same source are referenced,
    /// not copied again. Returns the id of the page dictionary in `dest`.
    pub(super) fn insert_into(
        self,
        dest: &mut Document,
        parent: ObjectId,
        imported: &mut ImportMap,
    ) -> ObjectId {
        let mut ids = BTreeMap::new();
        let mut fresh = Vec::new();

        for &old_id in &self.dependencies {
            let new_id = *imported.entry((self.source, old_id)).or_insert_with(|| {
                let new_id = dest.new_object_id();
                fresh.push((old_id, new_id));
                new_id
            });
            ids.insert(old_id, new_id);
        }

        let page_id = dest.new_object_id();
        ids.insert(self.root, page_id);

        for (old_id, new_id) in fresh {
            if let Some(object) = self.pool.get(&old_id) {
                let mut object = object.clone();
                remap_references(&mut object, &ids);
                dest.objects.insert(new_id, object);
            }
        }

        let mut page = Object::Dictionary(self.dictionary);
        remap_references(&mut page, &ids);
        if let Object::Dictionary(ref mut dict) = page {
            dict.set("Parent", Object::Reference(parent));
        }
        dest.objects.insert(page_id, page);

        page_id
    }
}

/// Walk up the page tree looking for an inheritable attribute.
fn inherited_attribute(source: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(node_id) = parent {
        if depth >= MAX_TREE_DEPTH {
            break;
        }
        let node = source.get_dictionary(node_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    None
}

/// Collect the ids of every object reachable from `page`, except page tree nodes.
///
/// Objects not yet in `pool` are cloned into it. Page tree nodes are reached
/// through back references such as an annotation's `/P`; copying them would
/// drag the whole source tree along.
fn collect_dependencies(
    source: &Document,
    page: &Dictionary,
    page_id: ObjectId,
    pool: &mut BTreeMap<ObjectId, Object>,
) -> Vec<ObjectId> {
    let mut seen = BTreeSet::new();
    let mut dependencies = Vec::new();
    let mut pending = Vec::new();

    for (_, value) in page.iter() {
        push_references(value, &mut pending);
    }

    while let Some(id) = pending.pop() {
        if id == page_id || !seen.insert(id) {
            continue;
        }
        if let Some(object) = pool.get(&id) {
            push_references(object, &mut pending);
            dependencies.push(id);
            continue;
        }
        let Ok(object) = source.get_object(id) else {
            continue;
        };
        if is_page_tree_node(object) {
            continue;
        }
        push_references(object, &mut pending);
        pool.insert(id, object.clone());
        dependencies.push(id);
    }

    dependencies
}

fn push_references(object: &Object, pending: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => pending.push(*id),
        Object::Array(items) => {
            for item in items {
                push_references(item, pending);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                push_references(value, pending);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter() {
                push_references(value, pending);
            }
        }
        _ => {}
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type").and_then(Object::as_name),
            Ok(b"Page") | Ok(b"Pages")
        ),
        _ => false,
    }
}

/// Rewrite references through `ids`; references that were not copied become `null`.
fn remap_references(object: &mut Object, ids: &BTreeMap<ObjectId, ObjectId>) {
    match object {
        Object::Reference(id) => {
            let target = ids.get(id).copied();
            *object = match target {
                Some(new_id) => Object::Reference(new_id),
                None => Object::Null,
            };
        }
        Object::Array(items) => {
            for item in items.iter_mut() {
                remap_references(item, ids);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                remap_references(value, ids);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                remap_references(value, ids);
            }
        }
        _ => {}
    }
}
