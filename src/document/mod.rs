//! Document model adapter.
//!
//! [`PdfDocument`] is the only type in the crate that touches `lopdf`
//! objects. Engines load documents, copy pages between them, append pages
//! and save, all through this module.
//!
//! # Examples
//!
//! ```no_run
//! use pdfforge::document::PdfDocument;
//!
//! # fn example(bytes: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let source = PdfDocument::load(bytes)?;
//! let mut first_page = PdfDocument::new();
//! for page in source.copy_pages(&[0])? {
//!     first_page.append_page(page)?;
//! }
//! let saved = first_page.save()?;
//! # Ok(())
//! # }
//! ```

mod page;


use std::sync::atomic::{AtomicU64, Ordering};

use lopdf::{Document, Object, ObjectId, dictionary};

pub use page::Page;
use page::{ImportMap, SourceKey};

use crate::error::{PdfForgeError, Result};
use crate::utils::file_stem;

/// PDF version written for documents created from scratch.
const PDF_VERSION: &str = "1.7";

/// Name used in errors when a document is loaded without a name.
const UNNAMED_DOCUMENT: &str = "<memory>";

static NEXT_SOURCE_KEY: AtomicU64 = AtomicU64::new(0);

fn next_source_key() -> SourceKey {
    NEXT_SOURCE_KEY.fetch_add(1, Ordering::Relaxed)
}

/// An uploaded document: its original file name and raw bytes.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Original file name as supplied by the client.
    pub name: String,
    /// Raw document bytes.
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    /// Create a source document.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Original name without directory components or extension.
    pub fn base_name(&self) -> String {
        file_stem(&self.name)
    }

    /// Parse the bytes, naming this document in any error.
    pub fn load(&self) -> Result<PdfDocument> {
        PdfDocument::load(&self.bytes).map_err(|err| err.for_document(&self.name))
    }
}

/// A parsed PDF document with an ordered page sequence.
#[derive(Debug)]
pub struct PdfDocument {
    inner: Document,
    /// Root node of the page tree; appended pages become its kids.
    pages_id: ObjectId,
    /// Page object ids in document order.
    page_ids: Vec<ObjectId>,
    /// Tags pages copied out of this document.
    key: SourceKey,
    /// Objects brought in by appended pages, per source document.
    imported: ImportMap,
}

impl PdfDocument {
    /// Create an empty document: a catalog and a page tree with no pages.
    pub fn new() -> Self {
        let mut inner = Document::with_version(PDF_VERSION);

        let pages_id = inner.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        });
        let catalog_id = inner.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        inner.trailer.set("Root", Object::Reference(catalog_id));

        Self::from_parts(inner, pages_id, Vec::new())
    }

    fn from_parts(inner: Document, pages_id: ObjectId, page_ids: Vec<ObjectId>) -> Self {
        Self {
            inner,
            pages_id,
            page_ids,
            key: next_source_key(),
            imported: ImportMap::new(),
        }
    }

    /// Parse a document from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PdfForgeError::MalformedDocument`] if the bytes are not a
    /// PDF `lopdf` can parse, if the document is encrypted, or if it has no
    /// page tree.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let inner = Document::load_mem(bytes)
            .map_err(|e| PdfForgeError::malformed(UNNAMED_DOCUMENT, e.to_string()))?;

        if inner.is_encrypted() {
            return Err(PdfForgeError::malformed(
                UNNAMED_DOCUMENT,
                "encrypted documents are not supported",
            ));
        }

        let pages_id = inner
            .catalog()
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
            .map_err(|e| {
                PdfForgeError::malformed(UNNAMED_DOCUMENT, format!("missing page tree: {e}"))
            })?;

        if inner.get_dictionary(pages_id).is_err() {
            return Err(PdfForgeError::malformed(
                UNNAMED_DOCUMENT,
                "page tree root is not a dictionary",
            ));
        }

        let page_ids = inner.get_pages().into_values().collect();
        Ok(Self::from_parts(inner, pages_id, page_ids))
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Copy the pages at the given 0-based indices.
    ///
    /// The result follows the order of `indices`. Objects shared between the
    /// copied pages are copied once. The document itself is not modified.
    ///
    /// # Errors
    ///
    /// Returns [`PdfForgeError::InvalidPageIndex`] if any index is outside
    /// `[0, page_count)`; nothing is copied in that case.
    pub fn copy_pages(&self, indices: &[usize]) -> Result<Vec<Page>> {
        let page_ids = indices
            .iter()
            .map(|&index| {
                self.page_ids
                    .get(index)
                    .copied()
                    .ok_or(PdfForgeError::InvalidPageIndex {
                        index,
                        page_count: self.page_ids.len(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        page::copy_pages(&self.inner, self.key, &page_ids)
    }

    /// Append a copied page at the end of the page sequence.
    ///
    /// Objects an earlier appended page already brought in from the same
    /// source are shared, not duplicated.
    pub fn append_page(&mut self, page: Page) -> Result<()> {
        let page_id = page.insert_into(&mut self.inner, self.pages_id, &mut self.imported);

        let pages_dict = self.inner.get_object_mut(self.pages_id)?.as_dict_mut()?;
        pages_dict.get_mut(b"Kids")?.as_array_mut()?.push(Object::Reference(page_id));

        let count = pages_dict.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
        pages_dict.set("Count", Object::Integer(count + 1));
        self.page_ids.push(page_id);

        Ok(())
    }

    /// Decoded content stream of the page at `index`.
    pub fn page_content(&self, index: usize) -> Result<Vec<u8>> {
        let page_id = *self.page_ids.get(index).ok_or(PdfForgeError::InvalidPageIndex {
            index,
            page_count: self.page_ids.len(),
        })?;

        Ok(self.inner.get_page_content(page_id)?)
    }

    /// Compress uncompressed streams before saving.
    pub fn compress(&mut self) {
        self.inner.compress();
    }

    /// Serialize the document.
    pub fn save(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfForgeError::document_operation(format!("Save failed: {e}")))?;
        Ok(buffer)
    }
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}
