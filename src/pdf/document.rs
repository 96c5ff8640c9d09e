use anyhow::{Context, Result};
use lopdf::{Document, Object, ObjectId};
use std::path::Path;

use super::error::ComposeError;

/// Page attributes a page may inherit from its ancestors in the page tree.
pub(crate) const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

pub struct PdfDocument {
    pub doc: Document,
    pub name: String,
}

impl PdfDocument {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let doc = Document::load(path).with_context(|| format!("Failed to open PDF: {}", name))?;
        Ok(PdfDocument { doc, name })
    }

    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self, ComposeError> {
        let name = name.into();
        let doc = Document::load_mem(bytes)
            .map_err(|e| ComposeError::for_source(name.clone(), e.into()))?;
        Ok(PdfDocument { doc, name })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Page object IDs in page order
    pub fn page_ids(&self) -> Vec<ObjectId> {
        page_ids(&self.doc)
    }

    fn page_id(&self, index: usize) -> Result<ObjectId, ComposeError> {
        let ids = self.page_ids();
        ids.get(index)
            .copied()
            .ok_or(ComposeError::PageOutOfRange {
                index,
                count: ids.len(),
            })
    }

    /// Current rotation of a page in degrees, following the page tree.
    pub fn rotation(&self, index: usize) -> Result<i64, ComposeError> {
        let page_id = self.page_id(index)?;
        Ok(page_rotation(&self.doc, page_id))
    }

    /// Set the absolute rotation of a page, normalised into `0..360`.
    pub fn set_rotation(&mut self, index: usize, angle: i64) -> Result<(), ComposeError> {
        let page_id = self.page_id(index)?;
        self.doc
            .get_dictionary_mut(page_id)?
            .set("Rotate", angle.rem_euclid(360));
        Ok(())
    }

    /// Get metadata from the document info dictionary
    pub fn get_info(&self) -> PdfInfo {
        let mut info = PdfInfo::default();

        if let Ok(Object::Reference(info_ref)) = self.doc.trailer.get(b"Info") {
            if let Ok(Object::Dictionary(dict)) = self.doc.get_object(*info_ref) {
                info.title = get_string_from_dict(dict, b"Title");
                info.author = get_string_from_dict(dict, b"Author");
                info.creator = get_string_from_dict(dict, b"Creator");
                info.producer = get_string_from_dict(dict, b"Producer");
                info.creation_date = get_string_from_dict(dict, b"CreationDate");
            }
        }

        info.page_count = self.page_count();
        info
    }

    /// Compress and serialise a document to bytes.
    pub fn to_bytes(doc: &mut Document) -> Result<Vec<u8>, ComposeError> {
        doc.compress();
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)?;
        Ok(buffer)
    }

    /// Save to a file; nothing is left at `path` if serialisation fails.
    pub fn save<P: AsRef<Path>>(doc: &mut Document, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = Self::to_bytes(doc)
            .with_context(|| format!("Failed to save PDF: {}", path.display()))?;
        crate::output::write_atomic(path, &bytes)
    }
}

/// Page object IDs of `doc` ordered by page number.
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    // get_pages is a BTreeMap keyed by page number
    doc.get_pages().into_values().collect()
}

/// Look up `key` on a page or, failing that, on its nearest ancestor.
pub(crate) fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;
    // Guard against /Parent cycles in malformed files
    for _ in 0..64 {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

pub(crate) fn page_rotation(doc: &Document, page_id: ObjectId) -> i64 {
    inherited_attribute(doc, page_id, b"Rotate")
        .and_then(|obj| obj.as_i64().ok())
        .unwrap_or(0)
}

#[derive(Debug, Default, Clone)]
pub struct PdfInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub page_count: usize,
}

fn get_string_from_dict(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key).ok().and_then(|obj| match obj {
        Object::String(bytes, _) => decode_pdf_string(bytes),
        _ => None,
    })
}

fn decode_pdf_string(bytes: &[u8]) -> Option<String> {
    // UTF-16BE when the BOM is present, otherwise treat as Latin-1
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let u16_chars: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        String::from_utf16(&u16_chars).ok()
    } else {
        Some(bytes.iter().map(|&b| b as char).collect())
    }
}
