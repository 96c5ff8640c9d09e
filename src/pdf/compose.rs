//! Assembling one output document from pages of many sources.
//!
//! Pages are copied object-by-object: a source is renumbered above the
//! objects already collected, its page-tree attributes are flattened onto
//! each page, and the pages are re-parented under a fresh page tree when
//! the composer is finished. Objects nothing points at are pruned then.

use std::collections::{BTreeMap, HashSet};

use log::debug;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId};

use super::document::{inherited_attribute, page_ids, INHERITABLE_KEYS};
use super::embed::{embed_image, Placement};
use super::error::{ComposeError, Result};
use crate::source::{ImageFormat, SourceFile, SourceKind};

/// Handle to a source whose objects have been moved into a [`Composer`].
#[derive(Debug, Clone)]
pub struct Imported {
    pages: Vec<ObjectId>,
}

impl Imported {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[derive(Debug)]
pub struct Composer {
    objects: BTreeMap<ObjectId, Object>,
    next_id: u32,
    kids: Vec<ObjectId>,
    used: HashSet<ObjectId>,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

impl Composer {
    pub fn new() -> Self {
        Composer {
            objects: BTreeMap::new(),
            next_id: 1,
            kids: Vec::new(),
            used: HashSet::new(),
        }
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    fn add_object(&mut self, object: impl Into<Object>) -> ObjectId {
        let id = (self.next_id, 0);
        self.next_id += 1;
        self.objects.insert(id, object.into());
        id
    }

    /// Move every object of `source` into the composer without adding pages yet.
    pub fn import(&mut self, source: &Document) -> Imported {
        let mut doc = source.clone();

        // Inherited attributes would be lost once pages get a new parent
        for page_id in page_ids(&doc) {
            let missing: Vec<(&[u8], Object)> = INHERITABLE_KEYS
                .iter()
                .filter(|key| {
                    doc.get_dictionary(page_id)
                        .map(|dict| !dict.has(key))
                        .unwrap_or(false)
                })
                .filter_map(|key| Some((*key, inherited_attribute(&doc, page_id, key)?)))
                .collect();
            if let Ok(dict) = doc.get_dictionary_mut(page_id) {
                for (key, value) in missing {
                    dict.set(key, value);
                }
            }
        }

        doc.renumber_objects_with(self.next_id);
        self.next_id = doc.max_id + 1;

        let pages = page_ids(&doc);
        self.objects.append(&mut doc.objects);
        debug!("imported {} page(s)", pages.len());

        Imported { pages }
    }

    /// Append page `index` of an imported source. Returns the new page's ID.
    ///
    /// Appending the same page twice yields two independent page objects.
    pub fn push_page(&mut self, imported: &Imported, index: usize) -> Result<ObjectId> {
        let page_id = *imported
            .pages
            .get(index)
            .ok_or(ComposeError::PageOutOfRange {
                index,
                count: imported.pages.len(),
            })?;

        let id = if self.used.insert(page_id) {
            page_id
        } else {
            let copy = self
                .objects
                .get(&page_id)
                .cloned()
                .ok_or(ComposeError::MissingObject(page_id))?;
            self.add_object(copy)
        };

        self.kids.push(id);
        Ok(id)
    }

    /// Copy every page of `source`, in order.
    pub fn copy_all(&mut self, source: &Document) -> Result<Imported> {
        let imported = self.import(source);
        for index in 0..imported.page_count() {
            self.push_page(&imported, index)?;
        }
        Ok(imported)
    }

    /// Copy the given zero-based pages of `source`, in the given order.
    pub fn copy_pages(&mut self, source: &Document, indices: &[usize]) -> Result<Imported> {
        let imported = self.import(source);
        for &index in indices {
            self.push_page(&imported, index)?;
        }
        Ok(imported)
    }

    /// Add `delta` degrees to the rotation of an appended page.
    pub fn rotate_page(&mut self, page_id: ObjectId, delta: i64) -> Result<()> {
        let dict = self
            .objects
            .get_mut(&page_id)
            .ok_or(ComposeError::MissingObject(page_id))?
            .as_dict_mut()?;
        let current = dict.get(b"Rotate").and_then(Object::as_i64).unwrap_or(0);
        dict.set("Rotate", (current + delta).rem_euclid(360));
        Ok(())
    }

    /// Add an image as a page of its own, sized and centered by [`Placement`].
    pub fn add_image(&mut self, bytes: &[u8], format: ImageFormat) -> Result<ObjectId> {
        let mut image = embed_image(bytes, format)?;
        let placement = Placement::for_image(image.width, image.height);

        if let Some(mask) = image.smask.take() {
            let mask_id = self.add_object(mask);
            image.xobject.dict.set("SMask", mask_id);
        }
        let image_id = self.add_object(image.xobject);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        placement.width.into(),
                        0.into(),
                        0.into(),
                        placement.height.into(),
                        placement.x.into(),
                        placement.y.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = self.add_object(lopdf::Stream::new(
            lopdf::Dictionary::new(),
            content.encode()?,
        ));

        let page_id = self.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![
                0.into(),
                0.into(),
                placement.page_width.into(),
                placement.page_height.into(),
            ],
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
            "Contents" => content_id,
        });
        self.used.insert(page_id);
        self.kids.push(page_id);

        debug!(
            "image page {}x{} ({})",
            image.width,
            image.height,
            if placement.is_landscape() { "landscape" } else { "portrait" }
        );
        Ok(page_id)
    }

    /// Append a whole source file: every page of a PDF, or one page per image.
    ///
    /// Errors name the offending file.
    pub fn add_source(&mut self, source: &SourceFile) -> Result<()> {
        let result = match source.kind {
            SourceKind::Pdf => Document::load_mem(&source.bytes)
                .map_err(ComposeError::from)
                .and_then(|doc| self.copy_all(&doc).map(|_| ())),
            SourceKind::Image(format) => self.add_image(&source.bytes, format).map(|_| ()),
        };
        result.map_err(|e| ComposeError::for_source(source.name.clone(), e))
    }

    /// Build the output document with a fresh catalog and page tree.
    pub fn finish(self) -> Document {
        let mut doc = Document::with_version("1.7");
        doc.objects = self.objects;
        doc.max_id = self.next_id - 1;

        let pages_id = doc.new_object_id();
        for &kid in &self.kids {
            if let Ok(dict) = doc.get_dictionary_mut(kid) {
                dict.set("Parent", pages_id);
            }
        }

        let kids: Vec<Object> = self.kids.iter().map(|&id| Object::Reference(id)).collect();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => kids.len() as i64,
                "Kids" => kids,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let pruned = doc.prune_objects();
        debug!("pruned {} unreferenced object(s)", pruned.len());
        doc
    }
}

/// Concatenate whole sources into one document.
///
/// All-or-nothing: the first source that fails aborts the merge and the
/// error names it.
pub fn merge_sources(sources: &[SourceFile]) -> Result<Document> {
    if sources.is_empty() {
        return Err(ComposeError::InvalidInput("No input files provided".into()));
    }

    let mut composer = Composer::new();
    for (i, source) in sources.iter().enumerate() {
        debug!("processing file {}/{}: {}", i + 1, sources.len(), source.name);
        composer.add_source(source)?;
    }
    Ok(composer.finish())
}
