//! The PDF utility operations: extract, rotate, mix, split, arrange, inspect.

use std::path::PathBuf;
use std::str::FromStr;

use log::{debug, warn};
use lopdf::Document;
use serde::Serialize;

use super::compose::Composer;
use super::document::PdfDocument;
use super::error::{ComposeError, Result};
use crate::page_range::{parse_page_indices, PageSelection};

/// Relative rotation accepted by the rotate tool.
pub const ROTATION_STEPS: [i64; 4] = [0, 90, 180, 270];

/// Copy the pages named by `spec` into a new document, in the order listed.
pub fn extract(source: &PdfDocument, spec: &str) -> Result<Document> {
    let indices = parse_page_indices(spec, source.page_count());
    if indices.is_empty() {
        return Err(ComposeError::InvalidInput(format!(
            "No valid pages in \"{}\" ({} pages)",
            spec,
            source.page_count()
        )));
    }

    let mut composer = Composer::new();
    composer.copy_pages(&source.doc, &indices)?;
    Ok(composer.finish())
}

/// Rotate the selected pages in place by `delta` degrees.
///
/// A page selected twice is rotated twice. Returns how many rotations
/// were applied.
pub fn rotate(source: &mut PdfDocument, selection: &PageSelection, delta: i64) -> Result<usize> {
    if !ROTATION_STEPS.contains(&delta) {
        return Err(ComposeError::InvalidInput(format!(
            "Rotation must be 0, 90, 180 or 270 degrees, got {}",
            delta
        )));
    }

    let indices = selection.indices(source.page_count());
    if indices.is_empty() {
        return Err(ComposeError::InvalidInput("No pages selected".into()));
    }

    for &index in &indices {
        let current = source.rotation(index)?;
        source.set_rotation(index, current + delta)?;
        debug!("page {}: {} -> {}", index + 1, current, (current + delta).rem_euclid(360));
    }
    Ok(indices.len())
}

/// Interleave two documents page by page: A1, B1, A2, B2, ...
///
/// Once the shorter document runs out the longer one continues alone.
pub fn mix(first: &PdfDocument, second: &PdfDocument) -> Result<Document> {
    let mut composer = Composer::new();
    let a = composer.import(&first.doc);
    let b = composer.import(&second.doc);

    for i in 0..a.page_count().max(b.page_count()) {
        if i < a.page_count() {
            composer.push_page(&a, i)?;
        }
        if i < b.page_count() {
            composer.push_page(&b, i)?;
        }
    }
    Ok(composer.finish())
}

/// Cut a document at sorted, deduplicated `points` into consecutive chunks
/// `[0, p1), [p1, p2), ..., [pn, page_count)`. Empty chunks are skipped.
pub fn split(source: &PdfDocument, points: &[usize]) -> Result<Vec<Document>> {
    let page_count = source.page_count();
    let mut chunks = Vec::new();
    let mut start = 0;

    for end in points.iter().copied().chain(std::iter::once(page_count)) {
        let end = end.min(page_count);
        if end <= start {
            continue;
        }
        let indices: Vec<usize> = (start..end).collect();
        let mut composer = Composer::new();
        composer.copy_pages(&source.doc, &indices)?;
        chunks.push(composer.finish());
        start = end;
    }

    debug!("split {} pages into {} chunk(s)", page_count, chunks.len());
    Ok(chunks)
}

/// One page of an arrangement: `file:page[:rotation]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageItem {
    pub file: PathBuf,
    /// 1-based
    pub page_number: usize,
    /// Degrees added to the page's current rotation
    pub rotation: i64,
}

impl FromStr for PageItem {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // Parse from the right so paths may contain ':'
        let mut parts = s.rsplitn(3, ':');
        let last = parts.next().unwrap_or_default();
        let middle = parts.next();
        let rest = parts.next();

        let (file, page, rotation) = match (rest, middle) {
            (Some(file), Some(page)) if last.parse::<i64>().is_ok() && page.parse::<usize>().is_ok() => {
                (file.to_string(), page, last)
            }
            (Some(file), Some(page)) => (format!("{}:{}", file, page), last, "0"),
            (None, Some(file)) => (file.to_string(), last, "0"),
            _ => return Err(format!("expected FILE:PAGE[:ROTATION], got \"{}\"", s)),
        };

        let page_number = page
            .parse::<usize>()
            .map_err(|_| format!("invalid page number \"{}\" in \"{}\"", page, s))?;
        let rotation = rotation
            .parse::<i64>()
            .map_err(|_| format!("invalid rotation \"{}\" in \"{}\"", rotation, s))?;

        Ok(PageItem {
            file: PathBuf::from(file),
            page_number,
            rotation,
        })
    }
}

/// Outcome of [`arrange`]: the document plus the items that were skipped.
pub struct Arrangement {
    pub document: Document,
    pub placed: usize,
    pub skipped: Vec<String>,
}

/// Build a document page by page from many files, rotating as asked.
///
/// An item that cannot be loaded or copied is logged and skipped; the
/// remaining items still make it into the output.
pub fn arrange(items: &[PageItem]) -> Result<Arrangement> {
    if items.is_empty() {
        return Err(ComposeError::InvalidInput("No pages provided".into()));
    }

    let mut composer = Composer::new();
    let mut skipped = Vec::new();

    for item in items {
        match place_item(&mut composer, item) {
            Ok(()) => {}
            Err(e) => {
                warn!(
                    "Skipping page {} from {}: {}",
                    item.page_number,
                    item.file.display(),
                    e
                );
                skipped.push(format!("{}:{}", item.file.display(), item.page_number));
            }
        }
    }

    let placed = composer.page_count();
    Ok(Arrangement {
        document: composer.finish(),
        placed,
        skipped,
    })
}

fn place_item(composer: &mut Composer, item: &PageItem) -> Result<()> {
    let bytes = std::fs::read(&item.file)?;
    let source = PdfDocument::from_bytes(item.file.display().to_string(), &bytes)?;
    let index = item
        .page_number
        .checked_sub(1)
        .ok_or(ComposeError::PageOutOfRange {
            index: 0,
            count: source.page_count(),
        })?;

    let imported = composer.import(&source.doc);
    let page_id = composer.push_page(&imported, index)?;
    if item.rotation != 0 {
        composer.rotate_page(page_id, item.rotation)?;
    }
    Ok(())
}

/// Page listing of a document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageListing {
    pub file_name: String,
    pub page_count: usize,
    pub pages: Vec<usize>,
}

pub fn inspect(source: &PdfDocument) -> PageListing {
    let page_count = source.page_count();
    PageListing {
        file_name: source.name.clone(),
        page_count,
        pages: (1..=page_count).collect(),
    }
}
