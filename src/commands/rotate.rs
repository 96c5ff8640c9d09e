use crate::output::resolve;
use crate::page_range::PageSelection;
use crate::pdf::{tools, PdfDocument};
use anyhow::Result;
use std::path::{Path, PathBuf};

pub fn run<P: AsRef<Path>>(
    input: P,
    pages: &str,
    degrees: i64,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut doc = PdfDocument::open(&input)?;

    let selection = PageSelection::parse(pages);
    let rotated = tools::rotate(&mut doc, &selection, degrees)?;

    let output = resolve(output, || "rotated.pdf".to_string());
    PdfDocument::save(&mut doc.doc, &output)?;

    println!(
        "Rotated {} page(s) by {} degrees into {}",
        rotated,
        degrees,
        output.display()
    );

    Ok(())
}
