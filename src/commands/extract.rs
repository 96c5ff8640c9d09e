use crate::output::resolve;
use crate::pdf::{tools, PdfDocument};
use anyhow::Result;
use std::path::{Path, PathBuf};

pub fn run<P: AsRef<Path>>(input: P, pages: &str, output: Option<PathBuf>) -> Result<()> {
    let doc = PdfDocument::open(&input)?;

    let mut new_doc = tools::extract(&doc, pages)?;
    let page_count = new_doc.get_pages().len();

    let output = resolve(output, || "extracted.pdf".to_string());
    PdfDocument::save(&mut new_doc, &output)?;

    println!("Extracted {} page(s) to {}", page_count, output.display());

    Ok(())
}
