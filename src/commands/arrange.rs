use crate::output::resolve;
use crate::pdf::tools::{self, PageItem};
use crate::pdf::PdfDocument;
use anyhow::Result;
use std::path::PathBuf;

pub fn run(items: &[PageItem], output: Option<PathBuf>) -> Result<()> {
    let mut arrangement = tools::arrange(items)?;
    if arrangement.placed == 0 {
        anyhow::bail!("None of the {} pages could be placed", items.len());
    }

    let output = resolve(output, || "arranged.pdf".to_string());
    PdfDocument::save(&mut arrangement.document, &output)?;

    println!("Arranged {} page(s) into {}", arrangement.placed, output.display());
    for skipped in &arrangement.skipped {
        println!("Skipped {}", skipped);
    }

    Ok(())
}
