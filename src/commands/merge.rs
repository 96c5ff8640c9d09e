use crate::output::{merged_file_name, resolve};
use crate::pdf::{merge_sources, PdfDocument};
use crate::source::SourceFile;
use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

/// Merge PDFs and images, in the order given, into one PDF.
pub fn run(inputs: &[PathBuf], output: Option<PathBuf>) -> Result<()> {
    if inputs.len() < 2 {
        anyhow::bail!("At least two files are required to merge");
    }

    let sources = inputs
        .iter()
        .map(SourceFile::read)
        .collect::<Result<Vec<_>>>()?;

    let mut merged = merge_sources(&sources).context("Failed to merge")?;
    let total_pages = merged.get_pages().len();

    let output = resolve(output, || merged_file_name(chrono::Local::now()));
    PdfDocument::save(&mut merged, &output)?;
    info!("wrote {}", output.display());

    println!(
        "Merged {} files ({} pages) into {}",
        inputs.len(),
        total_pages,
        output.display()
    );

    Ok(())
}
