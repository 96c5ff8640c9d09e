use crate::output::split_part_name;
use crate::page_range::{every_n_pages, parse_split_points};
use crate::pdf::{tools, PdfDocument};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Where to cut.
pub enum SplitAt {
    /// Comma-separated page numbers; each starts a new part.
    Pages(String),
    /// A new part every N pages.
    Every(usize),
}

pub fn run<P: AsRef<Path>>(input: P, at: &SplitAt, output_dir: Option<PathBuf>) -> Result<()> {
    let input = input.as_ref();
    let output_dir = output_dir.unwrap_or_else(|| PathBuf::from("."));

    let doc = PdfDocument::open(input)?;
    let total_pages = doc.page_count();

    let points = match at {
        SplitAt::Pages(spec) => parse_split_points(spec, total_pages),
        SplitAt::Every(0) => anyhow::bail!("--every must be at least 1"),
        SplitAt::Every(n) => every_n_pages(*n, total_pages),
    };

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create directory: {}", output_dir.display()))?;

    let parts = tools::split(&doc, &points)?;
    let count = parts.len();
    for (i, mut part) in parts.into_iter().enumerate() {
        let output_path = output_dir.join(split_part_name(input, i + 1));
        let pages = part.get_pages().len();
        PdfDocument::save(&mut part, &output_path)?;
        println!("{} ({} pages)", output_path.display(), pages);
    }

    println!(
        "Split {} pages into {} part(s) in {}",
        total_pages,
        count,
        output_dir.display()
    );

    Ok(())
}
