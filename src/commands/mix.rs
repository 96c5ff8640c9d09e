use crate::output::resolve;
use crate::pdf::{tools, PdfDocument};
use anyhow::Result;
use std::path::{Path, PathBuf};

pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(first: P, second: Q, output: Option<PathBuf>) -> Result<()> {
    let a = PdfDocument::open(&first)?;
    let b = PdfDocument::open(&second)?;

    let mut mixed = tools::mix(&a, &b)?;

    let output = resolve(output, || "mixed.pdf".to_string());
    PdfDocument::save(&mut mixed, &output)?;

    println!(
        "Mixed {} + {} pages into {}",
        a.page_count(),
        b.page_count(),
        output.display()
    );

    Ok(())
}
