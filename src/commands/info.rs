use crate::pdf::tools::inspect;
use crate::pdf::PdfDocument;
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InfoOutput {
    file_name: String,
    page_count: usize,
    pages: Vec<usize>,
    title: Option<String>,
    author: Option<String>,
    creator: Option<String>,
    producer: Option<String>,
    creation_date: Option<String>,
}

pub fn run<P: AsRef<Path>>(path: P, json: bool) -> Result<()> {
    let doc = PdfDocument::open(&path)?;
    let info = doc.get_info();

    if json {
        let listing = inspect(&doc);
        let output = InfoOutput {
            file_name: listing.file_name,
            page_count: listing.page_count,
            pages: listing.pages,
            title: info.title,
            author: info.author,
            creator: info.creator,
            producer: info.producer,
            creation_date: info.creation_date,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("File: {}", path.as_ref().display());
    println!("Pages: {}", info.page_count);

    if let Some(title) = &info.title {
        println!("Title: {}", title);
    }
    if let Some(author) = &info.author {
        println!("Author: {}", author);
    }
    if let Some(creator) = &info.creator {
        println!("Creator: {}", creator);
    }
    if let Some(producer) = &info.producer {
        println!("Producer: {}", producer);
    }
    if let Some(creation_date) = &info.creation_date {
        println!("Created: {}", format_pdf_date(creation_date));
    }

    Ok(())
}

/// `D:YYYYMMDDHHmmSS...` as `YYYY-MM-DD HH:mm:SS`; anything else unchanged.
fn format_pdf_date(date: &str) -> String {
    let Some(d) = date.strip_prefix("D:") else {
        return date.to_string();
    };
    if d.len() < 8 || !d.is_char_boundary(8) || !d[..8].bytes().all(|b| b.is_ascii_digit()) {
        return date.to_string();
    }
    let time = match d.get(8..14) {
        Some(t) if t.bytes().all(|b| b.is_ascii_digit()) => {
            format!(" {}:{}:{}", &t[0..2], &t[2..4], &t[4..6])
        }
        _ => String::new(),
    };
    format!("{}-{}-{}{}", &d[0..4], &d[4..6], &d[6..8], time)
}
