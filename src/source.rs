use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};

use crate::pdf::ComposeError;

/// Raster formats accepted as input pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Image(ImageFormat),
}

impl SourceKind {
    /// Infer the kind from a file name's extension (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(SourceKind::Pdf),
            "jpg" | "jpeg" => Some(SourceKind::Image(ImageFormat::Jpeg)),
            "png" => Some(SourceKind::Image(ImageFormat::Png)),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Pdf => f.write_str("pdf"),
            SourceKind::Image(_) => f.write_str("image"),
        }
    }
}

/// An input document: its name, raw bytes and inferred type.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub kind: SourceKind,
}

impl SourceFile {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ComposeError> {
        let name = name.into();
        let kind =
            SourceKind::from_name(&name).ok_or_else(|| ComposeError::Unsupported(name.clone()))?;
        Ok(SourceFile { name, bytes, kind })
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(SourceFile::from_bytes(name, bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(SourceKind::from_name("a.PDF"), Some(SourceKind::Pdf));
        assert_eq!(
            SourceKind::from_name("scan.jpeg"),
            Some(SourceKind::Image(ImageFormat::Jpeg))
        );
        assert_eq!(
            SourceKind::from_name("scan.Jpg"),
            Some(SourceKind::Image(ImageFormat::Jpeg))
        );
        assert_eq!(
            SourceKind::from_name("x.png"),
            Some(SourceKind::Image(ImageFormat::Png))
        );
        assert_eq!(SourceKind::from_name("notes.txt"), None);
        assert_eq!(SourceKind::from_name("pdf"), None);
    }

    #[test]
    fn test_unsupported_source() {
        let err = SourceFile::from_bytes("notes.docx", vec![]).unwrap_err();
        assert!(err.to_string().contains("notes.docx"));
    }
}
