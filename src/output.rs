//! Output artifacts: suggested file names and atomic writes.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

pub fn base_file_name(months: &[String]) -> String {
    match months {
        [] => "base.pdf".to_string(),
        [month] => format!("base_{}.pdf", month),
        [first, .., last] => format!("base_{}_to_{}.pdf", first, last),
    }
}

/// Month label back out of a `base_<month>.pdf` name.
pub fn month_from_base_file_name(name: &str) -> Option<&str> {
    let month = name.strip_prefix("base_")?.strip_suffix(".pdf")?;
    (!month.is_empty()).then_some(month)
}

/// Replace everything but ASCII letters and digits with `_`.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

pub fn final_file_name(month: &str, person: &str) -> String {
    format!("final_{}_{}.pdf", month, sanitize(person))
}

pub fn merged_file_name(at: DateTime<Local>) -> String {
    format!("merged_{}.pdf", at.format("%Y%m%d_%H%M%S"))
}

/// `<stem>_part<N>.pdf`, N starting at 1.
pub fn split_part_name(input: &Path, part: usize) -> String {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("split");
    format!("{}_part{}.pdf", stem, part)
}

/// Use `output` when given, otherwise the suggested name in the working directory.
pub fn resolve(output: Option<PathBuf>, suggested: impl FnOnce() -> String) -> PathBuf {
    output.unwrap_or_else(|| PathBuf::from(suggested()))
}

/// Write `bytes` next to `path` and rename into place, so a failed write
/// never leaves a partial file behind.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".part");
    let tmp = PathBuf::from(tmp);

    let written = std::fs::write(&tmp, bytes).and_then(|_| std::fs::rename(&tmp, path));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("Failed to write {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_base_file_names() {
        assert_eq!(base_file_name(&["03_2025".into()]), "base_03_2025.pdf");
        assert_eq!(
            base_file_name(&["01_2025".into(), "02_2025".into(), "03_2025".into()]),
            "base_01_2025_to_03_2025.pdf"
        );
        assert_eq!(month_from_base_file_name("base_03_2025.pdf"), Some("03_2025"));
        assert_eq!(month_from_base_file_name("base_.pdf"), None);
        assert_eq!(month_from_base_file_name("final_03_2025.pdf"), None);
    }

    #[test]
    fn test_final_file_name_sanitizes() {
        assert_eq!(
            final_file_name("01_2025", "João Silva-Lopes"),
            "final_01_2025_Jo_o_Silva_Lopes.pdf"
        );
    }

    #[test]
    fn test_merged_file_name() {
        let at = Local.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(merged_file_name(at), "merged_20250304_050607.pdf");
    }

    #[test]
    fn test_split_part_name() {
        assert_eq!(split_part_name(Path::new("in/report.pdf"), 2), "report_part2.pdf");
    }

    #[test]
    fn test_write_atomic_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/out.pdf");
        write_atomic(&path, b"data").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"data");
        assert!(!dir.path().join("a/b/out.pdf.part").exists());
    }
}
