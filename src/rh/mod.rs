//! The HR document workflow.
//!
//! The root folder holds numbered folders:
//!
//! ```text
//! 1/<MM_YYYY>/MM_YYYY <person>.pdf     per-person documents
//! 2..=13/<MM_YYYY>/*.{pdf,jpg,png}     one folder per document group
//! 14/base_<MM_YYYY>.pdf                compiled base documents
//! 14/state/<YYYY>/<MM_YYYY>.json       scan snapshots
//! 15/persons.json                      last person scan
//! 15/<person>/<MM_YYYY>/final_*.pdf    final documents
//! ```

pub mod compile;
pub mod persons;
pub mod scan;
pub mod session;
pub mod store;

use std::ops::RangeInclusive;

/// Folder numbering and thresholds of the workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub person_group: u32,
    pub groups: RangeInclusive<u32>,
    pub base_folder: u32,
    pub final_folder: u32,
    pub extensions: &'static [&'static str],
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            person_group: 1,
            groups: 2..=13,
            base_folder: 14,
            final_folder: 15,
            extensions: &["pdf", "jpg", "jpeg", "png"],
        }
    }
}

impl Layout {
    pub fn total_groups(&self) -> usize {
        self.groups.clone().count()
    }

    /// Groups a month needs before it compiles without confirmation: half, rounded up.
    pub fn required_groups(&self) -> usize {
        self.total_groups().div_ceil(2)
    }

    pub fn month_dir(&self, group: u32, month: &str) -> String {
        format!("{}/{}", group, month)
    }

    pub fn snapshot_key(&self, year: &str, month: &str) -> String {
        format!("{}/state/{}/{}.json", self.base_folder, year, month)
    }

    pub fn base_key(&self, file_name: &str) -> String {
        format!("{}/{}", self.base_folder, file_name)
    }

    pub fn persons_key(&self) -> String {
        format!("{}/persons.json", self.final_folder)
    }

    pub fn final_key(&self, person: &str, month: &str, file_name: &str) -> String {
        format!("{}/{}/{}/{}", self.final_folder, person, month, file_name)
    }

    pub fn accepts(&self, file_name: &str) -> bool {
        std::path::Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_ascii_lowercase();
                self.extensions.contains(&e.as_str())
            })
            .unwrap_or(false)
    }
}

/// Turn `3`, `03` or `03_2025` into the `MM_YYYY` label used for folders.
pub fn month_label(year: &str, month: &str) -> String {
    let month = month.trim();
    if month.contains('_') {
        return month.to_string();
    }
    match month.parse::<u32>() {
        Ok(n) => format!("{:02}_{}", n, year),
        Err(_) => format!("{}_{}", month, year),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_groups() {
        let layout = Layout::default();
        assert_eq!(layout.total_groups(), 12);
        assert_eq!(layout.required_groups(), 6);

        let odd = Layout {
            groups: 2..=8,
            ..Layout::default()
        };
        assert_eq!(odd.required_groups(), 4);
    }

    #[test]
    fn test_accepts_allow_list() {
        let layout = Layout::default();
        assert!(layout.accepts("a.PDF"));
        assert!(layout.accepts("b.jpeg"));
        assert!(!layout.accepts("c.gif"));
        assert!(!layout.accepts("README"));
    }

    #[test]
    fn test_month_labels() {
        assert_eq!(month_label("2025", "3"), "03_2025");
        assert_eq!(month_label("2025", "11"), "11_2025");
        assert_eq!(month_label("2025", "02_2024"), "02_2024");
    }

    #[test]
    fn test_keys() {
        let layout = Layout::default();
        assert_eq!(layout.snapshot_key("2025", "01_2025"), "14/state/2025/01_2025.json");
        assert_eq!(layout.final_key("Ana", "01_2025", "f.pdf"), "15/Ana/01_2025/f.pdf");
    }
}
