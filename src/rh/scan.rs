//! Scanning the group folders of a month and detecting changes since the last scan.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use chrono::{SecondsFormat, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::store::{ArtifactStore, SnapshotStore};
use super::Layout;
use crate::source::SourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Image,
}

impl From<SourceKind> for FileKind {
    fn from(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Pdf => FileKind::Pdf,
            SourceKind::Image(_) => FileKind::Image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedFile {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
}

/// The qualifying files of one group folder for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub path: String,
    pub files: Vec<ScannedFile>,
}

/// Group number to its files. Only groups with at least one file appear.
pub type Groups = BTreeMap<u32, GroupRecord>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub scan_date: String,
    pub groups: Groups,
    pub total_files: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthReport {
    pub month: String,
    pub groups: Groups,
    pub errors: Vec<String>,
    pub total_files: usize,
    pub has_changes: bool,
    pub previous_scan_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sufficiency {
    Sufficient {
        groups: usize,
    },
    /// Fewer groups than required; compiling needs an explicit go-ahead.
    NeedsConfirmation {
        groups: usize,
        required: usize,
        total: usize,
    },
}

impl MonthReport {
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn sufficiency(&self, layout: &Layout) -> Sufficiency {
        let groups = self.group_count();
        let required = layout.required_groups();
        if groups >= required {
            Sufficiency::Sufficient { groups }
        } else {
            Sufficiency::NeedsConfirmation {
                groups,
                required,
                total: layout.total_groups(),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub year: String,
    pub month_reports: Vec<MonthReport>,
    pub total_files: usize,
    pub scan_timestamp: String,
}

/// Collect the qualifying files of every group for `month`.
///
/// Missing folders and folders without qualifying files become error entries.
pub fn scan_groups(
    files: &dyn ArtifactStore,
    layout: &Layout,
    month: &str,
) -> (Groups, Vec<String>) {
    let mut groups = Groups::new();
    let mut errors = Vec::new();

    for group in layout.groups.clone() {
        let dir = layout.month_dir(group, month);
        let names = match files.list(&dir) {
            Ok(names) => names,
            Err(e) => {
                debug!("{}: {:#}", dir, e);
                errors.push(format!("group {} not found: {}", group, dir));
                continue;
            }
        };

        let mut scanned: Vec<ScannedFile> = names
            .into_iter()
            .filter(|name| layout.accepts(name))
            .filter_map(|name| {
                let kind = SourceKind::from_name(&name)?;
                Some(ScannedFile {
                    name,
                    kind: kind.into(),
                })
            })
            .collect();
        scanned.sort_by(|a, b| a.name.cmp(&b.name));

        if scanned.is_empty() {
            errors.push(format!("group {} has no PDF or image files: {}", group, dir));
            continue;
        }

        groups.insert(
            group,
            GroupRecord {
                path: dir,
                files: scanned,
            },
        );
    }

    (groups, errors)
}

/// Whether `current` differs from the groups recorded in `previous`.
pub fn detect_changes(previous: Option<&Groups>, current: &Groups) -> bool {
    let Some(previous) = previous else {
        return true;
    };
    if previous.len() != current.len() {
        return true;
    }

    current.iter().any(|(group, record)| {
        let Some(old) = previous.get(group) else {
            return true;
        };
        if old.files.len() != record.files.len() {
            return true;
        }
        let mut old_names: Vec<&str> = old.files.iter().map(|f| f.name.as_str()).collect();
        let mut new_names: Vec<&str> = record.files.iter().map(|f| f.name.as_str()).collect();
        old_names.sort_unstable();
        new_names.sort_unstable();
        old_names != new_names
    })
}

fn count_files(groups: &Groups) -> usize {
    groups.values().map(|g| g.files.len()).sum()
}

/// Scan `months` of `year`, compare each against its stored snapshot and
/// store the new one.
///
/// Snapshot failures are logged and never abort the scan; an unreadable
/// snapshot counts as no snapshot.
pub fn scan(
    files: &dyn ArtifactStore,
    snapshots: &dyn SnapshotStore,
    layout: &Layout,
    year: &str,
    months: &[String],
) -> Result<ScanResult> {
    if year.trim().is_empty() {
        bail!("A year is required");
    }
    if months.is_empty() {
        bail!("At least one month is required");
    }

    let scan_timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let mut month_reports = Vec::with_capacity(months.len());

    for month in months {
        let (groups, errors) = scan_groups(files, layout, month);
        let total_files = count_files(&groups);

        let previous = snapshots.load(year, month).unwrap_or_else(|e| {
            warn!("Could not load snapshot for {}: {:#}", month, e);
            None
        });
        let has_changes = detect_changes(previous.as_ref().map(|s| &s.groups), &groups);
        let previous_scan_date = previous.map(|s| s.scan_date);

        let snapshot = Snapshot {
            scan_date: scan_timestamp.clone(),
            groups: groups.clone(),
            total_files,
        };
        if let Err(e) = snapshots.save(year, month, &snapshot) {
            warn!("Could not save snapshot for {}: {:#}", month, e);
        }

        info!(
            "{}: {} groups, {} files{}",
            month,
            groups.len(),
            total_files,
            if has_changes { ", changed" } else { "" }
        );

        month_reports.push(MonthReport {
            month: month.clone(),
            groups,
            errors,
            total_files,
            has_changes,
            previous_scan_date,
        });
    }

    let total_files = month_reports.iter().map(|r| r.total_files).sum();
    Ok(ScanResult {
        year: year.to_string(),
        month_reports,
        total_files,
        scan_timestamp,
    })
}
