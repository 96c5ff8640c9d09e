//! Compiling base documents per month and final documents per person.

use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use serde::Serialize;

use super::persons::{person_name, PersonRecord};
use super::scan::{MonthReport, ScanResult, Sufficiency};
use super::store::ArtifactStore;
use super::Layout;
use crate::output::{base_file_name, final_file_name, month_from_base_file_name};
use crate::pdf::{merge_sources, PdfDocument};
use crate::source::SourceFile;

/// Decides whether a month with too few groups is compiled anyway.
pub type Confirm<'a> = dyn FnMut(&MonthReport, Sufficiency) -> bool + 'a;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub target: String,
    pub error: String,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct JoinSummary {
    /// Keys of the written documents.
    pub created: Vec<String>,
    /// Months left out, with the reason.
    pub skipped: Vec<Failure>,
    pub failed: Vec<Failure>,
}

impl JoinSummary {
    fn fail(&mut self, target: &str, error: anyhow::Error) {
        warn!("{}: {:#}", target, error);
        self.failed.push(Failure {
            target: target.to_string(),
            error: format!("{:#}", error),
        });
    }

    fn skip(&mut self, target: &str, reason: String) {
        info!("Skipping {}: {}", target, reason);
        self.skipped.push(Failure {
            target: target.to_string(),
            error: reason,
        });
    }
}

/// Read the scanned files of a month: groups in numeric order, files in scan order.
pub fn month_sources(files: &dyn ArtifactStore, report: &MonthReport) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::with_capacity(report.total_files);
    for record in report.groups.values() {
        for file in &record.files {
            let key = format!("{}/{}", record.path, file.name);
            let bytes = files.read(&key)?;
            sources.push(SourceFile::from_bytes(file.name.clone(), bytes)?);
        }
    }
    Ok(sources)
}

/// Compile the months of `reports` into one base document and write it to the
/// base folder. Returns the key of the written file.
///
/// Nothing is written when any file fails.
pub fn compile_base(
    files: &dyn ArtifactStore,
    layout: &Layout,
    reports: &[&MonthReport],
) -> Result<String> {
    let months: Vec<String> = reports.iter().map(|r| r.month.clone()).collect();
    let mut sources = Vec::new();
    for report in reports {
        sources.extend(month_sources(files, report)?);
    }
    if sources.is_empty() {
        bail!("No files to compile for {}", months.join(", "));
    }

    debug!("Compiling {} files for {}", sources.len(), months.join(", "));
    let mut doc = merge_sources(&sources)?;
    let bytes = PdfDocument::to_bytes(&mut doc)?;

    let key = layout.base_key(&base_file_name(&months));
    files.write(&key, &bytes)?;
    info!("Created {} ({} pages)", key, doc.get_pages().len());
    Ok(key)
}

/// Whether `report` should be compiled, consulting `confirm` for months
/// below the group threshold. `Err` carries the reason to skip.
fn admit(report: &MonthReport, layout: &Layout, confirm: &mut Confirm<'_>) -> Result<(), String> {
    if report.groups.is_empty() {
        return Err("no group has files".to_string());
    }
    match report.sufficiency(layout) {
        Sufficiency::Sufficient { .. } => Ok(()),
        needs @ Sufficiency::NeedsConfirmation {
            groups,
            required,
            total,
        } => {
            if confirm(report, needs) {
                Ok(())
            } else {
                Err(format!(
                    "only {} of {} groups have files ({} required)",
                    groups, total, required
                ))
            }
        }
    }
}

/// Compile one base document per scanned month.
pub fn join_all(
    files: &dyn ArtifactStore,
    layout: &Layout,
    scan: &ScanResult,
    confirm: &mut Confirm<'_>,
) -> JoinSummary {
    let mut summary = JoinSummary::default();
    for report in &scan.month_reports {
        if let Err(reason) = admit(report, layout, confirm) {
            summary.skip(&report.month, reason);
            continue;
        }
        match compile_base(files, layout, &[report]) {
            Ok(key) => summary.created.push(key),
            Err(e) => summary.fail(&report.month, e),
        }
    }
    summary
}

/// Compile every admitted month of the scan into a single base document.
pub fn join_combined(
    files: &dyn ArtifactStore,
    layout: &Layout,
    scan: &ScanResult,
    confirm: &mut Confirm<'_>,
) -> JoinSummary {
    let mut summary = JoinSummary::default();
    let mut admitted = Vec::new();
    for report in &scan.month_reports {
        match admit(report, layout, confirm) {
            Ok(()) => admitted.push(report),
            Err(reason) => summary.skip(&report.month, reason),
        }
    }
    if admitted.is_empty() {
        return summary;
    }

    let months: Vec<String> = admitted.iter().map(|r| r.month.clone()).collect();
    match compile_base(files, layout, &admitted) {
        Ok(key) => summary.created.push(key),
        Err(e) => summary.fail(&base_file_name(&months), e),
    }
    summary
}

/// Months that already have a base document, sorted.
pub fn available_base_months(files: &dyn ArtifactStore, layout: &Layout) -> Vec<String> {
    let dir = layout.base_folder.to_string();
    let names = match files.list(&dir) {
        Ok(names) => names,
        Err(e) => {
            debug!("{:#}", e);
            return Vec::new();
        }
    };
    let mut months: Vec<String> = names
        .iter()
        .filter_map(|name| month_from_base_file_name(name))
        .map(str::to_string)
        .collect();
    months.sort();
    months
}

/// The PDF in the person folder of `month` whose parsed name is `person`.
/// Without one, the first PDF whose name contains `person`.
pub fn find_person_file(
    files: &dyn ArtifactStore,
    layout: &Layout,
    month: &str,
    person: &str,
) -> Result<Option<String>> {
    let dir = layout.month_dir(layout.person_group, month);
    let pdfs: Vec<String> = files
        .list(&dir)?
        .into_iter()
        .filter(|name| name.ends_with(".pdf"))
        .collect();
    let exact = pdfs
        .iter()
        .position(|name| person_name(name).as_deref() == Some(person));
    let found = exact.or_else(|| pdfs.iter().position(|name| name.contains(person)));
    Ok(found.map(|i| pdfs[i].clone()))
}

/// Person pages first, then the month's base pages. Returns the written key.
pub fn compile_final(
    files: &dyn ArtifactStore,
    layout: &Layout,
    person: &str,
    month: &str,
) -> Result<String> {
    let base_name = base_file_name(&[month.to_string()]);
    let base = files
        .read(&layout.base_key(&base_name))
        .with_context(|| format!("No base document for {}", month))?;

    let person_file = find_person_file(files, layout, month, person)?
        .with_context(|| format!("No document for {} in {}", person, month))?;
    let person_dir = layout.month_dir(layout.person_group, month);
    let person_bytes = files.read(&format!("{}/{}", person_dir, person_file))?;

    let sources = [
        SourceFile::from_bytes(person_file, person_bytes)?,
        SourceFile::from_bytes(base_name, base)?,
    ];
    let mut doc = merge_sources(&sources)?;
    let bytes = PdfDocument::to_bytes(&mut doc)?;

    let key = layout.final_key(person, month, &final_file_name(month, person));
    files.write(&key, &bytes)?;
    info!("Created {}", key);
    Ok(key)
}

/// Final documents for `persons` over `months`, skipping months in which a
/// person has no document. Failures are collected and the rest continues.
pub fn join_final(
    files: &dyn ArtifactStore,
    layout: &Layout,
    persons: &[PersonRecord],
    months: &[String],
) -> JoinSummary {
    let mut summary = JoinSummary::default();
    for person in persons {
        for month in months.iter().filter(|m| person.months.contains(m)) {
            match compile_final(files, layout, &person.name, month) {
                Ok(key) => summary.created.push(key),
                Err(e) => summary.fail(&format!("{} {}", person.name, month), e),
            }
        }
    }
    summary
}
