use std::io::{BufRead, IsTerminal, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::{info, warn};

use crate::rh::compile::{self, JoinSummary};
use crate::rh::persons::{save_persons, scan_or_load_persons, scan_persons};
use crate::rh::scan::{scan as scan_months, MonthReport, Sufficiency};
use crate::rh::session::Session;
use crate::rh::store::FsStore;
use crate::rh::{month_label, Layout};

fn open_root(root: &Path) -> Result<FsStore> {
    if !root.is_dir() {
        bail!("Root folder not found: {}", root.display());
    }
    Ok(FsStore::new(root))
}

fn session(year: i32, months: &[String]) -> Session {
    let year = year.to_string();
    let months = months.iter().map(|m| month_label(&year, m)).collect();
    Session::new(year, months)
}

pub fn scan(root: &Path, year: i32, months: &[String], json: bool) -> Result<()> {
    let store = open_root(root)?;
    let session = session(year, months);
    let layout = Layout::default();

    let result = scan_months(&store, &store, &layout, &session.year, &session.selected_months)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    for report in &result.month_reports {
        let changed = if report.has_changes { "changed" } else { "unchanged" };
        println!(
            "{}: {} of {} groups, {} files ({})",
            report.month,
            report.group_count(),
            layout.total_groups(),
            report.total_files,
            changed
        );
        if let Some(previous) = &report.previous_scan_date {
            println!("  last scan: {}", previous);
        }
        for (group, record) in &report.groups {
            println!("  group {:>2}: {} file(s)", group, record.files.len());
        }
        for error in &report.errors {
            println!("  {}", error);
        }
    }
    println!("Total: {} files", result.total_files);

    Ok(())
}

/// Ask on the terminal whether to compile a month below the group threshold.
/// `yes` answers for the user; without a terminal the answer is no.
fn confirm_insufficient(yes: bool) -> impl FnMut(&MonthReport, Sufficiency) -> bool {
    move |report, sufficiency| {
        let Sufficiency::NeedsConfirmation {
            groups,
            required,
            total,
        } = sufficiency
        else {
            return true;
        };
        if yes {
            info!("{}: compiling {} of {} groups (--yes)", report.month, groups, total);
            return true;
        }
        if !std::io::stdin().is_terminal() {
            return false;
        }

        eprint!(
            "{}: only {} of {} groups have files ({} required). Compile anyway? [y/N] ",
            report.month, groups, total, required
        );
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

fn print_summary(summary: &JoinSummary) -> Result<()> {
    for key in &summary.created {
        println!("created {}", key);
    }
    for skipped in &summary.skipped {
        println!("skipped {}: {}", skipped.target, skipped.error);
    }
    for failed in &summary.failed {
        println!("failed {}: {}", failed.target, failed.error);
    }
    println!(
        "{} created, {} skipped, {} failed",
        summary.created.len(),
        summary.skipped.len(),
        summary.failed.len()
    );

    if !summary.failed.is_empty() {
        bail!("{} document(s) could not be compiled", summary.failed.len());
    }
    Ok(())
}

pub fn base(root: &Path, year: i32, months: &[String], yes: bool, combine: bool) -> Result<()> {
    let store = open_root(root)?;
    let layout = Layout::default();
    let session = session(year, months);

    let result = scan_months(&store, &store, &layout, &session.year, &session.selected_months)?;
    let session = session.with_scan(result);
    let Some(scan) = &session.scan else {
        return Ok(());
    };

    let mut confirm = confirm_insufficient(yes);
    let summary = if combine {
        compile::join_combined(&store, &layout, scan, &mut confirm)
    } else {
        compile::join_all(&store, &layout, scan, &mut confirm)
    };
    print_summary(&summary)
}

pub fn bases(root: &Path) -> Result<()> {
    let store = open_root(root)?;
    let months = compile::available_base_months(&store, &Layout::default());
    if months.is_empty() {
        println!("No base documents");
    }
    for month in months {
        println!("{}", month);
    }
    Ok(())
}

pub fn persons(root: &Path, year: i32, months: &[String], json: bool) -> Result<()> {
    let store = open_root(root)?;
    let layout = Layout::default();
    let session = session(year, months);

    let found = scan_persons(&store, &layout, &session.selected_months)?;
    save_persons(&store, &layout, &found)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }
    for person in &found {
        let flag = if person.is_simple { "" } else { " (similar name)" };
        println!("{}{}: {}", person.name, flag, person.months.join(", "));
    }
    println!("{} people", found.len());
    Ok(())
}

pub fn final_docs(root: &Path, year: i32, months: &[String], selected: &[String]) -> Result<()> {
    let store = open_root(root)?;
    let layout = Layout::default();
    let session = session(year, months);

    let found = scan_or_load_persons(&store, &layout, &session.selected_months)
        .context("No person list available")?;
    let session = session
        .with_persons(found)
        .with_selected_persons(selected.to_vec());

    let targets = session.target_persons();
    if targets.is_empty() {
        bail!("No matching people found");
    }
    for name in &session.selected_persons {
        if !targets.iter().any(|p| &p.name == name) {
            warn!("No documents found for {}", name);
        }
    }

    let summary = compile::join_final(&store, &layout, &targets, &session.selected_months);
    print_summary(&summary)
}
