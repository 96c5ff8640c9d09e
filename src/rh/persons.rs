use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::store::ArtifactStore;
use super::Layout;

/// Neighbouring names more similar than this are flagged as complex.
const SIMILARITY_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRecord {
    pub name: String,
    pub months: Vec<String>,
    /// False when the name is easily confused with a neighbour.
    pub is_simple: bool,
    pub full_filenames: Vec<String>,
}

fn person_file_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[0-9]{2}_[0-9]{4}\s+(.+)\.pdf$").ok())
        .as_ref()
}

/// Extract the person name from `MM_YYYY <name>.pdf`: digits dropped,
/// whitespace collapsed.
pub fn person_name(file_name: &str) -> Option<String> {
    let captured = person_file_pattern()?.captures(file_name)?.get(1)?.as_str();
    let without_digits: String = captured.chars().filter(|c| !c.is_ascii_digit()).collect();
    let name = without_digits.split_whitespace().collect::<Vec<_>>().join(" ");
    (!name.is_empty()).then_some(name)
}

/// Share of the longer name's characters that the shorter name covers.
pub fn similarity(a: &str, b: &str) -> f64 {
    let (longer, shorter) = if a.chars().count() > b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let longer_len = longer.chars().count();
    if longer_len == 0 {
        return 1.0;
    }
    let matches = shorter.chars().filter(|c| longer.contains(*c)).count();
    matches as f64 / longer_len as f64
}

/// Build the sorted person list, flagging names too similar to a sorted neighbour.
pub fn classify(found: BTreeMap<String, (BTreeSet<String>, Vec<String>)>) -> Vec<PersonRecord> {
    let names: Vec<&String> = found.keys().collect();
    let complex: Vec<bool> = (0..names.len())
        .map(|i| {
            let before = i
                .checked_sub(1)
                .map(|j| similarity(names[i], names[j]) > SIMILARITY_THRESHOLD);
            let after = names
                .get(i + 1)
                .map(|next| similarity(names[i], next) > SIMILARITY_THRESHOLD);
            before.unwrap_or(false) || after.unwrap_or(false)
        })
        .collect();

    found
        .into_iter()
        .zip(complex)
        .map(|((name, (months, full_filenames)), complex)| PersonRecord {
            name,
            months: months.into_iter().collect(),
            is_simple: !complex,
            full_filenames,
        })
        .collect()
}

/// Collect the people with documents in `1/<month>/` for each of `months`.
pub fn scan_persons(
    files: &dyn ArtifactStore,
    layout: &Layout,
    months: &[String],
) -> Result<Vec<PersonRecord>> {
    if months.is_empty() {
        bail!("At least one month is required");
    }

    let mut found: BTreeMap<String, (BTreeSet<String>, Vec<String>)> = BTreeMap::new();
    for month in months {
        let dir = layout.month_dir(layout.person_group, month);
        let names = match files.list(&dir) {
            Ok(names) => names,
            Err(e) => {
                warn!("Skipping {}: {:#}", dir, e);
                continue;
            }
        };

        for file_name in names {
            let Some(person) = person_name(&file_name) else {
                continue;
            };
            let entry = found.entry(person).or_default();
            entry.0.insert(month.clone());
            entry.1.push(file_name);
        }
    }

    let persons = classify(found);
    info!(
        "Found {} people ({} complex names)",
        persons.len(),
        persons.iter().filter(|p| !p.is_simple).count()
    );
    Ok(persons)
}

pub fn save_persons(files: &dyn ArtifactStore, layout: &Layout, persons: &[PersonRecord]) -> Result<()> {
    let json = serde_json::to_vec_pretty(persons)?;
    let key = layout.persons_key();
    files
        .write(&key, &json)
        .with_context(|| format!("Failed to save {}", key))
}

pub fn load_persons(files: &dyn ArtifactStore, layout: &Layout) -> Result<Vec<PersonRecord>> {
    let key = layout.persons_key();
    let bytes = files.read(&key)?;
    serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {}", key))
}

/// Scan `months`, falling back to the saved list when the scan finds no one.
/// Saved people are kept only for the months asked for.
pub fn scan_or_load_persons(
    files: &dyn ArtifactStore,
    layout: &Layout,
    months: &[String],
) -> Result<Vec<PersonRecord>> {
    let found = scan_persons(files, layout, months)?;
    if !found.is_empty() {
        return Ok(found);
    }

    warn!("No people found in folder {}, using saved list", layout.person_group);
    let saved = load_persons(files, layout)?;
    Ok(saved
        .into_iter()
        .filter(|p| p.months.iter().any(|m| months.contains(m)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rh::store::MemoryStore;

    #[test]
    fn test_person_name_extraction() {
        assert_eq!(person_name("01_2025 Ana Silva.pdf").as_deref(), Some("Ana Silva"));
        assert_eq!(person_name("01_2025   Ana   2 Silva .pdf").as_deref(), Some("Ana Silva"));
        assert_eq!(person_name("01_2025 Zé.pdf").as_deref(), Some("Zé"));
        assert_eq!(person_name("01_2025 123.pdf"), None);
        assert_eq!(person_name("01_2025 Ana.png"), None);
        assert_eq!(person_name("1_2025 Ana.pdf"), None);
        assert_eq!(person_name("01_2025Ana.pdf"), None);
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(similarity("Ana", "Zé"), 0.0);
        // "Ana" is longer; 'Z' and 'é' are absent
        assert_eq!(similarity("Zé", "Ana"), 0.0);
        assert!(similarity("Ana Silva", "Ana Sousa") > 0.3);
    }

    fn found(names: &[&str]) -> BTreeMap<String, (BTreeSet<String>, Vec<String>)> {
        names
            .iter()
            .map(|n| {
                (
                    n.to_string(),
                    (
                        BTreeSet::from(["01_2025".to_string()]),
                        vec![format!("01_2025 {}.pdf", n)],
                    ),
                )
            })
            .collect()
    }

    #[test]
    fn test_similar_neighbours_are_complex() {
        let persons = classify(found(&["Ana Silva", "Ana Sousa"]));
        assert!(persons.iter().all(|p| !p.is_simple));
    }

    #[test]
    fn test_distinct_neighbours_are_simple() {
        let persons = classify(found(&["Ana", "Zé"]));
        assert_eq!(persons[0].name, "Ana");
        assert!(persons.iter().all(|p| p.is_simple));
    }

    #[test]
    fn test_scan_persons_across_months() {
        let store = MemoryStore::new();
        store.put("1/02_2025/02_2025 Ana.pdf", vec![]);
        store.put("1/01_2025/01_2025 Ana.pdf", vec![]);
        store.put("1/01_2025/01_2025 Zé.pdf", vec![]);
        store.put("1/01_2025/notes.txt", vec![]);
        let layout = Layout::default();
        let months = vec![
            "02_2025".to_string(),
            "01_2025".to_string(),
            "03_2025".to_string(),
        ];

        let persons = scan_persons(&store, &layout, &months).unwrap();
        assert_eq!(persons.len(), 2);
        assert_eq!(persons[0].name, "Ana");
        assert_eq!(persons[0].months, vec!["01_2025", "02_2025"]);
        assert_eq!(persons[0].full_filenames.len(), 2);
        assert_eq!(persons[1].name, "Zé");

        save_persons(&store, &layout, &persons).unwrap();
        assert!(store.contains("15/persons.json"));
        assert_eq!(load_persons(&store, &layout).unwrap(), persons);
    }

    #[test]
    fn test_persons_json_shape() {
        let persons = classify(found(&["Ana"]));
        let json = serde_json::to_value(&persons).unwrap();
        assert_eq!(json[0]["isSimple"], true);
        assert_eq!(json[0]["fullFilenames"][0], "01_2025 Ana.pdf");
    }

    #[test]
    fn test_saved_list_used_when_scan_finds_no_one() {
        let store = MemoryStore::new();
        let layout = Layout::default();
        let months = vec!["01_2025".to_string()];

        assert!(scan_or_load_persons(&store, &layout, &months).is_err());

        let mut saved = classify(found(&["Ana", "Zé"]));
        saved[1].months = vec!["02_2025".to_string()];
        save_persons(&store, &layout, &saved).unwrap();

        let persons = scan_or_load_persons(&store, &layout, &months).unwrap();
        assert_eq!(persons.len(), 1);
        assert_eq!(persons[0].name, "Ana");

        store.put("1/01_2025/01_2025 Rui.pdf", vec![]);
        let persons = scan_or_load_persons(&store, &layout, &months).unwrap();
        assert_eq!(persons.len(), 1);
        assert_eq!(persons[0].name, "Rui");
    }

    #[test]
    fn test_scan_persons_requires_months() {
        assert!(scan_persons(&MemoryStore::new(), &Layout::default(), &[]).is_err());
    }
}
