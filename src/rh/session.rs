use super::persons::PersonRecord;
use super::scan::ScanResult;

/// Choices made so far in an HR workflow run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub year: String,
    pub selected_months: Vec<String>,
    pub scan: Option<ScanResult>,
    pub persons: Vec<PersonRecord>,
    /// Names to compile final documents for; empty means everyone.
    pub selected_persons: Vec<String>,
}

impl Session {
    pub fn new(year: impl Into<String>, selected_months: Vec<String>) -> Self {
        Session {
            year: year.into(),
            selected_months,
            ..Default::default()
        }
    }

    pub fn with_scan(self, scan: ScanResult) -> Self {
        Session {
            scan: Some(scan),
            ..self
        }
    }

    pub fn with_persons(self, persons: Vec<PersonRecord>) -> Self {
        Session { persons, ..self }
    }

    pub fn with_selected_persons(self, selected_persons: Vec<String>) -> Self {
        Session {
            selected_persons,
            ..self
        }
    }

    /// The persons a final compile should cover.
    pub fn target_persons(&self) -> Vec<PersonRecord> {
        if self.selected_persons.is_empty() {
            return self.persons.clone();
        }
        self.persons
            .iter()
            .filter(|p| self.selected_persons.contains(&p.name))
            .cloned()
            .collect()
    }
}
