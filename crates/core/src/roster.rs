// crates/core/src/roster.rs
//! Researcher roster loaded from a spreadsheet.
//!
//! The first worksheet is read; its first row is the header. Only the full
//! name and laboratory columns are required. The initials column is optional
//! and derived from the full name when absent or blank. Any other column is
//! carried along in [`Researcher::extra`].

use std::collections::BTreeMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use serde::{Deserialize, Serialize};

use crate::error::RosterError;
use crate::hal::initials_variant;

/// Header names used to locate the roster columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterColumns {
    pub full_name: String,
    pub initials: String,
    pub lab: String,
}

impl Default for RosterColumns {
    fn default() -> Self {
        Self {
            full_name: "NOM_COMPLET".into(),
            initials: "NOM_INITIALES".into(),
            lab: "LABO".into(),
        }
    }
}

/// One roster row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Researcher {
    pub full_name: String,
    pub initials_name: String,
    pub labo: String,
    /// Remaining non-empty cells, keyed by header.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Researcher {
    /// Build a row, deriving the initials variant from the full name.
    ///
    /// Falls back to the full name when it cannot be split into first and
    /// last name.
    pub fn new(full_name: impl Into<String>, labo: impl Into<String>) -> Self {
        let full_name = full_name.into();
        let initials_name = initials_variant(&full_name).unwrap_or_else(|_| full_name.clone());
        Self {
            full_name,
            initials_name,
            labo: labo.into(),
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    rows: Vec<Researcher>,
}

impl Roster {
    pub fn from_rows(rows: Vec<Researcher>) -> Self {
        Self { rows }
    }

    /// Load the first worksheet of a workbook (`.xlsx`, `.xls`, `.ods`).
    pub fn load(path: impl AsRef<Path>, columns: &RosterColumns) -> Result<Self, RosterError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RosterError::not_found(path));
        }

        let mut workbook = open_workbook_auto(path).map_err(|e| RosterError::Workbook {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| RosterError::Empty {
                path: path.to_path_buf(),
            })?
            .map_err(|e| RosterError::Workbook {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let mut rows = range.rows();
        let header: Vec<String> = match rows.next() {
            Some(cells) => cells.iter().map(cell_text).collect(),
            None => {
                return Err(RosterError::Empty {
                    path: path.to_path_buf(),
                })
            }
        };
        let body: Vec<Vec<String>> = rows
            .map(|cells| cells.iter().map(cell_text).collect())
            .collect();

        let roster = Self::from_table(&header, &body, columns)?;
        tracing::info!(
            path = %path.display(),
            rows = roster.len(),
            "Loaded researcher roster"
        );
        Ok(roster)
    }

    /// Build a roster from a header row and string cells.
    pub fn from_table(
        header: &[String],
        body: &[Vec<String>],
        columns: &RosterColumns,
    ) -> Result<Self, RosterError> {
        let position = |name: &str| header.iter().position(|h| h.trim() == name);

        let name_idx = position(columns.full_name.as_str())
            .ok_or_else(|| RosterError::missing_column(&columns.full_name))?;
        let lab_idx = position(columns.lab.as_str())
            .ok_or_else(|| RosterError::missing_column(&columns.lab))?;
        let initials_idx = position(columns.initials.as_str());
        let extra_cols: Vec<(usize, &str)> = header
            .iter()
            .enumerate()
            .map(|(idx, h)| (idx, h.trim()))
            .filter(|(idx, h)| {
                !h.is_empty() && *idx != name_idx && *idx != lab_idx && Some(*idx) != initials_idx
            })
            .collect();

        fn cell(row: &[String], idx: usize) -> String {
            row.get(idx).map(|s| s.trim().to_string()).unwrap_or_default()
        }

        let rows = body
            .iter()
            .filter_map(|row| {
                let full_name = cell(row, name_idx);
                if full_name.is_empty() {
                    return None;
                }
                let mut researcher = Researcher::new(full_name, cell(row, lab_idx));
                if let Some(idx) = initials_idx {
                    let initials = cell(row, idx);
                    if !initials.is_empty() {
                        researcher.initials_name = initials;
                    }
                }
                for &(idx, name) in &extra_cols {
                    let value = cell(row, idx);
                    if !value.is_empty() {
                        researcher.extra.insert(name.to_string(), value);
                    }
                }
                Some(researcher)
            })
            .collect();

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Researcher] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Researcher> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct non-empty laboratories, in first-seen order.
    pub fn labs(&self) -> Vec<String> {
        let mut labs: Vec<String> = Vec::new();
        for row in &self.rows {
            if !row.labo.is_empty() && !labs.contains(&row.labo) {
                labs.push(row.labo.clone());
            }
        }
        labs
    }

    /// Rows belonging to exactly `labo`.
    pub fn filter_by_lab(&self, labo: &str) -> Roster {
        Roster {
            rows: self
                .rows
                .iter()
                .filter(|r| r.labo == labo)
                .cloned()
                .collect(),
        }
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}
