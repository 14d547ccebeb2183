//! Resolution of messy header spellings to logical columns.
//!
//! Uploaded sheets name the same column a dozen ways ("Rate", "Price (Rs.)",
//! "Charges"). Each logical column carries an explicit, ordered matcher
//! table: exact aliases are tried against every header first, then substring
//! keys, so resolution is deterministic regardless of header order quirks.

use std::collections::HashMap;

use crate::parsing::ValidationError;

/// The abstract columns a rate sheet can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalColumn {
    /// Entry fingerprint carried forward from an exported sheet.
    Id,
    Group,
    TestName,
    PrintableText,
    Method,
    Unit,
    Rate,
    TatDays,
    Accreditation,
    Department,
}

impl LogicalColumn {
    /// Columns that must resolve before any data row is touched.
    pub const REQUIRED: [LogicalColumn; 3] = [Self::Group, Self::TestName, Self::Rate];

    pub const ALL: [LogicalColumn; 10] = [
        Self::Id,
        Self::Group,
        Self::TestName,
        Self::PrintableText,
        Self::Method,
        Self::Unit,
        Self::Rate,
        Self::TatDays,
        Self::Accreditation,
        Self::Department,
    ];

    /// Exact aliases, compared against headers normalized to lowercase
    /// alphanumerics.
    fn exact_aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Id => &["id", "fingerprint", "entryid", "catalogid", "testid"],
            Self::Group => &["group", "groupname", "section", "testgroup"],
            Self::TestName => &[
                "testname",
                "test",
                "parameter",
                "parametername",
                "nameoftest",
                "testparameter",
            ],
            Self::PrintableText => &[
                "printabletext",
                "printtext",
                "displaytext",
                "parameters",
                "printablename",
            ],
            Self::Method => &["method", "testmethod", "methodreference", "protocol"],
            Self::Unit => &["unit", "units", "uom"],
            Self::Rate => &["rate", "price", "amount", "charges", "rateinr", "raters"],
            Self::TatDays => &["tat", "tatdays", "tatindays", "turnaroundtime", "turnaround"],
            Self::Accreditation => &[
                "accreditation",
                "accredited",
                "accreditationstatus",
                "nabl",
                "nablscope",
            ],
            Self::Department => &["department", "dept", "lab"],
        }
    }

    /// Substring fallbacks, tried only after no exact alias matched any
    /// header.
    fn substring_keys(&self) -> &'static [&'static str] {
        match self {
            Self::Id => &["fingerprint"],
            Self::Group => &["group"],
            Self::TestName => &["testname", "parameter"],
            Self::PrintableText => &["printable", "display"],
            Self::Method => &["method"],
            Self::Unit => &["unit"],
            Self::Rate => &["rate", "price"],
            Self::TatDays => &["tat", "turnaround"],
            Self::Accreditation => &["accredit", "nabl"],
            Self::Department => &["depart"],
        }
    }
}

impl std::fmt::Display for LogicalColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Id => "Id",
            Self::Group => "Group",
            Self::TestName => "Test Name",
            Self::PrintableText => "Printable Text",
            Self::Method => "Method",
            Self::Unit => "Unit",
            Self::Rate => "Rate",
            Self::TatDays => "TAT (days)",
            Self::Accreditation => "Accreditation",
            Self::Department => "Department",
        };
        write!(f, "{name}")
    }
}

/// Resolved header positions for one sheet.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    indices: HashMap<LogicalColumn, usize>,
}

impl ColumnMap {
    #[must_use]
    pub fn index_of(&self, column: LogicalColumn) -> Option<usize> {
        self.indices.get(&column).copied()
    }
}

/// Strip a header down to lowercase alphanumerics for matching.
fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase()
}

fn find_column(headers: &[String], column: LogicalColumn) -> Option<usize> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    for alias in column.exact_aliases() {
        if let Some(idx) = normalized.iter().position(|h| h == alias) {
            return Some(idx);
        }
    }
    for key in column.substring_keys() {
        if let Some(idx) = normalized
            .iter()
            .position(|h| !h.is_empty() && h.contains(key))
        {
            return Some(idx);
        }
    }
    None
}

/// Resolve every logical column against the header row.
///
/// Fails before any data row is processed if a required column cannot be
/// resolved; the error names the missing column and lists the headers that
/// were actually present.
///
/// # Errors
///
/// [`ValidationError::MissingColumn`] for the first unresolved required
/// column.
pub fn resolve_columns(headers: &[String]) -> Result<ColumnMap, ValidationError> {
    let mut map = ColumnMap::default();
    for column in LogicalColumn::ALL {
        if let Some(idx) = find_column(headers, column) {
            map.indices.insert(column, idx);
        }
    }
    for required in LogicalColumn::REQUIRED {
        if map.index_of(required).is_none() {
            return Err(ValidationError::MissingColumn {
                column: required,
                seen: headers.iter().filter(|h| !h.is_empty()).cloned().collect(),
            });
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(hs: &[&str]) -> Vec<String> {
        hs.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_resolves_clean_headers() {
        let map =
            resolve_columns(&headers(&["Group", "Test Name", "Unit", "Rate", "TAT"])).unwrap();
        assert_eq!(map.index_of(LogicalColumn::Group), Some(0));
        assert_eq!(map.index_of(LogicalColumn::TestName), Some(1));
        assert_eq!(map.index_of(LogicalColumn::Unit), Some(2));
        assert_eq!(map.index_of(LogicalColumn::Rate), Some(3));
        assert_eq!(map.index_of(LogicalColumn::TatDays), Some(4));
    }

    #[test]
    fn test_resolves_messy_spellings() {
        let map = resolve_columns(&headers(&[
            "Test Group",
            "Name of Test",
            "Price (Rs.)",
            "NABL Scope",
            "T.A.T. in days",
        ]))
        .unwrap();
        assert_eq!(map.index_of(LogicalColumn::Group), Some(0));
        assert_eq!(map.index_of(LogicalColumn::TestName), Some(1));
        assert_eq!(map.index_of(LogicalColumn::Rate), Some(2));
        assert_eq!(map.index_of(LogicalColumn::Accreditation), Some(3));
        assert_eq!(map.index_of(LogicalColumn::TatDays), Some(4));
    }

    #[test]
    fn test_exact_alias_beats_substring() {
        // "Rate Remarks" contains the substring "rate" but the exact "price"
        // alias must win for the Rate column.
        let map =
            resolve_columns(&headers(&["Group", "Test", "Rate Remarks", "Price"])).unwrap();
        assert_eq!(map.index_of(LogicalColumn::Rate), Some(3));
    }

    #[test]
    fn test_missing_required_column_lists_seen_headers() {
        let err = resolve_columns(&headers(&["Group", "Test Name", "Unit"])).unwrap_err();
        match err {
            ValidationError::MissingColumn { column, seen } => {
                assert_eq!(column, LogicalColumn::Rate);
                assert_eq!(seen, vec!["Group", "Test Name", "Unit"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let msg = resolve_columns(&headers(&["Group", "Test Name"]))
            .unwrap_err()
            .to_string();
        assert!(msg.contains("Rate"));
        assert!(msg.contains("Group"));
    }

    #[test]
    fn test_optional_columns_may_be_absent() {
        let map = resolve_columns(&headers(&["Group", "Test", "Rate"])).unwrap();
        assert_eq!(map.index_of(LogicalColumn::Id), None);
        assert_eq!(map.index_of(LogicalColumn::Department), None);
    }
}
