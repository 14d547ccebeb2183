//! Row-level validation of a decoded sheet.
//!
//! Every problem in a file is collected and reported together; nothing
//! short-circuits on the first bad row. A batch with any error is rejected
//! wholesale upstream, since a half-applied price list could be acted upon
//! without anyone noticing.

use serde::{Deserialize, Serialize};

use crate::core::types::{AccreditationStatus, CellValue};
use crate::normalize::{
    int_or_null, normalize_accreditation, normalize_group, normalize_unit, string_or_null,
};
use crate::parsing::columns::{ColumnMap, LogicalColumn};
use crate::parsing::sheet::Sheet;

/// A validated, normalized sheet row.
#[derive(Debug, Clone, PartialEq)]
pub struct RateRow {
    /// Fingerprint carried forward from an exported sheet, if any.
    pub id: Option<String>,
    pub group: Option<String>,
    pub test_name: String,
    pub printable_text: Option<String>,
    pub method: Option<String>,
    pub unit: Option<String>,
    pub rate: f64,
    pub tat_days: Option<i64>,
    pub accreditation: Option<AccreditationStatus>,
    pub department: Option<String>,
    /// Parameter names split from the printable text.
    pub parameters: Vec<String>,
}

/// One row-level problem, keyed by 1-based data-row number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

/// Output of row parsing: everything that validated plus everything that
/// did not.
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub rows: Vec<RateRow>,
    pub errors: Vec<RowError>,
}

fn cell<'a>(row: &'a [CellValue], map: &ColumnMap, column: LogicalColumn) -> &'a CellValue {
    map.index_of(column)
        .and_then(|idx| row.get(idx))
        .unwrap_or(&CellValue::Empty)
}

/// Parse the rate cell. Blank defaults to 0; present-but-non-numeric or
/// negative values are row errors.
fn parse_rate(raw: &CellValue) -> Result<f64, String> {
    if raw.is_blank() {
        return Ok(0.0);
    }
    let value = match raw {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => {
            // Tolerate thousands separators and a currency marker.
            let cleaned: String = s
                .trim()
                .trim_start_matches('₹')
                .replace(',', "")
                .trim()
                .to_string();
            cleaned
                .parse::<f64>()
                .map_err(|_| format!("rate '{}' is not numeric", s.trim()))?
        }
        CellValue::Bool(_) => return Err("rate must be a number".to_string()),
        CellValue::Empty => unreachable!("blank handled above"),
    };
    if !value.is_finite() {
        return Err("rate must be a finite number".to_string());
    }
    if value < 0.0 {
        return Err(format!("rate must not be negative (got {value})"));
    }
    Ok(value)
}

fn split_parameters(printable: Option<&str>) -> Vec<String> {
    printable
        .map(|text| {
            text.split([',', ';'])
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Validate every data row of a sheet against the resolved column map.
///
/// Blank rows are skipped silently. Row numbers in errors are 1-based and
/// count data rows (the header row is row 0 from the caller's point of
/// view).
#[must_use]
pub fn parse_rows(sheet: &Sheet, map: &ColumnMap) -> ParsedBatch {
    let mut batch = ParsedBatch::default();

    for (i, raw_row) in sheet.rows.iter().enumerate() {
        let row_number = i + 1;
        if raw_row.iter().all(CellValue::is_blank) {
            continue;
        }

        let group = normalize_group(cell(raw_row, map, LogicalColumn::Group));
        let test_name = string_or_null(cell(raw_row, map, LogicalColumn::TestName));

        let mut row_ok = true;
        if group.is_none() {
            batch.errors.push(RowError {
                row: row_number,
                message: "missing group".to_string(),
            });
            row_ok = false;
        }
        if test_name.is_none() {
            batch.errors.push(RowError {
                row: row_number,
                message: "missing test name".to_string(),
            });
            row_ok = false;
        }

        let rate = match parse_rate(cell(raw_row, map, LogicalColumn::Rate)) {
            Ok(rate) => rate,
            Err(message) => {
                batch.errors.push(RowError {
                    row: row_number,
                    message,
                });
                row_ok = false;
                0.0
            }
        };

        if !row_ok {
            continue;
        }

        let printable_text = string_or_null(cell(raw_row, map, LogicalColumn::PrintableText));
        let unit = string_or_null(cell(raw_row, map, LogicalColumn::Unit))
            .and_then(|u| normalize_unit(&u));

        batch.rows.push(RateRow {
            id: string_or_null(cell(raw_row, map, LogicalColumn::Id)),
            group,
            test_name: test_name.unwrap_or_default(),
            parameters: split_parameters(printable_text.as_deref()),
            printable_text,
            method: string_or_null(cell(raw_row, map, LogicalColumn::Method)),
            unit,
            rate,
            tat_days: int_or_null(cell(raw_row, map, LogicalColumn::TatDays)),
            accreditation: normalize_accreditation(cell(raw_row, map, LogicalColumn::Accreditation)),
            department: string_or_null(cell(raw_row, map, LogicalColumn::Department)),
        });
    }

    batch
}
