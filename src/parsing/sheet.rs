//! Decode uploaded bytes into a header row plus cell matrix.
//!
//! Only the first worksheet of a workbook is read; rate lists are
//! single-sheet documents and silently merging sheets would hide data.

use std::io::Cursor;

use calamine::{Data, Reader, Xls, Xlsx};

use crate::core::types::CellValue;
use crate::parsing::ParseError;

/// Maximum accepted upload size (DoS protection).
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Maximum number of data rows in a single sheet (DoS protection).
pub const MAX_DATA_ROWS: usize = 50_000;

/// A decoded sheet: stringified header row and raw cell matrix.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SheetFormat {
    Xlsx,
    Xls,
    Csv,
}

/// Decode spreadsheet bytes into a [`Sheet`].
///
/// The format is chosen from the filename extension when one is given,
/// falling back to content sniffing (XLSX files are ZIP containers). The
/// first row becomes the header row; everything after it is data.
///
/// # Errors
///
/// [`ParseError::FileTooLarge`] / [`ParseError::TooManyRows`] when limits are
/// exceeded, [`ParseError::EmptySheet`] when there is no header row, and
/// [`ParseError::Decode`] when the bytes cannot be read in the chosen format.
pub fn decode_sheet(bytes: &[u8], filename: Option<&str>) -> Result<Sheet, ParseError> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ParseError::FileTooLarge {
            max: MAX_UPLOAD_BYTES,
        });
    }

    let format = detect_format(bytes, filename)?;
    let sheet = match format {
        SheetFormat::Xlsx => decode_xlsx(bytes)?,
        SheetFormat::Xls => decode_xls(bytes)?,
        SheetFormat::Csv => decode_csv(bytes)?,
    };

    if sheet.rows.len() > MAX_DATA_ROWS {
        return Err(ParseError::TooManyRows {
            limit: MAX_DATA_ROWS,
        });
    }
    Ok(sheet)
}

fn detect_format(bytes: &[u8], filename: Option<&str>) -> Result<SheetFormat, ParseError> {
    if let Some(name) = filename {
        let ext = std::path::Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        match ext.as_deref() {
            Some("xlsx" | "xlsm") => return Ok(SheetFormat::Xlsx),
            Some("xls") => return Ok(SheetFormat::Xls),
            Some("csv" | "txt" | "tsv") => return Ok(SheetFormat::Csv),
            Some(other) => {
                return Err(ParseError::UnsupportedFormat(Some(other.to_string())));
            }
            None => {}
        }
    }
    // No usable extension: sniff. XLSX is a ZIP container, legacy XLS an OLE
    // compound file.
    if bytes.starts_with(b"PK\x03\x04") {
        Ok(SheetFormat::Xlsx)
    } else if bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
        Ok(SheetFormat::Xls)
    } else {
        Ok(SheetFormat::Csv)
    }
}

fn decode_xlsx(bytes: &[u8]) -> Result<Sheet, ParseError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| ParseError::Decode(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ParseError::EmptySheet)?
        .map_err(|e| ParseError::Decode(e.to_string()))?;
    sheet_from_range(&range)
}

fn decode_xls(bytes: &[u8]) -> Result<Sheet, ParseError> {
    let mut workbook: Xls<_> = Xls::new(Cursor::new(bytes))
        .map_err(|e| ParseError::Decode(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ParseError::EmptySheet)?
        .map_err(|e| ParseError::Decode(e.to_string()))?;
    sheet_from_range(&range)
}

fn sheet_from_range(range: &calamine::Range<Data>) -> Result<Sheet, ParseError> {
    let mut rows_iter = range.rows();
    let header_cells = rows_iter.next().ok_or(ParseError::EmptySheet)?;
    let headers = header_cells.iter().map(cell_to_header).collect();
    let rows = rows_iter
        .map(|row| row.iter().map(data_to_cell).collect())
        .collect();
    Ok(Sheet { headers, rows })
}

fn decode_csv(bytes: &[u8]) -> Result<Sheet, ParseError> {
    let text = String::from_utf8_lossy(bytes);
    let delimiter = if text.lines().next().is_some_and(|l| l.contains('\t')) {
        b'\t'
    } else {
        b','
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let header_record = records
        .next()
        .ok_or(ParseError::EmptySheet)?
        .map_err(|e| ParseError::Decode(e.to_string()))?;
    let headers: Vec<String> = header_record.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(|e| ParseError::Decode(e.to_string()))?;
        rows.push(record.iter().map(CellValue::from).collect());
    }
    Ok(Sheet { headers, rows })
}

fn cell_to_header(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

fn data_to_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => {
            #[allow(clippy::cast_precision_loss)]
            CellValue::Number(*i as f64)
        }
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::from(s.as_str()),
        Data::Error(_) => CellValue::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_csv_basic() {
        let csv = b"Group,Test Name,Rate\nMetals,Lead,350\nMetals,Cadmium,420\n";
        let sheet = decode_sheet(csv, Some("rates.csv")).unwrap();
        assert_eq!(sheet.headers, vec!["Group", "Test Name", "Rate"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0][1], CellValue::Text("Lead".into()));
    }

    #[test]
    fn test_decode_tsv_by_sniffing() {
        let tsv = b"Group\tTest\tRate\nMetals\tLead\t350\n";
        let sheet = decode_sheet(tsv, None).unwrap();
        assert_eq!(sheet.headers.len(), 3);
        assert_eq!(sheet.rows.len(), 1);
    }

    #[test]
    fn test_decode_rejects_unknown_extension() {
        let err = decode_sheet(b"whatever", Some("rates.pdf")).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedFormat(Some(ref e)) if e == "pdf"));
    }

    #[test]
    fn test_decode_rejects_oversized_input() {
        let big = vec![b'a'; MAX_UPLOAD_BYTES + 1];
        let err = decode_sheet(&big, Some("rates.csv")).unwrap_err();
        assert!(matches!(err, ParseError::FileTooLarge { .. }));
    }

    #[test]
    fn test_decode_empty_input_is_empty_sheet() {
        let err = decode_sheet(b"", Some("rates.csv")).unwrap_err();
        assert!(matches!(err, ParseError::EmptySheet));
    }

    #[test]
    fn test_ragged_csv_rows_are_tolerated() {
        let csv = b"Group,Test,Rate\nMetals,Lead\n";
        let sheet = decode_sheet(csv, Some("r.csv")).unwrap();
        assert_eq!(sheet.rows[0].len(), 2);
    }
}
