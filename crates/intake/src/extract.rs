use crate::error::IntakeError;
use crate::limits::IntakeLimits;
use crate::signature::{self, FileKind};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use model::records::row::RawRow;
use std::io::Cursor;
use tracing::debug;

/// Decoded upload: ordered header names plus the raw data rows, each tagged
/// with its 1-based position in the source file (header excluded).
#[derive(Debug, Clone)]
pub struct Extraction {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Validates signature and ceilings, then decodes the buffer into raw rows.
/// Rows whose cells are all blank are dropped; their source positions are
/// preserved in the numbering of later rows.
pub fn extract(
    file_name: &str,
    bytes: &[u8],
    limits: &IntakeLimits,
) -> Result<Extraction, IntakeError> {
    if bytes.len() as u64 > limits.max_bytes {
        return Err(IntakeError::TooLarge {
            actual: bytes.len() as u64,
            limit: limits.max_bytes,
        });
    }

    let kind = signature::check_signature(file_name, bytes)?;
    let extraction = match kind {
        FileKind::Delimited => extract_delimited(bytes, limits)?,
        FileKind::Workbook => extract_workbook(bytes, limits)?,
    };

    debug!(
        file_name,
        headers = extraction.headers.len(),
        rows = extraction.rows.len(),
        "Extracted upload"
    );
    Ok(extraction)
}

fn extract_delimited(bytes: &[u8], limits: &IntakeLimits) -> Result<Extraction, IntakeError> {
    let delimiter = signature::sniff_delimiter(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(IntakeError::InvalidFormat("Missing header row".into()));
    }

    let mut rows = Vec::new();
    let mut row_number: u32 = 0;
    for record in reader.records() {
        row_number += 1;
        if row_number as u64 > limits.max_rows {
            return Err(IntakeError::TooManyRows {
                limit: limits.max_rows,
            });
        }

        let record = record.map_err(|e| IntakeError::Read {
            row: row_number as u64,
            message: e.to_string(),
        })?;

        let cells: Vec<(String, String)> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let value = record.get(i).unwrap_or("").trim().to_string();
                (header.clone(), value)
            })
            .collect();

        let row = RawRow::new(row_number, cells);
        if !row.is_empty() {
            rows.push(row);
        }
    }

    Ok(Extraction { headers, rows })
}

fn extract_workbook(bytes: &[u8], limits: &IntakeLimits) -> Result<Extraction, IntakeError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|e| IntakeError::Workbook(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IntakeError::InvalidFormat("Workbook has no sheets".into()))?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| IntakeError::Workbook(e.to_string()))?;

    let mut row_iter = range.rows();
    let headers: Vec<String> = row_iter
        .next()
        .ok_or_else(|| IntakeError::InvalidFormat("Missing header row".into()))?
        .iter()
        .map(render_cell)
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(IntakeError::InvalidFormat("Missing header row".into()));
    }

    let data_rows = range.height().saturating_sub(1) as u64;
    if data_rows > limits.max_rows {
        return Err(IntakeError::TooManyRows {
            limit: limits.max_rows,
        });
    }

    let mut rows = Vec::new();
    for (idx, cells) in row_iter.enumerate() {
        let row_number = (idx + 1) as u32;
        let cells: Vec<(String, String)> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let value = cells.get(i).map(render_cell).unwrap_or_default();
                (header.clone(), value)
            })
            .collect();

        let row = RawRow::new(row_number, cells);
        if !row.is_empty() {
            rows.push(row);
        }
    }

    Ok(Extraction { headers, rows })
}

fn render_cell(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => format!("{other}").trim().to_string(),
    }
}
