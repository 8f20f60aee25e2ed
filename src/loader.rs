use crate::cell::{CellValue, Row};
use crate::dataset::Dataset;
use crate::error::LoadError;
use calamine::{Data, Reader, Sheets, Xls, Xlsx};
use chrono::{Days, NaiveDate, NaiveTime, SecondsFormat, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

lazy_static! {
    static ref CSV_NUMBER_REGEX: Regex =
        Regex::new(r"^\s*-?(\d+\.?|\.\d+|\d+\.\d+)([eE][-+]?\d+)?\s*$").unwrap();
}

/// Numbers beyond this magnitude stay text
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// File extensions accepted for upload
pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls"];

/// Lower-cased extension of a file name, if any
pub fn file_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Whether a file name has one of the supported extensions
pub fn is_supported(file_name: &str) -> bool {
    file_extension(file_name).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Decode an uploaded file into a dataset
///
/// The format is picked from the extension of `declared_name`, which also
/// becomes the dataset's file name. The upload time is stamped now.
///
/// # Arguments
/// * `bytes` - Raw file content
/// * `declared_name` - Original file name as given by the client
///
/// # Returns
/// * `Result<Dataset, LoadError>` - The parsed dataset or a decode error
///
/// # Examples
/// ```
/// use data_vision::cell::CellValue;
/// use data_vision::loader::parse_file;
///
/// let dataset = parse_file(b"city,sales\nOslo,12\nRome,\n", "sales.csv").unwrap();
///
/// assert_eq!(dataset.headers, vec!["city", "sales"]);
/// assert_eq!(dataset.rows[0]["sales"], CellValue::Number(12.0));
/// assert_eq!(dataset.rows[1]["sales"], CellValue::Null);
/// ```
pub fn parse_file(bytes: &[u8], declared_name: &str) -> Result<Dataset, LoadError> {
    let (headers, rows) = match file_extension(declared_name).as_deref() {
        Some("csv") => from_csv(bytes)?,
        Some("xlsx") => {
            let workbook = Xlsx::new(Cursor::new(bytes)).map_err(calamine::Error::from)?;
            from_workbook(Sheets::Xlsx(workbook))?
        }
        Some("xls") => {
            let workbook = Xls::new(Cursor::new(bytes)).map_err(calamine::Error::from)?;
            from_workbook(Sheets::Xls(workbook))?
        }
        Some(ext) => return Err(LoadError::UnsupportedExtension(ext.to_string())),
        None => return Err(LoadError::MissingExtension),
    };

    log::debug!(
        "parsed {}: {} columns, {} rows",
        declared_name,
        headers.len(),
        rows.len()
    );

    Ok(Dataset {
        headers,
        rows,
        file_name: declared_name.to_string(),
        upload_time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Read a CSV or Excel file from disk
///
/// # Examples
/// ```no_run
/// use data_vision::loader::load_file;
///
/// match load_file("data.csv") {
///     Ok(dataset) => println!("Loaded {} rows", dataset.rows.len()),
///     Err(e) => eprintln!("Error loading file: {}", e),
/// }
/// ```
pub fn load_file(path: impl AsRef<Path>) -> Result<Dataset, LoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_file(&bytes, &name)
}

fn from_csv(bytes: &[u8]) -> Result<(Vec<String>, Vec<Row>), LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut records = reader.byte_records();

    let headers = match records.next() {
        Some(record) => {
            let record = record?;
            unique_headers(
                record
                    .iter()
                    .enumerate()
                    .map(|(i, field)| {
                        let name = String::from_utf8_lossy(field);
                        if i == 0 {
                            name.trim_start_matches('\u{feff}').to_string()
                        } else {
                            name.into_owned()
                        }
                    })
                    .collect(),
            )
        }
        None => return Ok((Vec::new(), Vec::new())),
    };

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(header, field)| {
                (
                    header.clone(),
                    csv_field_value(&String::from_utf8_lossy(field)),
                )
            })
            .collect();
        rows.push(row);
    }

    Ok((headers, rows))
}

/// Type a raw CSV field: empty is null, then booleans, then plain numbers
fn csv_field_value(field: &str) -> CellValue {
    if field.is_empty() {
        return CellValue::Null;
    }
    match field {
        "true" | "TRUE" => return CellValue::Bool(true),
        "false" | "FALSE" => return CellValue::Bool(false),
        _ => {}
    }
    if CSV_NUMBER_REGEX.is_match(field) {
        if let Ok(n) = field.trim().parse::<f64>() {
            if n.abs() <= MAX_SAFE_INTEGER {
                return CellValue::Number(n);
            }
        }
    }
    CellValue::Text(field.to_string())
}

fn from_workbook<RS>(mut workbook: Sheets<RS>) -> Result<(Vec<String>, Vec<Row>), LoadError>
where
    RS: Read + Seek,
{
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(LoadError::NoSheets)?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut sheet_rows = range.rows();
    let headers = match sheet_rows.next() {
        Some(first) => unique_headers(
            first
                .iter()
                .enumerate()
                .map(|(i, cell)| match excel_value(cell) {
                    Some(value) if !value.to_key().is_empty() => value.to_key(),
                    _ => format!("Column {}", i + 1),
                })
                .collect(),
        ),
        None => return Ok((Vec::new(), Vec::new())),
    };

    let rows = sheet_rows
        .map(|cells| -> Row {
            headers
                .iter()
                .zip(cells)
                .filter_map(|(header, cell)| Some((header.clone(), excel_value(cell)?)))
                .collect()
        })
        .filter(|row| !row.is_empty())
        .collect();

    Ok((headers, rows))
}

/// Convert a worksheet cell; `None` for empty cells
fn excel_value(cell: &Data) -> Option<CellValue> {
    let value = match cell {
        Data::Empty => return None,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => excel_serial_to_iso(dt.as_f64())
            .map(CellValue::Text)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    };
    Some(value)
}

/// Excel serial date (days since 1899-12-30) to ISO text
///
/// Whole days print as `YYYY-MM-DD`, anything with a time part as
/// `YYYY-MM-DDTHH:MM:SS`.
pub fn excel_serial_to_iso(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.floor();
    let seconds = (((serial - days) * 86_400.0).round() as u32).min(86_399);

    let date = NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(days as u64))?;
    if seconds == 0 {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)?;
    Some(date.and_time(time).format("%Y-%m-%dT%H:%M:%S").to_string())
}

/// Rename repeated header names to `name_1`, `name_2`, ...
fn unique_headers(names: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    names
        .into_iter()
        .map(|name| {
            let mut candidate = name.clone();
            let mut suffix = 1;
            while seen.contains(&candidate) {
                candidate = format!("{}_{}", name, suffix);
                suffix += 1;
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}
