#![allow(dead_code)]

use data_vision::cell::{CellValue, Row};
use data_vision::dataset::Dataset;

// Build a row from (column, value) pairs, keeping the given order
pub fn row(cells: &[(&str, CellValue)]) -> Row {
    cells
        .iter()
        .map(|(column, value)| (column.to_string(), value.clone()))
        .collect()
}

pub fn num(n: f64) -> CellValue {
    CellValue::Number(n)
}

pub fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

pub fn dataset(file_name: &str, rows: Vec<Row>) -> Dataset {
    let mut headers: Vec<String> = Vec::new();
    for row in &rows {
        for column in row.keys() {
            if !headers.contains(column) {
                headers.push(column.clone());
            }
        }
    }
    Dataset {
        headers,
        rows,
        file_name: file_name.to_string(),
        upload_time: "2024-01-01T00:00:00.000Z".to_string(),
    }
}

// Compare floats produced by summing/dividing
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {} but got {}",
        expected,
        actual
    );
}
