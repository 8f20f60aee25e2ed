use crate::cell::{CellValue, Row, key_of, row_number, row_value};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Built-in computation selected by a calculate request
///
/// Unknown names are not an error: they select `Raw`, which hands the rows
/// back untouched. The same goes for JSON values that are not strings at all
/// (`null`, numbers, objects).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FormulaKind {
    Sum,
    Average,
    Max,
    Min,
    GroupSum,
    GroupAvg,
    Trend,
    Compare,
    Distribution,
    Statistics,
    #[default]
    Raw,
}

impl FormulaKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "sum" => FormulaKind::Sum,
            "average" => FormulaKind::Average,
            "max" => FormulaKind::Max,
            "min" => FormulaKind::Min,
            "groupSum" => FormulaKind::GroupSum,
            "groupAvg" => FormulaKind::GroupAvg,
            "trend" => FormulaKind::Trend,
            "compare" => FormulaKind::Compare,
            "distribution" => FormulaKind::Distribution,
            "statistics" => FormulaKind::Statistics,
            _ => FormulaKind::Raw,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FormulaKind::Sum => "sum",
            FormulaKind::Average => "average",
            FormulaKind::Max => "max",
            FormulaKind::Min => "min",
            FormulaKind::GroupSum => "groupSum",
            FormulaKind::GroupAvg => "groupAvg",
            FormulaKind::Trend => "trend",
            FormulaKind::Compare => "compare",
            FormulaKind::Distribution => "distribution",
            FormulaKind::Statistics => "statistics",
            FormulaKind::Raw => "raw",
        }
    }
}

impl FromStr for FormulaKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl<'de> Deserialize<'de> for FormulaKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().map_or(FormulaKind::Raw, FormulaKind::from_name))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroupedPoint {
    pub name: String,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub x: CellValue,
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryPoint {
    pub category: CellValue,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistributionSlice {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: f64,
    pub percent: f64,
}

/// Summary statistics over the Y column
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub sum: f64,
    pub average: f64,
    pub max: f64,
    pub min: f64,
    pub median: f64,
    pub count: usize,
}

/// Output of a formula, tagged by result shape
///
/// Serializes as `{"type": "...", "data": ...}`, plus `summary` for
/// statistics. Degenerate inputs yield `NaN` or infinities, which JSON
/// encodes as `null`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CalculationResult {
    Single { data: f64 },
    Grouped { data: Vec<GroupedPoint> },
    Trend { data: Vec<TrendPoint> },
    Compare { data: Vec<CategoryPoint> },
    Distribution { data: Vec<DistributionSlice> },
    Statistics { data: Vec<TrendPoint>, summary: Summary },
    Raw { data: Vec<Row> },
}

impl CalculationResult {
    /// Name of the result shape (`single`, `grouped`, ...)
    pub fn kind(&self) -> &'static str {
        match self {
            CalculationResult::Single { .. } => "single",
            CalculationResult::Grouped { .. } => "grouped",
            CalculationResult::Trend { .. } => "trend",
            CalculationResult::Compare { .. } => "compare",
            CalculationResult::Distribution { .. } => "distribution",
            CalculationResult::Statistics { .. } => "statistics",
            CalculationResult::Raw { .. } => "raw",
        }
    }
}

/// Run one formula over a row set
///
/// `column_x` is the label/group column and `column_y` the value column.
/// Y values are coerced to numbers (non-numeric and missing cells count as
/// zero); X values are passed through or stringified, depending on the
/// formula. Empty input is allowed and yields `NaN`/infinite sentinels for
/// the averaging and extremum formulas.
///
/// # Arguments
/// * `rows` - Rows of the dataset, in source order
/// * `formula` - Which computation to run
/// * `column_x` - Grouping / label column
/// * `column_y` - Numeric column
///
/// # Examples
/// ```
/// use data_vision::cell::{CellValue, Row};
/// use data_vision::formula::{calculate, CalculationResult, FormulaKind};
///
/// let rows: Vec<Row> = [("a", 1.0), ("b", 2.0), ("a", 3.0)]
///     .iter()
///     .map(|(k, v)| {
///         let mut row = Row::new();
///         row.insert("k".to_string(), CellValue::from(*k));
///         row.insert("v".to_string(), CellValue::Number(*v));
///         row
///     })
///     .collect();
///
/// match calculate(&rows, FormulaKind::Sum, "k", "v") {
///     CalculationResult::Single { data } => assert_eq!(data, 6.0),
///     other => panic!("unexpected result {:?}", other),
/// }
/// ```
pub fn calculate(
    rows: &[Row],
    formula: FormulaKind,
    column_x: &str,
    column_y: &str,
) -> CalculationResult {
    let y_values: Vec<f64> = rows.iter().map(|row| row_number(row, column_y)).collect();

    match formula {
        FormulaKind::Sum => CalculationResult::Single {
            data: sum(&y_values),
        },
        FormulaKind::Average => CalculationResult::Single {
            data: average(&y_values),
        },
        FormulaKind::Max => CalculationResult::Single {
            data: max(&y_values),
        },
        FormulaKind::Min => CalculationResult::Single {
            data: min(&y_values),
        },
        FormulaKind::GroupSum => CalculationResult::Grouped {
            data: group(rows, column_x, column_y)
                .into_iter()
                .map(|(name, (total, _))| GroupedPoint { name, value: total })
                .collect(),
        },
        FormulaKind::GroupAvg => CalculationResult::Grouped {
            data: group(rows, column_x, column_y)
                .into_iter()
                .map(|(name, (total, count))| GroupedPoint {
                    name,
                    value: total / count as f64,
                })
                .collect(),
        },
        FormulaKind::Trend => CalculationResult::Trend {
            data: trend_points(rows, column_x, &y_values),
        },
        FormulaKind::Compare => CalculationResult::Compare {
            data: rows
                .iter()
                .zip(&y_values)
                .map(|(row, &value)| CategoryPoint {
                    category: row_value(row, column_x),
                    value,
                })
                .collect(),
        },
        FormulaKind::Distribution => {
            let total = sum(&y_values);
            CalculationResult::Distribution {
                data: rows
                    .iter()
                    .zip(&y_values)
                    .map(|(row, &value)| DistributionSlice {
                        kind: key_of(row.get(column_x)),
                        value,
                        // No guard: a zero total gives NaN or infinity
                        percent: value / total * 100.0,
                    })
                    .collect(),
            }
        }
        FormulaKind::Statistics => CalculationResult::Statistics {
            data: trend_points(rows, column_x, &y_values),
            summary: summarize(&y_values),
        },
        FormulaKind::Raw => CalculationResult::Raw {
            data: rows.to_vec(),
        },
    }
}

/// Sum, average, extremes, median and count of a value list
///
/// # Examples
/// ```
/// use data_vision::formula::summarize;
///
/// let summary = summarize(&[4.0, 1.0, 3.0, 2.0]);
/// assert_eq!(summary.sum, 10.0);
/// assert_eq!(summary.median, 2.5);
/// assert_eq!(summary.count, 4);
/// ```
pub fn summarize(values: &[f64]) -> Summary {
    Summary {
        sum: sum(values),
        average: average(values),
        max: max(values),
        min: min(values),
        median: median(values),
        count: values.len(),
    }
}

pub fn sum(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |acc, v| acc + v)
}

/// `NaN` for an empty list
pub fn average(values: &[f64]) -> f64 {
    sum(values) / values.len() as f64
}

/// `-Infinity` for an empty list
pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// `Infinity` for an empty list
pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Middle of the sorted values, mean of the two middle ones for even lengths
///
/// `NaN` for an empty list.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    if n == 0 {
        f64::NAN
    } else if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

// Group key -> (sum, count), in first-seen key order
fn group(rows: &[Row], column_x: &str, column_y: &str) -> IndexMap<String, (f64, usize)> {
    let mut groups: IndexMap<String, (f64, usize)> = IndexMap::new();
    for row in rows {
        let entry = groups.entry(key_of(row.get(column_x))).or_insert((0.0, 0));
        entry.0 += row_number(row, column_y);
        entry.1 += 1;
    }
    groups
}

fn trend_points(rows: &[Row], column_x: &str, y_values: &[f64]) -> Vec<TrendPoint> {
    rows.iter()
        .zip(y_values)
        .map(|(row, &y)| TrendPoint {
            x: row_value(row, column_x),
            y,
        })
        .collect()
}
