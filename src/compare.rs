use crate::cell::{CellValue, row_number, row_value};
use crate::dataset::{Dataset, DatasetSource};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabeledPoint {
    pub label: CellValue,
    pub value: f64,
}

/// Per-dataset totals and label/value series
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResult {
    pub dataset_id: String,
    pub file_name: String,
    pub total: f64,
    pub row_count: usize,
    pub data: Vec<LabeledPoint>,
}

impl CompareResult {
    /// Project one dataset onto its label and value columns
    pub fn from_dataset(
        id: &str,
        dataset: &Dataset,
        value_column: &str,
        label_column: &str,
    ) -> Self {
        let data: Vec<LabeledPoint> = dataset
            .rows
            .iter()
            .map(|row| LabeledPoint {
                label: row_value(row, label_column),
                value: row_number(row, value_column),
            })
            .collect();
        let total = data.iter().fold(0.0, |acc, point| acc + point.value);

        CompareResult {
            dataset_id: id.to_string(),
            file_name: dataset.file_name.clone(),
            total,
            row_count: dataset.rows.len(),
            data,
        }
    }
}

/// Compare several datasets on a shared value/label column pair
///
/// Ids that do not resolve are dropped without an error; the remaining
/// results keep the order of `dataset_ids`.
///
/// # Arguments
/// * `dataset_ids` - Ids to compare, in output order
/// * `source` - Lookup used to resolve each id
/// * `value_column` - Numeric column, summed into `total`
/// * `label_column` - Column copied into each point's `label`
///
/// # Examples
/// ```
/// use data_vision::cell::{CellValue, Row};
/// use data_vision::compare::compare_datasets;
/// use data_vision::dataset::Dataset;
/// use std::sync::Arc;
///
/// let mut row = Row::new();
/// row.insert("v".to_string(), CellValue::Number(4.0));
/// let dataset = Arc::new(Dataset {
///     headers: vec!["v".to_string()],
///     rows: vec![row],
///     file_name: "a.csv".to_string(),
///     upload_time: String::new(),
/// });
///
/// let lookup = |id: &str| (id == "a").then(|| dataset.clone());
/// let ids = vec!["a".to_string(), "missing".to_string()];
/// let results = compare_datasets(&ids, &lookup, "v", "label");
///
/// assert_eq!(results.len(), 1);
/// assert_eq!(results[0].total, 4.0);
/// ```
pub fn compare_datasets<S>(
    dataset_ids: &[String],
    source: &S,
    value_column: &str,
    label_column: &str,
) -> Vec<CompareResult>
where
    S: DatasetSource + ?Sized,
{
    dataset_ids
        .iter()
        .filter_map(|id| {
            source
                .dataset(id)
                .map(|dataset| CompareResult::from_dataset(id, &dataset, value_column, label_column))
        })
        .collect()
}
