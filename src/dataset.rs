use crate::cell::Row;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

/// A parsed tabular file
///
/// `rows` keep source order. Every key in a row should appear in `headers`,
/// but the engines tolerate rows that break this.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    pub file_name: String,
    pub upload_time: String,
}

/// Listing entry for a stored dataset (no row data)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetInfo {
    pub id: String,
    pub file_name: String,
    pub upload_time: String,
    pub row_count: usize,
    pub headers: Vec<String>,
}

impl Dataset {
    pub fn info(&self, id: &str) -> DatasetInfo {
        DatasetInfo {
            id: id.to_string(),
            file_name: self.file_name.clone(),
            upload_time: self.upload_time.clone(),
            row_count: self.rows.len(),
            headers: self.headers.clone(),
        }
    }
}

/// Resolves a dataset id to an immutable snapshot
///
/// This is the only way the engines and handlers reach stored data.
/// Implemented for the registry and for closures, so callers can inject
/// whatever lookup they need.
pub trait DatasetSource {
    fn dataset(&self, id: &str) -> Option<Arc<Dataset>>;
}

impl<F> DatasetSource for F
where
    F: Fn(&str) -> Option<Arc<Dataset>>,
{
    fn dataset(&self, id: &str) -> Option<Arc<Dataset>> {
        self(id)
    }
}

/// In-memory dataset store, keyed by generated id
///
/// Entries are kept in upload order so listings are stable. Nothing is
/// persisted; the store lives as long as the process.
#[derive(Debug, Default)]
pub struct DatasetRegistry {
    datasets: RwLock<IndexMap<String, Arc<Dataset>>>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a dataset and return its new id
    ///
    /// # Examples
    /// ```
    /// use data_vision::dataset::{Dataset, DatasetRegistry};
    ///
    /// let registry = DatasetRegistry::new();
    /// let id = registry.insert(Dataset {
    ///     headers: vec!["a".to_string()],
    ///     rows: Vec::new(),
    ///     file_name: "a.csv".to_string(),
    ///     upload_time: "2024-01-01T00:00:00.000Z".to_string(),
    /// });
    ///
    /// assert!(registry.get(&id).is_some());
    /// assert!(registry.remove(&id));
    /// assert!(!registry.remove(&id));
    /// ```
    pub fn insert(&self, dataset: impl Into<Arc<Dataset>>) -> String {
        let id = Uuid::new_v4().to_string();
        self.datasets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), dataset.into());
        id
    }

    pub fn get(&self, id: &str) -> Option<Arc<Dataset>> {
        self.datasets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn list(&self) -> Vec<DatasetInfo> {
        self.datasets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, dataset)| dataset.info(id))
            .collect()
    }

    /// Drop a dataset; returns whether it existed
    pub fn remove(&self, id: &str) -> bool {
        self.datasets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.datasets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DatasetSource for DatasetRegistry {
    fn dataset(&self, id: &str) -> Option<Arc<Dataset>> {
        self.get(id)
    }
}
