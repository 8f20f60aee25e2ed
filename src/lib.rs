/*!
# Data Vision

A small data-visualization backend, built in Rust.

## Overview

Users upload tabular files (CSV or Excel). The backend parses each file into
an in-memory dataset and exposes a set of formula and aggregation endpoints
that turn a dataset into chart-ready shapes: single numbers, groupings,
trends, distributions, summary statistics, time-bucketed series and
multi-dataset comparisons. A browser front end renders the results.

## Architecture

### Calculation engines (pure, synchronous)
- **Formula engine** (`formula`) - one typed `CalculationResult` per formula
- **Period aggregator** (`period`) - sums a value column per day/week/month/year
- **Comparison engine** (`compare`) - per-dataset totals and label/value series

The engines share only the cell type and its numeric coercion (`cell`).
They never fail: non-numeric cells count as zero, undated rows are skipped,
unknown formulas return the raw rows, and empty inputs produce `NaN` or
infinite sentinels.

### Collaborators
- **Loader** (`loader`) - decodes CSV/XLSX/XLS bytes into a `Dataset`
- **Registry** (`dataset`) - in-memory id to dataset store, reached through
  the `DatasetSource` lookup trait
- **Transport** (`app`, feature `web`) - axum routes, uploads, static files

## REST API Endpoints

- `GET /api/health` - Liveness check
- `POST /api/upload` - Upload a CSV/XLSX/XLS file (multipart field `file`)
- `GET /api/datasets` - List stored datasets
- `GET|DELETE /api/datasets/{id}` - Fetch or drop one dataset
- `POST /api/calculate` - Run a formula
- `POST /api/aggregate` - Time-bucketed sum
- `POST /api/compare-datasets` - Compare several datasets
*/

pub mod cell;
pub mod compare;
pub mod config;
pub mod dataset;
pub mod error;
pub mod formula;
pub mod loader;
pub mod period;

#[cfg(feature = "web")]
pub mod app;

/// Re-export the main types to make them easier to use
pub use cell::{CellValue, Row, coerce};
pub use compare::{CompareResult, compare_datasets};
pub use dataset::{Dataset, DatasetInfo, DatasetRegistry, DatasetSource};
pub use error::LoadError;
pub use formula::{CalculationResult, FormulaKind, Summary, calculate};
pub use loader::{load_file, parse_file};
pub use period::{Period, PeriodBucket, aggregate_by_period};
