use thiserror::Error;

/// Failure to decode an uploaded or local table
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV read error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet read error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),

    #[error("file has no extension")]
    MissingExtension,

    #[error("workbook contains no sheets")]
    NoSheets,
}

#[cfg(feature = "web")]
pub use api::ApiError;

#[cfg(feature = "web")]
mod api {
    use super::LoadError;
    use axum::Json;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use serde_json::json;
    use thiserror::Error;

    /// Error returned by an HTTP handler, rendered as `{"error": "..."}`
    #[derive(Error, Debug)]
    pub enum ApiError {
        #[error("invalid request parameters: {0}")]
        BadRequest(String),

        #[error("please select a file to upload")]
        MissingFile,

        #[error("only CSV, XLSX and XLS files are supported")]
        UnsupportedFile,

        #[error("dataset not found")]
        DatasetNotFound,

        #[error("failed to parse file: {0}")]
        Parse(#[from] LoadError),

        #[error("{0}")]
        Internal(String),
    }

    impl ApiError {
        pub fn status(&self) -> StatusCode {
            match self {
                ApiError::BadRequest(_) | ApiError::MissingFile | ApiError::UnsupportedFile => {
                    StatusCode::BAD_REQUEST
                }
                ApiError::DatasetNotFound => StatusCode::NOT_FOUND,
                ApiError::Parse(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for ApiError {
        fn into_response(self) -> Response {
            let status = self.status();
            if status.is_server_error() {
                log::error!("{}", self);
            } else {
                log::warn!("{}", self);
            }
            (status, Json(json!({ "error": self.to_string() }))).into_response()
        }
    }
}
