use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("Belum ada data survei untuk dianalisis.")]
    NoAnalysisData { event_id: i64 },

    #[error("Tidak ada data survei untuk diunduh.")]
    NoExportData { event_id: i64 },

    #[error("ID Event tidak valid.")]
    InvalidEventId(String),

    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("row source failed: {0}")]
    Source(String),

    #[error("sheet '{0}' has more cells than a worksheet can hold")]
    SheetTooLarge(String),

    #[error("workbook serialization failed: {0}")]
    Serialization(#[from] rust_xlsxwriter::XlsxError),
}

impl SurveyError {
    pub fn is_no_data(&self) -> bool {
        matches!(
            self,
            SurveyError::NoAnalysisData { .. } | SurveyError::NoExportData { .. }
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            SurveyError::NoAnalysisData { .. } | SurveyError::NoExportData { .. } => {
                StatusCode::NOT_FOUND
            }
            SurveyError::InvalidEventId(_) => StatusCode::BAD_REQUEST,
            SurveyError::Query(_)
            | SurveyError::Source(_)
            | SurveyError::SheetTooLarge(_)
            | SurveyError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<csv::Error> for SurveyError {
    fn from(err: csv::Error) -> Self {
        SurveyError::Source(err.to_string())
    }
}

impl IntoResponse for SurveyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            SurveyError::NoAnalysisData { .. }
            | SurveyError::NoExportData { .. }
            | SurveyError::InvalidEventId(_) => json!({ "message": self.to_string() }),
            SurveyError::Query(err) => json!({
                "message": "Server error saat memproses data survei.",
                "error": err.to_string(),
            }),
            SurveyError::Source(err) => json!({
                "message": "Server error saat memproses data survei.",
                "error": err,
            }),
            SurveyError::SheetTooLarge(_) => json!({
                "message": "Server error saat membuat file unduhan.",
                "error": self.to_string(),
            }),
            SurveyError::Serialization(err) => json!({
                "message": "Server error saat membuat file unduhan.",
                "error": err.to_string(),
            }),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_data_maps_to_not_found() {
        let err = SurveyError::NoAnalysisData { event_id: 7 };
        assert!(err.is_no_data());
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            SurveyError::NoExportData { event_id: 7 }.status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn source_failures_are_server_errors() {
        let err = SurveyError::Source("answers.csv: missing column".to_string());
        assert!(!err.is_no_data());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            SurveyError::InvalidEventId("abc".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn oversized_sheet_is_a_server_error() {
        let err = SurveyError::SheetTooLarge("Vendor".to_string());
        assert!(!err.is_no_data());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("'Vendor'"));
    }
}
