//! Response shaping.
//!
//! | Outcome  | Status          | Body                        |
//! |----------|-----------------|-----------------------------|
//! | `Binary` | 200             | image bytes, as attachment  |
//! | `Json`   | carried status  | JSON payload                |
//! | `Error`  | carried status  | `{"error": message}`        |

use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::dispatch::OperationOutcome;

impl IntoResponse for OperationOutcome {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            OperationOutcome::Binary {
                bytes,
                mime,
                filename,
            } => (
                status,
                [
                    (header::CONTENT_TYPE, mime.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename={}", filename),
                    ),
                ],
                bytes,
            )
                .into_response(),
            OperationOutcome::Json { payload, .. } => (status, Json(payload)).into_response(),
            OperationOutcome::Error { message, .. } => {
                (status, Json(json!({ "error": message }))).into_response()
            }
        }
    }
}
