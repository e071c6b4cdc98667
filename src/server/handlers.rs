//! Request handlers.

use crate::pipeline::{ParseFailure, ParseRequest};
use crate::server::AppState;
use axum::Json;
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Parse one multipart request into a validated entry.
pub async fn parse(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let limit = state.pipeline.config().max_upload_bytes;
    let request = match multipart {
        Ok(form) => match read_form(form, limit).await {
            Ok(request) => request,
            Err(failure) => return failure.into_response(),
        },
        Err(rejection) => {
            return ParseFailure::MalformedForm {
                message: rejection.body_text(),
            }
            .into_response();
        }
    };

    match state.pipeline.run(request).await.into_result() {
        Ok(entry) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            entry.json,
        )
            .into_response(),
        Err(failure) => failure.into_response(),
    }
}

/// Collect `audio`, `hint_text` and `tz`; other fields are ignored.
async fn read_form(mut form: Multipart, limit: u64) -> Result<ParseRequest, ParseFailure> {
    let mut request = ParseRequest::new();
    while let Some(field) = form
        .next_field()
        .await
        .map_err(|e| form_failure(e, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| form_failure(e, limit))?;
                request = request.with_audio(filename, bytes.to_vec());
            }
            "hint_text" => {
                let text = field.text().await.map_err(|e| form_failure(e, limit))?;
                request = request.with_hint_text(text);
            }
            "tz" => {
                let zone = field.text().await.map_err(|e| form_failure(e, limit))?;
                request = request.with_timezone(zone);
            }
            _ => {}
        }
    }
    Ok(request)
}

fn form_failure(error: MultipartError, limit: u64) -> ParseFailure {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ParseFailure::BodyTooLarge { limit }
    } else {
        ParseFailure::MalformedForm {
            message: error.body_text(),
        }
    }
}
