// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the suggestion function.
//!
//! Handles POST /functions/v1/generate-messages, its preflight, and GET /health.

use axum::{
    Json,
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

/// Suggestions returned when `language` is exactly `"en"`.
pub const ENGLISH_SUGGESTIONS: [&str; 3] = [
    "Hello! Just a reminder about tomorrow's election. Your vote matters.",
    "Don't forget to visit your polling station tomorrow. Your participation is crucial for our future.",
    "Election reminder: Polls open from 6am to 6pm tomorrow. Please remember to bring your ID.",
];

/// Suggestions returned for every other `language`, including none.
pub const SWAHILI_SUGGESTIONS: [&str; 3] = [
    "Habari! Tunataka kukumbusha kuhusu uchaguzi kesho. Kura yako ni muhimu.",
    "Ndugu mpigakura, tutafurahi kukuona katika kituo cha kupigia kura kesho.",
    "Tafadhali kumbuka kupiga kura kesho. Vituo vya kupigia kura vitafunguliwa saa 12 asubuhi.",
];

/// Response body for a successful suggestion request.
#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub suggestions: Vec<String>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// POST /functions/v1/generate-messages
///
/// Reads `{prompt, language, messageType}` and answers with a fixed set of
/// suggestions. No text is generated.
pub async fn generate_messages(body: Bytes) -> Response {
    let request: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(error = %e, "unreadable suggestion request");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };
    if request.is_null() {
        tracing::error!("suggestion request body is null");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "request body must be a JSON object".to_string(),
        );
    }

    if !request.get("prompt").is_some_and(is_present) {
        return error_response(StatusCode::BAD_REQUEST, "Missing prompt parameter".to_string());
    }

    let language = request.get("language").and_then(Value::as_str);
    let message_type = request.get("messageType").and_then(Value::as_str);
    tracing::debug!(language, message_type, "serving message suggestions");

    let response = SuggestionResponse {
        suggestions: suggestions_for(language)
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// OPTIONS preflight. Cross-origin headers are added by the router layers.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Picks the suggestion set for a request language.
pub fn suggestions_for(language: Option<&str>) -> &'static [&'static str; 3] {
    match language {
        Some("en") => &ENGLISH_SUGGESTIONS,
        _ => &SWAHILI_SUGGESTIONS,
    }
}

/// `null`, `false`, `0`, and `""` count as a missing prompt.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_exact_en_selects_english() {
        assert_eq!(suggestions_for(Some("en")), &ENGLISH_SUGGESTIONS);
        assert_eq!(suggestions_for(Some("EN")), &SWAHILI_SUGGESTIONS);
        assert_eq!(suggestions_for(Some("sw")), &SWAHILI_SUGGESTIONS);
        assert_eq!(suggestions_for(None), &SWAHILI_SUGGESTIONS);
    }

    #[test]
    fn falsy_prompts_are_missing() {
        for value in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(!is_present(&value), "{value} should count as missing");
        }
        for value in [json!("remind"), json!(1), json!(true), json!([]), json!({})] {
            assert!(is_present(&value), "{value} should count as present");
        }
    }

    #[test]
    fn error_response_serializes() {
        let json = serde_json::to_string(&ErrorResponse {
            error: "Missing prompt parameter".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"error":"Missing prompt parameter"}"#);
    }
}
