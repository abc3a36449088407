//! HTTP JSON server: letter rolls, word checks and log relays.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::dictionary::Dictionary;
use crate::engine::roll::roll_letters;
use crate::engine::tiles::word_cost;
use crate::export::backend::{UploadBackend, UploadError, UploadFile};

/// Largest batch `/roll` will hand out in one response.
pub const MAX_ROLL: usize = 100;

/// Shared, read-only handler state.
pub struct AppState {
    pub dictionary: Box<dyn Dictionary>,
    pub uploader: Box<dyn UploadBackend>,
    /// Server-held credential for `uploader`.
    pub upload_token: Option<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/roll", get(roll))
        .route("/check-word", post(check_word))
        .route("/api/upload", post(upload))
        .route("/api/save-game-log", post(save_game_log))
        .with_state(state)
}

/// POST bodies that are missing, not JSON or the wrong shape read as the
/// empty request, so handlers answer with their own validation errors.
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

// --- /roll ---

#[derive(Debug, Default, Deserialize)]
pub struct RollQuery {
    count: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RollResponse {
    pub letters: Vec<String>,
}

/// Missing, unparsable or zero counts fall back to one letter.
fn roll_count(raw: Option<&str>) -> usize {
    match raw.and_then(|s| s.trim().parse::<usize>().ok()) {
        Some(n) if n > 0 => n.min(MAX_ROLL),
        _ => 1,
    }
}

pub async fn roll(Query(query): Query<RollQuery>) -> Json<RollResponse> {
    let count = roll_count(query.count.as_deref());
    let letters = roll_letters(&mut rand::thread_rng(), count)
        .into_iter()
        .map(String::from)
        .collect();
    Json(RollResponse { letters })
}

// --- /check-word ---

#[derive(Debug, Default, Deserialize)]
pub struct CheckWordRequest {
    #[serde(default)]
    word: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckWordResponse {
    pub valid: bool,
    pub score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckWordResponse {
    fn invalid() -> Self {
        Self {
            valid: false,
            score: 0,
            error: None,
        }
    }
}

pub async fn check_word(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> (StatusCode, Json<CheckWordResponse>) {
    let req: CheckWordRequest = parse_body(&body);
    let word = req.word.unwrap_or_default();
    let word = word.trim();
    if word.is_empty() {
        return (
            StatusCode::OK,
            Json(CheckWordResponse {
                error: Some("empty word".into()),
                ..CheckWordResponse::invalid()
            }),
        );
    }

    match state.dictionary.lookup(word).await {
        Ok(true) => {
            let score = word_cost(&word.to_uppercase());
            (
                StatusCode::OK,
                Json(CheckWordResponse {
                    valid: true,
                    score,
                    error: None,
                }),
            )
        }
        Ok(false) => (StatusCode::OK, Json(CheckWordResponse::invalid())),
        Err(e) => {
            tracing::error!(word, error = %e, "error checking word");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(CheckWordResponse::invalid()))
        }
    }
}

// --- /api/upload ---

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    csv_content: Option<String>,
}

pub async fn upload(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let req: UploadRequest = parse_body(&body);
    let (file_name, csv) = match (req.file_name, req.csv_content) {
        (Some(f), Some(c)) if !f.is_empty() && !c.is_empty() => (f, c),
        _ => return (StatusCode::BAD_REQUEST, "Missing fileName or csvContent").into_response(),
    };

    let file = UploadFile {
        name: file_name,
        mime_type: "text/csv".into(),
        bytes: csv.into_bytes(),
    };
    match state
        .uploader
        .upload(&file, state.upload_token.as_deref())
        .await
    {
        Ok(()) => {
            tracing::info!(file = %file.name, backend = state.uploader.name(), "relayed upload");
            (
                StatusCode::OK,
                Json(serde_json::json!({ "message": "File uploaded to Dropbox!" })),
            )
                .into_response()
        }
        Err(UploadError::Transport(e)) => {
            tracing::error!(file = %file.name, error = %e, "upload relay transport error");
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
        Err(e) => {
            tracing::error!(file = %file.name, error = %e, "dropbox upload error");
            (StatusCode::INTERNAL_SERVER_ERROR, "Dropbox upload failed").into_response()
        }
    }
}

// --- /api/save-game-log ---

fn is_blank(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(b) => !b,
        serde_json::Value::String(s) => s.is_empty(),
        _ => false,
    }
}

pub async fn save_game_log(body: Bytes) -> (StatusCode, &'static str) {
    let body: serde_json::Value = parse_body(&body);
    let log = body.get("gameLog").unwrap_or(&serde_json::Value::Null);
    if is_blank(log) {
        return (StatusCode::BAD_REQUEST, "No gameLog provided");
    }
    tracing::info!(game_log = %log, "game log received");
    (StatusCode::OK, "Game log saved successfully!")
}
