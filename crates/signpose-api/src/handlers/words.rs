//! Vocabulary listing.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct WordsResponse {
    pub count: usize,
    pub words: Vec<String>,
}

/// `GET /api/words`: every word that can be animated, sorted.
pub async fn list_words(State(state): State<AppState>) -> Json<WordsResponse> {
    let words = state.pipeline.words();
    Json(WordsResponse {
        count: words.len(),
        words,
    })
}
