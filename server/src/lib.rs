use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use quarry::{Engine, Error, PorterStemmer, SearchConfig, SearchMode, SpellingSuggestion};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

const MAX_K: usize = 100;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default)]
    pub mode: Option<SearchMode>,
    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub mode: SearchMode,
    pub took_s: f64,
    pub total_hits: usize,
    pub accumulators: usize,
    pub results: Vec<SearchHit>,
    pub suggestions: Vec<SpellingSuggestion>,
    /// The query with the first suggestion applied, when there is one.
    pub corrected_query: Option<String>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: u32,
    pub score: f64,
    pub title: String,
    pub path: Option<String>,
    pub matching_terms: Vec<String>,
    pub snippet: Option<String>,
}

#[derive(Deserialize)]
pub struct SuggestParams {
    pub term: String,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(err: Error) -> ApiError {
    let status = match &err {
        Error::Parse(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

/// Open the index under `<corpus_dir>/index/` and serve it.
pub fn build_app(corpus_dir: impl AsRef<std::path::Path>, config: SearchConfig) -> Result<Router> {
    let corpus_dir = corpus_dir.as_ref();
    let engine = Engine::open(corpus_dir, Box::new(PorterStemmer::default()), config)
        .with_context(|| format!("opening index at {}", corpus_dir.display()))?;
    Ok(router(Arc::new(engine)))
}

pub fn router(engine: Arc<Engine>) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/vocabulary", get(vocabulary_handler))
        .route("/suggest", get(suggest_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(AppState { engine })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let engine = &state.engine;
    let mode = params.mode.unwrap_or(SearchMode::Ranked);
    let k = params.k.unwrap_or(engine.config().top_k).clamp(1, MAX_K);
    let results = engine.evaluate_top(&params.q, mode, k).map_err(api_error)?;

    let mut hits = Vec::with_capacity(results.hits.len());
    for hit in &results.hits {
        let snippet = engine
            .document_text(hit.document_id)
            .ok()
            .flatten()
            .and_then(|text| snippet(&text.body, &hit.matching_terms));
        hits.push(SearchHit {
            doc_id: hit.document_id,
            score: hit.score,
            title: hit.title().unwrap_or_default().to_string(),
            path: hit.document.as_ref().and_then(|d| d.path.clone()),
            matching_terms: hit.matching_terms.clone(),
            snippet,
        });
    }

    let corrected_query = results.suggestions.first().map(|s| s.apply_to(&params.q));
    let elapsed = start.elapsed();
    Ok(Json(SearchResponse {
        query: params.q,
        mode,
        took_s: elapsed.as_secs_f64(),
        total_hits: hits.len(),
        accumulators: results.accumulators,
        results: hits,
        suggestions: results.suggestions,
        corrected_query,
    }))
}

pub async fn vocabulary_handler(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let terms = state.engine.vocabulary().map_err(api_error)?;
    Ok(Json(serde_json::json!({ "count": terms.len(), "terms": terms })))
}

pub async fn suggest_handler(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
) -> Json<serde_json::Value> {
    let suggestion = state.engine.suggest_correction(&params.term);
    Json(serde_json::json!({ "term": params.term, "suggestion": suggestion }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<u32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(meta) = state.engine.document(doc_id) else {
        return Err((StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "not found" }))));
    };
    let mut obj = serde_json::json!({
        "doc_id": doc_id,
        "title": meta.title,
        "path": meta.path,
    });
    match state.engine.document_text(doc_id) {
        Ok(Some(text)) => obj["text"] = serde_json::Value::String(text.body),
        Ok(None) => {}
        Err(e) => tracing::warn!(doc_id, error = %e, "document text unavailable"),
    }
    Ok(Json(obj))
}

fn terms_pattern(terms: &[String]) -> Option<Regex> {
    let alternatives: Vec<String> = terms.iter().filter(|t| !t.trim().is_empty()).map(|t| regex::escape(t)).collect();
    if alternatives.is_empty() {
        return None;
    }
    RegexBuilder::new(&format!(r"\b(?:{})\b", alternatives.join("|"))).case_insensitive(true).build().ok()
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// About 300 bytes around the first matching word, matches wrapped in `<em>`.
fn snippet(text: &str, terms: &[String]) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }
    let pattern = terms_pattern(terms);
    let window = match pattern.as_ref().and_then(|re| re.find(text)) {
        Some(m) => {
            let start = floor_char_boundary(text, m.start().saturating_sub(100));
            let end = floor_char_boundary(text, (m.start() + 200).min(text.len()));
            &text[start..end]
        }
        None => {
            let end = text.char_indices().nth(200).map_or(text.len(), |(i, _)| i);
            &text[..end]
        }
    };
    Some(match pattern {
        Some(re) => re.replace_all(window, "<em>$0</em>").into_owned(),
        None => window.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_highlights_whole_words() {
        let text = "Call me Ishmael. The white Whale swims past the whalers.";
        let s = snippet(text, &["whale".to_string()]).unwrap();
        assert!(s.contains("<em>Whale</em>"));
        assert!(!s.contains("<em>whale</em>rs"));
        assert_eq!(snippet("   ", &[]), None);
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        let text = format!("{} whale", "é".repeat(120));
        let s = snippet(&text, &["whale".to_string()]).unwrap();
        assert!(s.ends_with("<em>whale</em>"));
    }
}
