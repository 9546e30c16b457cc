use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use savechat_core::models::{ConversationId, IgnoreUpdate};
use savechat_core::search::SearchFilters;
use savechat_core::util::split_comma_separated;
use savechat_core::{Conversation, NewConversation};
use serde::Deserialize;

use crate::error::AppError;
use crate::routes::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(upsert_conversation))
        .route("/search", get(search_conversations))
        .route("/url/{*url}", get(get_conversation_by_url))
        .route("/{id}", get(get_conversation).delete(delete_conversation))
        .route("/{id}/ignore", put(set_conversation_ignore))
}

/// Raw query string. Numeric filters that fail to parse are dropped.
#[derive(Debug, Default, Deserialize)]
struct SearchQuery {
    q: Option<String>,
    source: Option<String>,
    tags: Option<String>,
    collection_id: Option<String>,
}

impl From<SearchQuery> for SearchFilters {
    fn from(query: SearchQuery) -> Self {
        Self {
            query: query.q,
            source: query.source,
            tags: query
                .tags
                .as_deref()
                .map(split_comma_separated)
                .unwrap_or_default(),
            collection_id: query
                .collection_id
                .and_then(|value| value.trim().parse().ok()),
        }
    }
}

async fn upsert_conversation(
    State(state): State<AppState>,
    payload: Result<Json<NewConversation>, JsonRejection>,
) -> Result<(StatusCode, Json<Conversation>), AppError> {
    let Json(incoming) = payload?;
    let reconciled = state.db.upsert_conversation(incoming).await?;
    let status = if reconciled.is_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(reconciled.into_inner())))
}

async fn search_conversations(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<Conversation>>, AppError> {
    let Query(query) = query?;
    let filters = SearchFilters::from(query);
    Ok(Json(state.db.search_conversations(&filters).await?))
}

async fn get_conversation(
    State(state): State<AppState>,
    id: Result<Path<ConversationId>, PathRejection>,
) -> Result<Json<Conversation>, AppError> {
    let Path(id) = id?;
    Ok(Json(state.db.get_conversation(id).await?))
}

async fn get_conversation_by_url(
    State(state): State<AppState>,
    Path(url): Path<String>,
) -> Result<Json<Conversation>, AppError> {
    Ok(Json(state.db.get_conversation_by_url(&url).await?))
}

async fn set_conversation_ignore(
    State(state): State<AppState>,
    id: Result<Path<ConversationId>, PathRejection>,
    payload: Result<Json<IgnoreUpdate>, JsonRejection>,
) -> Result<Json<Conversation>, AppError> {
    let Path(id) = id?;
    let Json(update) = payload?;
    Ok(Json(
        state.db.set_conversation_ignore(id, update.ignore).await?,
    ))
}

async fn delete_conversation(
    State(state): State<AppState>,
    id: Result<Path<ConversationId>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    state.db.delete_conversation(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
