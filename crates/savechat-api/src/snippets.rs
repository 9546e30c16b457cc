use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use savechat_core::models::SnippetId;
use savechat_core::search::SnippetFilters;
use savechat_core::util::split_comma_separated;
use savechat_core::{NewSnippet, Snippet};
use serde::Deserialize;

use crate::error::AppError;
use crate::routes::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_snippets).post(create_snippet))
        .route(
            "/{id}",
            get(get_snippet).put(update_snippet).delete(delete_snippet),
        )
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    language: Option<String>,
    tags: Option<String>,
    source_conversation_id: Option<String>,
}

impl From<ListQuery> for SnippetFilters {
    fn from(query: ListQuery) -> Self {
        Self {
            language: query.language,
            tags: query
                .tags
                .as_deref()
                .map(split_comma_separated)
                .unwrap_or_default(),
            source_conversation_id: query
                .source_conversation_id
                .and_then(|value| value.trim().parse().ok()),
        }
    }
}

async fn list_snippets(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Snippet>>, AppError> {
    let Query(query) = query?;
    let filters = SnippetFilters::from(query);
    Ok(Json(state.db.list_snippets(&filters).await?))
}

async fn create_snippet(
    State(state): State<AppState>,
    payload: Result<Json<NewSnippet>, JsonRejection>,
) -> Result<(StatusCode, Json<Snippet>), AppError> {
    let Json(incoming) = payload?;
    let snippet = state.db.create_snippet(incoming).await?;
    Ok((StatusCode::CREATED, Json(snippet)))
}

async fn get_snippet(
    State(state): State<AppState>,
    id: Result<Path<SnippetId>, PathRejection>,
) -> Result<Json<Snippet>, AppError> {
    let Path(id) = id?;
    Ok(Json(state.db.get_snippet(id).await?))
}

async fn update_snippet(
    State(state): State<AppState>,
    id: Result<Path<SnippetId>, PathRejection>,
    payload: Result<Json<NewSnippet>, JsonRejection>,
) -> Result<Json<Snippet>, AppError> {
    let Path(id) = id?;
    let Json(incoming) = payload?;
    Ok(Json(state.db.update_snippet(id, incoming).await?))
}

async fn delete_snippet(
    State(state): State<AppState>,
    id: Result<Path<SnippetId>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    state.db.delete_snippet(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::routes::test_support::{body_json, send, test_app};

    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn create_list_update_delete() {
        let (app, _) = test_app().await;

        let response = send(
            &app,
            Method::POST,
            "/api/snippets",
            Some(json!({
                "title": "Spawn",
                "content": "tokio::spawn(fut)",
                "language": "rust",
                "tags": ["tokio"],
                "source_conversation_id": 3,
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        let uri = format!("/api/snippets/{}", created["id"]);

        send(
            &app,
            Method::POST,
            "/api/snippets",
            Some(json!({"title": "Print", "content": "print()", "language": "python"})),
        )
        .await;

        let response = send(&app, Method::GET, "/api/snippets?language=rust", None).await;
        let listed = body_json(response).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["title"], "Spawn");

        let listed = body_json(
            send(
                &app,
                Method::GET,
                "/api/snippets?source_conversation_id=3&tags=tokio,x",
                None,
            )
            .await,
        )
        .await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let response = send(
            &app,
            Method::PUT,
            &uri,
            Some(json!({"title": "Spawn task", "content": "tokio::spawn(async {})"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["title"], "Spawn task");
        assert_eq!(updated["created_at"], created["created_at"]);

        let response = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = send(&app, Method::GET, &uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_requires_title_and_content() {
        let (app, _) = test_app().await;

        let response = send(
            &app,
            Method::POST,
            "/api/snippets",
            Some(json!({"title": "  ", "content": "x"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "title is required");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_of_missing_snippet_is_404() {
        let (app, _) = test_app().await;

        let response = send(
            &app,
            Method::PUT,
            "/api/snippets/41",
            Some(json!({"title": "t", "content": "c"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn list_query_ignores_bad_conversation_id() {
        let filters = SnippetFilters::from(ListQuery {
            source_conversation_id: Some("seven".into()),
            ..ListQuery::default()
        });
        assert_eq!(filters.source_conversation_id, None);
    }
}
