use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use savechat_core::backup::{self, BackupPayload, ImportOptions, ImportResult};

use crate::auth::Caller;
use crate::error::AppError;
use crate::routes::AppState;

/// Backups carry full conversation transcripts, well past axum's 2 MB default.
const BACKUP_BODY_LIMIT: usize = 64 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/import",
            post(import_backup).layer(DefaultBodyLimit::max(BACKUP_BODY_LIMIT)),
        )
        .route("/export", get(export_backup))
}

async fn import_backup(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    options: Result<Query<ImportOptions>, QueryRejection>,
    payload: Result<Json<BackupPayload>, JsonRejection>,
) -> Result<Json<ImportResult>, AppError> {
    let Query(options) = options?;
    let Json(payload) = payload?;

    tracing::info!(
        caller = caller.subject.as_deref().unwrap_or("api-key"),
        version = payload.version.as_deref().unwrap_or("unknown"),
        conversations = payload.conversations.len(),
        snippets = payload.snippets.len(),
        collections = payload.collections.len(),
        skip_settings = options.skip_settings,
        "Importing backup"
    );
    Ok(Json(backup::import_backup(&state.db, payload, options).await))
}

async fn export_backup(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, AppError> {
    let export = backup::export_backup(&state.db).await?;
    let file_name = backup::suggested_backup_file_name(Utc::now());

    tracing::info!(
        caller = caller.subject.as_deref().unwrap_or("api-key"),
        conversations = export.conversations.len(),
        snippets = export.snippets.len(),
        collections = export.collections.len(),
        "Exported backup"
    );
    Ok((
        [(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        )],
        Json(export),
    ))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::routes::test_support::{body_json, send, test_app};

    #[tokio::test(flavor = "multi_thread")]
    async fn import_counts_each_item_and_isolates_failures() {
        let (app, _) = test_app().await;

        let response = send(
            &app,
            Method::POST,
            "/api/backup/import",
            Some(json!({
                "version": "1.0",
                "collections": [{"name": "Research"}],
                "conversations": [
                    {"canonical_url": "https://a", "source": "chatgpt", "title": "A", "content": "x"},
                    {"canonical_url": "https://b", "source": "chatgpt", "title": "", "content": "x"},
                    "not an object",
                ],
                "snippets": null,
                "settings": {"storageMode": "cloud"},
            })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let result = body_json(response).await;
        assert_eq!(result["created"], 2);
        assert_eq!(result["updated"], 1);
        assert_eq!(result["errors"], 2);
        assert_eq!(result["errors_details"].as_array().unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn import_can_skip_settings() {
        let (app, _) = test_app().await;

        let response = send(
            &app,
            Method::POST,
            "/api/backup/import?skip_settings=true",
            Some(json!({"settings": {"storageMode": "cloud"}})),
        )
        .await;
        let result = body_json(response).await;
        assert_eq!(result, json!({"created": 0, "updated": 0, "errors": 0}));

        let settings = body_json(send(&app, Method::GET, "/api/settings", None).await).await;
        assert_eq!(settings["storageMode"], "local");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn export_is_an_attachment_that_reimports() {
        let (app, _) = test_app().await;
        send(
            &app,
            Method::POST,
            "/api/conversations",
            Some(json!({
                "canonical_url": "https://a",
                "source": "claude",
                "title": "A",
                "content": "x",
            })),
        )
        .await;

        let response = send(&app, Method::GET, "/api/backup/export", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response.headers()[axum::http::header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"savechat-backup-"));
        let export = body_json(response).await;
        assert_eq!(export["version"], "1.0");
        assert_eq!(export["conversations"].as_array().unwrap().len(), 1);

        let (fresh, _) = test_app().await;
        let response = send(&fresh, Method::POST, "/api/backup/import", Some(export)).await;
        let result = body_json(response).await;
        assert_eq!(result["created"], 1);
        assert_eq!(result["updated"], 1);
        assert_eq!(result["errors"], 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_document_is_400() {
        let (app, _) = test_app().await;

        let response = send(
            &app,
            Method::POST,
            "/api/backup/import",
            Some(json!({"conversations": "nope"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
