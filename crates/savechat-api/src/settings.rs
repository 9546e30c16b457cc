use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use savechat_core::Settings;

use crate::error::AppError;
use crate::routes::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_settings).post(replace_settings))
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<Settings>, AppError> {
    Ok(Json(state.db.get_settings().await?))
}

async fn replace_settings(
    State(state): State<AppState>,
    payload: Result<Json<Settings>, JsonRejection>,
) -> Result<Json<Settings>, AppError> {
    let Json(settings) = payload?;
    Ok(Json(state.db.replace_settings(&settings).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::routes::test_support::{body_json, send, test_app};

    #[tokio::test(flavor = "multi_thread")]
    async fn defaults_then_replace() {
        let (app, _) = test_app().await;

        let response = send(&app, Method::GET, "/api/settings", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let defaults = body_json(response).await;
        assert_eq!(defaults["storageMode"], "local");
        assert_eq!(defaults.get("created_at"), None);

        let response = send(
            &app,
            Method::POST,
            "/api/settings",
            Some(json!({
                "storageMode": "cloud",
                "beast_enabled_per_domain": {"chatgpt.com": true},
                "selective_mode_enabled": true,
                "devModeEnabled": false,
                "xpaths_by_domain": {},
                "api_key": "never-stored",
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let saved = body_json(response).await;
        assert_eq!(saved["storageMode"], "cloud");
        assert_eq!(saved.get("api_key"), None);

        let fetched = body_json(send(&app, Method::GET, "/api/settings", None).await).await;
        assert_eq!(fetched, saved);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unknown_storage_mode_is_400() {
        let (app, _) = test_app().await;

        let response = send(
            &app,
            Method::POST,
            "/api/settings",
            Some(json!({"storageMode": "floppy"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
