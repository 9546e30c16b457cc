use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use savechat_core::models::CollectionId;
use savechat_core::{Collection, NewCollection};

use crate::error::AppError;
use crate::routes::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_collections).post(upsert_collection))
        .route(
            "/{id}",
            get(get_collection)
                .put(update_collection)
                .delete(delete_collection),
        )
}

async fn list_collections(
    State(state): State<AppState>,
) -> Result<Json<Vec<Collection>>, AppError> {
    Ok(Json(state.db.list_collections().await?))
}

/// Collections are keyed by name: posting an existing name refreshes it.
async fn upsert_collection(
    State(state): State<AppState>,
    payload: Result<Json<NewCollection>, JsonRejection>,
) -> Result<(StatusCode, Json<Collection>), AppError> {
    let Json(incoming) = payload?;
    let reconciled = state.db.upsert_collection(incoming).await?;
    let status = if reconciled.is_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(reconciled.into_inner())))
}

async fn get_collection(
    State(state): State<AppState>,
    id: Result<Path<CollectionId>, PathRejection>,
) -> Result<Json<Collection>, AppError> {
    let Path(id) = id?;
    Ok(Json(state.db.get_collection(id).await?))
}

async fn update_collection(
    State(state): State<AppState>,
    id: Result<Path<CollectionId>, PathRejection>,
    payload: Result<Json<NewCollection>, JsonRejection>,
) -> Result<Json<Collection>, AppError> {
    let Path(id) = id?;
    let Json(incoming) = payload?;
    Ok(Json(state.db.update_collection(id, incoming).await?))
}

async fn delete_collection(
    State(state): State<AppState>,
    id: Result<Path<CollectionId>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    state.db.delete_collection(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
