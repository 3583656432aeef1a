use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use uuid::Uuid;

use crate::error::AppError;
use crate::import::{parser, pipeline};
use crate::import::pipeline::BatchResult;
use crate::models::{ChainOfCommand, User};
use crate::state::SharedState;

/// Reconcile an uploaded CSV. Cell-level problems come back in `errors` with
/// a 200; only malformed input, cycles and storage failures are errors.
pub async fn upload(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<BatchResult>, AppError> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok());

    let text = if content_type.is_some_and(|ct| ct.contains("multipart/form-data")) {
        parser::read_multipart(&headers, body).await?
    } else {
        String::from_utf8(body.to_vec())
            .map_err(|e| AppError::BadRequest(format!("Invalid UTF-8: {e}")))?
    };

    let result = pipeline::run(state.store.as_ref(), &state.config.import, &text).await?;
    Ok(Json(result))
}

pub async fn list(State(state): State<SharedState>) -> Result<Json<Vec<User>>, AppError> {
    let users = state.store.list_users().await?;
    Ok(Json(users))
}

pub async fn get(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = state
        .store
        .find_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

pub async fn chain_of_command(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChainOfCommand>, AppError> {
    let chain = state
        .store
        .find_chain(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Chain of command not found".to_string()))?;
    Ok(Json(chain))
}
