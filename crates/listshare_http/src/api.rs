//! List route handlers.
//!
//! Every handler authenticates through [`Caller`] first, then runs one list
//! service call on the blocking pool.

use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use listshare_core::{
    HydratedList, ItemId, List, ListId, ListReplacement, NewItemRequest, NewList,
};
use uuid::Uuid;

/// GET /lists
pub async fn list_owned(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Vec<List>>, ApiError> {
    let lists = state
        .with_list_service(move |service| service.list_owned(&caller))
        .await?;
    Ok(Json(lists))
}

/// GET /lists/shared
pub async fn list_shared(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Vec<List>>, ApiError> {
    let lists = state
        .with_list_service(move |service| service.list_shared(&caller))
        .await?;
    Ok(Json(lists))
}

/// POST /lists
pub async fn create_list(
    State(state): State<AppState>,
    Caller(caller): Caller,
    JsonBody(payload): JsonBody<NewList>,
) -> Result<(StatusCode, Json<List>), ApiError> {
    let list = state
        .with_list_service(move |service| service.create_list(&caller, payload))
        .await?;
    Ok((StatusCode::CREATED, Json(list)))
}

/// GET /lists/{list_id}
pub async fn get_list(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(list_id): Path<String>,
) -> Result<Json<HydratedList>, ApiError> {
    let list_id = parse_id(&list_id).ok_or(ApiError::NotFound)?;
    let list = state
        .with_list_service(move |service| service.get_list(&caller, list_id))
        .await?;
    Ok(Json(list))
}

/// PUT /lists/{list_id}
///
/// An id that is not a UUID counts as missing (423), like an empty one. An
/// empty body has no name and is rejected the same way.
pub async fn update_list(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(list_id): Path<String>,
    JsonBody(payload): JsonBody<ListReplacement>,
) -> Result<Json<List>, ApiError> {
    let list_id = parse_id(&list_id);
    let list = state
        .with_list_service(move |service| service.update_list(&caller, list_id, payload))
        .await?;
    Ok(Json(list))
}

/// DELETE /lists/{list_id}
pub async fn delete_list(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(list_id): Path<String>,
) -> Result<Json<List>, ApiError> {
    let list_id = parse_id(&list_id);
    let list = state
        .with_list_service(move |service| service.delete_list(&caller, list_id))
        .await?;
    Ok(Json(list))
}

/// DELETE /lists/{list_id}/{item_id}
pub async fn remove_item(
    State(state): State<AppState>,
    Caller(_caller): Caller,
    Path((list_id, item_id)): Path<(String, String)>,
) -> Result<Json<List>, ApiError> {
    let list_id: ListId = parse_id(&list_id).ok_or(ApiError::NotFound)?;
    let item_id: ItemId = parse_id(&item_id).ok_or(ApiError::NotFound)?;
    let list = state
        .with_list_service(move |service| service.remove_item_from_list(list_id, item_id))
        .await?;
    Ok(Json(list))
}

/// POST /lists/{list_id}/items/new
pub async fn add_item(
    State(state): State<AppState>,
    Caller(_caller): Caller,
    Path(list_id): Path<String>,
    JsonBody(request): JsonBody<NewItemRequest>,
) -> Result<(StatusCode, Json<List>), ApiError> {
    let list_id = parse_id(&list_id).ok_or(ApiError::NotFound)?;
    let list = state
        .with_list_service(move |service| service.add_item_to_list(list_id, request))
        .await?;
    Ok((StatusCode::CREATED, Json(list)))
}

fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}
