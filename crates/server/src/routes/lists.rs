use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use tracing::instrument;
use uuid::Uuid;

use api_types::{
    CreateListRequest, List, ListListsQuery, ListWithCards, ReorderRequest, UpdateListRequest,
};

use crate::{
    AppState,
    auth::{RequestContext, ensure_can_edit, ensure_member},
    db::{boards::BoardRepository, lists::ListRepository},
    moves::MoveService,
    routes::error::ApiError,
};

use super::boards::target_index;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/lists", get(list_lists).post(create_list))
        .route("/lists/{id}", put(update_list).delete(delete_list))
        .route("/lists/{id}/position", put(reorder_list))
}

#[instrument(
    name = "lists.list_lists",
    skip(state, ctx),
    fields(board_id = %query.board_id, user_id = %ctx.user.id)
)]
async fn list_lists(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListListsQuery>,
) -> Result<Json<Vec<ListWithCards>>, ApiError> {
    let board = BoardRepository::find_by_id(state.pool(), query.board_id)
        .await?
        .ok_or(ApiError::NotFound("board not found"))?;
    ensure_member(
        state.pool(),
        ctx.user.id,
        board.workspace_id,
        "not a member of this workspace",
    )
    .await?;

    let lists = ListRepository::list_by_board(state.pool(), query.board_id).await?;
    Ok(Json(lists))
}

#[instrument(
    name = "lists.create_list",
    skip(state, ctx, payload),
    fields(board_id = %payload.board_id, user_id = %ctx.user.id)
)]
async fn create_list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateListRequest>,
) -> Result<Json<List>, ApiError> {
    let board = BoardRepository::find_by_id(state.pool(), payload.board_id)
        .await?
        .ok_or(ApiError::NotFound("board not found"))?;
    ensure_can_edit(
        state.pool(),
        ctx.user.id,
        board.workspace_id,
        "not authorized to create lists",
    )
    .await?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("list name is required".into()));
    }

    let max = ListRepository::max_position(state.pool(), payload.board_id).await?;
    let list = ListRepository::create(
        state.pool(),
        payload.board_id,
        &payload.name,
        ordering::next_position(max),
    )
    .await?;
    Ok(Json(list))
}

#[instrument(
    name = "lists.update_list",
    skip(state, ctx, payload),
    fields(list_id = %list_id, user_id = %ctx.user.id)
)]
async fn update_list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(list_id): Path<Uuid>,
    Json(payload): Json<UpdateListRequest>,
) -> Result<Json<List>, ApiError> {
    let workspace_id = ListRepository::workspace_id_of(state.pool(), list_id)
        .await?
        .ok_or(ApiError::NotFound("list not found"))?;
    ensure_can_edit(
        state.pool(),
        ctx.user.id,
        workspace_id,
        "not authorized to update lists",
    )
    .await?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("list name is required".into()));
    }

    let list = ListRepository::rename(state.pool(), list_id, &payload.name)
        .await?
        .ok_or(ApiError::NotFound("list not found"))?;
    Ok(Json(list))
}

#[instrument(
    name = "lists.delete_list",
    skip(state, ctx),
    fields(list_id = %list_id, user_id = %ctx.user.id)
)]
async fn delete_list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(list_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let workspace_id = ListRepository::workspace_id_of(state.pool(), list_id)
        .await?
        .ok_or(ApiError::NotFound("list not found"))?;
    ensure_can_edit(
        state.pool(),
        ctx.user.id,
        workspace_id,
        "not authorized to delete lists",
    )
    .await?;

    ListRepository::delete(state.pool(), list_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(
    name = "lists.reorder_list",
    skip(state, ctx, payload),
    fields(list_id = %list_id, user_id = %ctx.user.id)
)]
async fn reorder_list(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(list_id): Path<Uuid>,
    Json(payload): Json<ReorderRequest>,
) -> Result<Json<ListWithCards>, ApiError> {
    let target = target_index(payload.position)?;
    let list = MoveService::reorder_list(state.pool(), ctx.user.id, list_id, target).await?;
    Ok(Json(list))
}
