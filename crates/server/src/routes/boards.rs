use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use tracing::instrument;
use uuid::Uuid;

use api_types::{
    Board, BoardDetail, CreateBoardRequest, ListBoardsQuery, ReorderRequest, UpdateBoardRequest,
};

use crate::{
    AppState,
    auth::{RequestContext, ensure_can_edit, ensure_can_manage, ensure_member},
    db::{
        boards::{BoardRepository, CreateBoardParams},
        lists::ListRepository,
    },
    moves::MoveService,
    routes::error::ApiError,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/boards", get(list_boards).post(create_board))
        .route(
            "/boards/{id}",
            get(get_board).put(update_board).delete(delete_board),
        )
        .route("/boards/{id}/position", put(reorder_board))
}

#[instrument(
    name = "boards.list_boards",
    skip(state, ctx),
    fields(workspace_id = %query.workspace_id, user_id = %ctx.user.id)
)]
async fn list_boards(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListBoardsQuery>,
) -> Result<Json<Vec<Board>>, ApiError> {
    ensure_member(
        state.pool(),
        ctx.user.id,
        query.workspace_id,
        "not a member of this workspace",
    )
    .await?;

    let boards = BoardRepository::list_by_workspace(state.pool(), query.workspace_id).await?;
    Ok(Json(boards))
}

#[instrument(
    name = "boards.create_board",
    skip(state, ctx, payload),
    fields(workspace_id = %payload.workspace_id, user_id = %ctx.user.id)
)]
async fn create_board(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateBoardRequest>,
) -> Result<Json<Board>, ApiError> {
    ensure_can_edit(
        state.pool(),
        ctx.user.id,
        payload.workspace_id,
        "not authorized to create boards",
    )
    .await?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("board name is required".into()));
    }

    let max = BoardRepository::max_position(state.pool(), payload.workspace_id).await?;
    let board = BoardRepository::create(
        state.pool(),
        CreateBoardParams {
            workspace_id: payload.workspace_id,
            name: payload.name,
            description: payload.description,
            background: payload.background,
            position: ordering::next_position(max),
        },
    )
    .await?;
    Ok(Json(board))
}

#[instrument(
    name = "boards.get_board",
    skip(state, ctx),
    fields(board_id = %board_id, user_id = %ctx.user.id)
)]
async fn get_board(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(board_id): Path<Uuid>,
) -> Result<Json<BoardDetail>, ApiError> {
    let board = BoardRepository::find_by_id(state.pool(), board_id)
        .await?
        .ok_or(ApiError::NotFound("board not found"))?;
    ensure_member(
        state.pool(),
        ctx.user.id,
        board.workspace_id,
        "not a member of this workspace",
    )
    .await?;

    let lists = ListRepository::list_by_board(state.pool(), board_id).await?;
    Ok(Json(BoardDetail { board, lists }))
}

#[instrument(
    name = "boards.update_board",
    skip(state, ctx, payload),
    fields(board_id = %board_id, user_id = %ctx.user.id)
)]
async fn update_board(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(board_id): Path<Uuid>,
    Json(payload): Json<UpdateBoardRequest>,
) -> Result<Json<Board>, ApiError> {
    let board = BoardRepository::find_by_id(state.pool(), board_id)
        .await?
        .ok_or(ApiError::NotFound("board not found"))?;
    ensure_can_edit(
        state.pool(),
        ctx.user.id,
        board.workspace_id,
        "not authorized to update this board",
    )
    .await?;

    if let Some(name) = &payload.name {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("board name is required".into()));
        }
    }

    let board = BoardRepository::update(
        state.pool(),
        board_id,
        payload.name,
        payload.description,
        payload.background,
    )
    .await?
    .ok_or(ApiError::NotFound("board not found"))?;
    Ok(Json(board))
}

#[instrument(
    name = "boards.delete_board",
    skip(state, ctx),
    fields(board_id = %board_id, user_id = %ctx.user.id)
)]
async fn delete_board(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(board_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let board = BoardRepository::find_by_id(state.pool(), board_id)
        .await?
        .ok_or(ApiError::NotFound("board not found"))?;
    ensure_can_manage(
        state.pool(),
        ctx.user.id,
        board.workspace_id,
        "not authorized to delete this board",
    )
    .await?;

    BoardRepository::delete(state.pool(), board_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(
    name = "boards.reorder_board",
    skip(state, ctx, payload),
    fields(board_id = %board_id, user_id = %ctx.user.id)
)]
async fn reorder_board(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(board_id): Path<Uuid>,
    Json(payload): Json<ReorderRequest>,
) -> Result<Json<Board>, ApiError> {
    let target = target_index(payload.position)?;
    let board = MoveService::reorder_board(state.pool(), ctx.user.id, board_id, target).await?;
    Ok(Json(board))
}

/// Shared by every reorder endpoint: target indexes are non-negative, and
/// anything past the end of the collection clamps to an append.
pub(super) fn target_index(position: i32) -> Result<usize, ApiError> {
    usize::try_from(position)
        .map_err(|_| ApiError::Validation("position must be a non-negative integer".into()))
}
