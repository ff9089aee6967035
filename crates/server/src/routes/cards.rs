use axum::{
    Json, Router,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use tracing::instrument;
use uuid::Uuid;

use api_types::{
    Card, CardDetail, CardOverview, CardPriority, Checklist, CommentWithAuthor,
    CreateCardRequest, CreateChecklistRequest, CreateCommentRequest, CreateLabelRequest, Label,
    ListCardsQuery, MoveCardRequest, UpdateCardRequest, UpdateChecklistRequest,
};

use crate::{
    AppState,
    auth::{RequestContext, ensure_can_edit, ensure_member},
    db::{
        cards::{CardRepository, CreateCardParams, UpdateCardParams},
        lists::ListRepository,
    },
    moves::MoveService,
    routes::error::ApiError,
};

use super::boards::target_index;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cards", get(list_cards).post(create_card))
        .route(
            "/cards/{id}",
            get(get_card).put(update_card).delete(delete_card),
        )
        .route("/cards/{id}/move", put(move_card))
        .route("/cards/{id}/comments", post(add_comment))
        .route("/cards/{id}/checklists", post(add_checklist))
        .route(
            "/cards/{id}/checklists/{checklist_id}",
            put(update_checklist).delete(delete_checklist),
        )
        .route("/cards/{id}/labels", post(add_label))
        .route("/cards/{id}/labels/{label_id}", delete(delete_label))
}

/// Loads a card and resolves the workspace its list belongs to. Every
/// per-card endpoint starts here before its permission check.
async fn card_workspace(state: &AppState, card_id: Uuid) -> Result<(Card, Uuid), ApiError> {
    let card = CardRepository::find_by_id(state.pool(), card_id)
        .await?
        .ok_or(ApiError::NotFound("card not found"))?;
    let workspace_id = ListRepository::workspace_id_of(state.pool(), card.list_id)
        .await?
        .ok_or(ApiError::NotFound("card not found"))?;
    Ok((card, workspace_id))
}

#[instrument(
    name = "cards.list_cards",
    skip(state, ctx),
    fields(list_id = %query.list_id, user_id = %ctx.user.id)
)]
async fn list_cards(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListCardsQuery>,
) -> Result<Json<Vec<CardOverview>>, ApiError> {
    let workspace_id = ListRepository::workspace_id_of(state.pool(), query.list_id)
        .await?
        .ok_or(ApiError::NotFound("list not found"))?;
    ensure_member(
        state.pool(),
        ctx.user.id,
        workspace_id,
        "not a member of this workspace",
    )
    .await?;

    let cards = CardRepository::list_by_list(state.pool(), query.list_id).await?;
    Ok(Json(cards))
}

#[instrument(
    name = "cards.create_card",
    skip(state, ctx, payload),
    fields(list_id = %payload.list_id, user_id = %ctx.user.id)
)]
async fn create_card(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateCardRequest>,
) -> Result<Json<Card>, ApiError> {
    let workspace_id = ListRepository::workspace_id_of(state.pool(), payload.list_id)
        .await?
        .ok_or(ApiError::NotFound("list not found"))?;
    ensure_can_edit(
        state.pool(),
        ctx.user.id,
        workspace_id,
        "not authorized to create cards",
    )
    .await?;

    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("card title is required".into()));
    }

    // Appends after every card in the list, archived ones included, so an
    // unarchive never produces a duplicate position.
    let max = CardRepository::max_position(state.pool(), payload.list_id).await?;
    let card = CardRepository::create(
        state.pool(),
        CreateCardParams {
            list_id: payload.list_id,
            title: payload.title,
            description: payload.description,
            priority: payload.priority.unwrap_or(CardPriority::Medium),
            due_date: payload.due_date,
            creator_id: ctx.user.id,
            assignee_id: payload.assignee_id,
            position: ordering::next_position(max),
        },
    )
    .await?;
    Ok(Json(card))
}

#[instrument(
    name = "cards.get_card",
    skip(state, ctx),
    fields(card_id = %card_id, user_id = %ctx.user.id)
)]
async fn get_card(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(card_id): Path<Uuid>,
) -> Result<Json<CardDetail>, ApiError> {
    let (_, workspace_id) = card_workspace(&state, card_id).await?;
    ensure_member(
        state.pool(),
        ctx.user.id,
        workspace_id,
        "not a member of this workspace",
    )
    .await?;

    let overview = CardRepository::find_overview(state.pool(), card_id)
        .await?
        .ok_or(ApiError::NotFound("card not found"))?;
    let comments = CardRepository::comments_with_authors(state.pool(), card_id).await?;
    let checklists = CardRepository::checklists(state.pool(), card_id).await?;
    let labels = CardRepository::labels(state.pool(), card_id).await?;
    let attachments = CardRepository::attachments(state.pool(), card_id).await?;
    Ok(Json(CardDetail {
        overview,
        comments,
        checklists,
        labels,
        attachments,
    }))
}

#[instrument(
    name = "cards.update_card",
    skip(state, ctx, payload),
    fields(card_id = %card_id, user_id = %ctx.user.id)
)]
async fn update_card(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(card_id): Path<Uuid>,
    Json(payload): Json<UpdateCardRequest>,
) -> Result<Json<Card>, ApiError> {
    let (_, workspace_id) = card_workspace(&state, card_id).await?;
    ensure_can_edit(
        state.pool(),
        ctx.user.id,
        workspace_id,
        "not authorized to update cards",
    )
    .await?;

    if let Some(title) = &payload.title {
        if title.trim().is_empty() {
            return Err(ApiError::Validation("card title is required".into()));
        }
    }

    let card = CardRepository::update(
        state.pool(),
        card_id,
        UpdateCardParams {
            title: payload.title,
            description: payload.description,
            priority: payload.priority,
            due_date: payload.due_date,
            assignee_id: payload.assignee_id,
            is_archived: payload.is_archived,
        },
    )
    .await?
    .ok_or(ApiError::NotFound("card not found"))?;
    Ok(Json(card))
}

#[instrument(
    name = "cards.delete_card",
    skip(state, ctx),
    fields(card_id = %card_id, user_id = %ctx.user.id)
)]
async fn delete_card(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(card_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let (_, workspace_id) = card_workspace(&state, card_id).await?;
    ensure_can_edit(
        state.pool(),
        ctx.user.id,
        workspace_id,
        "not authorized to delete cards",
    )
    .await?;

    CardRepository::delete(state.pool(), card_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(
    name = "cards.move_card",
    skip(state, ctx, payload),
    fields(card_id = %card_id, to_list_id = %payload.list_id, user_id = %ctx.user.id)
)]
async fn move_card(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(card_id): Path<Uuid>,
    Json(payload): Json<MoveCardRequest>,
) -> Result<Json<CardOverview>, ApiError> {
    let target = target_index(payload.position)?;
    let card =
        MoveService::move_card(state.pool(), ctx.user.id, card_id, payload.list_id, target)
            .await?;
    Ok(Json(card))
}

#[instrument(
    name = "cards.add_comment",
    skip(state, ctx, payload),
    fields(card_id = %card_id, user_id = %ctx.user.id)
)]
async fn add_comment(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(card_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<Json<CommentWithAuthor>, ApiError> {
    let (_, workspace_id) = card_workspace(&state, card_id).await?;
    // Commenting is open to every member, VIEWERs included.
    ensure_member(
        state.pool(),
        ctx.user.id,
        workspace_id,
        "not a member of this workspace",
    )
    .await?;

    if payload.content.trim().is_empty() {
        return Err(ApiError::Validation("comment content is required".into()));
    }

    let comment =
        CardRepository::insert_comment(state.pool(), card_id, ctx.user.id, &payload.content)
            .await?;
    Ok(Json(CommentWithAuthor {
        comment,
        author_name: ctx.user.name,
        author_avatar: ctx.user.avatar,
    }))
}

#[instrument(
    name = "cards.add_checklist",
    skip(state, ctx, payload),
    fields(card_id = %card_id, user_id = %ctx.user.id)
)]
async fn add_checklist(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(card_id): Path<Uuid>,
    Json(payload): Json<CreateChecklistRequest>,
) -> Result<Json<Checklist>, ApiError> {
    let (_, workspace_id) = card_workspace(&state, card_id).await?;
    ensure_can_edit(
        state.pool(),
        ctx.user.id,
        workspace_id,
        "not authorized to edit checklists",
    )
    .await?;

    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("checklist title is required".into()));
    }

    let max = CardRepository::max_checklist_position(state.pool(), card_id).await?;
    let checklist = CardRepository::insert_checklist(
        state.pool(),
        card_id,
        &payload.title,
        ordering::next_position(max),
    )
    .await?;
    Ok(Json(checklist))
}

#[instrument(
    name = "cards.update_checklist",
    skip(state, ctx, payload),
    fields(card_id = %card_id, checklist_id = %checklist_id, user_id = %ctx.user.id)
)]
async fn update_checklist(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((card_id, checklist_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateChecklistRequest>,
) -> Result<Json<Checklist>, ApiError> {
    let (_, workspace_id) = card_workspace(&state, card_id).await?;
    ensure_can_edit(
        state.pool(),
        ctx.user.id,
        workspace_id,
        "not authorized to edit checklists",
    )
    .await?;

    let checklist = CardRepository::set_checklist_completed(
        state.pool(),
        card_id,
        checklist_id,
        payload.is_completed,
    )
    .await?
    .ok_or(ApiError::NotFound("checklist not found"))?;
    Ok(Json(checklist))
}

#[instrument(
    name = "cards.delete_checklist",
    skip(state, ctx),
    fields(card_id = %card_id, checklist_id = %checklist_id, user_id = %ctx.user.id)
)]
async fn delete_checklist(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((card_id, checklist_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let (_, workspace_id) = card_workspace(&state, card_id).await?;
    ensure_can_edit(
        state.pool(),
        ctx.user.id,
        workspace_id,
        "not authorized to edit checklists",
    )
    .await?;

    let deleted = CardRepository::delete_checklist(state.pool(), card_id, checklist_id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("checklist not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(
    name = "cards.add_label",
    skip(state, ctx, payload),
    fields(card_id = %card_id, user_id = %ctx.user.id)
)]
async fn add_label(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(card_id): Path<Uuid>,
    Json(payload): Json<CreateLabelRequest>,
) -> Result<Json<Label>, ApiError> {
    let (_, workspace_id) = card_workspace(&state, card_id).await?;
    ensure_can_edit(
        state.pool(),
        ctx.user.id,
        workspace_id,
        "not authorized to edit labels",
    )
    .await?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("label name is required".into()));
    }

    let label =
        CardRepository::insert_label(state.pool(), card_id, &payload.name, &payload.color).await?;
    Ok(Json(label))
}

#[instrument(
    name = "cards.delete_label",
    skip(state, ctx),
    fields(card_id = %card_id, label_id = %label_id, user_id = %ctx.user.id)
)]
async fn delete_label(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((card_id, label_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let (_, workspace_id) = card_workspace(&state, card_id).await?;
    ensure_can_edit(
        state.pool(),
        ctx.user.id,
        workspace_id,
        "not authorized to edit labels",
    )
    .await?;

    let deleted = CardRepository::delete_label(state.pool(), card_id, label_id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("label not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
