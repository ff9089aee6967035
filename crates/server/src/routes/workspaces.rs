use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use tracing::instrument;
use uuid::Uuid;

use api_types::{
    AddMemberRequest, CreateWorkspaceRequest, MemberWithUser, UpdateWorkspaceRequest, Workspace,
    WorkspaceDetail, WorkspaceRole,
};

use crate::{
    AppState,
    auth::{RequestContext, ensure_can_manage, ensure_member},
    db::{
        users::UserRepository,
        workspaces::{MembershipRepository, WorkspaceRepository},
    },
    routes::error::ApiError,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/workspaces", get(list_workspaces).post(create_workspace))
        .route(
            "/workspaces/{id}",
            get(get_workspace)
                .put(update_workspace)
                .delete(delete_workspace),
        )
        .route("/workspaces/{id}/members", post(add_member))
        .route("/workspaces/{id}/members/{user_id}", delete(remove_member))
}

#[instrument(name = "workspaces.list_workspaces", skip_all, fields(user_id = %ctx.user.id))]
async fn list_workspaces(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<Vec<Workspace>>, ApiError> {
    let workspaces = WorkspaceRepository::list_for_user(state.pool(), ctx.user.id).await?;
    Ok(Json(workspaces))
}

#[instrument(
    name = "workspaces.create_workspace",
    skip(state, ctx, payload),
    fields(user_id = %ctx.user.id)
)]
async fn create_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateWorkspaceRequest>,
) -> Result<Json<WorkspaceDetail>, ApiError> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("workspace name is required".into()));
    }

    // The workspace and its OWNER membership appear together or not at all.
    let mut tx = state.pool().begin().await?;
    let workspace =
        WorkspaceRepository::create(&mut *tx, &payload.name, payload.description.as_deref())
            .await?;
    MembershipRepository::insert(&mut *tx, workspace.id, ctx.user.id, WorkspaceRole::Owner)
        .await?;
    tx.commit().await?;

    let members = MembershipRepository::list_members(state.pool(), workspace.id).await?;
    Ok(Json(WorkspaceDetail { workspace, members }))
}

#[instrument(
    name = "workspaces.get_workspace",
    skip(state, ctx),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn get_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
) -> Result<Json<WorkspaceDetail>, ApiError> {
    ensure_member(
        state.pool(),
        ctx.user.id,
        workspace_id,
        "not a member of this workspace",
    )
    .await?;

    let workspace = WorkspaceRepository::find_by_id(state.pool(), workspace_id)
        .await?
        .ok_or(ApiError::NotFound("workspace not found"))?;
    let members = MembershipRepository::list_members(state.pool(), workspace_id).await?;
    Ok(Json(WorkspaceDetail { workspace, members }))
}

#[instrument(
    name = "workspaces.update_workspace",
    skip(state, ctx, payload),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn update_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
    Json(payload): Json<UpdateWorkspaceRequest>,
) -> Result<Json<Workspace>, ApiError> {
    ensure_can_manage(
        state.pool(),
        ctx.user.id,
        workspace_id,
        "not authorized to update this workspace",
    )
    .await?;

    if let Some(name) = &payload.name {
        if name.trim().is_empty() {
            return Err(ApiError::Validation("workspace name is required".into()));
        }
    }

    let workspace =
        WorkspaceRepository::update(state.pool(), workspace_id, payload.name, payload.description)
            .await?
            .ok_or(ApiError::NotFound("workspace not found"))?;
    Ok(Json(workspace))
}

#[instrument(
    name = "workspaces.delete_workspace",
    skip(state, ctx),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn delete_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let role = ensure_member(
        state.pool(),
        ctx.user.id,
        workspace_id,
        "not authorized to delete this workspace",
    )
    .await?;
    if role != WorkspaceRole::Owner {
        return Err(ApiError::Forbidden(
            "only the owner can delete a workspace",
        ));
    }

    let deleted = WorkspaceRepository::delete(state.pool(), workspace_id).await?;
    if deleted == 0 {
        return Err(ApiError::NotFound("workspace not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(
    name = "workspaces.add_member",
    skip(state, ctx, payload),
    fields(workspace_id = %workspace_id, user_id = %ctx.user.id)
)]
async fn add_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(workspace_id): Path<Uuid>,
    Json(payload): Json<AddMemberRequest>,
) -> Result<Json<MemberWithUser>, ApiError> {
    ensure_can_manage(
        state.pool(),
        ctx.user.id,
        workspace_id,
        "not authorized to manage members",
    )
    .await?;

    let target = UserRepository::find_by_email(state.pool(), &payload.email)
        .await?
        .ok_or(ApiError::NotFound("user not found"))?;

    if MembershipRepository::find(state.pool(), workspace_id, target.id)
        .await?
        .is_some()
    {
        return Err(ApiError::Validation("user is already a member".into()));
    }

    let role = payload.role.unwrap_or(WorkspaceRole::Member);
    let member = MembershipRepository::insert(state.pool(), workspace_id, target.id, role).await?;
    Ok(Json(MemberWithUser {
        user_id: target.id,
        role: member.role,
        joined_at: member.joined_at,
        name: target.name,
        email: target.email,
        avatar: target.avatar,
    }))
}

#[instrument(
    name = "workspaces.remove_member",
    skip(state, ctx),
    fields(workspace_id = %workspace_id, member_id = %member_id, user_id = %ctx.user.id)
)]
async fn remove_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((workspace_id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    ensure_can_manage(
        state.pool(),
        ctx.user.id,
        workspace_id,
        "not authorized to manage members",
    )
    .await?;

    let member = MembershipRepository::find(state.pool(), workspace_id, member_id)
        .await?
        .ok_or(ApiError::NotFound("member not found"))?;
    if member.role == WorkspaceRole::Owner {
        return Err(ApiError::Validation(
            "cannot remove the workspace owner".into(),
        ));
    }

    MembershipRepository::remove(state.pool(), workspace_id, member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
