//! Move and reorder transactions for cards, lists and boards.
//!
//! A move never patches a single row. The full affected collection is read
//! inside a transaction, replanned with the `ordering` planners and written
//! back row by row, so positions stay dense no matter how entities got
//! there. Parent rows are locked first (both parents on a cross-list move,
//! in ascending id order) which serializes concurrent moves over the same
//! collection without risking deadlock.

use api_types::{Board, CardOverview, ListWithCards};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::ensure_can_edit,
    db::{
        boards::BoardRepository, cards::CardRepository, lists::ListRepository,
        workspaces::WorkspaceRepository,
    },
    routes::error::ApiError,
};

pub struct MoveService;

impl MoveService {
    /// Moves a card to `target` index in `dest_list_id`, which may be its
    /// current list. Returns the card as it stands after the move.
    pub async fn move_card(
        pool: &PgPool,
        user_id: Uuid,
        card_id: Uuid,
        dest_list_id: Uuid,
        target: usize,
    ) -> Result<CardOverview, ApiError> {
        let card = CardRepository::find_by_id(pool, card_id)
            .await?
            .ok_or(ApiError::NotFound("card not found"))?;

        let source_workspace = ListRepository::workspace_id_of(pool, card.list_id)
            .await?
            .ok_or(ApiError::NotFound("card not found"))?;
        ensure_can_edit(pool, user_id, source_workspace, "not authorized to move cards").await?;

        let dest_list = ListRepository::find_by_id(pool, dest_list_id)
            .await?
            .ok_or(ApiError::NotFound("target list not found"))?;
        let dest_workspace = ListRepository::workspace_id_of(pool, dest_list.id)
            .await?
            .ok_or(ApiError::NotFound("target list not found"))?;
        if dest_workspace != source_workspace {
            ensure_can_edit(pool, user_id, dest_workspace, "not authorized to move cards").await?;
        }

        let mut tx = pool.begin().await?;
        let mut lock_ids = vec![card.list_id, dest_list_id];
        lock_ids.sort();
        lock_ids.dedup();
        ListRepository::lock_many(&mut tx, &lock_ids).await?;

        if dest_list_id == card.list_id {
            let siblings = CardRepository::list_ids_ordered(&mut *tx, card.list_id, None).await?;
            let plan = ordering::plan_same_parent(&siblings, card_id, target);
            CardRepository::apply_positions(&mut tx, &plan).await?;
        } else {
            let source =
                CardRepository::list_ids_ordered(&mut *tx, card.list_id, Some(card_id)).await?;
            let dest = CardRepository::list_ids_ordered(&mut *tx, dest_list_id, None).await?;
            let plan = ordering::plan_cross_parent(&source, &dest, card_id, target);
            CardRepository::apply_positions(&mut tx, &plan.source).await?;
            CardRepository::apply_positions_with_list(&mut tx, dest_list_id, &plan.dest).await?;
        }
        tx.commit().await?;

        CardRepository::find_overview(pool, card_id)
            .await?
            .ok_or(ApiError::NotFound("card not found"))
    }

    /// Moves a list to `target` index within its board.
    pub async fn reorder_list(
        pool: &PgPool,
        user_id: Uuid,
        list_id: Uuid,
        target: usize,
    ) -> Result<ListWithCards, ApiError> {
        let list = ListRepository::find_by_id(pool, list_id)
            .await?
            .ok_or(ApiError::NotFound("list not found"))?;
        let workspace_id = ListRepository::workspace_id_of(pool, list_id)
            .await?
            .ok_or(ApiError::NotFound("list not found"))?;
        ensure_can_edit(pool, user_id, workspace_id, "not authorized to reorder lists").await?;

        let mut tx = pool.begin().await?;
        BoardRepository::lock(&mut tx, list.board_id).await?;
        let siblings = ListRepository::list_ids_ordered(&mut *tx, list.board_id).await?;
        let plan = ordering::plan_same_parent(&siblings, list_id, target);
        ListRepository::apply_positions(&mut tx, &plan).await?;
        tx.commit().await?;

        let list = ListRepository::find_by_id(pool, list_id)
            .await?
            .ok_or(ApiError::NotFound("list not found"))?;
        let cards = CardRepository::list_by_list(pool, list_id).await?;
        Ok(ListWithCards { list, cards })
    }

    /// Moves a board to `target` index within its workspace.
    pub async fn reorder_board(
        pool: &PgPool,
        user_id: Uuid,
        board_id: Uuid,
        target: usize,
    ) -> Result<Board, ApiError> {
        let board = BoardRepository::find_by_id(pool, board_id)
            .await?
            .ok_or(ApiError::NotFound("board not found"))?;
        ensure_can_edit(
            pool,
            user_id,
            board.workspace_id,
            "not authorized to reorder boards",
        )
        .await?;

        let mut tx = pool.begin().await?;
        WorkspaceRepository::lock(&mut tx, board.workspace_id).await?;
        let siblings = BoardRepository::list_ids_ordered(&mut *tx, board.workspace_id).await?;
        let plan = ordering::plan_same_parent(&siblings, board_id, target);
        BoardRepository::apply_positions(&mut tx, &plan).await?;
        tx.commit().await?;

        BoardRepository::find_by_id(pool, board_id)
            .await?
            .ok_or(ApiError::NotFound("board not found"))
    }
}
