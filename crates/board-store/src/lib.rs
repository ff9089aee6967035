//! Client-side mirror of one board's ordered state.
//!
//! The store holds lists and cards the way the server hands them out
//! (position-ascending) and applies both local optimistic mutations and
//! remote relay frames through the same planners the server persists with
//! (the `ordering` crate). Sharing the algorithm is what makes a local
//! optimistic move and the later-arriving echo of the same logical move
//! converge instead of fighting each other.
//!
//! Relay payloads are advisory and loosely typed: anything that does not
//! parse is dropped silently, and a full board reload always restores the
//! canonical server order.

use api_types::{
    Board, BoardDetail, BoardEvent, CardOverview, List, ListWithCards, PresenceUser, ServerFrame,
};
use ordering::Reposition;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct BoardStore {
    board: Option<Board>,
    lists: Vec<ListWithCards>,
    online_users: Vec<PresenceUser>,
}

impl BoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all state with a freshly loaded canonical board.
    pub fn load(&mut self, detail: BoardDetail) {
        self.board = Some(detail.board);
        self.lists = detail.lists;
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    pub fn lists(&self) -> &[ListWithCards] {
        &self.lists
    }

    pub fn online_users(&self) -> &[PresenceUser] {
        &self.online_users
    }

    pub fn set_online_users(&mut self, users: Vec<PresenceUser>) {
        self.online_users = users;
    }

    pub fn add_list(&mut self, list: ListWithCards) {
        self.lists.push(list);
    }

    /// Replaces a list's own fields, keeping its cards.
    pub fn update_list(&mut self, list: List) {
        if let Some(entry) = self.lists.iter_mut().find(|l| l.list.id == list.id) {
            entry.list = list;
        }
    }

    pub fn remove_list(&mut self, list_id: Uuid) {
        self.lists.retain(|l| l.list.id != list_id);
    }

    /// Reorders lists to match `order` (id, position) pairs, position
    /// ascending. Lists missing from `order` keep their relative place at
    /// the end; cards are untouched.
    pub fn reorder_lists(&mut self, order: &[(Uuid, i32)]) {
        let mut ranked: Vec<(Uuid, i32)> = order.to_vec();
        ranked.sort_by_key(|(_, position)| *position);
        let rank_of = |id: Uuid| ranked.iter().position(|(rid, _)| *rid == id);
        self.lists
            .sort_by_key(|l| rank_of(l.list.id).unwrap_or(usize::MAX));
        for (index, entry) in self.lists.iter_mut().enumerate() {
            entry.list.position = index as i32;
        }
    }

    pub fn add_card(&mut self, list_id: Uuid, card: CardOverview) {
        if let Some(entry) = self.lists.iter_mut().find(|l| l.list.id == list_id) {
            entry.cards.push(card);
        }
    }

    /// Replaces a card within the given list; a card that is not there
    /// (e.g. already moved away) is left alone.
    pub fn update_card(&mut self, list_id: Uuid, card: CardOverview) {
        if let Some(entry) = self.lists.iter_mut().find(|l| l.list.id == list_id) {
            if let Some(slot) = entry.cards.iter_mut().find(|c| c.card.id == card.card.id) {
                *slot = card;
            }
        }
    }

    pub fn remove_card(&mut self, list_id: Uuid, card_id: Uuid) {
        if let Some(entry) = self.lists.iter_mut().find(|l| l.list.id == list_id) {
            entry.cards.retain(|c| c.card.id != card_id);
        }
    }

    /// Moves a card with the same splice-and-renumber plan the server
    /// persists. Returns false (and changes nothing) when either list is
    /// unknown or the card is not in the source list, which is what makes
    /// a second application of the same cross-list move a no-op.
    pub fn move_card(
        &mut self,
        from_list_id: Uuid,
        to_list_id: Uuid,
        card_id: Uuid,
        target: usize,
    ) -> bool {
        let Some(from_idx) = self.list_index(from_list_id) else {
            return false;
        };
        let Some(to_idx) = self.list_index(to_list_id) else {
            return false;
        };
        if !self.lists[from_idx].cards.iter().any(|c| c.card.id == card_id) {
            return false;
        }

        if from_idx == to_idx {
            let siblings: Vec<Uuid> = card_ids(&self.lists[from_idx]);
            let plan = ordering::plan_same_parent(&siblings, card_id, target);
            apply_plan(&mut self.lists[from_idx].cards, &plan);
        } else {
            let moved_at = self.lists[from_idx]
                .cards
                .iter()
                .position(|c| c.card.id == card_id)
                .unwrap_or_default();
            let mut moved = self.lists[from_idx].cards.remove(moved_at);
            moved.card.list_id = to_list_id;
            self.lists[to_idx].cards.push(moved);

            let source: Vec<Uuid> = card_ids(&self.lists[from_idx]);
            let dest: Vec<Uuid> = card_ids(&self.lists[to_idx]);
            let plan = ordering::plan_cross_parent(&source, &dest, card_id, target);
            apply_plan(&mut self.lists[from_idx].cards, &plan.source);
            apply_plan(&mut self.lists[to_idx].cards, &plan.dest);
        }
        true
    }

    /// Ingests a server frame. Frames for other boards and frames that do
    /// not parse into anything useful are dropped; the channel is advisory.
    pub fn apply_frame(&mut self, frame: &ServerFrame) {
        let board_id = self.board.as_ref().map(|b| b.id);
        match frame {
            ServerFrame::UsersOnline { board_id: id, users } if Some(*id) == board_id => {
                self.set_online_users(users.clone());
            }
            ServerFrame::Board { board_id: id, event } if Some(*id) == board_id => {
                self.apply_event(event);
            }
            _ => {}
        }
    }

    /// Applies one relayed board event.
    pub fn apply_event(&mut self, event: &BoardEvent) {
        match event {
            BoardEvent::CardCreated { card } => {
                if let Ok(card) = serde_json::from_value::<CardOverview>(card.clone()) {
                    self.add_card(card.card.list_id, card);
                }
            }
            BoardEvent::CardUpdated { card } => {
                if let Ok(card) = serde_json::from_value::<CardOverview>(card.clone()) {
                    self.update_card(card.card.list_id, card);
                }
            }
            BoardEvent::CardMoved {
                card,
                from_list_id,
                to_list_id,
            } => {
                let id = card.get("id").and_then(|v| v.as_str());
                let position = card.get("position").and_then(|v| v.as_i64());
                if let (Some(Ok(card_id)), Some(position)) = (id.map(str::parse), position) {
                    self.move_card(
                        *from_list_id,
                        *to_list_id,
                        card_id,
                        position.max(0) as usize,
                    );
                }
            }
            BoardEvent::CardDeleted { card_id, list_id } => {
                self.remove_card(*list_id, *card_id);
            }
            BoardEvent::ListCreated { list } => {
                if let Ok(list) = serde_json::from_value::<List>(list.clone()) {
                    self.add_list(ListWithCards { list, cards: Vec::new() });
                }
            }
            BoardEvent::ListUpdated { list } => {
                if let Ok(list) = serde_json::from_value::<List>(list.clone()) {
                    self.update_list(list);
                }
            }
            BoardEvent::ListDeleted { list_id } => {
                self.remove_list(*list_id);
            }
            BoardEvent::ListReordered { lists } => {
                let Some(entries) = lists.as_array() else {
                    return;
                };
                let order: Vec<(Uuid, i32)> = entries
                    .iter()
                    .filter_map(|entry| {
                        let id = entry.get("id")?.as_str()?.parse().ok()?;
                        let position = entry.get("position")?.as_i64()? as i32;
                        Some((id, position))
                    })
                    .collect();
                if order.len() == entries.len() {
                    self.reorder_lists(&order);
                }
            }
        }
    }

    fn list_index(&self, list_id: Uuid) -> Option<usize> {
        self.lists.iter().position(|l| l.list.id == list_id)
    }
}

fn card_ids(list: &ListWithCards) -> Vec<Uuid> {
    list.cards.iter().map(|c| c.card.id).collect()
}

/// Reorders `cards` to match the plan and stamps the planned positions.
fn apply_plan(cards: &mut Vec<CardOverview>, plan: &[Reposition]) {
    let mut pool: Vec<CardOverview> = std::mem::take(cards);
    for assignment in plan {
        if let Some(at) = pool.iter().position(|c| c.card.id == assignment.id) {
            let mut card = pool.remove(at);
            card.card.position = assignment.position;
            cards.push(card);
        }
    }
    // Anything the plan did not name (shouldn't happen) survives at the end.
    cards.append(&mut pool);
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_types::{Card, CardPriority};
    use chrono::Utc;
    use serde_json::json;

    fn card(list_id: Uuid, position: i32) -> CardOverview {
        let now = Utc::now();
        CardOverview {
            card: Card {
                id: Uuid::new_v4(),
                list_id,
                title: format!("card {position}"),
                description: None,
                position,
                priority: CardPriority::Medium,
                due_date: None,
                is_archived: false,
                creator_id: Uuid::new_v4(),
                assignee_id: None,
                created_at: now,
                updated_at: now,
            },
            comment_count: 0,
            checklist_count: 0,
            attachment_count: 0,
        }
    }

    fn list(board_id: Uuid, position: i32, cards: usize) -> ListWithCards {
        let now = Utc::now();
        let id = Uuid::new_v4();
        ListWithCards {
            list: List {
                id,
                board_id,
                name: format!("list {position}"),
                position,
                created_at: now,
                updated_at: now,
            },
            cards: (0..cards).map(|i| card(id, i as i32)).collect(),
        }
    }

    fn store_with_lists(cards_per_list: &[usize]) -> BoardStore {
        let now = Utc::now();
        let board_id = Uuid::new_v4();
        let mut store = BoardStore::new();
        store.load(BoardDetail {
            board: Board {
                id: board_id,
                workspace_id: Uuid::new_v4(),
                name: "roadmap".into(),
                description: None,
                background: None,
                position: 0,
                created_at: now,
                updated_at: now,
            },
            lists: cards_per_list
                .iter()
                .enumerate()
                .map(|(i, n)| list(board_id, i as i32, *n))
                .collect(),
        });
        store
    }

    fn positions(store: &BoardStore, list: usize) -> Vec<i32> {
        store.lists()[list].cards.iter().map(|c| c.card.position).collect()
    }

    fn order(store: &BoardStore, list: usize) -> Vec<Uuid> {
        store.lists()[list].cards.iter().map(|c| c.card.id).collect()
    }

    #[test]
    fn same_list_move_renumbers_densely() {
        let mut store = store_with_lists(&[4]);
        let list_id = store.lists()[0].list.id;
        let ids = order(&store, 0);

        assert!(store.move_card(list_id, list_id, ids[2], 0));
        assert_eq!(order(&store, 0), vec![ids[2], ids[0], ids[1], ids[3]]);
        assert_eq!(positions(&store, 0), vec![0, 1, 2, 3]);
    }

    #[test]
    fn cross_list_move_updates_parent_and_both_orders() {
        let mut store = store_with_lists(&[3, 2]);
        let (source_id, dest_id) = (store.lists()[0].list.id, store.lists()[1].list.id);
        let source = order(&store, 0);
        let dest = order(&store, 1);

        assert!(store.move_card(source_id, dest_id, source[1], 1));
        assert_eq!(order(&store, 0), vec![source[0], source[2]]);
        assert_eq!(positions(&store, 0), vec![0, 1]);
        assert_eq!(order(&store, 1), vec![dest[0], source[1], dest[1]]);
        assert_eq!(positions(&store, 1), vec![0, 1, 2]);
        assert_eq!(store.lists()[1].cards[1].card.list_id, dest_id);
    }

    #[test]
    fn move_to_unknown_list_is_a_no_op() {
        let mut store = store_with_lists(&[2]);
        let list_id = store.lists()[0].list.id;
        let ids = order(&store, 0);
        assert!(!store.move_card(list_id, Uuid::new_v4(), ids[0], 0));
        assert_eq!(order(&store, 0), ids);
    }

    #[test]
    fn remote_echo_of_local_move_converges() {
        let mut store = store_with_lists(&[3, 2]);
        let (source_id, dest_id) = (store.lists()[0].list.id, store.lists()[1].list.id);
        let moving = order(&store, 0)[1];

        // Optimistic local application, then the echo the server relays back.
        store.move_card(source_id, dest_id, moving, 1);
        let after_local = (order(&store, 0), order(&store, 1));

        let echo = BoardEvent::CardMoved {
            card: json!({"id": moving.to_string(), "position": 1}),
            from_list_id: source_id,
            to_list_id: dest_id,
        };
        store.apply_event(&echo);
        assert_eq!((order(&store, 0), order(&store, 1)), after_local);

        // Replaying the echo still changes nothing.
        store.apply_event(&echo);
        assert_eq!((order(&store, 0), order(&store, 1)), after_local);
        assert_eq!(positions(&store, 0), vec![0, 1]);
        assert_eq!(positions(&store, 1), vec![0, 1, 2]);
    }

    #[test]
    fn same_list_remote_replay_is_idempotent() {
        let mut store = store_with_lists(&[4]);
        let list_id = store.lists()[0].list.id;
        let moving = order(&store, 0)[3];

        let echo = BoardEvent::CardMoved {
            card: json!({"id": moving.to_string(), "position": 0}),
            from_list_id: list_id,
            to_list_id: list_id,
        };
        store.apply_event(&echo);
        let once = order(&store, 0);
        store.apply_event(&echo);
        assert_eq!(order(&store, 0), once);
        assert_eq!(positions(&store, 0), vec![0, 1, 2, 3]);
    }

    #[test]
    fn malformed_move_payload_is_dropped() {
        let mut store = store_with_lists(&[2]);
        let list_id = store.lists()[0].list.id;
        let before = order(&store, 0);
        store.apply_event(&BoardEvent::CardMoved {
            card: json!({"position": 0}), // no id
            from_list_id: list_id,
            to_list_id: list_id,
        });
        store.apply_event(&BoardEvent::CardMoved {
            card: json!({"id": "not-a-uuid", "position": 0}),
            from_list_id: list_id,
            to_list_id: list_id,
        });
        assert_eq!(order(&store, 0), before);
    }

    #[test]
    fn created_and_deleted_events_upsert() {
        let mut store = store_with_lists(&[1]);
        let list_id = store.lists()[0].list.id;
        let incoming = card(list_id, 1);
        store.apply_event(&BoardEvent::CardCreated {
            card: serde_json::to_value(&incoming).unwrap(),
        });
        assert_eq!(store.lists()[0].cards.len(), 2);

        store.apply_event(&BoardEvent::CardDeleted {
            card_id: incoming.card.id,
            list_id,
        });
        assert_eq!(store.lists()[0].cards.len(), 1);
    }

    #[test]
    fn list_reorder_applies_given_order() {
        let mut store = store_with_lists(&[1, 1, 1]);
        let ids: Vec<Uuid> = store.lists().iter().map(|l| l.list.id).collect();
        store.apply_event(&BoardEvent::ListReordered {
            lists: json!([
                {"id": ids[2].to_string(), "position": 0},
                {"id": ids[0].to_string(), "position": 1},
                {"id": ids[1].to_string(), "position": 2},
            ]),
        });
        let reordered: Vec<Uuid> = store.lists().iter().map(|l| l.list.id).collect();
        assert_eq!(reordered, vec![ids[2], ids[0], ids[1]]);
        let list_positions: Vec<i32> = store.lists().iter().map(|l| l.list.position).collect();
        assert_eq!(list_positions, vec![0, 1, 2]);
    }

    #[test]
    fn frames_for_other_boards_are_ignored() {
        let mut store = store_with_lists(&[1]);
        let foreign = Uuid::new_v4();
        store.apply_frame(&ServerFrame::UsersOnline {
            board_id: foreign,
            users: vec![PresenceUser {
                id: Uuid::new_v4(),
                name: "mallory".into(),
                avatar: None,
            }],
        });
        assert!(store.online_users().is_empty());

        let board_id = store.board().unwrap().id;
        store.apply_frame(&ServerFrame::UsersOnline {
            board_id,
            users: vec![PresenceUser {
                id: Uuid::new_v4(),
                name: "dana".into(),
                avatar: None,
            }],
        });
        assert_eq!(store.online_users().len(), 1);
    }
}
