//! Client-side board store.
//!
//! `BoardStore` owns one user's `Board` and applies every edit as an atomic,
//! invariant-preserving mutation. Each mutation reports whether anything
//! changed and bumps `version` only when it did, so observers (the sync
//! agent) can detect "dirty" by comparing versions.
//!
//! Invalid requests (blank titles, out-of-range indices, unknown ids) are
//! rejected as silent no-ops.

use std::collections::HashMap;

use crate::model::{Board, Column, ColumnId, Item, ItemId};

#[derive(Debug, Clone)]
pub struct BoardStore {
    board: Board,
    /// Reverse index: which column currently owns each item.
    index: HashMap<ItemId, ColumnId>,
    version: u64,
}

impl BoardStore {
    pub fn new(board: Board) -> Self {
        let index = build_index(&board);
        Self {
            board,
            index,
            version: 0,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn into_board(self) -> Board {
        self.board
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.board)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.board.columns.get(id)
    }

    pub fn ordered_columns(&self) -> impl Iterator<Item = &Column> {
        self.board.ordered_columns()
    }

    pub fn item_count(&self) -> usize {
        self.index.len()
    }

    /// Locate an item and the column holding it.
    pub fn find_item(&self, id: &ItemId) -> Option<(&ColumnId, &Item)> {
        let column_id = self.index.get(id)?;
        let item = self
            .board
            .columns
            .get(column_id)?
            .items
            .iter()
            .find(|item| &item.id == id)?;
        Some((column_id, item))
    }

    /// Items of a column that match `query`, in display order.
    pub fn filtered_items<'a>(&'a self, column: &ColumnId, query: &'a str) -> Vec<&'a Item> {
        self.column(column)
            .map(|c| c.items.iter().filter(|item| item.matches(query)).collect())
            .unwrap_or_default()
    }

    // ── Column ordering ───────────────────────────────────────────────

    pub fn reorder_columns(&mut self, from: usize, to: usize) -> bool {
        let len = self.board.column_order.len();
        if from >= len || to >= len || from == to {
            return false;
        }
        let id = self.board.column_order.remove(from);
        self.board.column_order.insert(to, id);
        self.touch()
    }

    // ── Card movement ─────────────────────────────────────────────────

    /// Move a card. Within one column this is a list splice where
    /// `dest_index` refers to the sequence after removal; across columns the
    /// card is removed from the source and inserted, unmodified, into the
    /// destination. A `dest_index` past the end appends.
    pub fn move_item(
        &mut self,
        source: &ColumnId,
        source_index: usize,
        dest: &ColumnId,
        dest_index: usize,
    ) -> bool {
        if !self.board.columns.contains_key(dest) {
            return false;
        }
        let Some(source_column) = self.board.columns.get_mut(source) else {
            return false;
        };
        let len = source_column.items.len();
        if source_index >= len {
            return false;
        }
        // Within one column the card lands at most at the last slot.
        if source == dest && dest_index.min(len - 1) == source_index {
            return false;
        }

        let item = source_column.items.remove(source_index);
        let item_id = item.id.clone();
        // Checked above, cannot be missing.
        let Some(dest_column) = self.board.columns.get_mut(dest) else {
            return false;
        };
        let at = dest_index.min(dest_column.items.len());
        dest_column.items.insert(at, item);
        self.index.insert(item_id, dest.clone());
        self.touch()
    }

    // ── Columns ───────────────────────────────────────────────────────

    pub fn add_column(&mut self, title: &str) -> Option<ColumnId> {
        if is_blank(title) {
            return None;
        }
        let id = ColumnId::generate();
        self.board
            .columns
            .insert(id.clone(), Column::new(id.clone(), title));
        self.board.column_order.push(id.clone());
        self.touch();
        Some(id)
    }

    pub fn rename_column(&mut self, id: &ColumnId, title: &str) -> bool {
        if is_blank(title) {
            return false;
        }
        let Some(column) = self.board.columns.get_mut(id) else {
            return false;
        };
        if column.title == title {
            return false;
        }
        column.title = title.to_string();
        self.touch()
    }

    /// Remove a column together with every item it holds.
    pub fn delete_column(&mut self, id: &ColumnId) -> bool {
        let Some(column) = self.board.columns.remove(id) else {
            return false;
        };
        self.board.column_order.retain(|c| c != id);
        for item in &column.items {
            self.index.remove(&item.id);
        }
        self.touch()
    }

    // ── Items ─────────────────────────────────────────────────────────

    pub fn add_item(&mut self, column: &ColumnId, title: &str) -> Option<ItemId> {
        if is_blank(title) {
            return None;
        }
        let target = self.board.columns.get_mut(column)?;
        let item = Item::new(title);
        let id = item.id.clone();
        target.items.push(item);
        self.index.insert(id.clone(), column.clone());
        self.touch();
        Some(id)
    }

    /// Replace an item in place, keeping its column and position.
    pub fn update_item(&mut self, updated: Item) -> bool {
        let Some(slot) = self.item_mut(&updated.id) else {
            return false;
        };
        if *slot == updated {
            return false;
        }
        *slot = updated;
        self.touch()
    }

    pub fn delete_item(&mut self, id: &ItemId) -> bool {
        let Some(column_id) = self.index.remove(id) else {
            return false;
        };
        if let Some(column) = self.board.columns.get_mut(&column_id) {
            column.items.retain(|item| &item.id != id);
        }
        self.touch()
    }

    /// `completed` flips back to `pending`; any other status becomes
    /// `completed`. An `in-progress` card therefore never returns to
    /// `in-progress` through this toggle.
    pub fn toggle_item_status(&mut self, id: &ItemId) -> bool {
        let Some(item) = self.item_mut(id) else {
            return false;
        };
        item.status = item.status.toggled();
        self.touch()
    }

    fn item_mut(&mut self, id: &ItemId) -> Option<&mut Item> {
        let column_id = self.index.get(id)?;
        self.board
            .columns
            .get_mut(column_id)?
            .items
            .iter_mut()
            .find(|item| &item.id == id)
    }

    fn touch(&mut self) -> bool {
        self.version += 1;
        true
    }
}

impl From<Board> for BoardStore {
    fn from(board: Board) -> Self {
        Self::new(board)
    }
}

fn build_index(board: &Board) -> HashMap<ItemId, ColumnId> {
    board
        .columns
        .values()
        .flat_map(|column| {
            column
                .items
                .iter()
                .map(move |item| (item.id.clone(), column.id.clone()))
        })
        .collect()
}

fn is_blank(title: &str) -> bool {
    title.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::model::{Status, Tag};

    fn col(id: &str) -> ColumnId {
        ColumnId::from(id)
    }

    fn titles(store: &BoardStore, column: &str) -> Vec<String> {
        store
            .column(&col(column))
            .unwrap()
            .items
            .iter()
            .map(|i| i.title.clone())
            .collect()
    }

    /// Seed board with `n` cards named `card-k` in "To Do".
    fn store_with_cards(n: usize) -> BoardStore {
        let mut store = BoardStore::new(Board::seed());
        for k in 0..n {
            store.add_item(&col("col-1"), &format!("card-{}", k)).unwrap();
        }
        store
    }

    fn assert_consistent(store: &BoardStore) {
        let board = store.board();
        board.validate().expect("board invariants hold");
        let keys: HashSet<_> = board.columns.keys().collect();
        let order: HashSet<_> = board.column_order.iter().collect();
        assert_eq!(keys, order);
        assert_eq!(store.index, build_index(board), "reverse index is stale");
    }

    #[test]
    fn test_new_store_indexes_existing_items() {
        let mut board = Board::seed();
        let item = Item::new("imported");
        let id = item.id.clone();
        board.columns.get_mut(&col("col-2")).unwrap().items.push(item);

        let store = BoardStore::new(board);
        let (column, found) = store.find_item(&id).unwrap();
        assert_eq!(column, &col("col-2"));
        assert_eq!(found.title, "imported");
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_reorder_columns_moves_id() {
        let mut store = BoardStore::new(Board::seed());
        assert!(store.reorder_columns(0, 2));
        let order: Vec<&str> = store.board().column_order.iter().map(|c| c.as_str()).collect();
        assert_eq!(order, ["col-2", "col-3", "col-1"]);
        assert_eq!(store.version(), 1);
        assert_consistent(&store);
    }

    #[test]
    fn test_reorder_columns_same_index_is_noop() {
        let mut store = BoardStore::new(Board::seed());
        let before = store.board().clone();
        assert!(!store.reorder_columns(1, 1));
        assert_eq!(store.board(), &before);
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_reorder_columns_out_of_range_is_rejected() {
        let mut store = BoardStore::new(Board::seed());
        assert!(!store.reorder_columns(3, 0));
        assert!(!store.reorder_columns(0, 3));
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_move_item_within_column_uses_splice_semantics() {
        let mut store = store_with_cards(4);
        // Remove card-0, then insert at index 2 of [card-1, card-2, card-3].
        assert!(store.move_item(&col("col-1"), 0, &col("col-1"), 2));
        assert_eq!(titles(&store, "col-1"), ["card-1", "card-2", "card-0", "card-3"]);

        assert!(store.move_item(&col("col-1"), 3, &col("col-1"), 0));
        assert_eq!(titles(&store, "col-1"), ["card-3", "card-1", "card-2", "card-0"]);
        assert_consistent(&store);
    }

    #[test]
    fn test_move_item_same_position_is_noop() {
        let mut store = store_with_cards(2);
        let before = store.board().clone();
        let version = store.version();
        assert!(!store.move_item(&col("col-1"), 1, &col("col-1"), 1));
        assert_eq!(store.board(), &before);
        assert_eq!(store.version(), version);
    }

    #[test]
    fn test_move_last_item_past_end_of_own_column_is_noop() {
        let mut store = store_with_cards(2);
        let before = store.board().clone();
        let version = store.version();
        assert!(!store.move_item(&col("col-1"), 1, &col("col-1"), 2));
        assert!(!store.move_item(&col("col-1"), 1, &col("col-1"), usize::MAX));
        assert_eq!(store.board(), &before);
        assert_eq!(store.version(), version);

        // Not the last card, so appending does change the order.
        assert!(store.move_item(&col("col-1"), 0, &col("col-1"), 2));
        assert_eq!(titles(&store, "col-1"), ["card-1", "card-0"]);
        assert_consistent(&store);
    }

    #[test]
    fn test_move_item_across_columns() {
        let mut store = store_with_cards(2);
        let moved_id = store.column(&col("col-1")).unwrap().items[0].id.clone();
        let moved_before = store.column(&col("col-1")).unwrap().items[0].clone();

        assert!(store.move_item(&col("col-1"), 0, &col("col-2"), 0));
        assert_eq!(titles(&store, "col-1"), ["card-1"]);
        assert_eq!(titles(&store, "col-2"), ["card-0"]);

        let (owner, moved) = store.find_item(&moved_id).unwrap();
        assert_eq!(owner, &col("col-2"));
        assert_eq!(moved, &moved_before, "move must not modify the item");
        assert_consistent(&store);
    }

    #[test]
    fn test_move_item_conserves_item_count() {
        let mut store = store_with_cards(5);
        let total = store.board().item_count();
        let moves = [
            ("col-1", 4, "col-3", 0),
            ("col-1", 0, "col-2", 9),
            ("col-3", 0, "col-2", 0),
            ("col-2", 1, "col-2", 0),
            ("col-1", 7, "col-2", 0),
            ("col-1", 0, "col-9", 0),
        ];
        for (src, si, dst, di) in moves {
            store.move_item(&col(src), si, &col(dst), di);
            assert_eq!(store.board().item_count(), total);
            assert_eq!(store.item_count(), total);
            assert_consistent(&store);
        }
    }

    #[test]
    fn test_move_item_rejects_bad_source() {
        let mut store = store_with_cards(1);
        assert!(!store.move_item(&col("col-1"), 1, &col("col-2"), 0));
        assert!(!store.move_item(&col("missing"), 0, &col("col-2"), 0));
        assert!(!store.move_item(&col("col-1"), 0, &col("missing"), 0));
        assert_eq!(titles(&store, "col-1"), ["card-0"]);
    }

    #[test]
    fn test_move_item_past_end_appends() {
        let mut store = store_with_cards(2);
        store.add_item(&col("col-2"), "existing").unwrap();
        assert!(store.move_item(&col("col-1"), 0, &col("col-2"), 42));
        assert_eq!(titles(&store, "col-2"), ["existing", "card-0"]);
    }

    #[test]
    fn test_add_column_appends_to_order() {
        let mut store = BoardStore::new(Board::seed());
        let id = store.add_column("Backlog").unwrap();
        assert_eq!(store.board().column_order.last(), Some(&id));
        let column = store.column(&id).unwrap();
        assert_eq!(column.title, "Backlog");
        assert!(column.items.is_empty());
        assert_consistent(&store);
    }

    #[test]
    fn test_add_column_rejects_blank_title() {
        let mut store = BoardStore::new(Board::seed());
        assert!(store.add_column("").is_none());
        assert!(store.add_column("   \t").is_none());
        assert_eq!(store.board().column_order.len(), 3);
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_rename_column() {
        let mut store = BoardStore::new(Board::seed());
        assert!(store.rename_column(&col("col-2"), "In Progress"));
        assert_eq!(store.column(&col("col-2")).unwrap().title, "In Progress");

        assert!(!store.rename_column(&col("col-2"), "  "));
        assert_eq!(store.column(&col("col-2")).unwrap().title, "In Progress");
        assert!(!store.rename_column(&col("nope"), "Title"));
    }

    #[test]
    fn test_delete_column_cascades_items() {
        let mut store = store_with_cards(3);
        store.add_item(&col("col-2"), "survivor").unwrap();
        let doomed: Vec<ItemId> = store
            .column(&col("col-1"))
            .unwrap()
            .items
            .iter()
            .map(|i| i.id.clone())
            .collect();

        assert!(store.delete_column(&col("col-1")));
        assert!(store.column(&col("col-1")).is_none());
        assert_eq!(store.board().item_count(), 1);
        for id in &doomed {
            assert!(store.find_item(id).is_none());
            for column in store.board().columns.values() {
                assert!(column.items.iter().all(|i| &i.id != id));
            }
        }
        assert_consistent(&store);
    }

    #[test]
    fn test_delete_unknown_column_is_noop() {
        let mut store = BoardStore::new(Board::seed());
        assert!(!store.delete_column(&col("col-9")));
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_add_item_defaults() {
        let mut store = BoardStore::new(Board::seed());
        let id = store.add_item(&col("col-1"), "Call the bank").unwrap();
        let (_, item) = store.find_item(&id).unwrap();
        assert_eq!(item.status, Status::Pending);
        assert_eq!(item.tag, Tag::General);
        assert_eq!(item.content, "");
        assert!(!item.created_at.is_empty());

        assert!(store.add_item(&col("col-1"), " ").is_none());
        assert!(store.add_item(&col("missing"), "Lost").is_none());
        assert_eq!(store.item_count(), 1);
    }

    #[test]
    fn test_update_item_preserves_position() {
        let mut store = store_with_cards(3);
        let mut edited = store.column(&col("col-1")).unwrap().items[1].clone();
        edited.title = "renamed".into();
        edited.content = "details".into();
        edited.tag = Tag::Urgent;

        assert!(store.update_item(edited.clone()));
        assert_eq!(titles(&store, "col-1"), ["card-0", "renamed", "card-2"]);
        assert_eq!(store.column(&col("col-1")).unwrap().items[1], edited);
    }

    #[test]
    fn test_update_missing_item_is_noop() {
        let mut store = store_with_cards(1);
        let ghost = Item::new("ghost");
        let version = store.version();
        assert!(!store.update_item(ghost));
        assert_eq!(store.version(), version);
    }

    #[test]
    fn test_delete_item() {
        let mut store = store_with_cards(2);
        let id = store.column(&col("col-1")).unwrap().items[0].id.clone();
        assert!(store.delete_item(&id));
        assert_eq!(titles(&store, "col-1"), ["card-1"]);
        assert!(!store.delete_item(&id), "second delete is a no-op");
        assert_consistent(&store);
    }

    #[test]
    fn test_toggle_pending_twice_returns_to_pending() {
        let mut store = store_with_cards(1);
        let id = store.column(&col("col-1")).unwrap().items[0].id.clone();
        assert!(store.toggle_item_status(&id));
        assert_eq!(store.find_item(&id).unwrap().1.status, Status::Completed);
        assert!(store.toggle_item_status(&id));
        assert_eq!(store.find_item(&id).unwrap().1.status, Status::Pending);
    }

    #[test]
    fn test_toggle_in_progress_lands_on_completed() {
        let mut store = store_with_cards(1);
        let mut item = store.column(&col("col-1")).unwrap().items[0].clone();
        item.status = Status::InProgress;
        store.update_item(item.clone());

        store.toggle_item_status(&item.id);
        assert_eq!(store.find_item(&item.id).unwrap().1.status, Status::Completed);
        store.toggle_item_status(&item.id);
        assert_eq!(store.find_item(&item.id).unwrap().1.status, Status::Pending);
    }

    #[test]
    fn test_toggle_unknown_item_is_noop() {
        let mut store = BoardStore::new(Board::seed());
        assert!(!store.toggle_item_status(&ItemId::from("nope")));
    }

    #[test]
    fn test_filtered_items() {
        let mut store = store_with_cards(3);
        store.add_item(&col("col-1"), "Dentist").unwrap();
        let hits: Vec<&str> = store
            .filtered_items(&col("col-1"), "dent")
            .into_iter()
            .map(|i| i.title.as_str())
            .collect();
        assert_eq!(hits, ["Dentist"]);
        assert_eq!(store.filtered_items(&col("col-1"), "").len(), 4);
        assert!(store.filtered_items(&col("missing"), "").is_empty());
    }

    #[test]
    fn test_to_json_round_trips_through_wire_shape() {
        let store = store_with_cards(2);
        let json = store.to_json().unwrap();
        let board: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(&board, store.board());
    }

    #[test]
    fn test_mixed_sequence_keeps_invariants() {
        let mut store = store_with_cards(4);
        let extra = store.add_column("Later").unwrap();
        store.move_item(&col("col-1"), 0, &extra, 0);
        store.reorder_columns(3, 0);
        store.move_item(&col("col-1"), 2, &col("col-3"), 0);
        store.delete_column(&col("col-2"));
        let id = store.column(&extra).unwrap().items[0].id.clone();
        store.toggle_item_status(&id);
        store.move_item(&extra, 0, &col("col-1"), 1);
        store.delete_column(&extra);
        assert_consistent(&store);
        assert_eq!(store.board().item_count(), 4);
    }
}
