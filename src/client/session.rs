//! One signed-in user's view of their board.
//!
//! `BoardSession` ties together the local `BoardStore`, the `SyncAgent` that
//! persists it, the search filter and the current interaction mode. Every
//! mutation that changes the store's version is forwarded to the agent.

use std::sync::Arc;
use std::time::Duration;

use quickboard_common::{BoardStore, ColumnId, Item, ItemId};

use super::api::BoardApi;
use super::credentials::{CredentialFile, Credentials};
use super::sync::{SaveStatus, SyncAgent};
use crate::errors::SyncError;

/// What the user is in the middle of doing. At most one at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    NoInteraction,
    AddingColumn,
    AddingCard(ColumnId),
    EditingColumn(ColumnId),
    EditingItem(ItemId),
}

pub struct BoardSession {
    store: Option<BoardStore>,
    mode: InteractionMode,
    search: String,
    username: String,
    credentials: CredentialFile,
    agent: SyncAgent,
}

impl BoardSession {
    /// Read the stored credential and start a sync agent for it. The board
    /// is not loaded yet; see [`BoardSession::load`].
    pub fn connect(
        api: Arc<dyn BoardApi>,
        credentials: CredentialFile,
        debounce: Duration,
    ) -> Result<Self, SyncError> {
        let stored = match credentials.load() {
            Ok(Some(stored)) => stored,
            Ok(None) => return Err(SyncError::NotLoggedIn),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable session file");
                return Err(SyncError::NotLoggedIn);
            }
        };
        let Credentials { token, username } = stored;
        Ok(Self {
            store: None,
            mode: InteractionMode::NoInteraction,
            search: String::new(),
            username,
            credentials,
            agent: SyncAgent::spawn(api, token, debounce),
        })
    }

    /// Connect and load in one step.
    pub async fn open(
        api: Arc<dyn BoardApi>,
        credentials: CredentialFile,
        debounce: Duration,
    ) -> Result<Self, SyncError> {
        let mut session = Self::connect(api, credentials, debounce)?;
        session.load().await?;
        Ok(session)
    }

    /// Fetch the board. A rejected credential logs the session out; any
    /// other failure leaves the board unset with status `error`.
    pub async fn load(&mut self) -> Result<(), SyncError> {
        match self.agent.load().await {
            Ok(board) => {
                self.store = Some(BoardStore::new(board));
                Ok(())
            }
            Err(SyncError::LoggedOut) => {
                self.force_logout();
                Err(SyncError::LoggedOut)
            }
            Err(e) => {
                self.store = None;
                Err(e)
            }
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn store(&self) -> Option<&BoardStore> {
        self.store.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.store.is_some()
    }

    pub fn status(&self) -> SaveStatus {
        self.agent.status()
    }

    pub fn mode(&self) -> &InteractionMode {
        &self.mode
    }

    // ── Search ────────────────────────────────────────────────────────

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, query: &str) {
        self.search = query.to_string();
    }

    /// Drag-style reordering is disabled while a filter is showing a
    /// partial view of the columns.
    pub fn is_filtering(&self) -> bool {
        !self.search.is_empty()
    }

    /// Items of `column` that pass the current search filter.
    pub fn visible_items(&self, column: &ColumnId) -> Vec<&Item> {
        self.store
            .as_ref()
            .map(|store| store.filtered_items(column, &self.search))
            .unwrap_or_default()
    }

    // ── Mutations ─────────────────────────────────────────────────────

    pub fn reorder_columns(&mut self, from: usize, to: usize) -> bool {
        if self.is_filtering() {
            return false;
        }
        self.mutate(|store| store.reorder_columns(from, to))
            .unwrap_or(false)
    }

    pub fn move_item(
        &mut self,
        source: &ColumnId,
        source_index: usize,
        dest: &ColumnId,
        dest_index: usize,
    ) -> bool {
        if self.is_filtering() {
            return false;
        }
        self.mutate(|store| store.move_item(source, source_index, dest, dest_index))
            .unwrap_or(false)
    }

    pub fn add_column(&mut self, title: &str) -> Option<ColumnId> {
        self.mutate(|store| store.add_column(title)).flatten()
    }

    pub fn rename_column(&mut self, id: &ColumnId, title: &str) -> bool {
        self.mutate(|store| store.rename_column(id, title))
            .unwrap_or(false)
    }

    pub fn delete_column(&mut self, id: &ColumnId) -> bool {
        let held: Vec<ItemId> = self
            .store
            .as_ref()
            .and_then(|store| store.column(id))
            .map(|column| column.items.iter().map(|item| item.id.clone()).collect())
            .unwrap_or_default();
        let deleted = self
            .mutate(|store| store.delete_column(id))
            .unwrap_or(false);
        if deleted {
            let stale = match &self.mode {
                InteractionMode::AddingCard(c) | InteractionMode::EditingColumn(c) => c == id,
                InteractionMode::EditingItem(item) => held.contains(item),
                _ => false,
            };
            if stale {
                self.mode = InteractionMode::NoInteraction;
            }
        }
        deleted
    }

    pub fn add_item(&mut self, column: &ColumnId, title: &str) -> Option<ItemId> {
        self.mutate(|store| store.add_item(column, title)).flatten()
    }

    pub fn update_item(&mut self, item: Item) -> bool {
        self.mutate(|store| store.update_item(item)).unwrap_or(false)
    }

    pub fn delete_item(&mut self, id: &ItemId) -> bool {
        let deleted = self.mutate(|store| store.delete_item(id)).unwrap_or(false);
        if deleted && self.mode == InteractionMode::EditingItem(id.clone()) {
            self.mode = InteractionMode::NoInteraction;
        }
        deleted
    }

    pub fn toggle_item_status(&mut self, id: &ItemId) -> bool {
        self.mutate(|store| store.toggle_item_status(id))
            .unwrap_or(false)
    }

    /// Run `f` against the store and notify the agent if the version moved.
    /// `None` when there is no board to mutate.
    fn mutate<R>(&mut self, f: impl FnOnce(&mut BoardStore) -> R) -> Option<R> {
        if self.agent.auth_expired() {
            self.force_logout();
        }
        let store = self.store.as_mut()?;
        let before = store.version();
        let result = f(store);
        if store.version() != before {
            if let Err(e) = self.agent.notify_changed(store.board().clone()) {
                tracing::error!(error = %e, "change not scheduled for saving");
            }
        }
        Some(result)
    }

    // ── Interaction modes ─────────────────────────────────────────────

    pub fn begin_add_column(&mut self) {
        self.mode = InteractionMode::AddingColumn;
    }

    /// Adding cards is only offered when no filter is active.
    pub fn begin_add_card(&mut self, column: &ColumnId) -> bool {
        if self.is_filtering() || !self.has_column(column) {
            return false;
        }
        self.mode = InteractionMode::AddingCard(column.clone());
        true
    }

    pub fn begin_edit_column(&mut self, column: &ColumnId) -> bool {
        if !self.has_column(column) {
            return false;
        }
        self.mode = InteractionMode::EditingColumn(column.clone());
        true
    }

    pub fn begin_edit_item(&mut self, id: &ItemId) -> bool {
        let known = self
            .store
            .as_ref()
            .is_some_and(|store| store.find_item(id).is_some());
        if !known {
            return false;
        }
        self.mode = InteractionMode::EditingItem(id.clone());
        true
    }

    pub fn cancel_interaction(&mut self) {
        self.mode = InteractionMode::NoInteraction;
    }

    /// Submit typed text for the current column or card mode. A blank entry
    /// cancels. Adding a card keeps the mode open for the next card.
    pub fn commit_text(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            self.mode = InteractionMode::NoInteraction;
            return false;
        }
        match self.mode.clone() {
            InteractionMode::AddingColumn => {
                self.mode = InteractionMode::NoInteraction;
                self.add_column(text).is_some()
            }
            InteractionMode::AddingCard(column) => self.add_item(&column, text).is_some(),
            InteractionMode::EditingColumn(column) => {
                self.mode = InteractionMode::NoInteraction;
                self.rename_column(&column, text)
            }
            InteractionMode::EditingItem(_) | InteractionMode::NoInteraction => false,
        }
    }

    /// Save the edited copy of the card being edited.
    pub fn commit_item_edit(&mut self, item: Item) -> bool {
        if self.mode != InteractionMode::EditingItem(item.id.clone()) {
            return false;
        }
        self.mode = InteractionMode::NoInteraction;
        self.update_item(item)
    }

    fn has_column(&self, column: &ColumnId) -> bool {
        self.store
            .as_ref()
            .is_some_and(|store| store.column(column).is_some())
    }

    // ── Persistence ───────────────────────────────────────────────────

    /// Push any pending change now. A credential rejected by the save
    /// logs the session out.
    pub async fn flush(&mut self) -> Result<SaveStatus, SyncError> {
        let status = self.agent.flush().await?;
        if self.agent.auth_expired() {
            self.force_logout();
            return Err(SyncError::LoggedOut);
        }
        Ok(status)
    }

    /// Clear the stored credential and the local board.
    pub fn logout(&mut self) {
        self.force_logout();
    }

    fn force_logout(&mut self) {
        if let Err(e) = self.credentials.clear() {
            tracing::warn!(error = %e, "failed to remove session file");
        }
        if self.store.is_some() {
            tracing::info!(username = %self.username, "logged out");
        }
        self.store = None;
        self.mode = InteractionMode::NoInteraction;
        self.search.clear();
    }

    pub async fn close(self) {
        self.agent.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::super::sync::testing::{FakeApi, forbidden, server_error};
    use super::*;
    use quickboard_common::{Board, Status};

    const WINDOW: Duration = Duration::from_millis(1000);

    struct Fixture {
        _dir: tempfile::TempDir,
        file: CredentialFile,
    }

    fn signed_in() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let file = CredentialFile::new(dir.path().join("session.json"));
        file.save(&Credentials {
            token: "tok".into(),
            username: "alice".into(),
        })
        .unwrap();
        Fixture { _dir: dir, file }
    }

    async fn open(api: Arc<FakeApi>, fx: &Fixture) -> BoardSession {
        BoardSession::open(api, fx.file.clone(), WINDOW).await.unwrap()
    }

    fn col(id: &str) -> ColumnId {
        ColumnId::from(id)
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_without_credential() {
        let dir = tempfile::tempdir().unwrap();
        let file = CredentialFile::new(dir.path().join("missing.json"));
        let result = BoardSession::connect(FakeApi::with_board(Board::seed()), file, WINDOW);
        assert!(matches!(result, Err(SyncError::NotLoggedIn)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_loads_board() {
        let fx = signed_in();
        let session = open(FakeApi::with_board(Board::seed()), &fx).await;
        assert_eq!(session.username(), "alice");
        assert_eq!(session.store().unwrap().board(), &Board::seed());
        assert_eq!(session.status(), SaveStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_load_clears_credential_and_board() {
        let fx = signed_in();
        let api = FakeApi::with_board(Board::seed());
        *api.load_error.lock().unwrap() = Some(forbidden);
        let mut session = BoardSession::connect(api, fx.file.clone(), WINDOW).unwrap();

        assert!(matches!(session.load().await, Err(SyncError::LoggedOut)));
        assert!(!session.is_loaded());
        assert_eq!(fx.file.load().unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_load_leaves_board_unset() {
        let fx = signed_in();
        let api = FakeApi::with_board(Board::seed());
        *api.load_error.lock().unwrap() = Some(server_error);
        let mut session = BoardSession::connect(api, fx.file.clone(), WINDOW).unwrap();

        assert!(matches!(session.load().await, Err(SyncError::Client(_))));
        assert!(!session.is_loaded());
        assert_eq!(session.status(), SaveStatus::Error);
        assert!(fx.file.load().unwrap().is_some(), "credential kept");
        assert!(session.add_column("x").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutation_schedules_save() {
        let fx = signed_in();
        let api = FakeApi::with_board(Board::seed());
        let mut session = open(api.clone(), &fx).await;

        let id = session.add_item(&col("col-1"), "Write report").unwrap();
        assert_eq!(session.flush().await.unwrap(), SaveStatus::Saved);

        let saves = api.saves();
        assert_eq!(saves.len(), 1);
        assert!(saves[0].1.columns[&col("col-1")]
            .items
            .iter()
            .any(|item| item.id == id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_mutation_does_not_schedule_save() {
        let fx = signed_in();
        let api = FakeApi::with_board(Board::seed());
        let mut session = open(api.clone(), &fx).await;

        assert!(session.add_column("   ").is_none());
        assert!(!session.reorder_columns(1, 1));
        assert!(!session.delete_item(&ItemId::from("nope")));
        assert_eq!(session.flush().await.unwrap(), SaveStatus::Idle);
        assert!(api.saves().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_moving_last_card_to_end_of_own_column_does_not_save() {
        let fx = signed_in();
        let mut board = Board::seed();
        board
            .columns
            .get_mut(&col("col-1"))
            .unwrap()
            .items
            .push(Item::new("only"));
        let api = FakeApi::with_board(board);
        let mut session = open(api.clone(), &fx).await;

        assert!(!session.move_item(&col("col-1"), 0, &col("col-1"), 1));
        assert_eq!(session.flush().await.unwrap(), SaveStatus::Idle);
        assert!(api.saves().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_blocks_reordering() {
        let fx = signed_in();
        let mut session = open(FakeApi::with_board(Board::seed()), &fx).await;
        session.add_item(&col("col-1"), "alpha").unwrap();
        session.add_item(&col("col-1"), "beta").unwrap();

        session.set_search("alp");
        assert!(session.is_filtering());
        assert!(!session.reorder_columns(0, 2));
        assert!(!session.move_item(&col("col-1"), 0, &col("col-2"), 0));
        assert!(!session.begin_add_card(&col("col-1")));
        let visible: Vec<_> = session
            .visible_items(&col("col-1"))
            .iter()
            .map(|item| item.title.clone())
            .collect();
        assert_eq!(visible, vec!["alpha"]);

        session.set_search("");
        assert!(session.reorder_columns(0, 2));
        assert!(session.move_item(&col("col-1"), 0, &col("col-2"), 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_column_mode() {
        let fx = signed_in();
        let mut session = open(FakeApi::with_board(Board::seed()), &fx).await;

        session.begin_add_column();
        assert_eq!(session.mode(), &InteractionMode::AddingColumn);
        assert!(session.commit_text("Backlog"));
        assert_eq!(session.mode(), &InteractionMode::NoInteraction);
        assert_eq!(session.store().unwrap().board().column_order.len(), 4);

        session.begin_add_column();
        assert!(!session.commit_text("  "));
        assert_eq!(session.mode(), &InteractionMode::NoInteraction);
        assert_eq!(session.store().unwrap().board().column_order.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_card_mode_stays_open() {
        let fx = signed_in();
        let mut session = open(FakeApi::with_board(Board::seed()), &fx).await;

        assert!(!session.begin_add_card(&col("missing")));
        assert!(session.begin_add_card(&col("col-2")));
        assert!(session.commit_text("one"));
        assert!(session.commit_text("two"));
        assert_eq!(session.mode(), &InteractionMode::AddingCard(col("col-2")));
        assert_eq!(session.store().unwrap().column(&col("col-2")).unwrap().items.len(), 2);

        session.cancel_interaction();
        assert_eq!(session.mode(), &InteractionMode::NoInteraction);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_column_mode() {
        let fx = signed_in();
        let mut session = open(FakeApi::with_board(Board::seed()), &fx).await;

        assert!(session.begin_edit_column(&col("col-3")));
        assert!(session.commit_text("Shipped"));
        assert_eq!(session.mode(), &InteractionMode::NoInteraction);
        assert_eq!(session.store().unwrap().column(&col("col-3")).unwrap().title, "Shipped");
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_item_mode() {
        let fx = signed_in();
        let mut session = open(FakeApi::with_board(Board::seed()), &fx).await;
        let id = session.add_item(&col("col-1"), "draft").unwrap();

        assert!(session.begin_edit_item(&id));
        assert!(!session.commit_text("ignored"));
        let mut edited = session.store().unwrap().find_item(&id).unwrap().1.clone();
        edited.content = "notes".into();
        edited.status = Status::InProgress;
        assert!(session.commit_item_edit(edited));
        assert_eq!(session.mode(), &InteractionMode::NoInteraction);

        let (_, item) = session.store().unwrap().find_item(&id).unwrap();
        assert_eq!(item.content, "notes");
        assert_eq!(item.status, Status::InProgress);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleting_target_resets_mode() {
        let fx = signed_in();
        let mut session = open(FakeApi::with_board(Board::seed()), &fx).await;
        let id = session.add_item(&col("col-1"), "doomed").unwrap();

        assert!(session.begin_edit_item(&id));
        assert!(session.delete_column(&col("col-1")));
        assert_eq!(session.mode(), &InteractionMode::NoInteraction);

        let other = session.add_item(&col("col-2"), "also doomed").unwrap();
        assert!(session.begin_edit_item(&other));
        assert!(session.delete_item(&other));
        assert_eq!(session.mode(), &InteractionMode::NoInteraction);

        assert!(session.begin_add_card(&col("col-3")));
        assert!(session.delete_column(&col("col-2")));
        assert_eq!(session.mode(), &InteractionMode::AddingCard(col("col-3")));
        assert!(session.delete_column(&col("col-3")));
        assert_eq!(session.mode(), &InteractionMode::NoInteraction);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_save_forces_logout() {
        let fx = signed_in();
        let api = FakeApi::with_board(Board::seed());
        api.fail_saves_with(Some(forbidden));
        let mut session = open(api, &fx).await;

        session.add_column("Later").unwrap();
        assert!(matches!(session.flush().await, Err(SyncError::LoggedOut)));
        assert!(!session.is_loaded());
        assert_eq!(fx.file.load().unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_clears_state() {
        let fx = signed_in();
        let mut session = open(FakeApi::with_board(Board::seed()), &fx).await;
        session.set_search("x");
        session.begin_add_column();

        session.logout();
        assert!(!session.is_loaded());
        assert_eq!(session.search(), "");
        assert_eq!(session.mode(), &InteractionMode::NoInteraction);
        assert_eq!(fx.file.load().unwrap(), None);
        session.close().await;
    }
}
