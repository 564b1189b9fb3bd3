//! Debounced board persistence.
//!
//! `SyncAgent` owns a background task that receives every board mutation
//! over a channel, waits for a quiet period after the most recent one, then
//! sends the latest board to the service. A mutation inside the window
//! pushes the deadline back instead of queuing a second save. The worker
//! awaits the in-flight save before starting another, so at most one save
//! request is ever outstanding.
//!
//! ```text
//!   idle ──mutation──> saving ──ok──> saved
//!                        ^  └─fail──> error
//!                        └──mutation──┘
//! ```
//!
//! A failed save is not retried on its own; the next mutation re-triggers it.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use quickboard_common::Board;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::api::BoardApi;
use crate::errors::{ClientError, SyncError};

/// Default quiet period between the last edit and the save.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    /// No board loaded, or nothing changed since load.
    Idle,
    /// A save is scheduled or in flight.
    Saving,
    /// The last save succeeded.
    Saved,
    /// The last save failed; the next mutation retries.
    Error,
}

impl SaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Saving => "saving",
            Self::Saved => "saved",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

enum SyncCommand {
    Changed(Board),
    Flush(oneshot::Sender<SaveStatus>),
    Shutdown,
}

type SaveFuture = Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send>>;

pub struct SyncAgent {
    api: Arc<dyn BoardApi>,
    token: String,
    cmd_tx: mpsc::UnboundedSender<SyncCommand>,
    status_tx: Arc<watch::Sender<SaveStatus>>,
    auth_tx: Arc<watch::Sender<bool>>,
    join_handle: JoinHandle<()>,
}

impl SyncAgent {
    /// Spawn the save worker for one authenticated session.
    pub fn spawn(api: Arc<dyn BoardApi>, token: String, debounce: Duration) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = watch::channel(SaveStatus::Idle);
        let (auth_tx, _) = watch::channel(false);
        let status_tx = Arc::new(status_tx);
        let auth_tx = Arc::new(auth_tx);

        let worker = SaveWorker {
            api: api.clone(),
            token: token.clone(),
            debounce,
            status_tx: status_tx.clone(),
            auth_tx: auth_tx.clone(),
        };
        let join_handle = tokio::spawn(worker.run(cmd_rx));

        Self {
            api,
            token,
            cmd_tx,
            status_tx,
            auth_tx,
            join_handle,
        }
    }

    /// Initial load. A rejected credential becomes `SyncError::LoggedOut`;
    /// any other failure marks the status `error` and leaves the caller
    /// without a board.
    pub async fn load(&self) -> Result<Board, SyncError> {
        match self.api.load_board(&self.token).await {
            Ok(board) => {
                if let Err(e) = board.validate() {
                    tracing::warn!(error = %e, "loaded board is inconsistent");
                }
                tracing::info!(columns = board.column_order.len(), "board loaded");
                Ok(board)
            }
            Err(e) if e.is_auth_failure() => {
                tracing::warn!(error = %e, "credential rejected on load");
                self.auth_tx.send_replace(true);
                Err(SyncError::LoggedOut)
            }
            Err(e) => {
                tracing::error!(error = %e, "board load failed");
                self.status_tx.send_replace(SaveStatus::Error);
                Err(e.into())
            }
        }
    }

    /// Report a mutation. The agent keeps only the latest board.
    pub fn notify_changed(&self, board: Board) -> Result<(), SyncError> {
        self.cmd_tx
            .send(SyncCommand::Changed(board))
            .map_err(|_| SyncError::AgentStopped)
    }

    /// Save any pending change now and wait for the outcome.
    pub async fn flush(&self) -> Result<SaveStatus, SyncError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.cmd_tx
            .send(SyncCommand::Flush(ack_tx))
            .map_err(|_| SyncError::AgentStopped)?;
        ack_rx.await.map_err(|_| SyncError::AgentStopped)
    }

    pub fn status(&self) -> SaveStatus {
        *self.status_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status_tx.subscribe()
    }

    /// True once the service has rejected this session's credential.
    pub fn auth_expired(&self) -> bool {
        *self.auth_tx.borrow()
    }

    /// Stop the worker. A save already on the wire runs to completion; a
    /// pending (not yet started) save is dropped.
    pub async fn shutdown(self) {
        let _ = self.cmd_tx.send(SyncCommand::Shutdown);
        let _ = self.join_handle.await;
    }
}

struct SaveWorker {
    api: Arc<dyn BoardApi>,
    token: String,
    debounce: Duration,
    status_tx: Arc<watch::Sender<SaveStatus>>,
    auth_tx: Arc<watch::Sender<bool>>,
}

impl SaveWorker {
    async fn run(self, mut cmd_rx: mpsc::UnboundedReceiver<SyncCommand>) {
        let mut pending: Option<Board> = None;
        let mut deadline: Option<Instant> = None;
        let mut in_flight: Option<SaveFuture> = None;
        let mut waiters: Vec<oneshot::Sender<SaveStatus>> = Vec::new();

        loop {
            let sleep_target = deadline.unwrap_or_else(Instant::now);
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(SyncCommand::Changed(board)) => {
                        pending = Some(board);
                        deadline = Some(Instant::now() + self.debounce);
                        self.set_status(SaveStatus::Saving);
                    }
                    Some(SyncCommand::Flush(ack)) => {
                        if pending.is_none() && in_flight.is_none() {
                            let _ = ack.send(*self.status_tx.borrow());
                        } else {
                            if pending.is_some() {
                                deadline = Some(Instant::now());
                            }
                            waiters.push(ack);
                        }
                    }
                    Some(SyncCommand::Shutdown) | None => break,
                },

                _ = tokio::time::sleep_until(sleep_target),
                    if deadline.is_some() && in_flight.is_none() =>
                {
                    deadline = None;
                    if let Some(board) = pending.take() {
                        in_flight = Some(self.start_save(board));
                    }
                }

                result = poll_in_flight(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    self.finish_save(result, pending.is_some());
                    if pending.is_none() {
                        let status = *self.status_tx.borrow();
                        for waiter in waiters.drain(..) {
                            let _ = waiter.send(status);
                        }
                    }
                }
            }
        }

        if pending.take().is_some() {
            tracing::debug!("dropping unsaved change on shutdown");
        }
        if let Some(save) = in_flight.take() {
            let result = save.await;
            self.finish_save(result, false);
        }
        let status = *self.status_tx.borrow();
        for waiter in waiters.drain(..) {
            let _ = waiter.send(status);
        }

        tracing::debug!("sync agent stopped");
    }

    fn start_save(&self, board: Board) -> SaveFuture {
        tracing::debug!(columns = board.column_order.len(), "saving board");
        let api = self.api.clone();
        let token = self.token.clone();
        Box::pin(async move { api.save_board(&token, &board).await })
    }

    fn finish_save(&self, result: Result<(), ClientError>, newer_pending: bool) {
        let outcome = match result {
            Ok(()) => {
                tracing::debug!("board saved");
                SaveStatus::Saved
            }
            Err(e) => {
                if e.is_auth_failure() {
                    tracing::warn!(error = %e, "credential rejected on save");
                    self.auth_tx.send_replace(true);
                } else {
                    tracing::error!(error = %e, "board save failed");
                }
                SaveStatus::Error
            }
        };
        // A newer change is already scheduled; stay in `saving` until it lands.
        if !newer_pending {
            self.set_status(outcome);
        }
    }

    fn set_status(&self, status: SaveStatus) {
        self.status_tx.send_if_modified(|current| {
            let changed = *current != status;
            *current = status;
            changed
        });
    }
}

async fn poll_in_flight(in_flight: &mut Option<SaveFuture>) -> Result<(), ClientError> {
    match in_flight {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}
