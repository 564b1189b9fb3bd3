//! Client half of Quickboard.
//!
//! ```text
//!  CLI command ──> session.rs (BoardSession: store, mode, search)
//!                     │ mutation (version changed)
//!                     v
//!                  sync.rs (SyncAgent: debounce, one save in flight)
//!                     │
//!                     v
//!                  api.rs (BoardApi / HttpBoardClient) ──HTTP──> service
//! ```
//!
//! `credentials.rs` keeps the token between invocations.

pub mod api;
pub mod credentials;
pub mod session;
pub mod sync;

pub use api::{BoardApi, HttpBoardClient};
pub use credentials::{CredentialFile, Credentials};
pub use session::{BoardSession, InteractionMode};
pub use sync::{SaveStatus, SyncAgent};
