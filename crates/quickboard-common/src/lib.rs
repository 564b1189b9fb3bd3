//! Shared domain types for Quickboard.
//!
//! `model` holds the board document exactly as it travels over the wire;
//! `protocol` holds the auth and error bodies around it;
//! `store` holds the client-side mutation engine that keeps it consistent.

pub mod model;
pub mod protocol;
pub mod store;

pub use model::{Board, Column, ColumnId, Item, ItemId, Status, Tag};
pub use store::BoardStore;
