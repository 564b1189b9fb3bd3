//! The server half of Quickboard.
//!
//! ## Overview
//!
//! Each user owns exactly one board, stored as an opaque JSON document. The
//! service loads it (seeding the default board on first access) and replaces
//! it wholesale on save. Identity comes from a bearer token issued at login.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, ServerConfig)      │
//! │ (sync    │ <─────── │    └─ api.rs  (handlers, AuthUser, AppState) │
//! │  agent)  │          │         │                                    │
//! └──────────┘          │         ├─ auth.rs  (PBKDF2, signed tokens)   │
//!                       │         └─ db.rs    (SQLite via DbHandle)     │
//!                       └──────────────────────────────────────────────┘
//! ```
//!
//! ## Routes
//!
//! | Route                 | Auth   | Behaviour                                  |
//! |-----------------------|--------|--------------------------------------------|
//! | `POST /api/register`  | none   | create user, 400 if taken                  |
//! | `POST /api/login`     | none   | `{token, username}`, 400 on bad password   |
//! | `GET /api/board`      | bearer | stored board, or seed it first             |
//! | `POST /api/board`     | bearer | overwrite stored board (last write wins)   |
//! | `GET /health`         | none   | `ok`                                       |
//!
//! A missing token is a 401; a token that fails verification is a 403.

pub mod api;
pub mod auth;
pub mod db;
pub mod models;
pub mod server;
