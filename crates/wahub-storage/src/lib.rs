// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Wahub gateway.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, typed CRUD operations for
//! instances, messages, webhooks, delivery history, and instance logs, and
//! the retention sweep.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod retention;

pub use database::{now_iso, Database};
pub use models::*;
