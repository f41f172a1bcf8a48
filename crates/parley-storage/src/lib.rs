// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Parley conversation history.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single
//! serialized connection via `tokio-rusqlite`, and the append-only turn log
//! behind [`parley_core::HistoryStore`]. Turn content can optionally be
//! sealed with AES-256-GCM before it reaches disk.

pub mod adapter;
pub mod cipher;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteHistory;
pub use cipher::ContentCipher;
pub use database::{Database, OpenOptions};
