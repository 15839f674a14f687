// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence layer for Bagwatch: registered users and which listings each
//! user has an outstanding notification for.
//!
//! The SQLite backend runs in WAL mode with embedded migrations and a
//! single-writer model via `tokio-rusqlite`. An in-memory backend is
//! available for tests and throwaway deployments.

pub mod adapter;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use memory::MemoryStorage;
