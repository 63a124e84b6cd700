//! # Chatterbox application crate
//!
//! Wires the pure engine in `chatterbox-core` to the outside world:
//! TOML configuration, SQLite persistence, background maintenance
//! tasks, and the `chatterbox` CLI with its stdin/stdout event loop.
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | `config` | TOML configuration with defaults and validation |
//! | `db` | SQLite connection pool (WAL mode) |
//! | `migrate` | Idempotent schema migrations |
//! | `sqlite_store` | [`ChatStore`] implementation over SQLite |
//! | `registry` | In-memory map of live chat states |
//! | `service` | Message handling, admin actions, persistence orchestration |
//! | `oracle` | Admin permission checks |
//! | `tasks` | Autosave and mood-cycle background loops |
//! | `export` / `import` | Corpus export and import commands |
//! | `stats` | Chat statistics command |
//!
//! [`ChatStore`]: chatterbox_core::ChatStore

pub mod config;
pub mod db;
pub mod export;
pub mod import;
pub mod migrate;
pub mod oracle;
pub mod registry;
pub mod service;
pub mod sqlite_store;
pub mod stats;
pub mod tasks;
