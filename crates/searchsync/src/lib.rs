//! # searchsync - MySQL binlog to search index CDC bridge
//!
//! Tails a MySQL replication stream and projects committed row mutations
//! into a full-text search index in near real-time. Inserts and updates
//! become document upserts, deletes become field clears, and the engine
//! durably checkpoints its binlog position so a restart resumes without loss
//! (at-least-once delivery; the sink's idempotent upsert absorbs replays).
//!
//! ## Architecture
//!
//! ```text
//! binlog callbacks          sync channel            collaborators
//! ┌──────────────┐   ┌───────────────────────┐   ┌────────────────┐
//! │ EventHandler │──▶│ SyncItem (documents / │──▶│   SearchSink   │
//! │ row/xid/     │   │ position saves)       │   ├────────────────┤
//! │ rotate/ddl   │   │        SyncLoop       │──▶│ PositionStore  │
//! └──────────────┘   └───────────────────────┘   └────────────────┘
//! ```
//!
//! The handler runs on the replication client's dispatch and only transforms
//! and enqueues. The loop is the single consumer: it batches documents up to
//! the bulk threshold, flushes on a periodic tick, and saves positions under
//! a debounce, always flushing documents before persisting the position that
//! bounds them. A shared cancellation token threads through everything; any
//! fatal error cancels it and the engine winds down.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use searchsync::{
//!     EventHandler, MemoryPositionStore, MemorySink, Rule, SyncConfig, SyncLoop,
//! };
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let rule = Rule::new("shop", "products");
//! let mut rules = HashMap::new();
//! rules.insert(rule.key(), rule);
//!
//! let (tx, rx) = mpsc::unbounded_channel();
//! let cancel = CancellationToken::new();
//!
//! let handler = EventHandler::new(Arc::new(rules), tx, cancel.clone());
//! let sync = SyncLoop::new(
//!     SyncConfig::default(),
//!     rx,
//!     Arc::new(MemorySink::new()),
//!     Arc::new(MemoryPositionStore::new()),
//!     cancel.clone(),
//! );
//! tokio::spawn(sync.run());
//! // hand `handler` to the replication client's callbacks
//! # let _ = handler;
//! # }
//! ```

pub mod coerce;
pub mod config;
pub mod document;
pub mod error;
pub mod event;
pub mod handler;
pub mod position;
pub mod rule;
pub mod schema;
pub mod sink;
pub mod sync;
pub mod transform;

pub use coerce::coerce_column;
pub use config::{SyncConfig, SyncConfigBuilder};
pub use document::Document;
pub use error::{Result, SyncError};
pub use event::{RowAction, RowsEvent};
pub use handler::EventHandler;
pub use position::{FilePositionStore, MemoryPositionStore, Position, PositionStore};
pub use rule::{rule_key, Rule};
pub use schema::{ColumnType, RawValue, TableColumn, TableInfo};
pub use sink::{IndexingOptions, MemorySink, SearchSink};
pub use sync::{SyncItem, SyncLoop, SyncStats, SyncStatsSnapshot};
pub use transform::{
    build_delete, build_insert, build_update, doc_id, parent_id, parse_mapping, FieldKind,
    FieldMapping,
};
