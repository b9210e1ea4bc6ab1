//! Replication event handler
//!
//! Receives the replication client's callbacks and turns them into work
//! items on the sync channel. Callbacks run on the client's dispatch, so
//! they stay synchronous and cheap; the sync loop does the heavy lifting.
//!
//! Every callback reports the cancellation state back to the caller, which
//! is how the replication client learns the engine has shut down.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::error::{Result, SyncError};
use crate::event::{RowAction, RowsEvent};
use crate::position::Position;
use crate::rule::{rule_key, Rule};
use crate::sync::SyncItem;

/// Bridges replication callbacks onto the sync channel.
pub struct EventHandler {
    rules: Arc<HashMap<String, Rule>>,
    tx: mpsc::UnboundedSender<SyncItem>,
    cancel: CancellationToken,
}

impl EventHandler {
    pub fn new(
        rules: Arc<HashMap<String, Rule>>,
        tx: mpsc::UnboundedSender<SyncItem>,
        cancel: CancellationToken,
    ) -> Self {
        Self { rules, tx, cancel }
    }

    /// Row event. Events for tables without a rule are dropped silently;
    /// builder failures cancel the engine.
    pub fn on_row(&self, event: &RowsEvent) -> Result<()> {
        let key = rule_key(&event.table.schema, &event.table.name);
        let Some(rule) = self.rules.get(&key) else {
            return Ok(());
        };

        let built = match event.action {
            RowAction::Insert => crate::transform::build_insert(rule, &event.rows),
            RowAction::Delete => crate::transform::build_delete(rule, &event.rows),
            RowAction::Update => crate::transform::build_update(rule, &event.rows),
            other => Err(SyncError::transform(format!("invalid rows action {}", other))),
        };

        let docs = match built {
            Ok(docs) => docs,
            Err(e) => {
                error!("make {} request failed: {}, close sync", event.action, e);
                self.cancel.cancel();
                return Err(e);
            }
        };

        let _ = self.tx.send(SyncItem::Documents(docs));
        self.state()
    }

    /// Transaction commit: a debounced position save.
    pub fn on_xid(&self, position: Position) -> Result<()> {
        let _ = self.tx.send(SyncItem::PositionSave {
            position,
            force: false,
        });
        self.state()
    }

    /// Log rotation: forces an immediate flush and save.
    pub fn on_rotate(&self, position: Position) -> Result<()> {
        let _ = self.tx.send(SyncItem::PositionSave {
            position,
            force: true,
        });
        self.state()
    }

    /// DDL statement. Schema refresh belongs to the replication client; the
    /// engine only checkpoints past the statement.
    pub fn on_ddl(&self, position: Position) -> Result<()> {
        let _ = self.tx.send(SyncItem::PositionSave {
            position,
            force: true,
        });
        self.state()
    }

    fn state(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(SyncError::Canceled)
        } else {
            Ok(())
        }
    }
}
