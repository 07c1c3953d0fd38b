//! One undoable unit of work
//!
//! A record is created when a command registers itself, before its mutation
//! runs. The do/undo closures carry the command's captured parameters (each
//! closure owns its own copies, taken at registration). The record also owns
//! the nested context that sub-commands triggered by its body land in, and a
//! private data store bridging its forward execution to its undo.

use crate::context::{Context, ContextId};
use crate::history::History;
use crate::store::DataStore;

/// A reversible operation over its captured parameters. Receives the
/// application state and the engine handle, and reports logical success.
pub type OpFn<T> = Box<dyn FnMut(&mut T, &mut History<T>) -> bool>;

pub struct CommandRecord<T> {
    seq: u64,
    label: String,
    pub(crate) redo_op: Option<OpFn<T>>,
    pub(crate) undo_op: Option<OpFn<T>>,
    pub(crate) data: DataStore,
    pub(crate) subcontext: Context,
    /// Context whose stack holds this record.
    pub(crate) owner: ContextId,
}

impl<T> CommandRecord<T> {
    pub(crate) fn new(
        seq: u64,
        label: &str,
        owner: ContextId,
        redo_op: OpFn<T>,
        undo_op: OpFn<T>,
    ) -> Self {
        Self {
            seq,
            label: label.to_string(),
            redo_op: Some(redo_op),
            undo_op: Some(undo_op),
            data: DataStore::new(),
            subcontext: Context::new(),
            owner,
        }
    }

    /// Human-readable label, used for diagnostics and [`History::dump`].
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Engine-unique, monotonically increasing id.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}
