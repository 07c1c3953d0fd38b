//! Hierarchical undo/redo command history.
//!
//! Operations register themselves as reversible commands on a [`History`]
//! engine. Each recorded command owns a nested context, so a composite
//! operation's sub-steps land on the composite's own sub-stack and replay
//! depth-first: undoing the composite undoes its steps in reverse order,
//! redoing re-applies them in original order.
//!
//! A command function pushes itself before mutating, and holds the returned
//! scope for the duration of its body; its undo counterpart opens an undo
//! scope instead. State a command computes forward and needs again at undo
//! time travels through the per-record save/load channel.
//!
//! ```
//! use rewind::History;
//!
//! fn add(items: &mut Vec<i32>, h: &mut History<Vec<i32>>, value: i32) -> bool {
//!     let _scope = h.push(
//!         "add",
//!         move |t, h| add(t, h, value),
//!         move |t, h| add_undo(t, h, value),
//!     );
//!     items.push(value);
//!     true
//! }
//!
//! fn add_undo(items: &mut Vec<i32>, h: &mut History<Vec<i32>>, _value: i32) -> bool {
//!     let _scope = h.undo_scope();
//!     items.pop();
//!     true
//! }
//!
//! let mut items = Vec::new();
//! let mut history = History::new();
//!
//! add(&mut items, &mut history, 7);
//! assert_eq!(items, vec![7]);
//!
//! history.undo(&mut items);
//! assert!(items.is_empty());
//!
//! history.redo(&mut items);
//! assert_eq!(items, vec![7]);
//! ```
//!
//! The engine is single-threaded by design: one active context, redirected
//! by scopes while command bodies run. It never persists or serializes
//! history; records live and die with their engine.

mod arena;
mod context;
mod history;
mod options;
mod record;
mod scope;
mod store;

pub use arena::{Arena, Handle};
pub use context::ContextId;
pub use history::History;
pub use options::HistoryOptions;
pub use record::{CommandRecord, OpFn};
pub use scope::{CommandScope, UndoScope};
pub use store::DataStore;
