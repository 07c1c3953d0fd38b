//! The command-history engine
//!
//! [`History`] owns every context and record of one undo tree: the root
//! stack, the arena all records live in, the active-context id that scoped
//! switches redirect, and the enable/disable kill-switch. It is generic over
//! the application state `T` the recorded operations mutate; the engine
//! never owns that state, it is passed into [`History::undo`] /
//! [`History::redo`] and threaded through to the stored closures.
//!
//! A command function registers itself first, then mutates:
//!
//! ```text
//! fn set_value(state, h, key, value) -> bool {
//!     let mut scope = h.push("set_value", <do closure>, <undo closure>);
//!     if let Some(old) = state.get(key) { scope.save("old", old); }
//!     state.set(key, value);
//!     true
//! }
//! ```
//!
//! and its undo opens [`History::undo_scope`] before reversing the mutation.
//! Nested command calls made through the scope land in the registered
//! record's own sub-stack, which is what makes a composite command's steps
//! individually replayable in order.

use std::any::Any;

use tracing::{debug, trace};

use crate::arena::{Arena, Handle};
use crate::context::{Context, ContextId};
use crate::options::HistoryOptions;
use crate::record::{CommandRecord, OpFn};
use crate::scope::{CommandScope, UndoScope};

pub struct History<T> {
    records: Arena<CommandRecord<T>>,
    root: Context,
    /// Context that new registrations land in. Scopes redirect this for the
    /// duration of a command body and restore it on exit.
    active: ContextId,
    enabled: bool,
    next_seq: u64,
    options: HistoryOptions,
}

impl<T> History<T> {
    pub fn new() -> Self {
        Self::with_options(HistoryOptions::default())
    }

    pub fn with_options(options: HistoryOptions) -> Self {
        Self {
            records: Arena::new(),
            root: Context::new(),
            active: ContextId::Root,
            enabled: true,
            next_seq: 0,
            options,
        }
    }

    // === Kill-switch ===

    /// Turn the engine off: pushes, undos, redos, saves and loads all become
    /// inert no-ops until [`History::enable`]. Command bodies still run their
    /// mutations, which is the point — bulk operations that should not be
    /// individually undoable execute under the switch.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // === Active context ===

    pub fn context(&self) -> ContextId {
        self.active
    }

    pub fn set_context(&mut self, context: ContextId) {
        self.active = context;
    }

    /// Parent of a context: the context holding the record that owns it.
    /// `None` for the root and for stale handles.
    pub fn parent_context(&self, context: ContextId) -> Option<ContextId> {
        match context {
            ContextId::Root => None,
            ContextId::Sub(handle) => self.records.get(handle).map(|r| r.owner),
        }
    }

    /// Nested context of the active context's present record.
    pub fn present_subcontext(&self) -> Option<ContextId> {
        if !self.enabled {
            return None;
        }
        let handle = self.lookup(self.active)?.present_handle()?;
        Some(ContextId::Sub(handle))
    }

    // === Replay flags ===

    /// True while this context or any ancestor is inside `undo`. A nested
    /// command must know it is being replayed even though only the topmost
    /// context set its flag.
    pub fn is_undoing(&self) -> bool {
        self.is_undoing_in(self.active)
    }

    pub fn is_redoing(&self) -> bool {
        self.is_redoing_in(self.active)
    }

    fn is_undoing_in(&self, mut context: ContextId) -> bool {
        loop {
            match self.lookup(context) {
                Some(ctx) if ctx.undoing => return true,
                Some(_) => {}
                None => return false,
            }
            match self.parent_context(context) {
                Some(parent) => context = parent,
                None => return false,
            }
        }
    }

    fn is_redoing_in(&self, mut context: ContextId) -> bool {
        loop {
            match self.lookup(context) {
                Some(ctx) if ctx.redoing => return true,
                Some(_) => {}
                None => return false,
            }
            match self.parent_context(context) {
                Some(parent) => context = parent,
                None => return false,
            }
        }
    }

    fn is_replaying_in(&self, context: ContextId) -> bool {
        self.is_undoing_in(context) || self.is_redoing_in(context)
    }

    // === Push / abort ===

    /// Register a command on the active context and enter its scope.
    ///
    /// The do closure is not called here — the command function's own body
    /// is the first execution; the closure only runs on redo. Registration
    /// silently does nothing while the engine is disabled or the active
    /// context is (transitively) undoing/redoing: a replayed body re-runs
    /// its sub-commands as a side effect and must not re-register them. The
    /// returned scope still redirects in the redo case so replayed nested
    /// calls resolve against the right sub-stack.
    pub fn push<D, U>(&mut self, label: &str, redo_op: D, undo_op: U) -> CommandScope<'_, T>
    where
        D: FnMut(&mut T, &mut History<T>) -> bool + 'static,
        U: FnMut(&mut T, &mut History<T>) -> bool + 'static,
    {
        if self.enabled && !self.is_replaying_in(self.active) {
            self.register(label, Box::new(redo_op), Box::new(undo_op));
        }
        CommandScope::enter(self)
    }

    fn register(&mut self, label: &str, redo_op: OpFn<T>, undo_op: OpFn<T>) {
        let context = self.active;

        // A forward edit invalidates anything previously undone: prune the
        // redo tail before appending.
        let tail = match self.lookup_mut(context) {
            Some(ctx) => ctx.entries.split_off(ctx.cursor),
            None => return,
        };
        if !tail.is_empty() {
            debug!(discarded = tail.len(), "pruning redo tail");
        }
        for handle in tail {
            self.free_record(handle);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        trace!(label = %label, seq, "recording command");

        let handle = self
            .records
            .insert(CommandRecord::new(seq, label, context, redo_op, undo_op));
        if let Some(ctx) = self.lookup_mut(context) {
            ctx.entries.push(handle);
            ctx.cursor += 1;
        }

        if context == ContextId::Root {
            self.enforce_cap();
        }
    }

    /// Drop the oldest root records while the stack exceeds the configured
    /// cap. Root only: nested replay is positional against its sub-stack.
    fn enforce_cap(&mut self) {
        let cap = self.options.max_records;
        if cap == 0 {
            return;
        }
        while self.root.entries.len() > cap && self.root.cursor > 0 {
            self.root.cursor -= 1;
            let evicted = self.root.entries.remove(0);
            debug!("evicting oldest record over capacity");
            self.free_record(evicted);
        }
    }

    /// Remove the most recently pushed record, restoring the pre-push
    /// state. Paired with [`CommandScope::abort`]; assumes the aborting
    /// push is the innermost, most recent one.
    pub(crate) fn abort_push(&mut self) {
        if !self.enabled {
            return;
        }
        if self.is_replaying_in(self.active) {
            return;
        }
        let context = self.active;
        let handle = match self.lookup_mut(context) {
            Some(ctx) if ctx.cursor > 0 && ctx.cursor == ctx.entries.len() => {
                ctx.cursor -= 1;
                ctx.entries.pop()
            }
            _ => None,
        };
        if let Some(handle) = handle {
            trace!("aborting push");
            self.free_record(handle);
        }
    }

    /// Free a record and, recursively, everything on its nested stack.
    fn free_record(&mut self, handle: Handle) {
        if let Some(record) = self.records.remove(handle) {
            for child in record.subcontext.entries {
                self.free_record(child);
            }
        }
    }

    // === Undo / Redo ===

    /// Undo the present command of the active context.
    ///
    /// Returns the undo operation's own result; `false` with no effect when
    /// there is nothing to undo, the engine is disabled, or this context is
    /// already replaying. The cursor retreats even when the operation
    /// reports logical failure.
    pub fn undo(&mut self, target: &mut T) -> bool {
        if !self.enabled {
            return false;
        }
        let context = self.active;
        let handle = match self.lookup(context) {
            Some(ctx) if ctx.cursor > 0 && !ctx.undoing && !ctx.redoing => {
                ctx.entries[ctx.cursor - 1]
            }
            _ => return false,
        };

        if let Some(ctx) = self.lookup_mut(context) {
            ctx.undoing = true;
        }
        debug!(cursor = self.cursor(), "undo");

        let mut op = self.records.get_mut(handle).and_then(|r| r.undo_op.take());
        let result = match op.as_mut() {
            Some(op) => op(target, self),
            None => false,
        };
        if let Some(op) = op {
            if let Some(record) = self.records.get_mut(handle) {
                record.undo_op = Some(op);
            }
        }

        if let Some(ctx) = self.lookup_mut(context) {
            ctx.cursor = ctx.cursor.saturating_sub(1);
            ctx.undoing = false;
            ctx.notify();
        }
        result
    }

    /// Re-apply the next command of the active context by invoking its
    /// stored do operation. Symmetric to [`History::undo`]: the cursor
    /// advances first, then the operation runs.
    pub fn redo(&mut self, target: &mut T) -> bool {
        if !self.enabled {
            return false;
        }
        let context = self.active;
        let handle = match self.lookup(context) {
            Some(ctx) if ctx.cursor < ctx.entries.len() && !ctx.undoing && !ctx.redoing => {
                ctx.entries[ctx.cursor]
            }
            _ => return false,
        };

        if let Some(ctx) = self.lookup_mut(context) {
            ctx.redoing = true;
            ctx.cursor += 1;
        }
        debug!(cursor = self.cursor(), "redo");

        let mut op = self.records.get_mut(handle).and_then(|r| r.redo_op.take());
        let result = match op.as_mut() {
            Some(op) => op(target, self),
            None => false,
        };
        if let Some(op) = op {
            if let Some(record) = self.records.get_mut(handle) {
                record.redo_op = Some(op);
            }
        }

        if let Some(ctx) = self.lookup_mut(context) {
            ctx.redoing = false;
            ctx.notify();
        }
        result
    }

    /// Enter the scoped switch an undo operation's body runs under.
    pub fn undo_scope(&mut self) -> UndoScope<'_, T> {
        UndoScope::enter(self)
    }

    // === Auxiliary data channel ===

    /// Store a value on the record currently being built or executed, for
    /// its undo operation to load later. Only permitted outside undo/redo
    /// replay; returns `false` (and stores nothing) during replay, while
    /// disabled, or outside any command scope.
    pub fn save<V: Any>(&mut self, key: &str, value: V) -> bool {
        if !self.enabled {
            return false;
        }
        if self.is_replaying_in(self.active) {
            return false;
        }
        let handle = match self.executing_record() {
            Some(handle) => handle,
            None => return false,
        };
        match self.records.get_mut(handle) {
            Some(record) => {
                record.data.insert(key, value);
                true
            }
            None => false,
        }
    }

    /// Load a value saved by this record's forward execution. Only
    /// permitted during undo/redo replay; `None` when the key was never
    /// saved for this record, outside replay, or while disabled. Callers
    /// branch on the `None` to distinguish, e.g., undoing an update (old
    /// value present) from undoing an insert (no old value).
    pub fn load<V: Any + Clone>(&self, key: &str) -> Option<V> {
        if !self.enabled {
            return None;
        }
        if !self.is_replaying_in(self.active) {
            return None;
        }
        let handle = self.executing_record()?;
        self.records.get(handle)?.data.get::<V>(key).cloned()
    }

    /// The record whose body is executing: present record of the active
    /// context's parent (the scoped switch put us one level below it).
    fn executing_record(&self) -> Option<Handle> {
        let parent = self.parent_context(self.active)?;
        self.lookup(parent)?.present_handle()
    }

    // === Inspection ===

    /// Most recently applied, not-yet-undone record of the active context.
    pub fn present(&self) -> Option<&CommandRecord<T>> {
        if !self.enabled {
            return None;
        }
        let handle = self.lookup(self.active)?.present_handle()?;
        self.records.get(handle)
    }

    /// Record that would become present after a redo, if any.
    pub fn peek_future(&self) -> Option<&CommandRecord<T>> {
        if !self.enabled {
            return None;
        }
        let handle = self.lookup(self.active)?.future_handle()?;
        self.records.get(handle)
    }

    /// Number of records on the active context's stack.
    pub fn len(&self) -> usize {
        self.lookup(self.active).map(|ctx| ctx.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cursor of the active context (0 = nothing applied).
    pub fn cursor(&self) -> usize {
        self.lookup(self.active).map(|ctx| ctx.cursor()).unwrap_or(0)
    }

    /// Indented listing of the active context's stack, most-recent-first,
    /// present entry marked, nested stacks one tab deeper. Diagnostics
    /// only; works under the kill-switch.
    pub fn dump(&self) -> String {
        self.dump_context(self.active, 0)
    }

    fn dump_context(&self, context: ContextId, indent: usize) -> String {
        let ctx = match self.lookup(context) {
            Some(ctx) => ctx,
            None => return String::new(),
        };
        let tabs = "\t".repeat(indent);
        let mut out = String::new();
        for i in (0..ctx.entries.len()).rev() {
            let record = match self.records.get(ctx.entries[i]) {
                Some(record) => record,
                None => continue,
            };
            out.push_str(&tabs);
            out.push_str(record.label());
            if ctx.cursor == i + 1 {
                out.push_str(" <<<");
            }
            out.push('\n');
            out.push_str(&self.dump_context(ContextId::Sub(ctx.entries[i]), indent + 1));
        }
        out
    }

    // === Wipe / notifications ===

    /// Discard every record of the active context and reset its cursor.
    pub fn clear(&mut self) {
        if !self.enabled {
            return;
        }
        let context = self.active;
        let entries = match self.lookup_mut(context) {
            Some(ctx) => {
                ctx.cursor = 0;
                std::mem::take(&mut ctx.entries)
            }
            None => return,
        };
        for handle in entries {
            self.free_record(handle);
        }
        debug!("history cleared");
        if let Some(ctx) = self.lookup_mut(context) {
            ctx.notify();
        }
    }

    /// Bind a callback fired with the new cursor whenever the active
    /// context's stack changes (push completion, undo, redo, clear).
    pub fn bind_on_stack_changed<F>(&mut self, callback: F)
    where
        F: FnMut(usize) + 'static,
    {
        if !self.enabled {
            return;
        }
        if let Some(ctx) = self.lookup_mut(self.active) {
            ctx.on_change = Some(Box::new(callback));
        }
    }

    pub fn unbind_on_stack_changed(&mut self) {
        if let Some(ctx) = self.lookup_mut(self.active) {
            ctx.on_change = None;
        }
    }

    // === Scope bookkeeping (called from the guards) ===

    /// Exit half of a do-scope, applied to the context just restored.
    /// During redo replay the nested cursor advances the way a live push
    /// would have moved it; outside replay the context announces the
    /// completed command.
    pub(crate) fn finish_do_scope(&mut self, restored: ContextId) {
        if !self.enabled {
            return;
        }
        let is_sub = matches!(restored, ContextId::Sub(_));
        if is_sub && self.is_redoing_in(restored) {
            if let Some(ctx) = self.lookup_mut(restored) {
                if ctx.cursor < ctx.entries.len() {
                    ctx.cursor += 1;
                }
            }
        } else if !self.is_redoing_in(restored) {
            if let Some(ctx) = self.lookup_mut(restored) {
                ctx.notify();
            }
        }
    }

    /// Exit half of an undo-scope: retreat the nested cursor as a fresh
    /// undo would, staying above the empty-state floor.
    pub(crate) fn finish_undo_scope(&mut self, restored: ContextId) {
        if !self.enabled {
            return;
        }
        if matches!(restored, ContextId::Sub(_)) {
            if let Some(ctx) = self.lookup_mut(restored) {
                if ctx.cursor > 1 {
                    ctx.cursor -= 1;
                }
            }
        }
    }

    // === Context resolution ===

    fn lookup(&self, context: ContextId) -> Option<&Context> {
        match context {
            ContextId::Root => Some(&self.root),
            ContextId::Sub(handle) => self.records.get(handle).map(|r| &r.subcontext),
        }
    }

    fn lookup_mut(&mut self, context: ContextId) -> Option<&mut Context> {
        match context {
            ContextId::Root => Some(&mut self.root),
            ContextId::Sub(handle) => self.records.get_mut(handle).map(|r| &mut r.subcontext),
        }
    }
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::new()
    }
}
