//! Scoped context switches
//!
//! While a command body runs, registrations it triggers must land in that
//! command's own nested context, not the context the command was pushed on.
//! [`CommandScope`] (returned by [`History::push`]) and [`UndoScope`] (from
//! [`History::undo_scope`]) redirect the engine's active context on entry
//! and restore it on drop, so restoration holds on every exit path —
//! early return, `?`, and unwinding included.
//!
//! Both guards deref to the engine, so a command body uses the scope itself
//! for saves, loads and nested command calls.

use std::ops::{Deref, DerefMut};

use crate::context::ContextId;
use crate::history::History;

/// Active-context redirection for the body of a do-operation.
///
/// Inert while the engine is disabled or during pure undo replay (undo
/// operations call each other directly rather than re-pushing). On exit,
/// performs the cursor bookkeeping redo replay needs: replayed bodies do not
/// go through a live push, so the scope advances the nested cursor the way
/// a fresh redo would have.
pub struct CommandScope<'a, T> {
    history: &'a mut History<T>,
    /// Context to restore on exit; `None` means the scope is inert.
    prev: Option<ContextId>,
}

impl<'a, T> CommandScope<'a, T> {
    pub(crate) fn enter(history: &'a mut History<T>) -> Self {
        let mut prev = None;
        if history.is_enabled() && !history.is_undoing() {
            if let Some(sub) = history.present_subcontext() {
                prev = Some(history.context());
                history.set_context(sub);
            }
        }
        Self { history, prev }
    }

    /// Tear the scope down and remove the record the paired push created,
    /// restoring the pre-push state. For a do-operation that discovers,
    /// after registering, that it must not be recorded.
    ///
    /// Assumes this scope belongs to the innermost, most recent push;
    /// anything else is unspecified.
    pub fn abort(mut self) {
        self.exit();
        self.history.abort_push();
    }

    fn exit(&mut self) {
        if let Some(prev) = self.prev.take() {
            self.history.set_context(prev);
            self.history.finish_do_scope(prev);
        }
    }
}

impl<T> Drop for CommandScope<'_, T> {
    fn drop(&mut self) {
        self.exit();
    }
}

impl<T> Deref for CommandScope<'_, T> {
    type Target = History<T>;

    fn deref(&self) -> &History<T> {
        self.history
    }
}

impl<T> DerefMut for CommandScope<'_, T> {
    fn deref_mut(&mut self) -> &mut History<T> {
        self.history
    }
}

/// Active-context redirection for the body of an undo-operation.
///
/// Entry/exit redirection only, without the push bookkeeping. On exit,
/// retreats the nested cursor one step if it is above the empty-state
/// floor, the way a fresh undo would have.
pub struct UndoScope<'a, T> {
    history: &'a mut History<T>,
    prev: Option<ContextId>,
}

impl<'a, T> UndoScope<'a, T> {
    pub(crate) fn enter(history: &'a mut History<T>) -> Self {
        let mut prev = None;
        if history.is_enabled() {
            if let Some(sub) = history.present_subcontext() {
                prev = Some(history.context());
                history.set_context(sub);
            }
        }
        Self { history, prev }
    }
}

impl<T> Drop for UndoScope<'_, T> {
    fn drop(&mut self) {
        if let Some(prev) = self.prev.take() {
            self.history.set_context(prev);
            self.history.finish_undo_scope(prev);
        }
    }
}

impl<T> Deref for UndoScope<'_, T> {
    type Target = History<T>;

    fn deref(&self) -> &History<T> {
        self.history
    }
}

impl<T> DerefMut for UndoScope<'_, T> {
    fn deref_mut(&mut self) -> &mut History<T> {
        self.history
    }
}
