//! Managing undo state.

use std::collections::VecDeque;
use std::error::Error;
use std::fmt;

// deep enough for a form-editing session without hoarding closures
const DEFAULT_UNDO_STACK_SIZE: usize = 10;

/// The result of invoking one half of an [`Action`].
pub type ActionResult = Result<(), Box<dyn Error>>;

/// A recorded, reversible edit.
///
/// The two callables are opaque to the stack; they capture whatever context
/// they need by value (record ids, old and new field values, a shared
/// workspace handle) so that nothing they refer to can dangle.
pub struct Action {
    description: String,
    undo: Box<dyn FnMut() -> ActionResult>,
    redo: Box<dyn FnMut() -> ActionResult>,
}

impl Action {
    pub fn new(
        description: impl Into<String>,
        undo: impl FnMut() -> ActionResult + 'static,
        redo: impl FnMut() -> ActionResult + 'static,
    ) -> Action {
        Action {
            description: description.into(),
            undo: Box::new(undo),
            redo: Box::new(redo),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Action")
            .field("description", &self.description)
            .finish()
    }
}

/// A pair of bounded stacks of actions that can be undone and redone.
///
/// One instance per editing scope; the stack is not a process-wide
/// singleton and is single-threaded by construction.
#[derive(Debug)]
pub struct UndoStack {
    max_depth: usize,
    undo: VecDeque<Action>,
    redo: VecDeque<Action>,
    dirty: bool,
}

impl UndoStack {
    pub fn new() -> UndoStack {
        UndoStack::new_sized(DEFAULT_UNDO_STACK_SIZE)
    }

    pub fn new_sized(max_depth: usize) -> UndoStack {
        UndoStack {
            max_depth,
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            dirty: false,
        }
    }

    /// Record a freshly applied action.
    ///
    /// The caller has already run the forward edit; we only keep the pair of
    /// closures. Recording discards any redo history: there is no branching.
    pub fn record(&mut self, action: Action) {
        self.redo.clear();
        push_bounded(&mut self.undo, action, self.max_depth);
        self.dirty = true;
    }

    /// Undo the most recent action.
    ///
    /// Returns `false` if there was nothing to undo or the action's callable
    /// failed. A failure is logged and the action stays at the front of the
    /// undo stack, exactly as it was before the attempt.
    pub fn undo(&mut self) -> bool {
        let mut action = match self.undo.pop_front() {
            Some(action) => action,
            None => return false,
        };
        if let Err(err) = (action.undo)() {
            log::warn!("undo of '{}' failed: {}", action.description, err);
            self.undo.push_front(action);
            return false;
        }
        push_bounded(&mut self.redo, action, self.max_depth);
        self.dirty = true;
        true
    }

    /// Redo the most recently undone action. Mirrors [`UndoStack::undo`].
    pub fn redo(&mut self) -> bool {
        let mut action = match self.redo.pop_front() {
            Some(action) => action,
            None => return false,
        };
        if let Err(err) = (action.redo)() {
            log::warn!("redo of '{}' failed: {}", action.description, err);
            self.redo.push_front(action);
            return false;
        }
        push_bounded(&mut self.undo, action, self.max_depth);
        self.dirty = true;
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// The description of the action `undo` would run next.
    pub fn undo_description(&self) -> Option<&str> {
        self.undo.front().map(|a| a.description())
    }

    /// The description of the action `redo` would run next.
    pub fn redo_description(&self) -> Option<&str> {
        self.redo.front().map(|a| a.description())
    }

    /// Drop all history. The dirty flag is left alone; forgetting how we got
    /// here does not mean the state was saved.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// `true` if anything was recorded, undone or redone since the last
    /// [`UndoStack::mark_clean`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Establish a new clean checkpoint. Call after a successful durable save.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        UndoStack::new()
    }
}

fn push_bounded(stack: &mut VecDeque<Action>, action: Action, max_depth: usize) {
    stack.push_front(action);
    while stack.len() > max_depth {
        stack.pop_back();
    }
}
