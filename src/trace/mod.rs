// Copyright 2024 The Regents of the University of California
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@berkeley.edu>
mod io;

pub use io::{TraceError, TraceFormat, TRACE_MARKER, TRACE_VERSION};

use crate::lps::{MultiAction, State};

const INIT_CAPACITY: usize = 64;

/// A recorded path through a transition system: a sequence of
/// (state, action, time) slots with a movable cursor.
///
/// The cursor `pos` ranges over `[0, len]` where `len` is the committed length
/// of the trace. Slot `len` is always kept unset, it is the next slot to be
/// written. Adding an action at a rewound cursor discards the recorded suffix
/// (record-over semantics). A state slot may be unset even within the
/// committed range; the state of a slot can be set exactly once.
#[derive(Debug, Clone)]
pub struct Trace {
    states: Vec<Option<State>>,
    actions: Vec<Option<MultiAction>>,
    pos: usize,
    len: usize,
}

impl Default for Trace {
    fn default() -> Self {
        Self::new()
    }
}

impl Trace {
    pub fn new() -> Self {
        Trace {
            states: vec![None; INIT_CAPACITY],
            actions: vec![None; INIT_CAPACITY],
            pos: 0,
            len: 0,
        }
    }

    fn check_invariant(&self) {
        debug_assert!(self.pos <= self.len);
        debug_assert!(self.len < self.states.len());
        debug_assert_eq!(self.states.len(), self.actions.len());
        debug_assert!(self.actions[self.len].is_none());
    }

    /// Doubles the capacity once `len` hits the end of the slot arrays.
    fn grow_if_full(&mut self) {
        if self.len + 1 > self.states.len() {
            let new_capacity = self.states.len() * 2;
            self.states.resize(new_capacity, None);
            self.actions.resize(new_capacity, None);
        }
    }

    /// The committed length of the trace in actions.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The current cursor position, in `[0, len]`.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Moves the cursor. A position beyond the committed length is silently
    /// ignored (the cursor stays put) for compatibility with the historic
    /// trace API; the simulator level reports this as `false` instead.
    pub fn set_position(&mut self, pos: usize) {
        if pos <= self.len {
            self.pos = pos;
        }
        self.check_invariant();
    }

    /// The state recorded at the cursor, if it was set.
    pub fn current_state(&self) -> Option<&State> {
        self.states[self.pos].as_ref()
    }

    pub fn has_current_state(&self) -> bool {
        self.states[self.pos].is_some()
    }

    /// The time stamp of the outgoing action at the cursor, if any.
    pub fn current_time(&self) -> Option<&str> {
        self.actions[self.pos].as_ref().and_then(|a| a.time.as_deref())
    }

    /// Reads the outgoing action at the cursor and advances the cursor by one,
    /// except when it already sits at the committed end.
    pub fn next_action(&mut self) -> Option<&MultiAction> {
        let at = self.pos;
        if self.pos < self.len {
            self.pos += 1;
        }
        self.check_invariant();
        self.actions[at].as_ref()
    }

    /// Appends an action at the cursor. The cursor advances, the committed
    /// length shrinks or grows to the cursor, and the new current slot is
    /// cleared: anything previously recorded past the write point is gone.
    pub fn add_action(&mut self, action: MultiAction) {
        self.actions[self.pos] = Some(action);
        self.pos += 1;
        self.len = self.pos;
        self.grow_if_full();
        self.states[self.len] = None;
        self.actions[self.len] = None;
        self.check_invariant();
    }

    /// Sets the state of the current slot. Fails (returns `false`) if the slot
    /// already holds a state; the existing state is kept.
    pub fn set_state(&mut self, state: State) -> bool {
        if self.states[self.pos].is_some() {
            return false;
        }
        self.states[self.pos] = Some(state);
        self.check_invariant();
        true
    }

    /// Discards everything from the cursor onward: the committed length
    /// becomes the cursor position and the action at the new boundary is
    /// dropped. The state at the cursor remains.
    pub fn truncate(&mut self) {
        self.len = self.pos;
        self.actions[self.len] = None;
        self.check_invariant();
    }

    /// The state recorded at slot `index`, if it was set. Slots up to and
    /// including `len` are addressable.
    pub fn state_at(&self, index: usize) -> Option<&State> {
        debug_assert!(index <= self.len);
        self.states[index].as_ref()
    }

    pub fn has_state_at(&self, index: usize) -> bool {
        debug_assert!(index <= self.len);
        self.states[index].is_some()
    }

    /// The action recorded at slot `index`. Committed slots always hold one.
    pub fn action_at(&self, index: usize) -> Option<&MultiAction> {
        debug_assert!(index <= self.len);
        self.actions[index].as_ref()
    }

    /// Overwrites the state of a slot, used by the replay matcher to fill in
    /// and instantiate provisional states.
    pub(crate) fn set_state_at(&mut self, index: usize, state: State) {
        debug_assert!(index <= self.len);
        self.states[index] = Some(state);
    }

    /// Removes a provisionally filled state again (replay backtracking).
    pub(crate) fn clear_state_at(&mut self, index: usize) {
        debug_assert!(index <= self.len);
        self.states[index] = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lps::DataValue;

    fn state(v: &str) -> State {
        State::new(vec![DataValue::term(v, "Nat")])
    }

    fn action(l: &str) -> MultiAction {
        MultiAction::from_label(l)
    }

    #[test]
    fn cursor_invariant() {
        let mut trace = Trace::new();
        assert_eq!(trace.position(), 0);
        assert_eq!(trace.len(), 0);
        for ii in 0..5 {
            trace.add_action(action(&format!("a{ii}")));
            assert!(trace.position() <= trace.len());
        }
        assert_eq!(trace.len(), 5);

        trace.set_position(3);
        assert_eq!(trace.position(), 3);
        // out of range requests are silently ignored
        trace.set_position(17);
        assert_eq!(trace.position(), 3);

        trace.truncate();
        assert_eq!(trace.len(), 3);
        assert!(trace.position() <= trace.len());
    }

    #[test]
    fn record_over() {
        let mut trace = Trace::new();
        for ii in 0..5 {
            trace.add_action(action(&format!("a{ii}")));
        }
        assert_eq!(trace.len(), 5);
        trace.set_position(2);
        trace.add_action(action("b"));
        assert_eq!(trace.len(), 3, "recording over discards the old suffix");

        trace.set_position(0);
        let mut labels = Vec::new();
        while trace.position() < trace.len() {
            labels.push(trace.next_action().unwrap().to_string());
        }
        assert_eq!(labels, vec!["a0", "a1", "b"]);
    }

    #[test]
    fn set_state_only_once() {
        let mut trace = Trace::new();
        assert!(!trace.has_current_state());
        assert!(trace.set_state(state("0")));
        assert!(!trace.set_state(state("1")), "second write must fail");
        assert_eq!(trace.current_state(), Some(&state("0")));
    }

    #[test]
    fn next_action_stops_at_the_end() {
        let mut trace = Trace::new();
        trace.add_action(action("a"));
        trace.set_position(0);
        assert_eq!(trace.next_action().unwrap().to_string(), "a");
        assert_eq!(trace.position(), 1);
        // at the end: the cursor stays, the slot is unset
        assert!(trace.next_action().is_none());
        assert_eq!(trace.position(), 1);
    }

    #[test]
    fn capacity_doubles() {
        let mut trace = Trace::new();
        for ii in 0..(INIT_CAPACITY * 2 + 3) {
            trace.add_action(action(&format!("a{ii}")));
            trace.set_state(state(&ii.to_string()));
        }
        assert_eq!(trace.len(), INIT_CAPACITY * 2 + 3);
        trace.set_position(0);
        assert_eq!(trace.next_action().unwrap().to_string(), "a0");
    }

    #[test]
    fn current_time() {
        let mut trace = Trace::new();
        trace.add_action(MultiAction::from_label("a").at_time("3"));
        assert_eq!(trace.current_time(), None, "cursor sits past the action");
        trace.set_position(0);
        assert_eq!(trace.current_time(), Some("3"));
    }
}
