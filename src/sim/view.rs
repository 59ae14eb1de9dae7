// Copyright 2024 The Regents of the University of California
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@berkeley.edu>

use crate::lps::{MultiAction, Parameter, State, Transition};
use crate::trace::Trace;

/// Handle identifying a registered view, used to unregister it again.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct ViewId(pub(crate) usize);

/// Observer of a [`crate::sim::Simulator`].
///
/// All callbacks are delivered synchronously, in registration order, once per
/// state-changing operation. Views receive read-only data; calling back into
/// the simulator from inside a callback is not supported (the simulator is
/// mutably borrowed for the whole dispatch, a smuggled handle will panic).
#[allow(unused_variables)]
pub trait SimulatorView {
    /// The view was added to the simulator.
    fn registered(&mut self) {}

    /// The view was removed from the simulator.
    fn unregistered(&mut self) {}

    /// Reports the parameter list of the loaded process.
    fn initialise(&mut self, parameters: &[Parameter]) {}

    /// The simulation was reset to the given initial state.
    fn reset(&mut self, state: &State) {}

    /// The current state or the enabled transitions changed.
    ///
    /// `action` is `Some` when a transition was committed and `None` when the
    /// transition list was merely refreshed (reset, undo, redo, cursor jump).
    fn state_changed(
        &mut self,
        action: Option<&MultiAction>,
        state: &State,
        transitions: &[Transition],
    ) {
    }

    /// The cursor moved back by `count` steps.
    fn undo(&mut self, count: usize) {}

    /// The cursor moved forward by `count` steps.
    fn redo(&mut self, count: usize) {}

    /// The trace contents changed from position `from` onward.
    fn trace_changed(&mut self, trace: &Trace, from: usize) {}

    /// The cursor jumped to `position`.
    fn trace_pos_changed(&mut self, position: usize) {}
}
