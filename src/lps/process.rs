// Copyright 2024 The Regents of the University of California
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@berkeley.edu>

use crate::lps::{MultiAction, Parameter, State, Transition};

/// Enumerates the enabled steps of a loaded linear process.
///
/// Implementations may keep internal iteration state between calls, thus
/// `transitions` takes `&mut self`. A generator is owned by exactly one
/// driver; the whole result for a state is materialized before it is used.
pub trait NextStateGenerator {
    /// The process parameters, in state vector order.
    fn parameters(&self) -> &[Parameter];

    /// The initial state of the process.
    fn initial_state(&self) -> State;

    /// All enabled (action, resulting state) pairs from the given state.
    fn transitions(&mut self, state: &State) -> Vec<Transition>;
}

/// A linear process given by an explicit transition table.
///
/// Real linearized specifications come with symbolic summands and a rewriter;
/// their internals are outside of this crate. The explicit table covers tests,
/// demos and any client that can enumerate its steps up front.
#[derive(Debug, Default)]
pub struct LinearProcess {
    name: String,
    parameters: Vec<Parameter>,
    initial_state: State,
    table: Vec<(State, Transition)>,
}

impl LinearProcess {
    pub fn new(name: &str, parameters: Vec<Parameter>, initial_state: State) -> Self {
        LinearProcess {
            name: name.to_string(),
            parameters,
            initial_state,
            table: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_transition(&mut self, source: State, action: MultiAction, target: State) {
        debug_assert_eq!(source.0.len(), self.parameters.len());
        debug_assert_eq!(target.0.len(), self.parameters.len());
        self.table.push((source, Transition::new(action, target)));
    }
}

impl NextStateGenerator for LinearProcess {
    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn initial_state(&self) -> State {
        self.initial_state.clone()
    }

    fn transitions(&mut self, state: &State) -> Vec<Transition> {
        self.table
            .iter()
            .filter(|(source, _)| source == state)
            .map(|(_, transition)| transition.clone())
            .collect()
    }
}
