// Copyright 2024 The Regents of the University of California
// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use crate::lps::{NextStateGenerator, State, Transition};
use crate::sim::{SimulatorView, ViewId};
use crate::trace::{Trace, TraceError, TraceFormat};
use indexmap::IndexSet;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::cell::RefCell;
use std::io::{Read, Write};
use std::rc::Rc;

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error(transparent)]
    Trace(#[from] TraceError),
    #[error("the initial state {found} of the trace does not match the initial state {expected} of the specification")]
    InitialStateMismatch { found: String, expected: String },
    #[error("cannot replay action '{action}' at position {position}: no enabled transition matches")]
    ReplayMismatch { action: String, position: usize },
}

/// Drives the exploration of the state space of a linear process.
///
/// The simulator owns the next-state generator and the current trace. Every
/// state-changing operation recomputes the cached transition list and notifies
/// the registered views. All operations run to completion on the calling
/// thread.
pub struct Simulator<G: NextStateGenerator> {
    generator: G,
    trace: Trace,
    transitions: Vec<Transition>,
    /// states visited by the current tau prioritization pass
    seen: IndexSet<State>,
    views: Vec<(ViewId, Rc<RefCell<dyn SimulatorView>>)>,
    next_view_id: usize,
    tau_prioritisation: bool,
    rng: Xoshiro256PlusPlus,
}

impl<G: NextStateGenerator> Simulator<G> {
    /// Loads a specification: the simulator starts out reset to the initial
    /// state of the given generator.
    pub fn new(generator: G) -> Self {
        let mut sim = Simulator {
            generator,
            trace: Trace::new(),
            transitions: Vec::new(),
            seen: IndexSet::new(),
            views: Vec::new(),
            next_view_id: 0,
            tau_prioritisation: false,
            rng: Xoshiro256PlusPlus::seed_from_u64(0),
        };
        sim.reset(None);
        sim
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn set_tau_prioritisation(&mut self, enabled: bool) {
        self.tau_prioritisation = enabled;
    }

    /// Re-seeds the rng behind [`Simulator::random_step`].
    pub fn seed_rng(&mut self, seed: u64) {
        self.rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    }

    // views

    /// Registers an observer. If the simulation is already under way, the view
    /// receives a catch-up: parameters, current state, trace and cursor.
    pub fn register_view(&mut self, view: Rc<RefCell<dyn SimulatorView>>) -> ViewId {
        let id = ViewId(self.next_view_id);
        self.next_view_id += 1;
        self.views.push((id, view.clone()));
        view.borrow_mut().registered();
        if !self.trace.is_empty() {
            let mut v = view.borrow_mut();
            v.initialise(self.generator.parameters());
            v.state_changed(None, self.state(), &self.transitions);
            v.trace_changed(&self.trace, 0);
            v.trace_pos_changed(self.trace.position());
        }
        id
    }

    /// Removes an observer. Returns `false` if the handle is unknown.
    pub fn unregister_view(&mut self, id: ViewId) -> bool {
        match self.views.iter().position(|(i, _)| *i == id) {
            Some(index) => {
                let (_, view) = self.views.remove(index);
                view.borrow_mut().unregistered();
                true
            }
            None => false,
        }
    }

    fn notify(&self, mut f: impl FnMut(&mut dyn SimulatorView)) {
        for (_, view) in self.views.iter() {
            f(&mut *view.borrow_mut());
        }
    }

    // accessors

    /// The current state. Every committed trace slot carries a state, thus the
    /// cursor always points at one.
    pub fn state(&self) -> &State {
        self.trace
            .current_state()
            .expect("the simulator keeps a state in every committed slot")
    }

    /// The cached list of enabled (action, resulting state) pairs.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// The resulting state of every enabled transition.
    pub fn next_states(&self) -> Vec<&State> {
        self.transitions.iter().map(|t| &t.target).collect()
    }

    /// The printed action of every enabled transition.
    pub fn next_actions(&self) -> Vec<String> {
        self.transitions
            .iter()
            .map(|t| t.action.to_string())
            .collect()
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn trace_len(&self) -> usize {
        self.trace.len()
    }

    pub fn trace_pos(&self) -> usize {
        self.trace.position()
    }

    fn refresh_transitions(&mut self) {
        let state = self
            .trace
            .current_state()
            .expect("the simulator keeps a state in every committed slot")
            .clone();
        self.transitions = self.generator.transitions(&state);
    }

    // state changing operations

    /// Starts over from the given state, or from the initial state of the
    /// specification.
    pub fn reset(&mut self, state: Option<State>) {
        let initial = state.unwrap_or_else(|| self.generator.initial_state());
        self.trace = Trace::new();
        let ok = self.trace.set_state(initial.clone());
        debug_assert!(ok);
        self.transitions = self.generator.transitions(&initial);
        self.notify(|v| {
            v.reset(&initial);
        });
        self.notify(|v| v.state_changed(None, &initial, &self.transitions));
    }

    /// Commits the enabled transition at `index`: any recorded future is
    /// discarded, the action and resulting state are appended and the enabled
    /// transitions are recomputed. Returns `false` when `index` is out of
    /// range.
    ///
    /// With tau prioritization enabled, committing a transition chases tau
    /// steps: as long as the fresh transition list holds a tau step to a state
    /// not seen in this pass, that step is committed as well. The pass
    /// terminates on tau cycles because visited states are skipped.
    pub fn choose_transition(&mut self, index: usize) -> bool {
        if index >= self.transitions.len() {
            return false;
        }
        self.commit_transition(index);
        if self.tau_prioritisation {
            loop {
                let current = self.state().clone();
                self.seen.insert(current);
                let next_tau = self
                    .transitions
                    .iter()
                    .position(|t| t.action.is_tau() && !self.seen.contains(&t.target));
                match next_tau {
                    Some(ii) => self.commit_transition(ii),
                    None => break,
                }
            }
            self.seen.clear();
        }
        true
    }

    fn commit_transition(&mut self, index: usize) {
        let transition = self.transitions[index].clone();
        log::debug!(
            "step: {} -> {}",
            transition.action,
            transition.target
        );
        self.trace.add_action(transition.action.clone());
        let ok = self.trace.set_state(transition.target.clone());
        debug_assert!(ok, "add_action clears the new slot");
        self.transitions = self.generator.transitions(&transition.target);
        self.notify(|v| {
            v.state_changed(
                Some(&transition.action),
                &transition.target,
                &self.transitions,
            )
        });
    }

    /// Picks one of the enabled transitions at random. Returns `false` when
    /// there is none.
    pub fn random_step(&mut self) -> bool {
        if self.transitions.is_empty() {
            return false;
        }
        let index = self.rng.gen_range(0..self.transitions.len());
        self.choose_transition(index)
    }

    /// Moves the cursor back one step. Returns `false` at position zero.
    pub fn undo(&mut self) -> bool {
        if self.trace.position() == 0 {
            return false;
        }
        let pos = self.trace.position() - 1;
        self.trace.set_position(pos);
        self.refresh_transitions();
        self.notify(|v| v.undo(1));
        self.notify(|v| v.state_changed(None, self.state(), &self.transitions));
        true
    }

    /// Moves the cursor forward one step. Returns `false` at the committed end.
    pub fn redo(&mut self) -> bool {
        if self.trace.position() >= self.trace.len() {
            return false;
        }
        let pos = self.trace.position() + 1;
        self.trace.set_position(pos);
        self.refresh_transitions();
        self.notify(|v| v.redo(1));
        self.notify(|v| v.state_changed(None, self.state(), &self.transitions));
        true
    }

    /// Jumps the cursor to an arbitrary committed position. Returns `false`
    /// when `pos` exceeds the trace length.
    pub fn set_trace_pos(&mut self, pos: usize) -> bool {
        if pos > self.trace.len() {
            return false;
        }
        self.trace.set_position(pos);
        self.refresh_transitions();
        self.notify(|v| v.trace_pos_changed(pos));
        self.notify(|v| v.state_changed(None, self.state(), &self.transitions));
        true
    }

    // trace persistence

    pub fn save_trace(&self, path: &str) -> Result<(), SimulationError> {
        self.trace.save_file(path, TraceFormat::Binary)?;
        Ok(())
    }

    pub fn save_trace_to(
        &self,
        writer: &mut impl Write,
        format: TraceFormat,
        origin: &str,
    ) -> Result<(), SimulationError> {
        self.trace.save(writer, format, origin)?;
        Ok(())
    }

    /// Loads a trace and replays it against the specification.
    ///
    /// The recorded initial state must match the computed initial state modulo
    /// free variables. Each recorded action is then matched by a depth-first
    /// search over the enabled transitions, filling in missing states and
    /// backtracking on mismatch. On failure the trace is truncated at position
    /// zero and the error names the action and the deepest position reached.
    pub fn load_trace(&mut self, path: &str) -> Result<(), SimulationError> {
        let loaded = Trace::load_file(path)?;
        self.replay_trace(loaded)
    }

    pub fn load_trace_from(
        &mut self,
        reader: &mut impl Read,
        origin: &str,
    ) -> Result<(), SimulationError> {
        let loaded = Trace::load(reader, origin)?;
        self.replay_trace(loaded)
    }

    fn replay_trace(&mut self, mut loaded: Trace) -> Result<(), SimulationError> {
        let initial = self.generator.initial_state();
        if let Some(recorded) = loaded.state_at(0) {
            if !recorded.matches_modulo_free(&initial) {
                return Err(SimulationError::InitialStateMismatch {
                    found: recorded.to_string(),
                    expected: initial.to_string(),
                });
            }
        }
        // instantiate any free variables with the concrete initial state
        loaded.set_state_at(0, initial.clone());

        let mut deepest = 0;
        if self.match_from(&mut loaded, 0, &initial, &mut deepest) {
            loaded.set_position(0);
            self.trace = loaded;
            self.refresh_transitions();
            self.notify(|v| v.trace_changed(&self.trace, 0));
            self.notify(|v| v.trace_pos_changed(0));
            self.notify(|v| v.state_changed(None, self.state(), &self.transitions));
            Ok(())
        } else {
            let action = loaded
                .action_at(deepest)
                .map(|a| a.to_string())
                .unwrap_or_default();
            log::warn!("trace replay failed at position {deepest} on action '{action}'");
            // leave the unmatched suffix discarded so the caller can inspect
            // how far matching got
            loaded.set_position(0);
            loaded.truncate();
            self.trace = loaded;
            self.refresh_transitions();
            self.notify(|v| v.trace_changed(&self.trace, 0));
            self.notify(|v| v.state_changed(None, self.state(), &self.transitions));
            Err(SimulationError::ReplayMismatch {
                action,
                position: deepest,
            })
        }
    }

    /// Depth-first matching of the recorded suffix starting at `pos` from the
    /// concrete `state`. The candidate transitions of a level are fully
    /// materialized before any recursion, the generator is never re-entered
    /// while candidates of the same level are in flight.
    fn match_from(
        &mut self,
        trace: &mut Trace,
        pos: usize,
        state: &State,
        deepest: &mut usize,
    ) -> bool {
        if pos == trace.len() {
            return true;
        }
        let recorded = trace
            .action_at(pos)
            .cloned()
            .expect("committed slots hold an action");
        let candidates = self.generator.transitions(state);
        for candidate in candidates {
            if !candidate.action.equal_actions(&recorded) {
                continue;
            }
            let next = pos + 1;
            let previous = trace.state_at(next).cloned();
            if let Some(recorded_state) = &previous {
                if !recorded_state.matches_modulo_free(&candidate.target) {
                    continue;
                }
            }
            // tentatively accept the resulting state
            trace.set_state_at(next, candidate.target.clone());
            if self.match_from(trace, next, &candidate.target, deepest) {
                return true;
            }
            // undo the provisional fill
            match previous {
                Some(recorded_state) => trace.set_state_at(next, recorded_state),
                None => trace.clear_state_at(next),
            }
        }
        if pos > *deepest {
            *deepest = pos;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lps::{DataValue, LinearProcess, MultiAction, Parameter};

    fn state(v: &str) -> State {
        State::new(vec![DataValue::term(v, "Nat")])
    }

    /// P = a . P
    fn one_action_loop() -> LinearProcess {
        let mut p = LinearProcess::new("loop", vec![Parameter::new("n", "Nat")], state("0"));
        p.add_transition(state("0"), MultiAction::from_label("a"), state("0"));
        p
    }

    #[test]
    fn end_to_end_one_action_process() {
        let mut sim = Simulator::new(one_action_loop());
        let actions = sim.next_actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0], "a");
        assert!(sim.choose_transition(0));
        assert_eq!(sim.trace_len(), 1);
        assert!(sim.undo());
        assert_eq!(sim.trace_pos(), 0);
        assert!(!sim.undo(), "undo at position zero fails");
        assert!(sim.redo());
        assert!(!sim.redo(), "redo at the end fails");
    }

    #[test]
    fn choose_transition_out_of_range() {
        let mut sim = Simulator::new(one_action_loop());
        assert!(!sim.choose_transition(1));
        assert_eq!(sim.trace_len(), 0);
    }
}
