// Copyright 2024 The Regents of the University of California
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@berkeley.edu>

use besim::lps::{DataValue, LinearProcess, MultiAction, Parameter, State};
use besim::sim::{SimulationError, Simulator, SimulatorView};
use besim::trace::TraceFormat;
use std::cell::RefCell;
use std::rc::Rc;

fn state(v: &str) -> State {
    State::new(vec![DataValue::term(v, "Nat")])
}

fn act(l: &str) -> MultiAction {
    MultiAction::from_label(l)
}

fn params() -> Vec<Parameter> {
    vec![Parameter::new("n", "Nat")]
}

/// P = a . P
fn one_action_loop() -> LinearProcess {
    let mut p = LinearProcess::new("loop", params(), state("0"));
    p.add_transition(state("0"), act("a"), state("0"));
    p
}

/// 0 -a-> 1 -tau-> 2 -tau-> 3 -tau-> 4 -b-> 0
fn tau_chain() -> LinearProcess {
    let mut p = LinearProcess::new("tau_chain", params(), state("0"));
    p.add_transition(state("0"), act("a"), state("1"));
    p.add_transition(state("1"), MultiAction::tau(), state("2"));
    p.add_transition(state("2"), MultiAction::tau(), state("3"));
    p.add_transition(state("3"), MultiAction::tau(), state("4"));
    p.add_transition(state("4"), act("b"), state("0"));
    p
}

#[test]
fn end_to_end_scenario() {
    let mut sim = Simulator::new(one_action_loop());
    let actions = sim.next_actions();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0], "a");
    assert!(sim.choose_transition(0));
    assert_eq!(sim.trace_len(), 1);
    assert!(sim.undo());
    assert_eq!(sim.trace_pos(), 0);
    assert!(!sim.undo());
}

#[test]
fn undo_redo_bounds_and_cursor_jump() {
    let mut sim = Simulator::new(one_action_loop());
    for _ in 0..4 {
        assert!(sim.choose_transition(0));
    }
    assert_eq!(sim.trace_len(), 4);
    assert_eq!(sim.trace_pos(), 4);
    assert!(!sim.redo());
    assert!(sim.set_trace_pos(1));
    assert_eq!(sim.trace_pos(), 1);
    assert!(sim.redo());
    assert_eq!(sim.trace_pos(), 2);
    assert!(!sim.set_trace_pos(5), "beyond the trace length");
    assert_eq!(sim.trace_pos(), 2);
    assert!(sim.set_trace_pos(0));
    assert!(!sim.undo());
}

#[test]
fn record_over_after_rewind() {
    let mut sim = Simulator::new(one_action_loop());
    for _ in 0..3 {
        assert!(sim.choose_transition(0));
    }
    assert!(sim.set_trace_pos(1));
    assert!(sim.choose_transition(0));
    assert_eq!(sim.trace_len(), 2, "the recorded future is gone");
    assert!(!sim.redo());
}

#[test]
fn tau_prioritisation_chases_unseen_taus() {
    let mut sim = Simulator::new(tau_chain());
    sim.set_tau_prioritisation(true);
    assert!(sim.choose_transition(0));
    // one externally chosen step plus three chased tau steps
    assert_eq!(sim.trace_len(), 4);
    assert_eq!(sim.state(), &state("4"));
    assert_eq!(sim.next_actions(), vec!["b".to_string()]);
}

#[test]
fn tau_prioritisation_stops_on_self_loop() {
    let mut p = LinearProcess::new("tau_loop", params(), state("0"));
    p.add_transition(state("0"), act("a"), state("1"));
    p.add_transition(state("1"), MultiAction::tau(), state("1"));
    let mut sim = Simulator::new(p);
    sim.set_tau_prioritisation(true);
    assert!(sim.choose_transition(0), "must terminate, not hang");
    assert_eq!(sim.trace_len(), 1);
    assert_eq!(sim.state(), &state("1"));
}

#[test]
fn tau_prioritisation_disabled_takes_single_steps() {
    let mut sim = Simulator::new(tau_chain());
    assert!(sim.choose_transition(0));
    assert_eq!(sim.trace_len(), 1);
    assert_eq!(sim.state(), &state("1"));
}

#[test_log::test]
fn replay_round_trip() {
    let mut sim = Simulator::new(tau_chain());
    for _ in 0..5 {
        assert!(sim.choose_transition(0));
    }
    let recorded: Vec<String> = (0..sim.trace_len())
        .map(|i| sim.trace().action_at(i).unwrap().to_string())
        .collect();
    let mut buf = Vec::new();
    sim.save_trace_to(&mut buf, TraceFormat::Binary, "buffer")
        .unwrap();

    let mut replayed = Simulator::new(tau_chain());
    replayed
        .load_trace_from(&mut buf.as_slice(), "buffer")
        .unwrap();
    assert_eq!(replayed.trace_len(), 5);
    assert_eq!(replayed.trace_pos(), 0, "walk the replayed trace with redo");
    let reloaded: Vec<String> = (0..replayed.trace_len())
        .map(|i| replayed.trace().action_at(i).unwrap().to_string())
        .collect();
    assert_eq!(recorded, reloaded);
    for i in 0..=sim.trace_len() {
        assert_eq!(sim.trace().state_at(i), replayed.trace().state_at(i));
    }
    while replayed.redo() {}
    assert_eq!(replayed.state(), &state("0"));
}

#[test]
fn replay_plain_trace_fills_in_states() {
    let mut sim = Simulator::new(tau_chain());
    let plain = b"a\ntau\ntau\n";
    sim.load_trace_from(&mut plain.as_slice(), "buffer").unwrap();
    assert_eq!(sim.trace_len(), 3);
    assert_eq!(sim.trace().state_at(3), Some(&state("3")));
}

#[test]
fn replay_backtracks_over_equal_actions() {
    // two a-steps from the start, only one of them can continue with b
    let mut p = LinearProcess::new("branch", params(), state("0"));
    p.add_transition(state("0"), act("a"), state("1"));
    p.add_transition(state("0"), act("a"), state("2"));
    p.add_transition(state("2"), act("b"), state("3"));
    let mut sim = Simulator::new(p);
    let plain = b"a\nb\n";
    sim.load_trace_from(&mut plain.as_slice(), "buffer").unwrap();
    assert_eq!(sim.trace_len(), 2);
    assert_eq!(sim.trace().state_at(1), Some(&state("2")));
    assert_eq!(sim.trace().state_at(2), Some(&state("3")));
}

#[test_log::test]
fn replay_mismatch_truncates_and_reports() {
    let mut sim = Simulator::new(tau_chain());
    let plain = b"a\nc\n";
    let err = sim
        .load_trace_from(&mut plain.as_slice(), "buffer")
        .unwrap_err();
    match err {
        SimulationError::ReplayMismatch { action, position } => {
            assert_eq!(action, "c");
            assert_eq!(position, 1);
        }
        other => panic!("expected a replay mismatch, got: {other}"),
    }
    assert_eq!(sim.trace_len(), 0, "unmatched suffix is discarded");
    assert_eq!(sim.state(), &state("0"));
}

#[test]
fn replay_initial_state_mismatch() {
    let mut other = Simulator::new(LinearProcess::new("other", params(), state("9")));
    other.choose_transition(0); // no transitions, stays put
    let mut buf = Vec::new();
    other
        .save_trace_to(&mut buf, TraceFormat::Binary, "buffer")
        .unwrap();

    let mut sim = Simulator::new(tau_chain());
    let err = sim
        .load_trace_from(&mut buf.as_slice(), "buffer")
        .unwrap_err();
    assert!(matches!(err, SimulationError::InitialStateMismatch { .. }));
}

#[test]
fn replay_accepts_free_variables_of_matching_sort() {
    let mut recorded = besim::trace::Trace::new();
    recorded.set_state(State::new(vec![DataValue::free("dc0", "Nat")]));
    recorded.add_action(act("a"));
    recorded.set_state(State::new(vec![DataValue::free("dc1", "Nat")]));
    recorded.set_position(0);
    let mut buf = Vec::new();
    recorded.save(&mut buf, TraceFormat::Binary, "buffer").unwrap();

    let mut sim = Simulator::new(tau_chain());
    sim.load_trace_from(&mut buf.as_slice(), "buffer").unwrap();
    assert_eq!(sim.trace_len(), 1);
    // the placeholder was instantiated with the concrete state
    assert_eq!(sim.trace().state_at(1), Some(&state("1")));
}

#[test]
fn random_steps_follow_the_table() {
    let mut sim = Simulator::new(tau_chain());
    sim.seed_rng(42);
    for _ in 0..10 {
        assert!(sim.random_step());
    }
    assert_eq!(sim.trace_len(), 10);
}

/// Records the callbacks it receives.
#[derive(Default)]
struct RecordingView {
    events: Vec<String>,
}

impl SimulatorView for RecordingView {
    fn registered(&mut self) {
        self.events.push("registered".to_string());
    }
    fn unregistered(&mut self) {
        self.events.push("unregistered".to_string());
    }
    fn initialise(&mut self, parameters: &[Parameter]) {
        self.events.push(format!("initialise({})", parameters.len()));
    }
    fn reset(&mut self, state: &State) {
        self.events.push(format!("reset{state}"));
    }
    fn state_changed(
        &mut self,
        action: Option<&MultiAction>,
        state: &State,
        transitions: &[besim::lps::Transition],
    ) {
        match action {
            Some(a) => self
                .events
                .push(format!("step({a}, {state}, {})", transitions.len())),
            None => self
                .events
                .push(format!("refresh({state}, {})", transitions.len())),
        }
    }
    fn undo(&mut self, count: usize) {
        self.events.push(format!("undo({count})"));
    }
    fn redo(&mut self, count: usize) {
        self.events.push(format!("redo({count})"));
    }
    fn trace_changed(&mut self, trace: &besim::trace::Trace, from: usize) {
        self.events
            .push(format!("trace_changed({}, {from})", trace.len()));
    }
    fn trace_pos_changed(&mut self, position: usize) {
        self.events.push(format!("trace_pos_changed({position})"));
    }
}

#[test]
fn views_receive_notifications_in_order() {
    let view = Rc::new(RefCell::new(RecordingView::default()));
    let mut sim = Simulator::new(one_action_loop());
    let id = sim.register_view(view.clone());

    sim.choose_transition(0);
    sim.undo();
    sim.redo();
    sim.set_trace_pos(0);
    sim.unregister_view(id);
    sim.choose_transition(0);

    let events = view.borrow().events.clone();
    assert_eq!(
        events,
        vec![
            "registered",
            "step(a, (0), 1)",
            "undo(1)",
            "refresh((0), 1)",
            "redo(1)",
            "refresh((0), 1)",
            "trace_pos_changed(0)",
            "refresh((0), 1)",
            "unregistered",
        ]
    );
}

#[test]
fn late_registration_gets_a_catch_up() {
    let mut sim = Simulator::new(one_action_loop());
    sim.choose_transition(0);
    let view = Rc::new(RefCell::new(RecordingView::default()));
    sim.register_view(view.clone());
    let events = view.borrow().events.clone();
    assert_eq!(
        events,
        vec![
            "registered",
            "initialise(1)",
            "refresh((0), 1)",
            "trace_changed(1, 0)",
            "trace_pos_changed(1)",
        ]
    );
}
