// Copyright 2024 The Regents of the University of California
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@berkeley.edu>
mod process;

pub use process::{LinearProcess, NextStateGenerator};

use smallvec::SmallVec;
use std::fmt::{Display, Formatter};

/// A process parameter: one position of the state vector.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct Parameter {
    pub name: String,
    pub sort: String,
}

impl Parameter {
    pub fn new(name: &str, sort: &str) -> Self {
        Parameter {
            name: name.to_string(),
            sort: sort.to_string(),
        }
    }
}

/// One position of a state vector: either a concrete data term or a still
/// unbound (global) variable of a known sort.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum DataValue {
    Term { value: String, sort: String },
    Free { name: String, sort: String },
}

impl DataValue {
    pub fn term(value: &str, sort: &str) -> Self {
        DataValue::Term {
            value: value.to_string(),
            sort: sort.to_string(),
        }
    }

    pub fn free(name: &str, sort: &str) -> Self {
        DataValue::Free {
            name: name.to_string(),
            sort: sort.to_string(),
        }
    }

    pub fn sort(&self) -> &str {
        match self {
            DataValue::Term { sort, .. } => sort,
            DataValue::Free { sort, .. } => sort,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self, DataValue::Free { .. })
    }

    /// Relaxed equality: values are equal, or either side is an unbound
    /// variable of matching sort.
    pub fn matches_modulo_free(&self, other: &DataValue) -> bool {
        if self.is_free() || other.is_free() {
            self.sort() == other.sort()
        } else {
            self == other
        }
    }
}

impl Display for DataValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DataValue::Term { value, .. } => write!(f, "{value}"),
            DataValue::Free { name, .. } => write!(f, "_{name}"),
        }
    }
}

/// A state is a vector of data values, one per process parameter.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Default)]
pub struct State(pub Vec<DataValue>);

impl State {
    pub fn new(values: Vec<DataValue>) -> Self {
        State(values)
    }

    /// Position-wise relaxed equality, see [`DataValue::matches_modulo_free`].
    pub fn matches_modulo_free(&self, other: &State) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| a.matches_modulo_free(b))
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (ii, value) in self.0.iter().enumerate() {
            if ii > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}

/// A single parameterized action.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct Action {
    pub label: String,
    pub args: Vec<String>,
}

impl Action {
    pub fn new(label: &str) -> Self {
        Action {
            label: label.to_string(),
            args: Vec::new(),
        }
    }

    pub fn with_args(label: &str, args: &[&str]) -> Self {
        Action {
            label: label.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)?;
        if !self.args.is_empty() {
            write!(f, "({})", self.args.join(", "))?;
        }
        Ok(())
    }
}

/// A multi-action: zero or more actions happening together, with an optional
/// time stamp. The empty multi-action is the internal step `tau`.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Default)]
pub struct MultiAction {
    pub actions: SmallVec<[Action; 1]>,
    pub time: Option<String>,
}

impl MultiAction {
    pub fn tau() -> Self {
        MultiAction::default()
    }

    pub fn from_label(label: &str) -> Self {
        let mut actions = SmallVec::new();
        actions.push(Action::new(label));
        MultiAction {
            actions,
            time: None,
        }
    }

    pub fn from_action(action: Action) -> Self {
        let mut actions = SmallVec::new();
        actions.push(action);
        MultiAction {
            actions,
            time: None,
        }
    }

    pub fn at_time(mut self, time: &str) -> Self {
        self.time = Some(time.to_string());
        self
    }

    pub fn is_tau(&self) -> bool {
        self.actions.is_empty()
    }

    /// Compares the action content, ignoring the time stamp. Used when matching
    /// a recorded trace step against a live transition.
    pub fn equal_actions(&self, other: &MultiAction) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Display for MultiAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_tau() {
            return write!(f, "tau");
        }
        for (ii, action) in self.actions.iter().enumerate() {
            if ii > 0 {
                write!(f, "|")?;
            }
            write!(f, "{action}")?;
        }
        Ok(())
    }
}

/// An enabled step: the action and the state it leads to.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct Transition {
    pub action: MultiAction,
    pub target: State,
}

impl Transition {
    pub fn new(action: MultiAction, target: State) -> Self {
        Transition { action, target }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relaxed_state_matching() {
        let concrete = State::new(vec![DataValue::term("0", "Nat"), DataValue::term("a", "Id")]);
        let with_free = State::new(vec![DataValue::free("dc1", "Nat"), DataValue::term("a", "Id")]);
        let wrong_sort = State::new(vec![DataValue::free("dc1", "Bool"), DataValue::term("a", "Id")]);
        let other = State::new(vec![DataValue::term("1", "Nat"), DataValue::term("a", "Id")]);

        assert!(concrete.matches_modulo_free(&concrete));
        assert!(concrete.matches_modulo_free(&with_free));
        assert!(with_free.matches_modulo_free(&concrete));
        assert!(!concrete.matches_modulo_free(&wrong_sort));
        assert!(!concrete.matches_modulo_free(&other));
        assert!(other.matches_modulo_free(&with_free));
    }

    #[test]
    fn tau_and_display() {
        assert!(MultiAction::tau().is_tau());
        assert_eq!(MultiAction::tau().to_string(), "tau");
        assert!(!MultiAction::from_label("a").is_tau());
        assert_eq!(MultiAction::from_label("a").to_string(), "a");
        let send = Action::with_args("send", &["1", "true"]);
        let recv = Action::new("recv");
        let multi = MultiAction {
            actions: smallvec::smallvec![send, recv],
            time: None,
        };
        assert_eq!(multi.to_string(), "send(1, true)|recv");
    }

    #[test]
    fn action_matching_ignores_time() {
        let a = MultiAction::from_label("a");
        let timed = MultiAction::from_label("a").at_time("7");
        assert_ne!(a, timed);
        assert!(a.equal_actions(&timed));
    }
}
