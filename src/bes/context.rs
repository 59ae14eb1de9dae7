// Copyright 2024 The Regents of the University of California
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@berkeley.edu>

use crate::bes::expr::BooleanExpr;
use std::fmt::{Debug, Formatter};
use std::num::{NonZeroU16, NonZeroU32};

#[derive(PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct StringRef(NonZeroU16);

impl Debug for StringRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "StringRef({})", self.index())
    }
}

impl StringRef {
    fn from_index(index: usize) -> Self {
        Self(NonZeroU16::new((index + 1) as u16).unwrap())
    }

    fn index(&self) -> usize {
        (self.0.get() - 1) as usize
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct ExprRef(NonZeroU32);

impl Debug for ExprRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // we need a custom implementation in order to show the zero based index
        write!(f, "ExprRef({})", self.index())
    }
}

impl ExprRef {
    fn from_index(index: usize) -> Self {
        ExprRef(NonZeroU32::new((index + 1) as u32).unwrap())
    }

    fn index(&self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// Context which is used to create all boolean expressions. Expressions are interned such that
/// reference equivalence implies structural equivalence.
#[derive(Clone, Default)]
pub struct Context {
    strings: indexmap::IndexSet<String>,
    exprs: indexmap::IndexSet<BooleanExpr>,
}

/// Adding and removing nodes.
impl Context {
    pub fn get(&self, reference: ExprRef) -> &BooleanExpr {
        self.exprs
            .get_index((reference.0.get() as usize) - 1)
            .expect("Invalid ExprRef!")
    }

    pub(crate) fn add_expr(&mut self, value: BooleanExpr) -> ExprRef {
        let (index, _) = self.exprs.insert_full(value);
        ExprRef::from_index(index)
    }

    pub fn get_str(&self, reference: StringRef) -> &str {
        self.strings
            .get_index((reference.0.get() as usize) - 1)
            .expect("Invalid StringRef!")
    }

    pub fn string(&mut self, value: std::borrow::Cow<str>) -> StringRef {
        if let Some(index) = self.strings.get_index_of(value.as_ref()) {
            StringRef::from_index(index)
        } else {
            let (index, _) = self.strings.insert_full(value.into_owned());
            StringRef::from_index(index)
        }
    }
}

/// Convenience methods to construct expression nodes.
impl Context {
    pub fn tru(&mut self) -> ExprRef {
        self.add_expr(BooleanExpr::True)
    }
    pub fn fals(&mut self) -> ExprRef {
        self.add_expr(BooleanExpr::False)
    }
    pub fn var(&mut self, name: &str) -> ExprRef {
        let name_ref = self.string(name.into());
        self.add_expr(BooleanExpr::Var(name_ref))
    }
    pub fn var_from_ref(&mut self, name: StringRef) -> ExprRef {
        self.add_expr(BooleanExpr::Var(name))
    }
    pub fn not(&mut self, e: ExprRef) -> ExprRef {
        self.add_expr(BooleanExpr::Not(e))
    }
    pub fn and(&mut self, a: ExprRef, b: ExprRef) -> ExprRef {
        self.add_expr(BooleanExpr::And(a, b))
    }
    pub fn or(&mut self, a: ExprRef, b: ExprRef) -> ExprRef {
        self.add_expr(BooleanExpr::Or(a, b))
    }
    pub fn implies(&mut self, a: ExprRef, b: ExprRef) -> ExprRef {
        self.add_expr(BooleanExpr::Implies(a, b))
    }
}
