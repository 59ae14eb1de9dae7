// Copyright 2024 The Regents of the University of California
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@berkeley.edu>

use crate::bes::{Context, ExprRef, StringRef};

/// Represents a boolean fixpoint expression.
///
/// The variant tag fully determines the arity, thus calling an accessor like
/// [`BooleanExpr::left`] on anything but a binary node is a programming error and panics.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum BooleanExpr {
    // nullary
    True,
    False,
    /// References the bound variable of an equation by name.
    Var(StringRef),
    // unary
    Not(ExprRef),
    // binary
    And(ExprRef, ExprRef),
    Or(ExprRef, ExprRef),
    Implies(ExprRef, ExprRef),
}

impl BooleanExpr {
    pub fn is_true(&self) -> bool {
        matches!(self, BooleanExpr::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, BooleanExpr::False)
    }

    pub fn is_var(&self) -> bool {
        matches!(self, BooleanExpr::Var(_))
    }

    pub fn is_not(&self) -> bool {
        matches!(self, BooleanExpr::Not(_))
    }

    pub fn is_and(&self) -> bool {
        matches!(self, BooleanExpr::And(_, _))
    }

    pub fn is_or(&self) -> bool {
        matches!(self, BooleanExpr::Or(_, _))
    }

    pub fn is_implies(&self) -> bool {
        matches!(self, BooleanExpr::Implies(_, _))
    }

    /// The operand of a negation. Panics on any other node.
    pub fn operand(&self) -> ExprRef {
        match self {
            BooleanExpr::Not(e) => *e,
            other => panic!("operand() is only available on a negation, not: {other:?}"),
        }
    }

    /// The left operand of a binary node. Panics on any other node.
    pub fn left(&self) -> ExprRef {
        match self {
            BooleanExpr::And(a, _) | BooleanExpr::Or(a, _) | BooleanExpr::Implies(a, _) => *a,
            other => panic!("left() is only available on a binary node, not: {other:?}"),
        }
    }

    /// The right operand of a binary node. Panics on any other node.
    pub fn right(&self) -> ExprRef {
        match self {
            BooleanExpr::And(_, b) | BooleanExpr::Or(_, b) | BooleanExpr::Implies(_, b) => *b,
            other => panic!("right() is only available on a binary node, not: {other:?}"),
        }
    }

    /// The name of a variable node. Panics on any other node.
    pub fn variable_name(&self) -> StringRef {
        match self {
            BooleanExpr::Var(name) => *name,
            other => panic!("variable_name() is only available on a variable, not: {other:?}"),
        }
    }
}

/// Convenience accessors which de-reference the expression first.
impl ExprRef {
    pub fn is_true(&self, ctx: &Context) -> bool {
        ctx.get(*self).is_true()
    }
    pub fn is_false(&self, ctx: &Context) -> bool {
        ctx.get(*self).is_false()
    }
    pub fn is_var(&self, ctx: &Context) -> bool {
        ctx.get(*self).is_var()
    }
    pub fn is_not(&self, ctx: &Context) -> bool {
        ctx.get(*self).is_not()
    }
    pub fn is_and(&self, ctx: &Context) -> bool {
        ctx.get(*self).is_and()
    }
    pub fn is_or(&self, ctx: &Context) -> bool {
        ctx.get(*self).is_or()
    }
    pub fn is_implies(&self, ctx: &Context) -> bool {
        ctx.get(*self).is_implies()
    }
    pub fn variable_name(&self, ctx: &Context) -> StringRef {
        ctx.get(*self).variable_name()
    }

    /// True iff no variable occurs anywhere in the expression tree. Not cached.
    pub fn is_constant(&self, ctx: &Context) -> bool {
        crate::bes::traversal::bottom_up(ctx, *self, |_, expr, children| {
            !expr.is_var() && children.iter().all(|c| *c)
        })
    }
}

/// Visitor support for expression nodes.
pub trait ForEachChild<T: Clone> {
    fn for_each_child(&self, visitor: impl FnMut(&T));
    fn collect_children(&self, children: &mut Vec<T>) {
        self.for_each_child(|c: &T| {
            children.push(c.clone());
        });
    }
    fn num_children(&self) -> usize;
}

impl ForEachChild<ExprRef> for BooleanExpr {
    fn for_each_child(&self, mut visitor: impl FnMut(&ExprRef)) {
        match self {
            BooleanExpr::True | BooleanExpr::False | BooleanExpr::Var(_) => {} // no children
            BooleanExpr::Not(e) => {
                (visitor)(e);
            }
            BooleanExpr::And(a, b) | BooleanExpr::Or(a, b) | BooleanExpr::Implies(a, b) => {
                (visitor)(a);
                (visitor)(b);
            }
        }
    }

    fn num_children(&self) -> usize {
        match self {
            BooleanExpr::True | BooleanExpr::False | BooleanExpr::Var(_) => 0,
            BooleanExpr::Not(_) => 1,
            BooleanExpr::And(_, _) | BooleanExpr::Or(_, _) | BooleanExpr::Implies(_, _) => 2,
        }
    }
}
