// Copyright 2024 The Regents of the University of California
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@berkeley.edu>

use crate::bes::expr::ForEachChild;
use crate::bes::{BooleanExpr, Context, ExprRef, StringRef};
use indexmap::IndexSet;

/// Tags an equation as defining the least (`mu`) or greatest (`nu`) solution
/// for its bound variable.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum FixpointSymbol {
    Mu,
    Nu,
}

impl FixpointSymbol {
    pub fn is_mu(&self) -> bool {
        matches!(self, FixpointSymbol::Mu)
    }
    pub fn is_nu(&self) -> bool {
        matches!(self, FixpointSymbol::Nu)
    }
}

impl std::fmt::Display for FixpointSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FixpointSymbol::Mu => write!(f, "mu"),
            FixpointSymbol::Nu => write!(f, "nu"),
        }
    }
}

/// A variable bound by an equation. Two variables are equal iff their names are equal.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct BooleanVariable(StringRef);

impl BooleanVariable {
    pub fn new(name: StringRef) -> Self {
        BooleanVariable(name)
    }

    pub fn name(&self) -> StringRef {
        self.0
    }

    pub fn name_str<'a>(&self, ctx: &'a Context) -> &'a str {
        ctx.get_str(self.0)
    }
}

/// Binds a variable as the least/greatest fixpoint of an expression which may
/// reference the variable itself and other variables of the system.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct BooleanEquation {
    pub symbol: FixpointSymbol,
    pub variable: BooleanVariable,
    pub rhs: ExprRef,
}

impl BooleanEquation {
    pub fn new(symbol: FixpointSymbol, variable: BooleanVariable, rhs: ExprRef) -> Self {
        BooleanEquation {
            symbol,
            variable,
            rhs,
        }
    }
}

/// An ordered sequence of equations plus one designated initial expression.
///
/// Closedness (every occurring variable is bound) is checked by [`BooleanEquationSystem::is_closed`]
/// and never auto-enforced. The constructor also tolerates duplicate bindings;
/// [`BooleanEquationSystem::duplicate_bindings`] reports them and the text parser rejects them.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct BooleanEquationSystem {
    equations: Vec<BooleanEquation>,
    pub initial_state: ExprRef,
}

impl BooleanEquationSystem {
    pub fn new(equations: Vec<BooleanEquation>, initial_state: ExprRef) -> Self {
        BooleanEquationSystem {
            equations,
            initial_state,
        }
    }

    pub fn equations(&self) -> &[BooleanEquation] {
        &self.equations
    }

    pub fn equations_mut(&mut self) -> &mut Vec<BooleanEquation> {
        &mut self.equations
    }

    /// The set of all left-hand-side variables. Duplicates collapse silently.
    pub fn binding_variables(&self) -> IndexSet<StringRef> {
        self.equations
            .iter()
            .map(|eq| eq.variable.name())
            .collect()
    }

    /// The set of all variables referenced by any right-hand side or by the
    /// initial expression.
    pub fn occurring_variables(&self, ctx: &Context) -> IndexSet<StringRef> {
        let mut out = IndexSet::new();
        for eq in self.equations.iter() {
            collect_variables(ctx, eq.rhs, &mut out);
        }
        collect_variables(ctx, self.initial_state, &mut out);
        out
    }

    /// True iff every occurring variable (right-hand sides and initial expression)
    /// is bound by some equation.
    pub fn is_closed(&self, ctx: &Context) -> bool {
        let bound = self.binding_variables();
        self.occurring_variables(ctx)
            .iter()
            .all(|v| bound.contains(v))
    }

    /// Names bound by more than one equation, in first-occurrence order.
    pub fn duplicate_bindings(&self) -> Vec<StringRef> {
        let mut seen = IndexSet::new();
        let mut dups = IndexSet::new();
        for eq in self.equations.iter() {
            if !seen.insert(eq.variable.name()) {
                dups.insert(eq.variable.name());
            }
        }
        dups.into_iter().collect()
    }

    /// Applies a term-level substitution to the right-hand side of every equation
    /// in place. Equation count and ordering are preserved. The initial expression
    /// is not touched.
    pub fn substitute(
        &mut self,
        ctx: &mut Context,
        mut f: impl FnMut(&mut Context, ExprRef) -> ExprRef,
    ) {
        for eq in self.equations.iter_mut() {
            eq.rhs = (f)(ctx, eq.rhs);
        }
    }
}

/// Collects all variable names referenced by an expression.
pub fn collect_variables(ctx: &Context, expr: ExprRef, out: &mut IndexSet<StringRef>) {
    let mut todo = vec![expr];
    while let Some(e) = todo.pop() {
        let node = ctx.get(e);
        if let BooleanExpr::Var(name) = node {
            out.insert(*name);
        }
        node.for_each_child(|c| todo.push(*c));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// { nu X = X || Y; mu Y = false; init X; }
    fn sample_system(ctx: &mut Context) -> BooleanEquationSystem {
        let x_name = ctx.string("X".into());
        let y_name = ctx.string("Y".into());
        let x = ctx.var_from_ref(x_name);
        let y = ctx.var_from_ref(y_name);
        let x_or_y = ctx.or(x, y);
        let f = ctx.fals();
        BooleanEquationSystem::new(
            vec![
                BooleanEquation::new(FixpointSymbol::Nu, BooleanVariable::new(x_name), x_or_y),
                BooleanEquation::new(FixpointSymbol::Mu, BooleanVariable::new(y_name), f),
            ],
            x,
        )
    }

    #[test]
    fn closedness() {
        let mut ctx = Context::default();
        let sys = sample_system(&mut ctx);
        assert!(sys.is_closed(&ctx));

        // removing the Y equation leaves Y unbound in X's right-hand side
        let mut open = sys.clone();
        open.equations_mut().pop();
        assert!(!open.is_closed(&ctx));
    }

    #[test]
    fn variable_sets() {
        let mut ctx = Context::default();
        let sys = sample_system(&mut ctx);
        let bound = sys.binding_variables();
        assert_eq!(bound.len(), 2);
        let occurring = sys.occurring_variables(&ctx);
        assert_eq!(occurring.len(), 2);
    }

    #[test]
    fn duplicate_bindings_are_reported_not_collapsed() {
        let mut ctx = Context::default();
        let x_name = ctx.string("X".into());
        let t = ctx.tru();
        let f = ctx.fals();
        let x = ctx.var_from_ref(x_name);
        let sys = BooleanEquationSystem::new(
            vec![
                BooleanEquation::new(FixpointSymbol::Mu, BooleanVariable::new(x_name), t),
                BooleanEquation::new(FixpointSymbol::Nu, BooleanVariable::new(x_name), f),
            ],
            x,
        );
        assert_eq!(sys.equations().len(), 2, "construction must not deduplicate");
        assert_eq!(sys.binding_variables().len(), 1);
        assert_eq!(sys.duplicate_bindings(), vec![x_name]);
    }

    #[test]
    fn substitution_preserves_count_and_order() {
        let mut ctx = Context::default();
        let mut sys = sample_system(&mut ctx);
        let names: Vec<_> = sys.equations().iter().map(|e| e.variable).collect();
        let t = ctx.tru();
        sys.substitute(&mut ctx, |_, _| t);
        assert_eq!(sys.equations().len(), 2);
        let after: Vec<_> = sys.equations().iter().map(|e| e.variable).collect();
        assert_eq!(names, after);
        assert!(sys.equations().iter().all(|e| e.rhs == t));
    }
}
