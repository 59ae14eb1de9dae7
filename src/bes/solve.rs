// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use crate::bes::traversal::transform_expr;
use crate::bes::{BesError, BooleanEquationSystem, BooleanExpr, Context, ExprRef, StringRef};
use crate::bes::{FixpointSymbol, SerializableIrNode};

/// Standard constant folding over all five operators plus double negation removal.
pub fn simplify(ctx: &mut Context, expr: ExprRef) -> ExprRef {
    transform_expr(ctx, expr, &mut |ctx, e| {
        let node = *ctx.get(e);
        match node {
            BooleanExpr::Not(a) => {
                let child = *ctx.get(a);
                match child {
                    BooleanExpr::True => Some(ctx.fals()),
                    BooleanExpr::False => Some(ctx.tru()),
                    BooleanExpr::Not(inner) => Some(inner),
                    _ => None,
                }
            }
            BooleanExpr::And(a, b) => {
                if a.is_true(ctx) {
                    Some(b)
                } else if b.is_true(ctx) {
                    Some(a)
                } else if a.is_false(ctx) || b.is_false(ctx) {
                    Some(ctx.fals())
                } else if a == b {
                    Some(a)
                } else {
                    None
                }
            }
            BooleanExpr::Or(a, b) => {
                if a.is_false(ctx) {
                    Some(b)
                } else if b.is_false(ctx) {
                    Some(a)
                } else if a.is_true(ctx) || b.is_true(ctx) {
                    Some(ctx.tru())
                } else if a == b {
                    Some(a)
                } else {
                    None
                }
            }
            BooleanExpr::Implies(a, b) => {
                if a.is_true(ctx) {
                    Some(b)
                } else if a.is_false(ctx) || b.is_true(ctx) {
                    Some(ctx.tru())
                } else if b.is_false(ctx) {
                    Some(ctx.not(a))
                } else {
                    None
                }
            }
            _ => None,
        }
    })
}

/// Replaces every reference to `name` with `replacement`.
pub fn replace_variable(
    ctx: &mut Context,
    expr: ExprRef,
    name: StringRef,
    replacement: ExprRef,
) -> ExprRef {
    transform_expr(ctx, expr, &mut |ctx, e| match ctx.get(e) {
        BooleanExpr::Var(n) if *n == name => Some(replacement),
        _ => None,
    })
}

/// Solves a closed equation system by sequential Gauss elimination.
///
/// Equations are processed back to front: each equation is closed by substituting its own
/// variable with `false` (mu) resp. `true` (nu), folded, and the solved right-hand side is
/// substituted into all earlier equations and the initial expression. Assumes the usual
/// positive form (no negation applied to bound variables); the final initial expression
/// must fold to a constant.
pub fn solve(ctx: &mut Context, sys: &BooleanEquationSystem) -> Result<bool, BesError> {
    let bound = sys.binding_variables();
    if let Some(unbound) = sys
        .occurring_variables(ctx)
        .iter()
        .find(|v| !bound.contains(*v))
    {
        return Err(BesError::NotClosed {
            name: ctx.get_str(*unbound).to_string(),
        });
    }

    let mut rhs: Vec<ExprRef> = sys.equations().iter().map(|eq| eq.rhs).collect();
    let mut init = sys.initial_state;

    for i in (0..rhs.len()).rev() {
        let eq = &sys.equations()[i];
        let name = eq.variable.name();
        let approximation = match eq.symbol {
            FixpointSymbol::Mu => ctx.fals(),
            FixpointSymbol::Nu => ctx.tru(),
        };
        let closed = replace_variable(ctx, rhs[i], name, approximation);
        let closed = simplify(ctx, closed);
        log::debug!(
            "solved {} {} = {}",
            eq.symbol,
            ctx.get_str(name),
            closed.serialize_to_str(ctx)
        );
        for j in 0..i {
            let substituted = replace_variable(ctx, rhs[j], name, closed);
            rhs[j] = simplify(ctx, substituted);
        }
        let substituted = replace_variable(ctx, init, name, closed);
        init = simplify(ctx, substituted);
        rhs[i] = closed;
    }

    match ctx.get(init) {
        BooleanExpr::True => Ok(true),
        BooleanExpr::False => Ok(false),
        _ => Err(BesError::NotConstant {
            expr: init.serialize_to_str(ctx),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bes::{BooleanEquation, BooleanVariable};

    #[test]
    fn fold_constants() {
        let mut ctx = Context::default();
        let t = ctx.tru();
        let f = ctx.fals();
        let x = ctx.var("x");
        let a = ctx.and(t, x);
        assert_eq!(simplify(&mut ctx, a), x);
        let o = ctx.or(x, f);
        assert_eq!(simplify(&mut ctx, o), x);
        let i = ctx.implies(f, x);
        assert_eq!(simplify(&mut ctx, i), t);
        let nn = ctx.not(x);
        let nn = ctx.not(nn);
        assert_eq!(simplify(&mut ctx, nn), x);
    }

    #[test]
    fn solve_nu_or() {
        // nu X = X || Y; mu Y = false; init X  ==> true
        let mut ctx = Context::default();
        let x_name = ctx.string("X".into());
        let y_name = ctx.string("Y".into());
        let x = ctx.var_from_ref(x_name);
        let y = ctx.var_from_ref(y_name);
        let x_or_y = ctx.or(x, y);
        let f = ctx.fals();
        let sys = BooleanEquationSystem::new(
            vec![
                BooleanEquation::new(FixpointSymbol::Nu, BooleanVariable::new(x_name), x_or_y),
                BooleanEquation::new(FixpointSymbol::Mu, BooleanVariable::new(y_name), f),
            ],
            x,
        );
        assert!(solve(&mut ctx, &sys).unwrap());
    }

    #[test]
    fn solve_mu_self_loop() {
        // mu X = X; init X  ==> false
        let mut ctx = Context::default();
        let x_name = ctx.string("X".into());
        let x = ctx.var_from_ref(x_name);
        let sys = BooleanEquationSystem::new(
            vec![BooleanEquation::new(
                FixpointSymbol::Mu,
                BooleanVariable::new(x_name),
                x,
            )],
            x,
        );
        assert!(!solve(&mut ctx, &sys).unwrap());
    }

    #[test]
    fn solve_requires_closed_system() {
        let mut ctx = Context::default();
        let x_name = ctx.string("X".into());
        let x = ctx.var_from_ref(x_name);
        let y = ctx.var("Y");
        let x_or_y = ctx.or(x, y);
        let sys = BooleanEquationSystem::new(
            vec![BooleanEquation::new(
                FixpointSymbol::Nu,
                BooleanVariable::new(x_name),
                x_or_y,
            )],
            x,
        );
        assert!(matches!(
            solve(&mut ctx, &sys),
            Err(BesError::NotClosed { name }) if name == "Y"
        ));
    }
}
