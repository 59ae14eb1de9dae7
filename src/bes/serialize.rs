// Copyright 2024 The Regents of the University of California
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@berkeley.edu>

use crate::bes::{BooleanEquation, BooleanEquationSystem, BooleanExpr, Context, ExprRef};
use std::io::Write;

pub trait SerializableIrNode {
    fn serialize<W: Write>(&self, ctx: &Context, writer: &mut W) -> std::io::Result<()>;
    fn serialize_to_str(&self, ctx: &Context) -> String {
        let mut buf = Vec::new();
        self.serialize(ctx, &mut buf)
            .expect("Failed to write to string!");
        String::from_utf8(buf).expect("Failed to read string we wrote!")
    }
}

impl SerializableIrNode for BooleanExpr {
    fn serialize<W: Write>(&self, ctx: &Context, writer: &mut W) -> std::io::Result<()> {
        serialize_expr(self, ctx, writer, false)
    }
}

/// Internal serialize function for expressions. `needs_parens` is set on recursive calls
/// only: a binary node wraps itself when asked to, a negation and the atoms never do.
fn serialize_expr<W: Write>(
    expr: &BooleanExpr,
    ctx: &Context,
    writer: &mut W,
    needs_parens: bool,
) -> std::io::Result<()> {
    match expr {
        BooleanExpr::True => write!(writer, "true"),
        BooleanExpr::False => write!(writer, "false"),
        BooleanExpr::Var(name) => write!(writer, "{}", ctx.get_str(*name)),
        BooleanExpr::Not(e) => {
            write!(writer, "!")?;
            serialize_expr_ref(e, ctx, writer, true)
        }
        BooleanExpr::And(a, b) => serialize_bin_op(ctx, writer, "&&", a, b, needs_parens),
        BooleanExpr::Or(a, b) => serialize_bin_op(ctx, writer, "||", a, b, needs_parens),
        BooleanExpr::Implies(a, b) => serialize_bin_op(ctx, writer, "=>", a, b, needs_parens),
    }
}

fn serialize_bin_op<W: Write>(
    ctx: &Context,
    writer: &mut W,
    op: &str,
    a: &ExprRef,
    b: &ExprRef,
    needs_parens: bool,
) -> std::io::Result<()> {
    if needs_parens {
        write!(writer, "(")?;
    }
    serialize_expr_ref(a, ctx, writer, true)?;
    write!(writer, " {op} ")?;
    serialize_expr_ref(b, ctx, writer, true)?;
    if needs_parens {
        write!(writer, ")")?;
    }
    Ok(())
}

/// De-reference and serialize.
#[inline]
fn serialize_expr_ref<W: Write>(
    expr: &ExprRef,
    ctx: &Context,
    writer: &mut W,
    needs_parens: bool,
) -> std::io::Result<()> {
    serialize_expr(ctx.get(*expr), ctx, writer, needs_parens)
}

impl SerializableIrNode for ExprRef {
    fn serialize<W: Write>(&self, ctx: &Context, writer: &mut W) -> std::io::Result<()> {
        ctx.get(*self).serialize(ctx, writer)
    }
}

impl SerializableIrNode for BooleanEquation {
    fn serialize<W: Write>(&self, ctx: &Context, writer: &mut W) -> std::io::Result<()> {
        write!(
            writer,
            "{} {} = ",
            self.symbol,
            ctx.get_str(self.variable.name())
        )?;
        self.rhs.serialize(ctx, writer)?;
        write!(writer, ";")
    }
}

impl SerializableIrNode for BooleanEquationSystem {
    fn serialize<W: Write>(&self, ctx: &Context, writer: &mut W) -> std::io::Result<()> {
        for eq in self.equations() {
            eq.serialize(ctx, writer)?;
            writeln!(writer)?;
        }
        write!(writer, "init ")?;
        self.initial_state.serialize(ctx, writer)?;
        writeln!(writer, ";")
    }
}
