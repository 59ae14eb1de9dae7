// Copyright 2024 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>

use crate::bes::parse::{render_errors, Parser};
use crate::bes::{
    BesError, BooleanEquation, BooleanEquationSystem, BooleanExpr, BooleanVariable, Context,
    ExprRef, FixpointSymbol, SerializableIrNode,
};
use std::io::{Read, Write};

pub const BES_MARKER: &[u8; 6] = b"besBES";
pub const BES_VERSION: [u8; 2] = [0x01, 0x00];

// constructor tags of the binary encoding
const TAG_SYSTEM: u8 = 0x01;
const TAG_TRUE: u8 = 0x10;
const TAG_FALSE: u8 = 0x11;
const TAG_VAR: u8 = 0x12;
const TAG_NOT: u8 = 0x13;
const TAG_AND: u8 = 0x14;
const TAG_OR: u8 = 0x15;
const TAG_IMPLIES: u8 = 0x16;

/// Loads an equation system from a file. An empty filename reads from stdin.
/// The binary format is auto-detected by its marker, anything else is parsed as text.
pub fn load(ctx: &mut Context, filename: &str) -> Result<BooleanEquationSystem, BesError> {
    if filename.is_empty() {
        load_from(ctx, &mut std::io::stdin().lock(), "stdin")
    } else {
        let mut f = std::fs::File::open(filename).map_err(|err| BesError::Io {
            origin: filename.to_string(),
            err,
        })?;
        load_from(ctx, &mut f, filename)
    }
}

pub fn load_from(
    ctx: &mut Context,
    reader: &mut impl Read,
    origin: &str,
) -> Result<BooleanEquationSystem, BesError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).map_err(|err| BesError::Io {
        origin: origin.to_string(),
        err,
    })?;
    let sys = if bytes.starts_with(BES_MARKER) {
        decode_binary(ctx, &bytes, origin)?
    } else {
        let text = std::str::from_utf8(&bytes).map_err(|_| BesError::Format {
            origin: origin.to_string(),
            msg: "not valid utf8 text".to_string(),
        })?;
        Parser::new(ctx)
            .parse(text)
            .map_err(|errors| BesError::Parse {
                origin: origin.to_string(),
                diagnostics: render_errors(&errors, origin, text),
            })?
    };
    log::info!(
        "loaded equation system with {} equations from {origin}",
        sys.equations().len()
    );
    Ok(sys)
}

/// Saves an equation system to a file. An empty filename writes to stdout.
pub fn save(
    ctx: &Context,
    sys: &BooleanEquationSystem,
    filename: &str,
    binary: bool,
) -> Result<(), BesError> {
    if filename.is_empty() {
        save_to(ctx, sys, &mut std::io::stdout().lock(), binary, "stdout")
    } else {
        let mut f = std::fs::File::create(filename).map_err(|err| BesError::Io {
            origin: filename.to_string(),
            err,
        })?;
        save_to(ctx, sys, &mut f, binary, filename)
    }
}

pub fn save_to(
    ctx: &Context,
    sys: &BooleanEquationSystem,
    writer: &mut impl Write,
    binary: bool,
    origin: &str,
) -> Result<(), BesError> {
    let res = if binary {
        encode_binary(ctx, sys, writer)
    } else {
        sys.serialize(ctx, writer)
    };
    res.map_err(|err| BesError::Io {
        origin: origin.to_string(),
        err,
    })
}

fn encode_binary(
    ctx: &Context,
    sys: &BooleanEquationSystem,
    writer: &mut impl Write,
) -> std::io::Result<()> {
    writer.write_all(BES_MARKER)?;
    writer.write_all(&BES_VERSION)?;
    writer.write_all(&[TAG_SYSTEM])?;
    writer.write_all(&(sys.equations().len() as u32).to_le_bytes())?;
    for eq in sys.equations() {
        let symbol = match eq.symbol {
            FixpointSymbol::Mu => 0u8,
            FixpointSymbol::Nu => 1u8,
        };
        writer.write_all(&[symbol])?;
        encode_str(ctx.get_str(eq.variable.name()), writer)?;
        encode_expr(ctx, eq.rhs, writer)?;
    }
    encode_expr(ctx, sys.initial_state, writer)
}

fn encode_str(value: &str, writer: &mut impl Write) -> std::io::Result<()> {
    writer.write_all(&(value.len() as u32).to_le_bytes())?;
    writer.write_all(value.as_bytes())
}

fn encode_expr(ctx: &Context, expr: ExprRef, writer: &mut impl Write) -> std::io::Result<()> {
    match ctx.get(expr) {
        BooleanExpr::True => writer.write_all(&[TAG_TRUE]),
        BooleanExpr::False => writer.write_all(&[TAG_FALSE]),
        BooleanExpr::Var(name) => {
            writer.write_all(&[TAG_VAR])?;
            encode_str(ctx.get_str(*name), writer)
        }
        BooleanExpr::Not(e) => {
            writer.write_all(&[TAG_NOT])?;
            encode_expr(ctx, *e, writer)
        }
        BooleanExpr::And(a, b) => {
            writer.write_all(&[TAG_AND])?;
            encode_expr(ctx, *a, writer)?;
            encode_expr(ctx, *b, writer)
        }
        BooleanExpr::Or(a, b) => {
            writer.write_all(&[TAG_OR])?;
            encode_expr(ctx, *a, writer)?;
            encode_expr(ctx, *b, writer)
        }
        BooleanExpr::Implies(a, b) => {
            writer.write_all(&[TAG_IMPLIES])?;
            encode_expr(ctx, *a, writer)?;
            encode_expr(ctx, *b, writer)
        }
    }
}

fn decode_binary(
    ctx: &mut Context,
    bytes: &[u8],
    origin: &str,
) -> Result<BooleanEquationSystem, BesError> {
    let mut decoder = Decoder {
        bytes,
        pos: BES_MARKER.len(),
        origin,
    };
    let version = [decoder.u8()?, decoder.u8()?];
    if version != BES_VERSION {
        return Err(decoder.malformed(format!("unsupported version {version:?}")));
    }
    let tag = decoder.u8()?;
    if tag != TAG_SYSTEM {
        return Err(decoder.malformed(format!("expected a system constructor, found tag {tag:#x}")));
    }
    let count = decoder.u32()? as usize;
    let mut equations = Vec::with_capacity(count);
    for _ in 0..count {
        let symbol = match decoder.u8()? {
            0 => FixpointSymbol::Mu,
            1 => FixpointSymbol::Nu,
            other => {
                return Err(decoder.malformed(format!("invalid fixpoint symbol {other:#x}")));
            }
        };
        let name = decoder.str()?;
        let name_ref = ctx.string(name.into());
        let rhs = decoder.expr(ctx)?;
        equations.push(BooleanEquation::new(
            symbol,
            BooleanVariable::new(name_ref),
            rhs,
        ));
    }
    let initial_state = decoder.expr(ctx)?;
    if decoder.pos != bytes.len() {
        return Err(decoder.malformed("trailing data after the equation system".to_string()));
    }
    Ok(BooleanEquationSystem::new(equations, initial_state))
}

struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
    origin: &'a str,
}

impl<'a> Decoder<'a> {
    fn malformed(&self, msg: String) -> BesError {
        BesError::Format {
            origin: self.origin.to_string(),
            msg,
        }
    }

    fn u8(&mut self) -> Result<u8, BesError> {
        match self.bytes.get(self.pos) {
            Some(b) => {
                self.pos += 1;
                Ok(*b)
            }
            None => Err(self.malformed("unexpected end of data".to_string())),
        }
    }

    fn u32(&mut self) -> Result<u32, BesError> {
        if self.pos + 4 > self.bytes.len() {
            return Err(self.malformed("unexpected end of data".to_string()));
        }
        let value = u32::from_le_bytes(self.bytes[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(value)
    }

    fn str(&mut self) -> Result<String, BesError> {
        let len = self.u32()? as usize;
        if self.pos + len > self.bytes.len() {
            return Err(self.malformed("string runs past the end of the data".to_string()));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        String::from_utf8(slice.to_vec())
            .map_err(|_| self.malformed("string is not valid utf8".to_string()))
    }

    fn expr(&mut self, ctx: &mut Context) -> Result<ExprRef, BesError> {
        match self.u8()? {
            TAG_TRUE => Ok(ctx.tru()),
            TAG_FALSE => Ok(ctx.fals()),
            TAG_VAR => {
                let name = self.str()?;
                Ok(ctx.var(&name))
            }
            TAG_NOT => {
                let e = self.expr(ctx)?;
                Ok(ctx.not(e))
            }
            TAG_AND => {
                let a = self.expr(ctx)?;
                let b = self.expr(ctx)?;
                Ok(ctx.and(a, b))
            }
            TAG_OR => {
                let a = self.expr(ctx)?;
                let b = self.expr(ctx)?;
                Ok(ctx.or(a, b))
            }
            TAG_IMPLIES => {
                let a = self.expr(ctx)?;
                let b = self.expr(ctx)?;
                Ok(ctx.implies(a, b))
            }
            other => Err(self.malformed(format!("invalid expression tag {other:#x}"))),
        }
    }
}
