// Copyright 2024 The Regents of the University of California
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@berkeley.edu>

use crate::bes::{
    BooleanEquation, BooleanEquationSystem, BooleanVariable, Context, ExprRef, FixpointSymbol,
};
use fuzzy_matcher::FuzzyMatcher;
use indexmap::IndexSet;
use lazy_static::lazy_static;
use smallvec::SmallVec;

pub fn parse_str(ctx: &mut Context, input: &str, name: Option<&str>) -> Option<BooleanEquationSystem> {
    match Parser::new(ctx).parse(input) {
        Ok(sys) => Some(sys),
        Err(errors) => {
            eprint!("{}", render_errors(&errors, name.unwrap_or("str"), input));
            None
        }
    }
}

#[derive(Debug)]
pub(crate) struct ParserError {
    pub(crate) msg: String,
    pub(crate) start: usize,
    pub(crate) end: usize,
}

pub(crate) type Errors = Vec<ParserError>;

/// Renders accumulated parse errors in a compiler style diagnostic format.
pub(crate) fn render_errors(errors: &Errors, name: &str, source: &str) -> String {
    let report_file = codespan_reporting::files::SimpleFile::new(name, source);
    let config = codespan_reporting::term::Config::default();
    let mut writer = codespan_reporting::term::termcolor::NoColor::new(Vec::new());
    for error in errors.iter() {
        let diagnostic = codespan_reporting::diagnostic::Diagnostic::error()
            .with_message(error.msg.clone())
            .with_labels(vec![codespan_reporting::diagnostic::Label::primary(
                (),
                error.start..error.end,
            )]);
        codespan_reporting::term::emit(&mut writer, &config, &report_file, &diagnostic)
            .expect("failed to render diagnostic");
    }
    String::from_utf8(writer.into_inner()).expect("diagnostics are valid utf8")
}

// Tokenizer

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum TokenKind {
    Ident,
    Equal,
    Semicolon,
    LParen,
    RParen,
    Not,
    And,
    Or,
    Implies,
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    kind: TokenKind,
    text: &'a str,
    start: usize,
    end: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '\''
}

fn tokenize<'a>(input: &'a str, errors: &mut Errors) -> SmallVec<[Token<'a>; 16]> {
    let mut out = SmallVec::new();
    let mut chars = input.char_indices().peekable();
    while let Some((ii, cc)) = chars.next() {
        let single = |kind: TokenKind| Token {
            kind,
            text: &input[ii..ii + 1],
            start: ii,
            end: ii + 1,
        };
        match cc {
            c if c.is_whitespace() => {}
            '%' => {
                // comment until the end of the line
                while let Some((_, c)) = chars.peek() {
                    if *c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '(' => out.push(single(TokenKind::LParen)),
            ')' => out.push(single(TokenKind::RParen)),
            ';' => out.push(single(TokenKind::Semicolon)),
            '!' => out.push(single(TokenKind::Not)),
            '=' => {
                if matches!(chars.peek(), Some((_, '>'))) {
                    chars.next();
                    out.push(Token {
                        kind: TokenKind::Implies,
                        text: &input[ii..ii + 2],
                        start: ii,
                        end: ii + 2,
                    });
                } else {
                    out.push(single(TokenKind::Equal));
                }
            }
            '&' | '|' => {
                if matches!(chars.peek(), Some((_, c2)) if *c2 == cc) {
                    chars.next();
                    let kind = if cc == '&' { TokenKind::And } else { TokenKind::Or };
                    out.push(Token {
                        kind,
                        text: &input[ii..ii + 2],
                        start: ii,
                        end: ii + 2,
                    });
                } else {
                    errors.push(ParserError {
                        msg: format!("Stray `{cc}`. Did you mean `{cc}{cc}`?"),
                        start: ii,
                        end: ii + 1,
                    });
                }
            }
            c if is_ident_start(c) => {
                let mut end = ii + c.len_utf8();
                while let Some((jj, c2)) = chars.peek() {
                    if is_ident_char(*c2) {
                        end = *jj + c2.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push(Token {
                    kind: TokenKind::Ident,
                    text: &input[ii..end],
                    start: ii,
                    end,
                });
            }
            other => {
                errors.push(ParserError {
                    msg: format!("Unexpected character `{other}`."),
                    start: ii,
                    end: ii + other.len_utf8(),
                });
            }
        }
    }
    out
}

// Parser

const KEYWORDS: [&str; 3] = ["mu", "nu", "init"];

lazy_static! {
    static ref KEYWORD_SET: std::collections::HashSet<&'static str> =
        std::collections::HashSet::from(KEYWORDS);
}

/// Indicates success or failure. Errors are not returned directly, but rather added to the parser.
type ParseResult<T = ()> = std::result::Result<T, ()>;

pub(crate) struct Parser<'a> {
    ctx: &'a mut Context,
    errors: Errors,
    input_len: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(ctx: &'a mut Context) -> Self {
        Parser {
            ctx,
            errors: Errors::new(),
            input_len: 0,
        }
    }

    pub(crate) fn parse(&mut self, input: &str) -> Result<BooleanEquationSystem, Errors> {
        self.input_len = input.len();
        let tokens = tokenize(input, &mut self.errors);
        let mut cursor = Cursor {
            tokens: &tokens,
            pos: 0,
        };

        let mut equations = Vec::new();
        let mut bound: IndexSet<&str> = IndexSet::new();
        let mut initial_state: Option<ExprRef> = None;

        while !cursor.is_at_end() {
            let keyword = match self.expect_ident(&mut cursor, "a `mu`, `nu` or `init` statement") {
                Ok(tok) => tok,
                Err(()) => {
                    skip_statement(&mut cursor);
                    continue;
                }
            };
            let res = match keyword.text {
                "mu" | "nu" => {
                    let symbol = if keyword.text == "mu" {
                        FixpointSymbol::Mu
                    } else {
                        FixpointSymbol::Nu
                    };
                    self.parse_equation(&mut cursor, symbol, &mut equations, &mut bound)
                }
                "init" => {
                    if initial_state.is_some() {
                        let _ = self.add_error(
                            keyword.start,
                            keyword.end,
                            "Duplicate `init` declaration.".to_owned(),
                        );
                        Err(())
                    } else {
                        match self.parse_expr(&mut cursor) {
                            Ok(e) => {
                                initial_state = Some(e);
                                self.expect(&mut cursor, TokenKind::Semicolon, "`;`")
                                    .map(|_| ())
                            }
                            Err(()) => Err(()),
                        }
                    }
                }
                other => self.invalid_keyword_error(keyword.start, keyword.end, other),
            };
            if res.is_err() {
                skip_statement(&mut cursor);
            }
        }

        let initial_state = match initial_state {
            Some(e) => e,
            None => {
                let _ = self.add_error(
                    self.input_len,
                    self.input_len,
                    "Missing `init` declaration.".to_owned(),
                );
                return Err(std::mem::take(&mut self.errors));
            }
        };

        if self.errors.is_empty() {
            Ok(BooleanEquationSystem::new(equations, initial_state))
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    fn parse_equation<'t>(
        &mut self,
        cursor: &mut Cursor<'t>,
        symbol: FixpointSymbol,
        equations: &mut Vec<BooleanEquation>,
        bound: &mut IndexSet<&'t str>,
    ) -> ParseResult {
        let var_tok = self.expect(cursor, TokenKind::Ident, "a variable name")?;
        if KEYWORD_SET.contains(var_tok.text) {
            return self.add_error(
                var_tok.start,
                var_tok.end,
                format!("`{}` is a keyword and cannot be bound.", var_tok.text),
            );
        }
        if !bound.insert(var_tok.text) {
            return self.add_error(
                var_tok.start,
                var_tok.end,
                format!("Variable `{}` is bound more than once.", var_tok.text),
            );
        }
        self.expect(cursor, TokenKind::Equal, "`=`")?;
        let rhs = self.parse_expr(cursor)?;
        self.expect(cursor, TokenKind::Semicolon, "`;`")?;
        let name = self.ctx.string(var_tok.text.into());
        equations.push(BooleanEquation::new(
            symbol,
            BooleanVariable::new(name),
            rhs,
        ));
        Ok(())
    }

    /// expr := or [ "=>" expr ]   (right associative)
    fn parse_expr(&mut self, cursor: &mut Cursor) -> ParseResult<ExprRef> {
        let lhs = self.parse_or(cursor)?;
        if cursor.consume(TokenKind::Implies) {
            let rhs = self.parse_expr(cursor)?;
            Ok(self.ctx.implies(lhs, rhs))
        } else {
            Ok(lhs)
        }
    }

    fn parse_or(&mut self, cursor: &mut Cursor) -> ParseResult<ExprRef> {
        let mut lhs = self.parse_and(cursor)?;
        while cursor.consume(TokenKind::Or) {
            let rhs = self.parse_and(cursor)?;
            lhs = self.ctx.or(lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self, cursor: &mut Cursor) -> ParseResult<ExprRef> {
        let mut lhs = self.parse_unary(cursor)?;
        while cursor.consume(TokenKind::And) {
            let rhs = self.parse_unary(cursor)?;
            lhs = self.ctx.and(lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self, cursor: &mut Cursor) -> ParseResult<ExprRef> {
        if cursor.consume(TokenKind::Not) {
            let e = self.parse_unary(cursor)?;
            Ok(self.ctx.not(e))
        } else {
            self.parse_atom(cursor)
        }
    }

    fn parse_atom(&mut self, cursor: &mut Cursor) -> ParseResult<ExprRef> {
        if cursor.consume(TokenKind::LParen) {
            let e = self.parse_expr(cursor)?;
            self.expect(cursor, TokenKind::RParen, "`)`")?;
            return Ok(e);
        }
        let tok = self.expect(cursor, TokenKind::Ident, "an expression")?;
        match tok.text {
            "true" => Ok(self.ctx.tru()),
            "false" => Ok(self.ctx.fals()),
            name if KEYWORD_SET.contains(name) => {
                let _ = self.add_error(
                    tok.start,
                    tok.end,
                    format!("`{name}` is a keyword and cannot be used as a variable."),
                );
                Err(())
            }
            name => Ok(self.ctx.var(name)),
        }
    }

    fn expect<'t>(
        &mut self,
        cursor: &mut Cursor<'t>,
        kind: TokenKind,
        what: &str,
    ) -> ParseResult<Token<'t>> {
        match cursor.peek() {
            Some(tok) if tok.kind == kind => {
                cursor.pos += 1;
                Ok(tok)
            }
            Some(tok) => {
                let _ = self.add_error(
                    tok.start,
                    tok.end,
                    format!("Expected {what}, found `{}`.", tok.text),
                );
                Err(())
            }
            None => {
                let _ = self.add_error(
                    self.input_len,
                    self.input_len,
                    format!("Expected {what}, found the end of the input."),
                );
                Err(())
            }
        }
    }

    fn expect_ident<'t>(
        &mut self,
        cursor: &mut Cursor<'t>,
        what: &str,
    ) -> ParseResult<Token<'t>> {
        self.expect(cursor, TokenKind::Ident, what)
    }

    fn invalid_keyword_error(&mut self, start: usize, end: usize, keyword: &str) -> ParseResult {
        let matcher = fuzzy_matcher::skim::SkimMatcherV2::default();
        let mut matches: Vec<(&&str, i64)> = KEYWORDS
            .iter()
            .flat_map(|other| matcher.fuzzy_match(other, keyword).map(|s| (other, s)))
            .collect();
        matches.sort_by_key(|(_, s)| -(*s));
        let msg = if matches.is_empty() {
            format!("Invalid keyword `{keyword}`. Expected `mu`, `nu` or `init`.")
        } else {
            let suggestions = matches
                .iter()
                .map(|(n, _)| **n)
                .collect::<Vec<&str>>()
                .join(", ");
            format!("Invalid keyword `{keyword}`. Did you mean: {suggestions}?")
        };
        self.add_error(start, end, msg)
    }

    fn add_error(&mut self, start: usize, end: usize, msg: String) -> ParseResult {
        self.errors.push(ParserError { msg, start, end });
        Err(())
    }
}

struct Cursor<'t> {
    tokens: &'t [Token<'t>],
    pos: usize,
}

impl<'t> Cursor<'t> {
    fn peek(&self) -> Option<Token<'t>> {
        self.tokens.get(self.pos).copied()
    }

    fn consume(&mut self, kind: TokenKind) -> bool {
        match self.peek() {
            Some(tok) if tok.kind == kind => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

/// Error recovery: skip to just after the next `;` so that later statements still get checked.
fn skip_statement(cursor: &mut Cursor) {
    while let Some(tok) = cursor.peek() {
        cursor.pos += 1;
        if tok.kind == TokenKind::Semicolon {
            break;
        }
    }
}
