use std::collections::HashMap;

use miette::{Diagnostic, Error, NamedSource, SourceSpan};
use num_complex::Complex64;
use thiserror::Error;

use crate::{
    lex::{Lexer, Token, TokenKind},
    math,
};

#[derive(Error, Debug, Diagnostic)]
#[error("{message}")]
pub struct SyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    bad_bit: SourceSpan,

    pub message: String,
}

#[derive(Error, Debug, Diagnostic)]
#[error("unbound identifier `{name}`")]
#[diagnostic(help("assign it first: `{name} = ...`"))]
pub struct UnboundIdentifier {
    #[source_code]
    src: NamedSource<String>,

    #[label("never assigned")]
    bad_bit: SourceSpan,

    pub name: String,
}

/// Flat variable table, one namespace for the whole session.
///
/// Seeded with `i` (the imaginary unit) and the real constants `pi` and `e`;
/// nothing stops an expression from reassigning them.
#[derive(Debug)]
pub struct Env {
    values: HashMap<String, Complex64>,
}

impl Env {
    pub fn new() -> Self {
        let mut values = HashMap::new();
        values.insert("i".to_string(), Complex64::i());
        values.insert("pi".to_string(), Complex64::new(std::f64::consts::PI, 0.0));
        values.insert("e".to_string(), Complex64::new(std::f64::consts::E, 0.0));
        Env { values }
    }

    pub fn get(&self, name: &str) -> Option<Complex64> {
        self.values.get(name).copied()
    }

    /// Inserts or overwrites; never fails.
    pub fn set(&mut self, name: &str, value: Complex64) {
        self.values.insert(name.to_string(), value);
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursive-descent parser that evaluates as it goes.
///
/// Grammar, loosest first, left-associative unless noted:
///
/// ```text
/// expression := IDENT '=' expression            assignment, right-assoc
///             | term { ('+'|'-') term }
/// term       := postfix { ('*'|'/'|'%'|'|') postfix }
/// postfix    := primary { '!' }
/// primary    := atom [ '^' primary ]            right-assoc
/// atom       := NUMBER | IDENT | '-' atom | '(' expression ')'
/// ```
///
/// So unary `-` binds tighter than `^` (`-2^2` is `(-2)^2`), and `^` binds
/// tighter than `!` (`2^3!` is `(2^3)!`).
///
/// The parser owns the variable table and survives across expressions; the
/// caller hands it a fresh `Lexer` per expression. Evaluation is left to
/// right with immediate table mutation, so assignments that complete before
/// a later subexpression fails stay applied.
pub struct Parser {
    env: Env,
    depth: usize,
    last: Complex64,
}

impl Parser {
    pub fn new() -> Self {
        Parser {
            env: Env::new(),
            depth: 0,
            last: Complex64::new(0.0, 0.0),
        }
    }

    /// The most recent successful result.
    pub fn result(&self) -> Complex64 {
        self.last
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Env {
        &mut self.env
    }

    /// Evaluates one complete expression; the token stream must be exhausted
    /// once the expression ends.
    pub fn parse(&mut self, lexer: &mut Lexer<'_>) -> Result<Complex64, Error> {
        self.depth = 0;
        let value = self.expression(lexer)?;
        match lexer.next() {
            None => {}
            Some(Ok(token)) if token.kind == TokenKind::RightParen => {
                return Err(syntax_error(lexer, token.span(), "unmatched `)`"));
            }
            Some(Ok(token)) => {
                return Err(syntax_error(
                    lexer,
                    token.span(),
                    format!("unexpected `{}` after the expression", token.literal),
                ));
            }
            Some(Err(e)) => return Err(e),
        }
        debug_assert_eq!(self.depth, 0, "parenthesis depth out of balance");
        self.last = value;
        Ok(value)
    }

    fn expression(&mut self, lexer: &mut Lexer<'_>) -> Result<Complex64, Error> {
        let first = advance(lexer)?;

        // Assignment only when an identifier is immediately followed by `=`;
        // otherwise the identifier is a value and `first` is handed down as
        // the already-read head of the arithmetic expression.
        if first.kind == TokenKind::Ident
            && matches!(lexer.peek()?, Some(token) if token.kind == TokenKind::Equal)
        {
            let _ = lexer.next();
            let value = self.expression(lexer)?;
            self.env.set(first.literal, value);
            return Ok(value);
        }

        let mut sum = self.term(lexer, Some(first))?;
        loop {
            match lexer.next() {
                Some(Ok(token)) => match token.kind {
                    TokenKind::Plus => sum += self.term(lexer, None)?,
                    TokenKind::Minus => sum -= self.term(lexer, None)?,
                    _ => {
                        lexer.unget(token);
                        break;
                    }
                },
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }
        Ok(math::ensure_finite(sum)?)
    }

    fn term<'src>(
        &mut self,
        lexer: &mut Lexer<'src>,
        pending: Option<Token<'src>>,
    ) -> Result<Complex64, Error> {
        let mut product = self.postfix(lexer, pending)?;
        loop {
            match lexer.next() {
                Some(Ok(token)) => match token.kind {
                    TokenKind::Star => product *= self.postfix(lexer, None)?,
                    TokenKind::Slash => {
                        let divisor = self.postfix(lexer, None)?;
                        product = math::safe_div(product, divisor)?;
                    }
                    TokenKind::Pipe => {
                        let divisor = self.postfix(lexer, None)?;
                        product = math::safe_floordiv(product, divisor)?;
                    }
                    TokenKind::Percent => {
                        let divisor = self.postfix(lexer, None)?;
                        let left = math::as_integer(product, '%')?;
                        let right = math::as_integer(divisor, '%')?;
                        product = Complex64::new(math::safe_mod(left, right)? as f64, 0.0);
                    }
                    _ => {
                        lexer.unget(token);
                        break;
                    }
                },
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }
        Ok(product)
    }

    fn postfix<'src>(
        &mut self,
        lexer: &mut Lexer<'src>,
        pending: Option<Token<'src>>,
    ) -> Result<Complex64, Error> {
        let mut value = self.primary(lexer, pending)?;
        loop {
            match lexer.next() {
                Some(Ok(token)) if token.kind == TokenKind::Bang => {
                    let n = math::factorial_operand(value)?;
                    value = Complex64::new(math::factorial(n)? as f64, 0.0);
                }
                Some(Ok(token)) => {
                    lexer.unget(token);
                    break;
                }
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }
        Ok(value)
    }

    fn primary<'src>(
        &mut self,
        lexer: &mut Lexer<'src>,
        pending: Option<Token<'src>>,
    ) -> Result<Complex64, Error> {
        let base = self.atom(lexer, pending)?;
        match lexer.next() {
            Some(Ok(token)) if token.kind == TokenKind::Caret => {
                let exponent = self.primary(lexer, None)?;
                Ok(math::pow(base, exponent))
            }
            Some(Ok(token)) => {
                lexer.unget(token);
                Ok(base)
            }
            Some(Err(e)) => Err(e),
            None => Ok(base),
        }
    }

    fn atom<'src>(
        &mut self,
        lexer: &mut Lexer<'src>,
        pending: Option<Token<'src>>,
    ) -> Result<Complex64, Error> {
        let token = match pending {
            Some(token) => token,
            None => advance(lexer)?,
        };
        match token.kind {
            TokenKind::Number(n) => Ok(Complex64::new(n, 0.0)),
            TokenKind::Ident => match self.env.get(token.literal) {
                Some(value) => Ok(value),
                None => Err(UnboundIdentifier {
                    src: lexer.named_source(),
                    bad_bit: token.span(),
                    name: token.literal.to_string(),
                }
                .into()),
            },
            TokenKind::Minus => Ok(-self.atom(lexer, None)?),
            TokenKind::LeftParen => {
                self.depth += 1;
                let value = self.expression(lexer)?;
                self.consume_closing_paren(lexer)?;
                Ok(value)
            }
            _ => Err(syntax_error(
                lexer,
                token.span(),
                format!(
                    "expected a number, a variable, `-`, or `(`, found `{}`",
                    token.literal
                ),
            )),
        }
    }

    fn consume_closing_paren(&mut self, lexer: &mut Lexer<'_>) -> Result<(), Error> {
        match lexer.next() {
            Some(Ok(token)) if token.kind == TokenKind::RightParen => {
                self.depth -= 1;
                Ok(())
            }
            Some(Ok(token)) => Err(syntax_error(
                lexer,
                token.span(),
                format!("expected `)`, found `{}`", token.literal),
            )),
            Some(Err(e)) => Err(e),
            None => Err(syntax_error(lexer, lexer.end_span(), "unmatched `(`")),
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

fn advance<'src>(lexer: &mut Lexer<'src>) -> Result<Token<'src>, Error> {
    match lexer.next() {
        Some(Ok(token)) => Ok(token),
        Some(Err(e)) => Err(e),
        None => Err(syntax_error(
            lexer,
            lexer.end_span(),
            "unexpected end of expression",
        )),
    }
}

fn syntax_error(lexer: &Lexer<'_>, span: SourceSpan, message: impl Into<String>) -> Error {
    SyntaxError {
        src: lexer.named_source(),
        bad_bit: span,
        message: message.into(),
    }
    .into()
}
