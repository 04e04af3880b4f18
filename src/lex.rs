use miette::{Diagnostic, Error, LabeledSpan, NamedSource, SourceSpan, miette};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
#[error("Unexpected character '{token}'")]
#[diagnostic(help("remove or correct the character: `{token}`"))]
pub struct SingleTokenError {
    #[source_code]
    src: NamedSource<String>,

    #[label("this character")]
    bad_bit: SourceSpan,

    pub token: char,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub literal: &'src str,
    pub offset: usize,
}

impl Token<'_> {
    pub fn span(&self) -> SourceSpan {
        SourceSpan::from(self.offset..self.offset + self.literal.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    /// `|`, floor division.
    Pipe,
    /// `^`, exponentiation.
    Caret,
    /// `!`, postfix factorial.
    Bang,
    Equal,
    Ident,
    Number(f64),
}

/// Scanner over one expression buffer.
///
/// Tokens borrow from the input, so a `Lexer` lives no longer than the line it
/// scans; restarting on new input means constructing a fresh `Lexer`, which
/// starts with an empty pushback slot. End of input is the exhaustion of the
/// iterator.
pub struct Lexer<'src> {
    filename: Option<&'src str>,
    whole: &'src str,
    rest: &'src str,
    byte: usize,
    pushback: Option<Token<'src>>,
}

impl<'src> Lexer<'src> {
    pub fn new(filename: Option<&'src str>, input: &'src str) -> Self {
        Lexer {
            filename,
            whole: input,
            rest: input,
            byte: 0,
            pushback: None,
        }
    }

    /// Pushes one token back to be returned by the next `next()` call.
    ///
    /// The pushback slot holds at most one token; ungetting twice without an
    /// intervening `next()` is a bug in the caller, not in the input.
    pub fn unget(&mut self, token: Token<'src>) {
        assert!(
            self.pushback.is_none(),
            "single-slot pushback already occupied"
        );
        self.pushback = Some(token);
    }

    /// Returns the next token without consuming it, filling the pushback slot.
    pub fn peek(&mut self) -> Result<Option<&Token<'src>>, Error> {
        if self.pushback.is_none() {
            match self.next() {
                Some(Ok(token)) => self.pushback = Some(token),
                Some(Err(e)) => return Err(e),
                None => return Ok(None),
            }
        }
        Ok(self.pushback.as_ref())
    }

    pub(crate) fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.filename.unwrap_or("<input>"), self.whole.to_string())
    }

    pub(crate) fn end_span(&self) -> SourceSpan {
        SourceSpan::from(self.whole.len().saturating_sub(1)..self.whole.len())
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Result<Token<'src>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(token) = self.pushback.take() {
            return Some(Ok(token));
        }
        loop {
            let mut chars = self.rest.chars();
            let c = chars.next()?;
            let literal = &self.rest[..c.len_utf8()];
            let offset = self.byte;
            let cur = self.rest;
            self.rest = chars.as_str();
            self.byte += c.len_utf8();

            let process = |kind: TokenKind| {
                Some(Ok(Token {
                    kind,
                    literal,
                    offset,
                }))
            };

            match c {
                '(' => return process(TokenKind::LeftParen),
                ')' => return process(TokenKind::RightParen),
                '+' => return process(TokenKind::Plus),
                '-' => return process(TokenKind::Minus),
                '*' => return process(TokenKind::Star),
                '/' => return process(TokenKind::Slash),
                '%' => return process(TokenKind::Percent),
                '|' => return process(TokenKind::Pipe),
                '^' => return process(TokenKind::Caret),
                '!' => return process(TokenKind::Bang),
                '=' => return process(TokenKind::Equal),
                'a'..='z' | 'A'..='Z' | '_' => {
                    let first_non_ident = cur
                        .find(|c| !matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_'))
                        .unwrap_or(cur.len());

                    let literal = &cur[..first_non_ident];

                    let extra_bytes = literal.len() - c.len_utf8();
                    self.byte += extra_bytes;
                    self.rest = &self.rest[extra_bytes..];

                    return Some(Ok(Token {
                        kind: TokenKind::Ident,
                        literal,
                        offset,
                    }));
                }
                '0'..='9' => {
                    let first_non_digit = cur
                        .find(|c| !matches!(c, '0'..='9' | '.'))
                        .unwrap_or(cur.len());

                    let mut literal = &cur[..first_non_digit];

                    // no exponent notation; at most one interior dot
                    let mut dotted = literal.splitn(3, '.');
                    match (dotted.next(), dotted.next(), dotted.next()) {
                        (Some(one), Some(two), Some(_)) => {
                            literal = &literal[..one.len() + two.len() + 1]
                        }
                        (Some(one), Some(""), None) => literal = &literal[..one.len()],
                        _ => {}
                    };

                    let extra_bytes = literal.len() - c.len_utf8();
                    self.byte += extra_bytes;
                    self.rest = &self.rest[extra_bytes..];

                    let n = match literal.parse() {
                        Ok(n) => n,
                        Err(e) => {
                            return Some(Err(miette!(
                                labels = vec![LabeledSpan::at(
                                    offset..offset + literal.len(),
                                    "this numeric literal"
                                )],
                                "{e}",
                            )
                            .with_source_code(self.whole.to_string())));
                        }
                    };

                    return Some(Ok(Token {
                        kind: TokenKind::Number(n),
                        literal,
                        offset,
                    }));
                }
                ' ' | '\r' | '\t' | '\n' => continue, // Skip whitespace
                c => {
                    return Some(Err(SingleTokenError {
                        src: self.named_source(),
                        bad_bit: SourceSpan::from(offset..offset + c.len_utf8()),
                        token: c,
                    }
                    .into()));
                }
            }
        }
    }
}
