use calc_interpreter::lex::{Lexer, SingleTokenError, TokenKind};
use calc_interpreter::math::{DivideByZero, DomainError};
use calc_interpreter::parse::{Parser, SyntaxError, UnboundIdentifier};
use calc_interpreter::DisplayComplex;
use num_complex::Complex64;

fn eval(src: &str) -> Result<Complex64, miette::Error> {
    Parser::new().parse(&mut Lexer::new(None, src))
}

fn eval_ok(src: &str) -> Complex64 {
    eval(src).unwrap_or_else(|e| panic!("`{src}` failed: {e:?}"))
}

fn eval_real(src: &str) -> f64 {
    let value = eval_ok(src);
    assert_eq!(value.im, 0.0, "`{src}` produced an imaginary part");
    value.re
}

/// Evaluates each line against one shared parser, returning the last value.
fn session(lines: &[&str]) -> Result<Complex64, miette::Error> {
    let mut parser = Parser::new();
    let mut last = Complex64::new(0.0, 0.0);
    for line in lines {
        last = parser.parse(&mut Lexer::new(None, line))?;
    }
    Ok(last)
}

fn expect_err<E>(src: &str)
where
    E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
{
    let err = eval(src).expect_err(&format!("`{src}` should fail"));
    assert!(
        err.downcast_ref::<E>().is_some(),
        "`{src}` failed with the wrong kind: {err:?}"
    );
}

#[test]
fn precedence_and_grouping() {
    assert_eq!(eval_real("2+3*4"), 14.0);
    assert_eq!(eval_real("(2+3)*4"), 20.0);
    assert_eq!(eval_real("((2+3)*4)"), 20.0);
    assert_eq!(eval_real("10-4-3"), 3.0);
    assert_eq!(eval_real("2*3+4*5"), 26.0);
    assert_eq!(eval_real("7/2"), 3.5);
}

#[test]
fn unary_minus() {
    assert_eq!(eval_real("-5+3"), -2.0);
    assert_eq!(eval_real("-2*3"), -6.0);
    assert_eq!(eval_real("2*-3"), -6.0);
    assert_eq!(eval_real("-(2+3)"), -5.0);
    assert_eq!(eval_real("--4"), 4.0);
}

#[test]
fn complex_arithmetic() {
    assert_eq!(eval_ok("i*i"), Complex64::new(-1.0, 0.0));
    assert_eq!(eval_ok("(1+i)*(1-i)"), Complex64::new(2.0, 0.0));
    assert_eq!(eval_ok("(4+6*i)/2"), Complex64::new(2.0, 3.0));
    assert_eq!(eval_ok("3+4*i"), Complex64::new(3.0, 4.0));
}

#[test]
fn assignment_is_an_expression() {
    assert_eq!(eval_real("x = 5"), 5.0);
    assert_eq!(session(&["x = 5", "x"]).unwrap().re, 5.0);
    assert_eq!(session(&["x = 5", "x = x + 1", "x"]).unwrap().re, 6.0);
    assert_eq!(session(&["x = y = 2+1", "x*y"]).unwrap().re, 9.0);
}

#[test]
fn assigned_complex_values_round_trip() {
    let mut parser = Parser::new();
    let stored = parser.parse(&mut Lexer::new(None, "x = 3+4*i")).unwrap();
    assert_eq!(stored, Complex64::new(3.0, 4.0));
    let read = parser.parse(&mut Lexer::new(None, "x")).unwrap();
    assert_eq!(read, stored);
}

#[test]
fn seeded_constants() {
    assert_eq!(eval_real("pi"), std::f64::consts::PI);
    assert_eq!(eval_real("e"), std::f64::consts::E);
    // constants are plain bindings, nothing stops a reassignment
    assert_eq!(session(&["pi = 3", "pi"]).unwrap().re, 3.0);
}

#[test]
fn factorial() {
    for (n, expected) in [(0, 1.0), (1, 1.0), (2, 2.0), (3, 6.0), (5, 120.0), (10, 3628800.0)] {
        assert_eq!(eval_real(&format!("{n}!")), expected, "{n}!");
    }
    assert_eq!(eval_real("3!!"), 720.0);
    assert_eq!(eval_real("20!"), 2432902008176640000u64 as f64);
}

#[test]
fn factorial_domain() {
    expect_err::<DomainError>("(-1)!");
    expect_err::<DomainError>("2.5!");
    expect_err::<DomainError>("i!");
    // first overflow past u64 is reported, not wrapped
    expect_err::<DomainError>("21!");
}

#[test]
fn power() {
    assert_eq!(eval_real("2^10"), 1024.0);
    assert_eq!(eval_real("2^-1"), 0.5);
    // right-associative
    assert_eq!(eval_real("2^3^2"), 512.0);
    // unary minus binds tighter than `^`
    assert_eq!(eval_real("-2^2"), 4.0);
    // `^` binds tighter than `!`
    assert_eq!(eval_real("2^3!"), 40320.0);
    assert_eq!(eval_ok("(1+i)^2"), Complex64::new(0.0, 2.0));
}

#[test]
fn non_finite_results_are_rejected() {
    expect_err::<DomainError>("10^400");
    expect_err::<DomainError>("10^400 + 1");
}

#[test]
fn floor_division() {
    assert_eq!(eval_real("5|2"), 2.0);
    assert_eq!(eval_real("7|2"), 3.0);
    assert_eq!(eval_real("-5|2"), -3.0);
    expect_err::<DivideByZero>("1|0");
    expect_err::<DomainError>("i|2");
}

#[test]
fn modulo() {
    assert_eq!(eval_real("5%3"), 2.0);
    // remainder keeps the sign of the dividend
    assert_eq!(eval_real("-7%3"), -1.0);
    expect_err::<DivideByZero>("5%0");
    expect_err::<DomainError>("i%2");
    expect_err::<DomainError>("2.5%2");
}

#[test]
fn division_by_zero() {
    expect_err::<DivideByZero>("1/0");
    expect_err::<DivideByZero>("(3+4*i)/0");
    expect_err::<DivideByZero>("1/(0*i)");
}

#[test]
fn unbound_identifiers() {
    let err = eval("y").expect_err("unbound reference should fail");
    let unbound = err
        .downcast_ref::<UnboundIdentifier>()
        .expect("should be an UnboundIdentifier");
    assert_eq!(unbound.name, "y");
    expect_err::<UnboundIdentifier>("2 + missing*3");
}

#[test]
fn syntax_errors() {
    expect_err::<SyntaxError>("");
    expect_err::<SyntaxError>("(2+3");
    expect_err::<SyntaxError>("2+3)");
    expect_err::<SyntaxError>("2+*3");
    expect_err::<SyntaxError>("2 3");
    expect_err::<SyntaxError>("2^");
    expect_err::<SyntaxError>("()");
    // `^` combines primaries only, a factorial cannot be a base
    expect_err::<SyntaxError>("3!^2");
}

#[test]
fn lex_errors_carry_the_character() {
    let err = eval("2 @ 3").expect_err("unknown character should fail");
    let lex = err
        .downcast_ref::<SingleTokenError>()
        .expect("should be a SingleTokenError");
    assert_eq!(lex.token, '@');
}

#[test]
fn parser_recovers_after_a_failure() {
    let mut parser = Parser::new();
    assert!(parser.parse(&mut Lexer::new(None, "(2+3")).is_err());
    // the depth counter is reset, balanced input still evaluates
    let value = parser.parse(&mut Lexer::new(None, "((2+3)*4)")).unwrap();
    assert_eq!(value.re, 20.0);
}

#[test]
fn assignments_before_a_failure_stay_applied() {
    let mut parser = Parser::new();
    let err = parser
        .parse(&mut Lexer::new(None, "(a = 3) + (1/0)"))
        .expect_err("divide by zero should fail");
    assert!(err.downcast_ref::<DivideByZero>().is_some());
    let a = parser.parse(&mut Lexer::new(None, "a")).unwrap();
    assert_eq!(a, Complex64::new(3.0, 0.0));
}

#[test]
fn last_result_is_kept() {
    let mut parser = Parser::new();
    let value = parser.parse(&mut Lexer::new(None, "2+3")).unwrap();
    assert_eq!(parser.result(), value);
    // a failed expression leaves the last result alone
    assert!(parser.parse(&mut Lexer::new(None, "1/0")).is_err());
    assert_eq!(parser.result(), value);
}

#[test]
fn env_accessors() {
    let mut parser = Parser::new();
    assert_eq!(parser.env().get("i"), Some(Complex64::i()));
    assert_eq!(parser.env().get("nope"), None);
    parser.env_mut().set("half", Complex64::new(0.5, 0.0));
    assert_eq!(parser.parse(&mut Lexer::new(None, "half*4")).unwrap().re, 2.0);
}

#[test]
fn tokenizes_operators_numbers_and_identifiers() {
    let kinds: Vec<TokenKind> = Lexer::new(None, "x1 = (2.5 + 3) * -4 / 5 % 6 | 7 ^ 8 !")
        .map(|token| token.unwrap().kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Ident,
            TokenKind::Equal,
            TokenKind::LeftParen,
            TokenKind::Number(2.5),
            TokenKind::Plus,
            TokenKind::Number(3.0),
            TokenKind::RightParen,
            TokenKind::Star,
            TokenKind::Minus,
            TokenKind::Number(4.0),
            TokenKind::Slash,
            TokenKind::Number(5.0),
            TokenKind::Percent,
            TokenKind::Number(6.0),
            TokenKind::Pipe,
            TokenKind::Number(7.0),
            TokenKind::Caret,
            TokenKind::Number(8.0),
            TokenKind::Bang,
        ]
    );
}

#[test]
fn peek_and_unget_are_single_slot() {
    let mut lexer = Lexer::new(None, "1 2");
    let one = lexer.next().unwrap().unwrap();
    assert_eq!(one.kind, TokenKind::Number(1.0));
    lexer.unget(one);
    assert_eq!(lexer.next().unwrap().unwrap(), one);
    assert_eq!(lexer.peek().unwrap().unwrap().kind, TokenKind::Number(2.0));
    assert_eq!(lexer.next().unwrap().unwrap().kind, TokenKind::Number(2.0));
    assert!(lexer.next().is_none());
}

#[test]
#[should_panic(expected = "single-slot pushback")]
fn double_unget_asserts() {
    let mut lexer = Lexer::new(None, "1 2");
    let one = lexer.next().unwrap().unwrap();
    let two = lexer.next().unwrap().unwrap();
    lexer.unget(two);
    lexer.unget(one);
}

#[test]
fn renders_results_like_the_repl() {
    assert_eq!(DisplayComplex(Complex64::new(5.0, 0.0)).to_string(), "5");
    assert_eq!(DisplayComplex(Complex64::new(3.0, 4.0)).to_string(), "3 + 4i");
    assert_eq!(DisplayComplex(Complex64::new(3.0, -4.0)).to_string(), "3 - 4i");
    assert_eq!(DisplayComplex(Complex64::new(0.0, 1.0)).to_string(), "0 + 1i");
}
