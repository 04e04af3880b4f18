//! An interactive arithmetic expression evaluator over complex numbers.
//!
//! Input goes through [`lex::Lexer`] into [`parse::Parser`], which evaluates
//! a fixed operator-precedence grammar directly to a [`num_complex::Complex64`]
//! and keeps a variable table across expressions. The arithmetic that the
//! grammar invokes (safe division, floor division, modulo, factorial, powers)
//! lives in [`math`].

use std::fmt::Display;

use num_complex::Complex64;

pub mod lex;
pub mod math;
pub mod parse;

pub use lex::Lexer;
pub use parse::Parser;

/// Renders a result the way the calculator prints it: the real part alone
/// when the imaginary part is exactly zero, otherwise `a + bi` / `a - bi`.
pub struct DisplayComplex(pub Complex64);

impl Display for DisplayComplex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Complex64 { re, im } = self.0;
        if im == 0.0 {
            write!(f, "{re}")
        } else if im > 0.0 {
            write!(f, "{re} + {im}i")
        } else {
            write!(f, "{re} - {}i", -im)
        }
    }
}
