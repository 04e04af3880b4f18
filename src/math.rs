use std::ops::Rem;

use miette::{Diagnostic, Error};
use num_complex::Complex64;
use num_traits::Zero;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
#[error("Divide by Zero")]
pub struct DivideByZero;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("factorial needs a non-negative integer")]
    #[diagnostic(help("`!` is defined for 0, 1, 2, ..."))]
    Factorial,

    #[error("factorial of {n} overflows")]
    FactorialOverflow { n: i64 },

    #[error("`{operator}` needs real operands")]
    RealOperands { operator: char },

    #[error("`{operator}` needs integer operands")]
    IntegerOperands { operator: char },

    #[error("result is not a finite number")]
    NotFinite,
}

/// Complex division, refusing an exact-zero divisor.
pub fn safe_div(left: Complex64, right: Complex64) -> Result<Complex64, Error> {
    if right.is_zero() {
        return Err(DivideByZero.into());
    }
    Ok(left / right)
}

/// Floor division over the real line: both operands must be imaginary-free.
pub fn safe_floordiv(left: Complex64, right: Complex64) -> Result<Complex64, Error> {
    let left = as_real(left, '|')?;
    let right = as_real(right, '|')?;
    if right == 0.0 {
        return Err(DivideByZero.into());
    }
    Ok(Complex64::new((left / right).floor(), 0.0))
}

/// Remainder with the sign of the dividend, refusing a zero divisor.
pub fn safe_mod<T>(left: T, right: T) -> Result<T, DivideByZero>
where
    T: Zero + Rem<Output = T> + Copy,
{
    if right.is_zero() {
        return Err(DivideByZero);
    }
    Ok(left % right)
}

/// `1 * 2 * ... * n`, refusing negative input and reporting overflow instead
/// of wrapping. `21!` is the first value past `u64`.
pub fn factorial(n: i64) -> Result<u64, DomainError> {
    if n < 0 {
        return Err(DomainError::Factorial);
    }
    let mut product: u64 = 1;
    for k in 2..=n as u64 {
        product = product
            .checked_mul(k)
            .ok_or(DomainError::FactorialOverflow { n })?;
    }
    Ok(product)
}

/// Exponentiation. An imaginary-free integer exponent goes through `powi`,
/// which stays exact for small integer powers of real bases; anything else
/// goes through the full complex `powc`.
pub fn pow(base: Complex64, exponent: Complex64) -> Complex64 {
    if exponent.im == 0.0 && exponent.re.fract() == 0.0 && exponent.re.abs() <= i32::MAX as f64 {
        base.powi(exponent.re as i32)
    } else {
        base.powc(exponent)
    }
}

/// The operand of a factorial, as an integer.
pub fn factorial_operand(value: Complex64) -> Result<i64, DomainError> {
    if value.im != 0.0 || value.re.fract() != 0.0 {
        return Err(DomainError::Factorial);
    }
    Ok(value.re as i64)
}

/// An operand of an integer operator such as `%`, as an integer.
pub fn as_integer(value: Complex64, operator: char) -> Result<i64, DomainError> {
    if value.im != 0.0 {
        return Err(DomainError::RealOperands { operator });
    }
    if value.re.fract() != 0.0 {
        return Err(DomainError::IntegerOperands { operator });
    }
    Ok(value.re as i64)
}

/// NaN and infinity never escape as results.
pub fn ensure_finite(value: Complex64) -> Result<Complex64, DomainError> {
    if value.re.is_finite() && value.im.is_finite() {
        Ok(value)
    } else {
        Err(DomainError::NotFinite)
    }
}

fn as_real(value: Complex64, operator: char) -> Result<f64, DomainError> {
    if value.im != 0.0 {
        return Err(DomainError::RealOperands { operator });
    }
    Ok(value.re)
}
