//! Arbitrary-precision rational arithmetic.
//!
//! Used mostly with integer values; integrality is enforced at the
//! boundary where a relation's constraints are handed to the Hilbert-basis
//! saturator.

use num_bigint::BigInt;
use num_rational::BigRational;

/// Arbitrary-precision rational number.
pub type Rational = BigRational;

/// Builds a [`Rational`] from an `i64`.
pub fn from_i64(n: i64) -> Rational {
    Rational::from_integer(BigInt::from(n))
}

/// Returns the value as an `i64` if it is an integer and fits; used when
/// feeding rows to the Hilbert-basis saturator, which is integer-only.
pub fn to_i64_exact(r: &Rational) -> Option<i64> {
    if !r.is_integer() {
        return None;
    }
    let (num, _) = (r.numer(), r.denom());
    num_traits::ToPrimitive::to_i64(num)
}

/// `true` if the rational denotes an integer value.
pub fn is_integer(r: &Rational) -> bool {
    r.is_integer()
}
