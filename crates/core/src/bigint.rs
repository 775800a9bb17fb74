//! Arbitrary-precision integer arithmetic.
//!
//! Thin wrapper over [`num_bigint::BigInt`] giving the core the exact
//! operation set the IR needs (signed truncated division, unsigned shift
//! amounts, conversion to machine integers and Unicode scalar values) without
//! scattering `num-bigint`/`num-traits` imports across the rest of the crate.

use num_bigint::{BigInt as NumBigInt, Sign};
use num_traits::{Signed, ToPrimitive, Zero};
use std::fmt;

/// An arbitrary-precision signed integer.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct BigInt(NumBigInt);

impl BigInt {
    pub fn new(n: i64) -> Self {
        BigInt(NumBigInt::from(n))
    }

    pub fn zero() -> Self {
        BigInt(NumBigInt::zero())
    }

    pub fn from_u64(n: u64) -> Self {
        BigInt(NumBigInt::from(n))
    }

    pub fn add(&self, other: &BigInt) -> BigInt {
        BigInt(&self.0 + &other.0)
    }

    pub fn sub(&self, other: &BigInt) -> BigInt {
        BigInt(&self.0 - &other.0)
    }

    pub fn mul(&self, other: &BigInt) -> BigInt {
        BigInt(&self.0 * &other.0)
    }

    /// Truncated (sign-follows-dividend) division. Panics if `other` is zero;
    /// callers must check [`BigInt::sign`] first — folding never divides by a
    /// statically known zero (see the constant-folding pass).
    pub fn div(&self, other: &BigInt) -> BigInt {
        BigInt(&self.0 / &other.0)
    }

    /// Truncated modulo, matching [`BigInt::div`]'s sign convention.
    pub fn rem(&self, other: &BigInt) -> BigInt {
        BigInt(&self.0 % &other.0)
    }

    pub fn neg(&self) -> BigInt {
        BigInt(-&self.0)
    }

    pub fn and(&self, other: &BigInt) -> BigInt {
        BigInt(&self.0 & &other.0)
    }

    pub fn or(&self, other: &BigInt) -> BigInt {
        BigInt(&self.0 | &other.0)
    }

    pub fn xor(&self, other: &BigInt) -> BigInt {
        BigInt(&self.0 ^ &other.0)
    }

    /// Left shift. `amount` is an unsigned machine integer; see
    /// [`BigInt::to_shift_amount`] for how callers obtain one from a `BigInt`
    /// shift-amount operand.
    pub fn shl(&self, amount: u32) -> BigInt {
        BigInt(&self.0 << amount)
    }

    /// Arithmetic (sign-extending) right shift.
    pub fn ashr(&self, amount: u32) -> BigInt {
        BigInt(&self.0 >> amount)
    }

    pub fn sign(&self) -> i32 {
        if self.0.is_zero() {
            0
        } else if self.0.sign() == Sign::Minus {
            -1
        } else {
            1
        }
    }

    pub fn cmp(&self, other: &BigInt) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn bit_len(&self) -> u64 {
        self.0.bits()
    }

    /// Number of trailing zero bits in the magnitude, used to detect
    /// power-of-two divisors/multipliers for strength reduction.
    pub fn trailing_zero_bits(&self) -> u64 {
        if self.0.is_zero() {
            return 0;
        }
        let (_, bytes) = self.0.to_bytes_le();
        let mut count = 0u64;
        for byte in bytes {
            if byte == 0 {
                count += 8;
            } else {
                count += byte.trailing_zeros() as u64;
                break;
            }
        }
        count
    }

    /// `true` iff the value is strictly positive and has exactly one bit set.
    pub fn is_power_of_two(&self) -> bool {
        self.sign() > 0 && self.bit_len() == self.trailing_zero_bits() + 1
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.0.to_i64()
    }

    /// Converts to a Unicode scalar value for `PrintChar`/character I/O.
    /// Returns `None` for out-of-range or surrogate code points.
    pub fn to_rune(&self) -> Option<char> {
        let n = self.0.to_u32()?;
        char::from_u32(n)
    }

    /// Converts a non-negative shift-amount operand to a machine `u32`.
    /// Returns `None` (a fatal shift-overflow condition per the spec — the
    /// caller panics) if the amount is negative or does not fit.
    pub fn to_shift_amount(&self) -> Option<u32> {
        if self.sign() < 0 {
            return None;
        }
        self.0.to_u32()
    }
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for BigInt {
    fn from(n: i64) -> Self {
        BigInt::new(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_division_matches_sign_of_dividend() {
        assert_eq!(BigInt::new(-7).div(&BigInt::new(2)), BigInt::new(-3));
        assert_eq!(BigInt::new(7).div(&BigInt::new(-2)), BigInt::new(-3));
        assert_eq!(BigInt::new(-7).rem(&BigInt::new(2)), BigInt::new(-1));
    }

    #[test]
    fn power_of_two_detection() {
        assert!(BigInt::new(8).is_power_of_two());
        assert!(!BigInt::new(6).is_power_of_two());
        assert!(!BigInt::new(-8).is_power_of_two());
        assert_eq!(BigInt::new(8).trailing_zero_bits(), 3);
    }

    #[test]
    fn rune_conversion() {
        assert_eq!(BigInt::new(65).to_rune(), Some('A'));
        assert_eq!(BigInt::new(-1).to_rune(), None);
    }

    #[test]
    fn shift_amount_rejects_negative() {
        assert_eq!(BigInt::new(-1).to_shift_amount(), None);
        assert_eq!(BigInt::new(4).to_shift_amount(), Some(4));
    }
}
