//! 17.14 Fixed-Point Arithmetic
//!
//! Real numbers for the scheduler's load average, recent CPU and priority
//! calculations, encoded in a plain `i32` scaled by 2^14.
//!
//! # Format
//! ```text
//! ┌──────┬────────────────────┬──────────────────┐
//! │ sign │ 17 integer bits    │ 14 fraction bits │
//! └──────┴────────────────────┴──────────────────┘
//! ```
//!
//! The raw integer is `real_value * 16384`. Nothing in the encoding says so;
//! anyone reading a logged or stored value must know the scale.
//!
//! # Division
//! Dividing by zero panics, like the integer division underneath. The
//! scheduler never passes a zero divisor.

use core::fmt;
use core::ops::{Add, Div, Mul, Neg, Sub};

/// Number of fractional bits.
pub const FRACTION_BITS: u32 = 14;

/// Scale factor, `1.0` in fixed-point.
pub const F: i32 = 1 << FRACTION_BITS;

/// A signed 17.14 fixed-point number.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Fixed(i32);

impl Fixed {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// One.
    pub const ONE: Self = Self(F);

    /// Reinterpret a raw scaled integer.
    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// The raw scaled integer.
    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Convert an integer exactly: `n * 2^14`.
    #[inline]
    pub const fn to_fixed(n: i32) -> Self {
        Self(n * F)
    }

    /// Convert to an integer, truncating toward zero.
    #[inline]
    pub const fn to_int_truncate(self) -> i32 {
        self.0 / F
    }

    /// Convert to an integer, rounding to nearest with ties away from zero.
    #[inline]
    pub const fn to_int_round(self) -> i32 {
        if self.0 >= 0 {
            (self.0 + F / 2) / F
        } else {
            (self.0 - F / 2) / F
        }
    }

    #[inline]
    pub const fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }

    #[inline]
    pub const fn subtract(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }

    /// `self + n`, scaling `n` first.
    #[inline]
    pub const fn add_int(self, n: i32) -> Self {
        Self(self.0 + n * F)
    }

    /// `self - n`, scaling `n` first.
    #[inline]
    pub const fn subtract_int(self, n: i32) -> Self {
        Self(self.0 - n * F)
    }

    /// Fixed-point product, widened to 64 bits before the rescale.
    #[inline]
    pub const fn multiply(self, other: Self) -> Self {
        Self(((self.0 as i64) * (other.0 as i64) / F as i64) as i32)
    }

    /// Product with an integer; no rescale is needed.
    #[inline]
    pub const fn multiply_by_int(self, n: i32) -> Self {
        Self(self.0 * n)
    }

    /// Fixed-point quotient, widened to 64 bits before the rescale.
    ///
    /// # Panics
    /// Panics if `other` is zero.
    #[inline]
    pub const fn divide(self, other: Self) -> Self {
        Self(((self.0 as i64) * (F as i64) / (other.0 as i64)) as i32)
    }

    /// Quotient by an integer.
    ///
    /// # Panics
    /// Panics if `n` is zero.
    #[inline]
    pub const fn divide_by_int(self, n: i32) -> Self {
        Self(self.0 / n)
    }
}

impl From<i32> for Fixed {
    fn from(n: i32) -> Self {
        Self::to_fixed(n)
    }
}

impl Add for Fixed {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Add<i32> for Fixed {
    type Output = Self;
    fn add(self, rhs: i32) -> Self {
        self.add_int(rhs)
    }
}

impl Sub for Fixed {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.subtract(rhs)
    }
}

impl Sub<i32> for Fixed {
    type Output = Self;
    fn sub(self, rhs: i32) -> Self {
        self.subtract_int(rhs)
    }
}

impl Mul for Fixed {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        self.multiply(rhs)
    }
}

impl Mul<i32> for Fixed {
    type Output = Self;
    fn mul(self, rhs: i32) -> Self {
        self.multiply_by_int(rhs)
    }
}

impl Div for Fixed {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        self.divide(rhs)
    }
}

impl Div<i32> for Fixed {
    type Output = Self;
    fn div(self, rhs: i32) -> Self {
        self.divide_by_int(rhs)
    }
}

impl Neg for Fixed {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl fmt::Debug for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed({:#x} ~ {})", self.0, self)
    }
}

/// Prints two decimal places, rounded the same way as `to_int_round`.
impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Scaled in 64 bits; `raw * 100` overflows i32 above about 1310.72.
        let scaled = self.0 as i64 * 100;
        let half = F as i64 / 2;
        let hundredths = if scaled >= 0 {
            (scaled + half) / F as i64
        } else {
            (scaled - half) / F as i64
        };
        let sign = if hundredths < 0 { "-" } else { "" };
        let abs = hundredths.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}
