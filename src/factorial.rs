//! Factorials, used as sample payloads for the containers.

use num_traits::{CheckedMul, NumCast, PrimInt};

/// `n!` in any primitive integer type, or `None` if it does not fit.
///
/// ```
/// use chunk_arena::factorial;
///
/// assert_eq!(factorial::<u32>(10), Some(3_628_800));
/// assert_eq!(factorial::<u8>(6), None);
/// ```
pub fn factorial<N: PrimInt + CheckedMul>(n: u32) -> Option<N> {
    (2..=n).try_fold(N::one(), |acc, k| acc.checked_mul(&<N as NumCast>::from(k)?))
}

/// `n!` as a `u64`, usable in constant expressions.
///
/// # Panics
/// Panics if the result overflows `u64` (`n > 20`). In a const context this
/// is a compile error.
pub const fn factorial_const(n: u64) -> u64 {
    let mut acc: u64 = 1;
    let mut k = 2;
    while k <= n {
        acc = match acc.checked_mul(k) {
            Some(v) => v,
            None => panic!("factorial overflows u64"),
        };
        k += 1;
    }
    acc
}

/// Type-level factorial: `Factorial::<N>::VALUE == N!`.
pub struct Factorial<const N: u64>;

impl<const N: u64> Factorial<N> {
    /// `N!`, evaluated at compile time.
    pub const VALUE: u64 = factorial_const(N);
}
