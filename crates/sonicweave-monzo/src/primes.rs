//! Process-wide prime table
//!
//! The table is append-only and grows on demand; monzo components index into
//! it. Residual factoring stops at [`FACTOR_LIMIT`] so that pathological
//! integers escape to the real form instead of stalling the interpreter.

use std::sync::{LazyLock, Mutex};

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

/// Number of prime components a monzo tracks by default (primes through 37).
pub const DEFAULT_COMPONENTS: usize = 12;

/// Largest prime tried when unpacking a residual into components.
pub const FACTOR_LIMIT: u64 = 7919;

static PRIME_TABLE: LazyLock<Mutex<Vec<u64>>> = LazyLock::new(|| {
    Mutex::new(vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37])
});

fn is_prime(candidate: u64, table: &[u64]) -> bool {
    for &p in table {
        if p * p > candidate {
            return true;
        }
        if candidate % p == 0 {
            return false;
        }
    }
    // The table always covers sqrt(candidate) because it grows one prime at
    // a time.
    true
}

/// The prime at `index` (0-based: prime 0 is 2).
pub fn nth_prime(index: usize) -> u64 {
    let mut table = PRIME_TABLE.lock().expect("prime table poisoned");
    while table.len() <= index {
        let mut candidate = table.last().copied().unwrap_or(1) + 2;
        while !is_prime(candidate, &table) {
            candidate += 2;
        }
        table.push(candidate);
    }
    table[index]
}

/// The first `count` primes as an owned vector.
pub fn primes(count: usize) -> Vec<u64> {
    if count > 0 {
        nth_prime(count - 1);
    }
    let table = PRIME_TABLE.lock().expect("prime table poisoned");
    table[..count].to_vec()
}

/// Index of `prime` in the table, if it is prime and below the factor limit.
pub fn prime_index(prime: u64) -> Option<usize> {
    if prime < 2 || prime > FACTOR_LIMIT {
        return None;
    }
    let mut index = 0;
    loop {
        let p = nth_prime(index);
        if p == prime {
            return Some(index);
        }
        if p > prime {
            return None;
        }
        index += 1;
    }
}

/// Factor the magnitude of `value` over primes up to the factor limit.
///
/// Returns the exponents of the primes that divide `value` as
/// `(prime index, exponent)` pairs together with the unfactored cofactor.
pub fn factorize(value: &BigInt) -> (Vec<(usize, i64)>, BigInt) {
    let mut remaining = value.abs();
    let mut factors = Vec::new();
    if remaining.is_zero() || remaining.is_one() {
        return (factors, remaining);
    }
    let mut index = 0;
    loop {
        let p = nth_prime(index);
        if p > FACTOR_LIMIT {
            break;
        }
        let prime = BigInt::from(p);
        if &prime * &prime > remaining {
            break;
        }
        let mut exponent = 0i64;
        while (&remaining % &prime).is_zero() {
            remaining /= &prime;
            exponent += 1;
        }
        if exponent > 0 {
            factors.push((index, exponent));
        }
        if remaining.is_one() {
            return (factors, remaining);
        }
        index += 1;
    }
    // The cofactor is either 1, a prime below the limit, or something we
    // refuse to factor.
    if let Some(small) = to_small(&remaining) {
        if small <= FACTOR_LIMIT {
            if let Some(idx) = prime_index(small) {
                factors.push((idx, 1));
                return (factors, BigInt::one());
            }
        }
    }
    (factors, remaining)
}

fn to_small(value: &BigInt) -> Option<u64> {
    use num_traits::ToPrimitive;
    value.to_u64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_extends_on_demand() {
        assert_eq!(nth_prime(0), 2);
        assert_eq!(nth_prime(11), 37);
        assert_eq!(nth_prime(25), 101);
        assert_eq!(prime_index(101), Some(25));
        assert_eq!(prime_index(100), None);
    }

    #[test]
    fn factorization_splits_small_primes() {
        let (factors, cofactor) = factorize(&BigInt::from(360));
        assert_eq!(factors, vec![(0, 3), (1, 2), (2, 1)]);
        assert!(cofactor.is_one());
    }

    #[test]
    fn factorization_keeps_large_cofactors() {
        // 7927 is the first prime past the factor limit.
        let (factors, cofactor) = factorize(&BigInt::from(7927 * 8));
        assert_eq!(factors, vec![(0, 3)]);
        assert_eq!(cofactor, BigInt::from(7927));
    }
}
