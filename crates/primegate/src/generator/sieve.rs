use crate::{PrimeGenerator, Result};

/// Single-threaded Sieve of Eratosthenes.
///
/// This is the default strategy.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sieve;

/// Marks every index of `0..=bound` that is prime.
///
/// Indices `0` and `1` are always `false`.
pub(crate) fn sieve_domain(bound: u32) -> Vec<bool> {
    let len = bound as usize + 1;
    let mut is_prime = vec![true; len];
    is_prime[0] = false;
    if len > 1 {
        is_prime[1] = false;
    }

    let mut p = 2_usize;
    while p * p < len {
        if is_prime[p] {
            for i in (p * p..len).step_by(p) {
                is_prime[i] = false;
            }
        }
        p += 1;
    }
    is_prime
}

/// Collects the marked indices of a domain in ascending order.
pub(crate) fn collect_marked(domain: &[bool]) -> Vec<u32> {
    domain
        .iter()
        .enumerate()
        .filter_map(|(i, &prime)| prime.then_some(i as u32))
        .collect()
}

impl PrimeGenerator for Sieve {
    fn generate(&self, bound: u32) -> Result<Vec<u32>> {
        Ok(collect_marked(&sieve_domain(bound)))
    }
}
