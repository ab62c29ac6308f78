use crate::{PrimeGenerator, Result};

/// Trial-division generator.
///
/// Tests every candidate against all divisors up to its square root. Slow,
/// but trivially correct, which makes it the reference the sieves are checked
/// against.
#[derive(Clone, Copy, Debug, Default)]
pub struct BruteForce;

impl BruteForce {
    fn is_prime(n: u32) -> bool {
        let n = u64::from(n);
        let mut i = 2_u64;
        while i * i <= n {
            if n % i == 0 {
                return false;
            }
            i += 1;
        }
        true
    }
}

impl PrimeGenerator for BruteForce {
    fn generate(&self, bound: u32) -> Result<Vec<u32>> {
        Ok((2..=bound).filter(|&n| Self::is_prime(n)).collect())
    }
}
