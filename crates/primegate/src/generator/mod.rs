mod brute_force;
mod interface;
mod parallel;
mod sieve;
mod strategy;

pub use brute_force::*;
pub use interface::*;
pub use parallel::*;
pub use sieve::*;
pub use strategy::*;
