//! Password generation
//!
//! Each character is picked independently and uniformly from the policy's
//! character set, with replacement.

use crate::policy::{Length, Policy};
use rand::Rng;

/// Generate a password using the thread-local RNG
pub fn generate(policy: Policy, length: Length) -> String {
    generate_with(&mut rand::thread_rng(), policy, length)
}

/// Generate a password from a caller-supplied RNG
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R, policy: Policy, length: Length) -> String {
    let charset = policy.charset();
    (0..length.get())
        .map(|_| charset[rng.gen_range(0..charset.len())] as char)
        .collect()
}
