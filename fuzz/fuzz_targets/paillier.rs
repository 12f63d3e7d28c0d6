#![no_main]

//! Fuzz harness for the gateway's Paillier arithmetic.
//!
//! | Operation               | Property                                        |
//! |-------------------------|-------------------------------------------------|
//! | `encrypt` / `decrypt`   | round-trips any plaintext within `max_plaintext`|
//! | `add_ciphertexts`       | decrypts to the plaintext sum                   |
//! | `mul_plaintext`         | decrypts to the plaintext product               |
//! | `is_valid_ciphertext`   | holds for every produced ciphertext             |
//!
//! Inputs are clamped so every exact result stays inside the centered
//! plaintext range.

use arbitrary::Arbitrary;
use fhe_gateway::homomorphic::{keypair_from_primes, HomomorphicEngine};
use fhe_gateway::testutils::{TEST_PRIME_P, TEST_PRIME_Q};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
pub struct Input {
    a: i32,
    b: i32,
    scalar: i8,
    r_a: u64,
    r_b: u64,
}

fuzz_target!(|input: Input| {
    let (pk, sk) = keypair_from_primes(TEST_PRIME_P, TEST_PRIME_Q);
    let n = pk.n;

    // r must be a unit mod n; skip the rare multiples of p or q.
    let r_a = (input.r_a as u128 % (n - 1)) + 1;
    let r_b = (input.r_b as u128 % (n - 1)) + 1;
    if r_a % TEST_PRIME_P == 0 || r_a % TEST_PRIME_Q == 0 {
        return;
    }
    if r_b % TEST_PRIME_P == 0 || r_b % TEST_PRIME_Q == 0 {
        return;
    }

    let a = input.a as i128;
    let b = input.b as i128;
    let k = input.scalar as i128;

    let ca = HomomorphicEngine::encrypt(&pk, a, r_a);
    let cb = HomomorphicEngine::encrypt(&pk, b, r_b);
    assert!(HomomorphicEngine::is_valid_ciphertext(&pk, ca));
    assert!(HomomorphicEngine::is_valid_ciphertext(&pk, cb));

    assert_eq!(HomomorphicEngine::decrypt(&pk, &sk, ca), a);
    assert_eq!(HomomorphicEngine::decrypt(&pk, &sk, cb), b);

    let sum = HomomorphicEngine::add_ciphertexts(&pk, ca, cb);
    assert!(HomomorphicEngine::is_valid_ciphertext(&pk, sum));
    assert_eq!(HomomorphicEngine::decrypt(&pk, &sk, sum), a + b);

    // |a * k| <= 2^31 * 2^7, inside max_plaintext (~5 * 10^11).
    let product = HomomorphicEngine::mul_plaintext(&pk, ca, k);
    assert_eq!(HomomorphicEngine::decrypt(&pk, &sk, product), a * k);
    assert!(a.abs() * k.abs() <= pk.max_plaintext());
});
