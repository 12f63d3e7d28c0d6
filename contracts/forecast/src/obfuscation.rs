//! Deterministic ±5 % perturbation of finalized values.
//!
//! `offset = SHA-256(seed || index) mod 11`. Offsets 0–4 scale the value down
//! by that many percent; offsets 5–10 scale it up by `offset − 5` percent.
//! The same `(seed, index)` always yields the same offset.

use soroban_sdk::{Bytes, BytesN, Env};

/// Fields at these indices are perturbed; wind speed (index 3) is published
/// as computed.
pub const OBFUSCATED_FIELDS: u32 = 3;

const OFFSET_RANGE: u64 = 11;

pub fn offset_for(env: &Env, seed: &BytesN<32>, index: u32) -> u32 {
    let mut preimage = Bytes::from_array(env, &seed.to_array());
    preimage.extend_from_array(&index.to_be_bytes());
    let digest = env.crypto().sha256(&preimage).to_array();

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(head) % OFFSET_RANGE) as u32
}

pub fn scale_by_offset(value: i128, offset: u32) -> i128 {
    let offset = offset as i128;
    let percent = if offset < 5 {
        100 - offset
    } else {
        100 + (offset - 5)
    };
    value.saturating_mul(percent) / 100
}

pub fn apply_obfuscation(env: &Env, value: i128, seed: &BytesN<32>, index: u32) -> i128 {
    scale_by_offset(value, offset_for(env, seed, index))
}
