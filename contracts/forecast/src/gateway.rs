//! Client for the FHE gateway contract.
//!
//! Every handle the forecast contract creates is owned by the contract's own
//! address, so only this contract can combine contributions or ask for their
//! decryption.

use soroban_sdk::{Address, Bytes, BytesN, Env, Symbol, Vec};

#[soroban_sdk::contractclient(name = "FheGatewayClient")]
#[allow(dead_code)]
pub trait FheGatewayInterface {
    fn encrypt(env: Env, caller: Address, plaintext: i128) -> BytesN<32>;

    fn add(env: Env, caller: Address, lhs: BytesN<32>, rhs: BytesN<32>) -> BytesN<32>;

    fn mul_const(env: Env, caller: Address, handle: BytesN<32>, constant: i128) -> BytesN<32>;

    fn request_decryption(
        env: Env,
        caller: Address,
        handles: Vec<BytesN<32>>,
        callback: Symbol,
    ) -> u64;

    /// Traps on a well-shaped but invalid signature; call through
    /// `try_verify_decryption`.
    fn verify_decryption(env: Env, request_id: u64, cleartexts: Vec<i128>, proof: Bytes) -> bool;
}

/// Encrypts one plaintext as a handle owned by this contract.
pub(crate) fn encrypt(env: &Env, gateway: &FheGatewayClient, plaintext: i128) -> BytesN<32> {
    gateway.encrypt(&env.current_contract_address(), &plaintext)
}

/// `true` only when the gateway positively confirms the proof.
pub(crate) fn is_authentic(
    gateway: &FheGatewayClient,
    request_id: u64,
    cleartexts: &Vec<i128>,
    proof: &Bytes,
) -> bool {
    matches!(
        gateway.try_verify_decryption(&request_id, cleartexts, proof),
        Ok(Ok(true))
    )
}
