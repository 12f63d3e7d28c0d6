//! Decryption request manager.
//!
//! Tracks the in-flight request of each period, maps gateway request ids back
//! to periods, and keeps the processed-request set used for replay rejection.

use common::extend_persistent_ttl;
use soroban_sdk::{symbol_short, Bytes, BytesN, Env, Symbol, Vec};

use crate::gateway::FheGatewayClient;
use crate::types::PendingRequest;

/// Entry point the oracle calls with the decrypted totals.
pub const CALLBACK: &str = "on_decryption_result";

const PENDING: Symbol = symbol_short!("PENDING");
const REQUEST_MAP: Symbol = symbol_short!("REQ_MAP");
const PROCESSED: Symbol = symbol_short!("PROC");

fn pending_key(period: u64) -> (Symbol, u64) {
    (PENDING, period)
}

fn request_key(request_id: u64) -> (Symbol, u64) {
    (REQUEST_MAP, request_id)
}

fn processed_key(request_id: u64) -> (Symbol, u64) {
    (PROCESSED, request_id)
}

/// Sends the scaled totals to the gateway and records the pending request.
pub(crate) fn issue(
    env: &Env,
    gateway: &FheGatewayClient,
    period: u64,
    totals: Vec<BytesN<32>>,
    participants: u32,
    timeout_secs: u64,
) -> PendingRequest {
    let request_id = gateway.request_decryption(
        &env.current_contract_address(),
        &totals,
        &Symbol::new(env, CALLBACK),
    );

    let pending = PendingRequest {
        period,
        request_id,
        issued_at: env.ledger().timestamp(),
        timeout_secs,
        participants,
        seed: derive_seed(env),
    };

    let key = pending_key(period);
    env.storage().persistent().set(&key, &pending);
    extend_persistent_ttl(env, &key);

    let key = request_key(request_id);
    env.storage().persistent().set(&key, &period);
    extend_persistent_ttl(env, &key);

    pending
}

/// `SHA-256(timestamp || sequence || prng_u64 || prng_u64)`.
///
/// Every input is visible to, or steerable by, the validator that closes the
/// ledger.
fn derive_seed(env: &Env) -> BytesN<32> {
    let mut preimage = Bytes::new(env);
    preimage.extend_from_array(&env.ledger().timestamp().to_be_bytes());
    preimage.extend_from_array(&env.ledger().sequence().to_be_bytes());
    for _ in 0..2 {
        let noise: u64 = env.prng().gen();
        preimage.extend_from_array(&noise.to_be_bytes());
    }
    env.crypto().sha256(&preimage).into()
}

pub fn load_pending(env: &Env, period: u64) -> Option<PendingRequest> {
    env.storage().persistent().get(&pending_key(period))
}

pub(crate) fn clear_pending(env: &Env, period: u64) {
    env.storage().persistent().remove(&pending_key(period));
}

pub fn period_for_request(env: &Env, request_id: u64) -> Option<u64> {
    env.storage().persistent().get(&request_key(request_id))
}

pub fn is_processed(env: &Env, request_id: u64) -> bool {
    env.storage().persistent().has(&processed_key(request_id))
}

pub(crate) fn mark_processed(env: &Env, request_id: u64) {
    let key = processed_key(request_id);
    env.storage().persistent().set(&key, &true);
    extend_persistent_ttl(env, &key);
}
