//! Decryption request queue and proof verification.
//!
//! A requester enqueues ciphertext handles together with the name of the
//! function the oracle must call back. The off-chain oracle drains the queue,
//! decrypts, signs
//!
//! ```text
//! digest = SHA-256(request_id_be || ciphertext_be... || cleartext_be...)
//! ```
//!
//! with its ed25519 key and calls the requester directly. The requester then
//! asks [`verify`] whether the cleartexts it received are genuine.

use common::{extend_instance_ttl, extend_persistent_ttl};
use soroban_sdk::{contracttype, symbol_short, Address, Bytes, BytesN, Env, Symbol, Vec};

use crate::GatewayError;

const REQ_CTR: Symbol = symbol_short!("REQ_CTR");
const REQUEST: Symbol = symbol_short!("DEC_REQ");
const QUEUE: Symbol = symbol_short!("DEC_QUE");

pub const MAX_HANDLES_PER_REQUEST: u32 = 16;
const SIGNATURE_LEN: u32 = 64;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecryptionRequest {
    pub request_id: u64,
    pub requester: Address,
    pub handles: Vec<BytesN<32>>,
    /// Snapshot of the ciphertexts at request time, in handle order.
    pub ciphertexts: Vec<u128>,
    /// Function on `requester` invoked with `(request_id, cleartexts, proof)`.
    pub callback: Symbol,
    pub issued_at: u64,
    pub fulfilled: bool,
}

fn request_key(request_id: u64) -> (Symbol, u64) {
    (REQUEST, request_id)
}

pub(crate) fn enqueue(
    env: &Env,
    requester: &Address,
    handles: Vec<BytesN<32>>,
    ciphertexts: Vec<u128>,
    callback: Symbol,
) -> DecryptionRequest {
    let request_id: u64 = env
        .storage()
        .instance()
        .get(&REQ_CTR)
        .unwrap_or(0u64)
        .saturating_add(1);
    env.storage().instance().set(&REQ_CTR, &request_id);

    let request = DecryptionRequest {
        request_id,
        requester: requester.clone(),
        handles,
        ciphertexts,
        callback,
        issued_at: env.ledger().timestamp(),
        fulfilled: false,
    };
    store(env, &request);

    let mut queue = pending(env);
    queue.push_back(request_id);
    env.storage().instance().set(&QUEUE, &queue);
    extend_instance_ttl(env);

    request
}

fn store(env: &Env, request: &DecryptionRequest) {
    let key = request_key(request.request_id);
    env.storage().persistent().set(&key, request);
    extend_persistent_ttl(env, &key);
}

pub(crate) fn load(env: &Env, request_id: u64) -> Option<DecryptionRequest> {
    env.storage().persistent().get(&request_key(request_id))
}

/// Request ids not yet acknowledged by the oracle, oldest first.
pub(crate) fn pending(env: &Env) -> Vec<u64> {
    env.storage()
        .instance()
        .get(&QUEUE)
        .unwrap_or_else(|| Vec::new(env))
}

pub(crate) fn mark_fulfilled(env: &Env, request_id: u64) -> Result<(), GatewayError> {
    let mut request = load(env, request_id).ok_or(GatewayError::RequestNotFound)?;
    if request.fulfilled {
        return Err(GatewayError::RequestAlreadyFulfilled);
    }
    request.fulfilled = true;
    store(env, &request);

    let mut queue = pending(env);
    if let Some(pos) = queue.first_index_of(request_id) {
        queue.remove(pos);
    }
    env.storage().instance().set(&QUEUE, &queue);
    Ok(())
}

pub fn digest(env: &Env, request: &DecryptionRequest, cleartexts: &Vec<i128>) -> BytesN<32> {
    let mut data = Bytes::new(env);
    data.extend_from_array(&request.request_id.to_be_bytes());
    for ciphertext in request.ciphertexts.iter() {
        data.extend_from_array(&ciphertext.to_be_bytes());
    }
    for cleartext in cleartexts.iter() {
        data.extend_from_array(&cleartext.to_be_bytes());
    }
    env.crypto().sha256(&data).into()
}

/// Returns `false` for shape mismatches. A well-shaped proof whose signature
/// does not match traps inside the host's ed25519 check, so callers must use
/// the fallible client call and treat a trap like `false`.
pub(crate) fn verify(
    env: &Env,
    oracle_key: &BytesN<32>,
    request_id: u64,
    cleartexts: &Vec<i128>,
    proof: &Bytes,
) -> bool {
    let request = match load(env, request_id) {
        Some(r) => r,
        None => return false,
    };
    if cleartexts.len() != request.ciphertexts.len() || proof.len() != SIGNATURE_LEN {
        return false;
    }

    let mut raw = [0u8; SIGNATURE_LEN as usize];
    proof.copy_into_slice(&mut raw);
    let signature = BytesN::from_array(env, &raw);

    let message = Bytes::from_array(env, &digest(env, &request, cleartexts).to_array());
    env.crypto().ed25519_verify(oracle_key, &message, &signature);
    true
}
