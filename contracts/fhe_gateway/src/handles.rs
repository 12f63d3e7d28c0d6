//! Ciphertext registry. Callers only ever see the 32-byte handle; the
//! ciphertext and its owner stay in gateway storage.

use common::{extend_instance_ttl, extend_persistent_ttl};
use soroban_sdk::{contracttype, symbol_short, Address, Bytes, BytesN, Env, Symbol};

use crate::GatewayError;

const HANDLE_CTR: Symbol = symbol_short!("HDL_CTR");
const CIPHERTEXT: Symbol = symbol_short!("CT");

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncryptedValue {
    pub ciphertext: u128,
    /// Only the owner may combine this value or request its decryption.
    pub owner: Address,
    pub created_at: u64,
}

fn handle_key(handle: &BytesN<32>) -> (Symbol, BytesN<32>) {
    (CIPHERTEXT, handle.clone())
}

/// Stores `ciphertext` and returns a fresh handle for it.
///
/// `handle = SHA-256(counter || ciphertext)`; the counter keeps two
/// encryptions of the same ciphertext distinct.
pub(crate) fn store(env: &Env, owner: &Address, ciphertext: u128) -> BytesN<32> {
    let counter: u64 = env
        .storage()
        .instance()
        .get(&HANDLE_CTR)
        .unwrap_or(0u64)
        .saturating_add(1);
    env.storage().instance().set(&HANDLE_CTR, &counter);
    extend_instance_ttl(env);

    let mut preimage = Bytes::new(env);
    preimage.extend_from_array(&counter.to_be_bytes());
    preimage.extend_from_array(&ciphertext.to_be_bytes());
    let handle: BytesN<32> = env.crypto().sha256(&preimage).into();

    let key = handle_key(&handle);
    env.storage().persistent().set(
        &key,
        &EncryptedValue {
            ciphertext,
            owner: owner.clone(),
            created_at: env.ledger().timestamp(),
        },
    );
    extend_persistent_ttl(env, &key);
    handle
}

pub(crate) fn load(env: &Env, handle: &BytesN<32>) -> Option<EncryptedValue> {
    env.storage().persistent().get(&handle_key(handle))
}

/// Loads a value the caller is allowed to operate on.
pub(crate) fn load_owned(
    env: &Env,
    handle: &BytesN<32>,
    caller: &Address,
) -> Result<EncryptedValue, GatewayError> {
    let value = load(env, handle).ok_or(GatewayError::HandleNotFound)?;
    if value.owner != *caller {
        return Err(GatewayError::HandleAccessDenied);
    }
    Ok(value)
}
