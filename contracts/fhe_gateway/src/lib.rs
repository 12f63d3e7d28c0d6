#![no_std]

//! # FHE Gateway
//!
//! Additive-homomorphic encryption service and decryption-request queue used
//! by the forecast aggregator.
//!
//! - **Handles**: every ciphertext is addressed by an opaque 32-byte handle
//!   owned by the address that produced it.
//! - **Operations**: encrypt, homomorphic add, multiply by a plaintext
//!   constant (Paillier over `u128` arithmetic).
//! - **Decryption**: owners enqueue handles for the off-chain oracle, which
//!   answers the requester's callback with cleartexts and an ed25519 proof
//!   checked by [`FheGatewayContract::verify_decryption`].

#[cfg(any(test, feature = "testutils"))]
extern crate std;

pub mod decryption;
pub mod events;
pub mod handles;
pub mod homomorphic;
#[cfg(any(test, feature = "testutils"))]
pub mod testutils;


use common::extend_instance_ttl;
use soroban_sdk::{
    contract, contracterror, contractimpl, symbol_short, Address, Bytes, BytesN, Env, Symbol, Vec,
};

use decryption::{DecryptionRequest, MAX_HANDLES_PER_REQUEST};
use homomorphic::{gcd, HomomorphicEngine, PaillierPublicKey};

// ── Storage keys ────────────────────────────────────────────────────────────────

const ADMIN: Symbol = symbol_short!("ADMIN");
const INITIALIZED: Symbol = symbol_short!("INIT");
const PUB_KEY: Symbol = symbol_short!("PUB_KEY");
const ORACLE_KEY: Symbol = symbol_short!("ORC_KEY");
const RELAYER: Symbol = symbol_short!("RELAYER");

// ── Errors ─────────────────────────────────────────────────────────────────────

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum GatewayError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    InvalidPublicKey = 4,
    HandleNotFound = 5,
    HandleAccessDenied = 6,
    PlaintextOutOfRange = 7,
    EmptyRequest = 8,
    TooManyHandles = 9,
    RequestNotFound = 10,
    RequestAlreadyFulfilled = 11,
}

// ── Contract ───────────────────────────────────────────────────────────────────

#[contract]
pub struct FheGatewayContract;

#[contractimpl]
impl FheGatewayContract {
    /// * `pub_key`   : Paillier public key; the private half stays with the oracle.
    /// * `oracle_key`: ed25519 key the oracle signs decryption results with.
    /// * `relayer`   : account allowed to acknowledge fulfilled requests.
    pub fn initialize(
        env: Env,
        admin: Address,
        pub_key: PaillierPublicKey,
        oracle_key: BytesN<32>,
        relayer: Address,
    ) -> Result<(), GatewayError> {
        if env.storage().instance().has(&INITIALIZED) {
            return Err(GatewayError::AlreadyInitialized);
        }
        admin.require_auth();
        if !pub_key.is_well_formed() {
            return Err(GatewayError::InvalidPublicKey);
        }

        env.storage().instance().set(&ADMIN, &admin);
        env.storage().instance().set(&PUB_KEY, &pub_key);
        env.storage().instance().set(&ORACLE_KEY, &oracle_key);
        env.storage().instance().set(&RELAYER, &relayer);
        env.storage().instance().set(&INITIALIZED, &true);
        extend_instance_ttl(&env);

        events::publish_initialized(&env, admin, relayer);
        Ok(())
    }

    // ── Homomorphic Operations ────────────────────────────────────────────────

    pub fn encrypt(env: Env, caller: Address, plaintext: i128) -> Result<BytesN<32>, GatewayError> {
        let pub_key = Self::load_public_key(&env)?;
        caller.require_auth();

        if plaintext.unsigned_abs() > pub_key.max_plaintext() as u128 {
            return Err(GatewayError::PlaintextOutOfRange);
        }

        let r = Self::random_unit(&env, pub_key.n);
        let ciphertext = HomomorphicEngine::encrypt(&pub_key, plaintext, r);
        Ok(handles::store(&env, &caller, ciphertext))
    }

    pub fn add(
        env: Env,
        caller: Address,
        lhs: BytesN<32>,
        rhs: BytesN<32>,
    ) -> Result<BytesN<32>, GatewayError> {
        let pub_key = Self::load_public_key(&env)?;
        caller.require_auth();

        let a = handles::load_owned(&env, &lhs, &caller)?;
        let b = handles::load_owned(&env, &rhs, &caller)?;
        let sum = HomomorphicEngine::add_ciphertexts(&pub_key, a.ciphertext, b.ciphertext);
        Ok(handles::store(&env, &caller, sum))
    }

    pub fn mul_const(
        env: Env,
        caller: Address,
        handle: BytesN<32>,
        constant: i128,
    ) -> Result<BytesN<32>, GatewayError> {
        let pub_key = Self::load_public_key(&env)?;
        caller.require_auth();

        let value = handles::load_owned(&env, &handle, &caller)?;
        let product = HomomorphicEngine::mul_plaintext(&pub_key, value.ciphertext, constant);
        Ok(handles::store(&env, &caller, product))
    }

    // ── Decryption queue ──────────────────────────────────────────────────────

    /// Queue `handles` for decryption. The oracle later invokes
    /// `caller.<callback>(request_id, cleartexts, proof)`.
    pub fn request_decryption(
        env: Env,
        caller: Address,
        handles: Vec<BytesN<32>>,
        callback: Symbol,
    ) -> Result<u64, GatewayError> {
        Self::require_initialized(&env)?;
        caller.require_auth();

        if handles.is_empty() {
            return Err(GatewayError::EmptyRequest);
        }
        if handles.len() > MAX_HANDLES_PER_REQUEST {
            return Err(GatewayError::TooManyHandles);
        }

        let mut ciphertexts = Vec::new(&env);
        for handle in handles.iter() {
            let value = crate::handles::load_owned(&env, &handle, &caller)?;
            ciphertexts.push_back(value.ciphertext);
        }

        let handle_count = handles.len();
        let request = decryption::enqueue(&env, &caller, handles, ciphertexts, callback.clone());
        events::publish_decryption_requested(
            &env,
            request.request_id,
            caller,
            handle_count,
            callback,
        );
        Ok(request.request_id)
    }

    /// Checks that `proof` is the oracle's signature over the request's
    /// ciphertexts and `cleartexts`.
    ///
    /// Returns `false` on shape mismatch; traps when the signature itself is
    /// wrong.
    pub fn verify_decryption(
        env: Env,
        request_id: u64,
        cleartexts: Vec<i128>,
        proof: Bytes,
    ) -> bool {
        let oracle_key: BytesN<32> = match env.storage().instance().get(&ORACLE_KEY) {
            Some(k) => k,
            None => return false,
        };
        decryption::verify(&env, &oracle_key, request_id, &cleartexts, &proof)
    }

    /// The 32-byte message the oracle signs for `(request_id, cleartexts)`.
    pub fn decryption_digest(
        env: Env,
        request_id: u64,
        cleartexts: Vec<i128>,
    ) -> Result<BytesN<32>, GatewayError> {
        let request = decryption::load(&env, request_id).ok_or(GatewayError::RequestNotFound)?;
        Ok(decryption::digest(&env, &request, &cleartexts))
    }

    /// Called by the relayer once the callback has been delivered.
    pub fn mark_fulfilled(env: Env, relayer: Address, request_id: u64) -> Result<(), GatewayError> {
        Self::require_initialized(&env)?;
        relayer.require_auth();
        let expected: Address = env
            .storage()
            .instance()
            .get(&RELAYER)
            .ok_or(GatewayError::NotInitialized)?;
        if relayer != expected {
            return Err(GatewayError::Unauthorized);
        }

        decryption::mark_fulfilled(&env, request_id)?;
        events::publish_decryption_fulfilled(&env, request_id, relayer);
        Ok(())
    }

    pub fn pending_requests(env: Env) -> Vec<u64> {
        decryption::pending(&env)
    }

    pub fn get_request(env: Env, request_id: u64) -> Option<DecryptionRequest> {
        decryption::load(&env, request_id)
    }

    // ── Admin ─────────────────────────────────────────────────────────────────

    pub fn set_oracle_key(env: Env, admin: Address, oracle_key: BytesN<32>) -> Result<(), GatewayError> {
        Self::require_initialized(&env)?;
        admin.require_auth();
        Self::require_admin(&env, &admin)?;

        env.storage().instance().set(&ORACLE_KEY, &oracle_key);
        extend_instance_ttl(&env);
        events::publish_oracle_key_updated(&env, admin, oracle_key);
        Ok(())
    }

    // ── View functions ────────────────────────────────────────────────────────

    pub fn get_public_key(env: Env) -> Result<PaillierPublicKey, GatewayError> {
        Self::load_public_key(&env)
    }

    pub fn get_oracle_key(env: Env) -> Result<BytesN<32>, GatewayError> {
        env.storage()
            .instance()
            .get(&ORACLE_KEY)
            .ok_or(GatewayError::NotInitialized)
    }

    pub fn get_admin(env: Env) -> Result<Address, GatewayError> {
        env.storage()
            .instance()
            .get(&ADMIN)
            .ok_or(GatewayError::NotInitialized)
    }

    pub fn is_initialized(env: Env) -> bool {
        env.storage().instance().has(&INITIALIZED)
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn require_initialized(env: &Env) -> Result<(), GatewayError> {
        if !env.storage().instance().has(&INITIALIZED) {
            return Err(GatewayError::NotInitialized);
        }
        Ok(())
    }

    fn require_admin(env: &Env, caller: &Address) -> Result<(), GatewayError> {
        let admin: Address = env
            .storage()
            .instance()
            .get(&ADMIN)
            .ok_or(GatewayError::NotInitialized)?;
        if *caller != admin {
            return Err(GatewayError::Unauthorized);
        }
        Ok(())
    }

    fn load_public_key(env: &Env) -> Result<PaillierPublicKey, GatewayError> {
        env.storage()
            .instance()
            .get(&PUB_KEY)
            .ok_or(GatewayError::NotInitialized)
    }

    /// Encryption randomness: uniform in `[2, n)` and coprime with `n`.
    /// `n²` fits in a `u128`, so `n` fits in a `u64`.
    fn random_unit(env: &Env, n: u128) -> u128 {
        let upper = n as u64;
        loop {
            let r: u64 = env.prng().gen_range(2..upper);
            if gcd(r as u128, n) == 1 {
                return r as u128;
            }
        }
    }
}
