//! Test support: an in-process stand-in for the off-chain decryption oracle.
//!
//! The oracle owns the Paillier private key and an ed25519 signing key. It
//! reads queued requests from the gateway, decrypts them, signs the gateway's
//! digest and calls the requester's callback, exactly as the production
//! relayer would, but synchronously inside the test `Env`.

use ed25519_dalek::{Signer, SigningKey};
use soroban_sdk::{Address, Bytes, BytesN, Env, IntoVal, Symbol, TryFromVal, Val, Vec};

use crate::decryption::DecryptionRequest;
use crate::homomorphic::{
    keypair_from_primes, HomomorphicEngine, PaillierPrivateKey, PaillierPublicKey,
};
use crate::{FheGatewayContract, FheGatewayContractClient};

/// Small primes so `n²` fits the gateway's `u128` arithmetic.
pub const TEST_PRIME_P: u128 = 1_000_003;
pub const TEST_PRIME_Q: u128 = 1_000_033;

/// What the oracle would send over the wire for one request.
#[derive(Clone, Debug)]
pub struct DecryptionResponse {
    pub request_id: u64,
    pub requester: Address,
    pub callback: Symbol,
    pub cleartexts: Vec<i128>,
    pub proof: Bytes,
}

pub struct SimulatedOracle {
    signing_key: SigningKey,
    public_key: PaillierPublicKey,
    private_key: PaillierPrivateKey,
}

impl SimulatedOracle {
    pub fn new(signing_seed: [u8; 32]) -> Self {
        let (public_key, private_key) = keypair_from_primes(TEST_PRIME_P, TEST_PRIME_Q);
        Self {
            signing_key: SigningKey::from_bytes(&signing_seed),
            public_key,
            private_key,
        }
    }

    pub fn paillier_public_key(&self) -> PaillierPublicKey {
        self.public_key.clone()
    }

    pub fn verifying_key(&self, env: &Env) -> BytesN<32> {
        BytesN::from_array(env, &self.signing_key.verifying_key().to_bytes())
    }

    pub fn decrypt(&self, ciphertext: u128) -> i128 {
        HomomorphicEngine::decrypt(&self.public_key, &self.private_key, ciphertext)
    }

    pub fn decrypt_request(&self, env: &Env, request: &DecryptionRequest) -> Vec<i128> {
        let mut cleartexts = Vec::new(env);
        for ciphertext in request.ciphertexts.iter() {
            cleartexts.push_back(self.decrypt(ciphertext));
        }
        cleartexts
    }

    /// Signs whatever `cleartexts` it is given; tests use this to model a
    /// correctly keyed oracle that lies about the plaintext.
    pub fn sign(&self, env: &Env, gateway: &Address, request_id: u64, cleartexts: &Vec<i128>) -> Bytes {
        let client = FheGatewayContractClient::new(env, gateway);
        let digest = client.decryption_digest(&request_id, cleartexts);
        let signature = self.signing_key.sign(&digest.to_array());
        Bytes::from_array(env, &signature.to_bytes())
    }

    /// Oldest request still waiting in the gateway queue.
    pub fn next_pending(&self, env: &Env, gateway: &Address) -> Option<u64> {
        FheGatewayContractClient::new(env, gateway)
            .pending_requests()
            .first()
    }

    /// Honest response: decrypts the queued ciphertexts and signs them.
    pub fn respond(&self, env: &Env, gateway: &Address, request_id: u64) -> DecryptionResponse {
        let request = Self::load(env, gateway, request_id);
        let cleartexts = self.decrypt_request(env, &request);
        self.build(env, gateway, request, cleartexts)
    }

    pub fn respond_with(
        &self,
        env: &Env,
        gateway: &Address,
        request_id: u64,
        cleartexts: Vec<i128>,
    ) -> DecryptionResponse {
        let request = Self::load(env, gateway, request_id);
        self.build(env, gateway, request, cleartexts)
    }

    /// Invokes `requester.<callback>(request_id, cleartexts, proof)`.
    /// Panics if the callback returns an error.
    pub fn deliver<T>(&self, env: &Env, response: &DecryptionResponse) -> T
    where
        T: TryFromVal<Env, Val>,
    {
        let args: Vec<Val> = (
            response.request_id,
            response.cleartexts.clone(),
            response.proof.clone(),
        )
            .into_val(env);
        env.invoke_contract::<T>(&response.requester, &response.callback, args)
    }

    /// Removes the request from the gateway queue.
    pub fn acknowledge(&self, env: &Env, gateway: &Address, relayer: &Address, request_id: u64) {
        FheGatewayContractClient::new(env, gateway).mark_fulfilled(relayer, &request_id);
    }

    fn load(env: &Env, gateway: &Address, request_id: u64) -> DecryptionRequest {
        FheGatewayContractClient::new(env, gateway)
            .get_request(&request_id)
            .unwrap_or_else(|| panic!("decryption request {} not queued", request_id))
    }

    fn build(
        &self,
        env: &Env,
        gateway: &Address,
        request: DecryptionRequest,
        cleartexts: Vec<i128>,
    ) -> DecryptionResponse {
        let proof = self.sign(env, gateway, request.request_id, &cleartexts);
        DecryptionResponse {
            request_id: request.request_id,
            requester: request.requester,
            callback: request.callback,
            cleartexts,
            proof,
        }
    }
}

/// Registers a gateway whose public key and oracle key belong to `oracle`.
pub fn deploy_gateway(
    env: &Env,
    oracle: &SimulatedOracle,
    admin: &Address,
    relayer: &Address,
) -> Address {
    let gateway_id = env.register(FheGatewayContract, ());
    FheGatewayContractClient::new(env, &gateway_id).initialize(
        admin,
        &oracle.paillier_public_key(),
        &oracle.verifying_key(env),
        relayer,
    );
    gateway_id
}
