#![allow(deprecated)] // events().publish migration tracked separately

use soroban_sdk::{contracttype, symbol_short, Address, BytesN, Env, Symbol};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GatewayInitializedEvent {
    pub admin: Address,
    pub relayer: Address,
    pub timestamp: u64,
}

/// Fired for every queued request; this is what the oracle watches.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecryptionRequestedEvent {
    pub request_id: u64,
    pub requester: Address,
    pub handle_count: u32,
    pub callback: Symbol,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecryptionFulfilledEvent {
    pub request_id: u64,
    pub relayer: Address,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OracleKeyUpdatedEvent {
    pub admin: Address,
    pub oracle_key: BytesN<32>,
    pub timestamp: u64,
}

pub fn publish_initialized(env: &Env, admin: Address, relayer: Address) {
    env.events().publish(
        (symbol_short!("GW_INIT"),),
        GatewayInitializedEvent {
            admin,
            relayer,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_decryption_requested(
    env: &Env,
    request_id: u64,
    requester: Address,
    handle_count: u32,
    callback: Symbol,
) {
    env.events().publish(
        (symbol_short!("DEC_REQ"), request_id),
        DecryptionRequestedEvent {
            request_id,
            requester,
            handle_count,
            callback,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_decryption_fulfilled(env: &Env, request_id: u64, relayer: Address) {
    env.events().publish(
        (symbol_short!("DEC_DONE"), request_id),
        DecryptionFulfilledEvent {
            request_id,
            relayer,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_oracle_key_updated(env: &Env, admin: Address, oracle_key: BytesN<32>) {
    env.events().publish(
        (symbol_short!("ORC_KEY"), admin.clone()),
        OracleKeyUpdatedEvent {
            admin,
            oracle_key,
            timestamp: env.ledger().timestamp(),
        },
    );
}
