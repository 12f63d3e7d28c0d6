use soroban_sdk::{Env, IntoVal, Val};

// ~60 days at 5s/ledger
pub const TTL_THRESHOLD: u32 = 1_036_800;
// ~120 days at 5s/ledger
pub const TTL_EXTEND_TO: u32 = 2_073_600;

/// Bumps the contract instance (config, counters, registries).
pub fn extend_instance_ttl(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);
}

/// Bumps a persistent entry. The key must already be present.
pub fn extend_persistent_ttl<K>(env: &Env, key: &K)
where
    K: IntoVal<Env, Val>,
{
    env.storage()
        .persistent()
        .extend_ttl(key, TTL_THRESHOLD, TTL_EXTEND_TO);
}
