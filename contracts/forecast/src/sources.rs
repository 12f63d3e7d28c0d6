//! Source registry.
//!
//! Registration order is kept in an instance-storage list (the index); the
//! per-source record lives in persistent storage keyed by address.

use common::{extend_instance_ttl, extend_persistent_ttl};
use soroban_sdk::{symbol_short, Address, Env, Symbol, Vec};

use crate::errors::ForecastError;
use crate::types::{SourceInfo, MAX_SOURCES};

const SOURCE_LIST: Symbol = symbol_short!("SRC_LIST");
const SOURCE: Symbol = symbol_short!("SOURCE");
const ACTIVE_COUNT: Symbol = symbol_short!("ACT_CNT");

fn source_key(source: &Address) -> (Symbol, Address) {
    (SOURCE, source.clone())
}

/// All registered sources, active or not, in registration order.
pub fn list(env: &Env) -> Vec<Address> {
    env.storage()
        .instance()
        .get(&SOURCE_LIST)
        .unwrap_or_else(|| Vec::new(env))
}

pub fn load(env: &Env, source: &Address) -> Option<SourceInfo> {
    env.storage().persistent().get(&source_key(source))
}

fn store(env: &Env, info: &SourceInfo) {
    let key = source_key(&info.address);
    env.storage().persistent().set(&key, info);
    extend_persistent_ttl(env, &key);
}

pub(crate) fn register(env: &Env, source: &Address) -> Result<SourceInfo, ForecastError> {
    if load(env, source).is_some() {
        return Err(ForecastError::SourceAlreadyRegistered);
    }
    let mut index = list(env);
    if index.len() >= MAX_SOURCES {
        return Err(ForecastError::TooManySources);
    }

    let info = SourceInfo {
        address: source.clone(),
        registered_at: env.ledger().timestamp(),
        active: true,
        submission_count: 0,
    };
    store(env, &info);
    index.push_back(source.clone());
    env.storage().instance().set(&SOURCE_LIST, &index);
    set_active_count(env, active_count(env).saturating_add(1));
    extend_instance_ttl(env);
    Ok(info)
}

/// Flips the active flag and returns whether it changed. Setting the
/// current value again is a no-op.
pub(crate) fn set_active(env: &Env, source: &Address, active: bool) -> Result<bool, ForecastError> {
    let mut info = load(env, source).ok_or(ForecastError::SourceNotRegistered)?;
    if info.active == active {
        return Ok(false);
    }
    info.active = active;
    store(env, &info);
    let count = active_count(env);
    set_active_count(
        env,
        if active {
            count.saturating_add(1)
        } else {
            count.saturating_sub(1)
        },
    );
    Ok(true)
}

pub(crate) fn record_submission(env: &Env, source: &Address) -> Result<(), ForecastError> {
    let mut info = load(env, source).ok_or(ForecastError::SourceNotRegistered)?;
    info.submission_count = info
        .submission_count
        .checked_add(1)
        .ok_or(ForecastError::ArithmeticOverflow)?;
    store(env, &info);
    Ok(())
}

pub fn active_count(env: &Env) -> u32 {
    env.storage().instance().get(&ACTIVE_COUNT).unwrap_or(0)
}

fn set_active_count(env: &Env, count: u32) {
    env.storage().instance().set(&ACTIVE_COUNT, &count);
}
