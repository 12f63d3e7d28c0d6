//! Forecast record store and period counter.
//!
//! Records are append-only and keyed by `(period, attempt)`. A retry after a
//! failure writes a new attempt; earlier attempts are never rewritten once
//! terminal.

use common::{extend_instance_ttl, extend_persistent_ttl};
use soroban_sdk::{symbol_short, Env, Symbol};

use crate::errors::ForecastError;
use crate::types::{ForecastRecord, ForecastStatus};

const PERIOD: Symbol = symbol_short!("PERIOD");
const LAST_COMPLETED: Symbol = symbol_short!("LAST_DONE");
const FORECAST: Symbol = symbol_short!("FCAST");
const LATEST_ATTEMPT: Symbol = symbol_short!("FC_ATT");

fn record_key(period: u64, attempt: u32) -> (Symbol, u64, u32) {
    (FORECAST, period, attempt)
}

fn attempt_key(period: u64) -> (Symbol, u64) {
    (LATEST_ATTEMPT, period)
}

/// The open period; zero before initialisation.
pub fn current_period(env: &Env) -> u64 {
    env.storage().instance().get(&PERIOD).unwrap_or(0u64)
}

pub fn last_completed(env: &Env) -> Option<u64> {
    env.storage().instance().get(&LAST_COMPLETED)
}

pub fn latest_attempt(env: &Env, period: u64) -> Option<u32> {
    env.storage().persistent().get(&attempt_key(period))
}

pub fn load(env: &Env, period: u64, attempt: u32) -> Option<ForecastRecord> {
    env.storage().persistent().get(&record_key(period, attempt))
}

pub fn load_latest(env: &Env, period: u64) -> Option<ForecastRecord> {
    latest_attempt(env, period).and_then(|attempt| load(env, period, attempt))
}

pub(crate) fn load_current(env: &Env) -> Result<ForecastRecord, ForecastError> {
    load_latest(env, current_period(env)).ok_or(ForecastError::ForecastNotFound)
}

pub(crate) fn store(env: &Env, record: &ForecastRecord) {
    let key = record_key(record.period, record.attempt);
    env.storage().persistent().set(&key, record);
    extend_persistent_ttl(env, &key);
}

/// Writes a fresh Pending record for `(period, attempt)` and makes it the
/// period's latest attempt.
pub(crate) fn open(env: &Env, period: u64, attempt: u32) -> ForecastRecord {
    let record = ForecastRecord {
        period,
        attempt,
        temperature: 0,
        humidity: 0,
        pressure: 0,
        wind_speed: 0,
        participants: 0,
        status: ForecastStatus::Pending,
        request_id: None,
        opened_at: env.ledger().timestamp(),
        completed_at: 0,
        failure_reason: None,
    };
    store(env, &record);

    let key = attempt_key(period);
    env.storage().persistent().set(&key, &attempt);
    extend_persistent_ttl(env, &key);
    record
}

/// Moves the period counter forward and opens the next period.
pub(crate) fn advance_period(env: &Env) -> Result<u64, ForecastError> {
    let next = current_period(env)
        .checked_add(1)
        .ok_or(ForecastError::ArithmeticOverflow)?;
    env.storage().instance().set(&PERIOD, &next);
    extend_instance_ttl(env);
    open(env, next, 1);
    Ok(next)
}

pub(crate) fn set_last_completed(env: &Env, period: u64) {
    env.storage().instance().set(&LAST_COMPLETED, &period);
}

/// Applies one lifecycle step, rejecting anything the status machine does
/// not allow.
pub(crate) fn transition(
    record: &mut ForecastRecord,
    next: ForecastStatus,
) -> Result<(), ForecastError> {
    if !record.status.can_transition_to(next) {
        return Err(ForecastError::InvalidForecastState);
    }
    record.status = next;
    Ok(())
}
