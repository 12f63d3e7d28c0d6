//! Per-period contribution store: at most one encrypted reading per source.

use common::extend_persistent_ttl;
use soroban_sdk::{symbol_short, Address, Env, Symbol};

use crate::errors::ForecastError;
use crate::types::{
    Contribution, Reading, HUMIDITY_MAX, HUMIDITY_MIN, PRESSURE_MAX, PRESSURE_MIN,
    TEMPERATURE_MAX, TEMPERATURE_MIN, WIND_SPEED_MAX, WIND_SPEED_MIN,
};

const CONTRIBUTION: Symbol = symbol_short!("CONTRIB");

fn contribution_key(period: u64, source: &Address) -> (Symbol, u64, Address) {
    (CONTRIBUTION, period, source.clone())
}

/// Checks every field against its physical bounds, in field order.
pub fn validate_reading(reading: &Reading) -> Result<(), ForecastError> {
    if !(TEMPERATURE_MIN..=TEMPERATURE_MAX).contains(&reading.temperature) {
        return Err(ForecastError::InvalidTemperature);
    }
    if !(HUMIDITY_MIN..=HUMIDITY_MAX).contains(&reading.humidity) {
        return Err(ForecastError::InvalidHumidity);
    }
    if !(PRESSURE_MIN..=PRESSURE_MAX).contains(&reading.pressure) {
        return Err(ForecastError::InvalidPressure);
    }
    if !(WIND_SPEED_MIN..=WIND_SPEED_MAX).contains(&reading.wind_speed) {
        return Err(ForecastError::InvalidWindSpeed);
    }
    Ok(())
}

pub fn load(env: &Env, period: u64, source: &Address) -> Option<Contribution> {
    env.storage()
        .persistent()
        .get(&contribution_key(period, source))
}

pub fn has_submitted(env: &Env, period: u64, source: &Address) -> bool {
    load(env, period, source)
        .map(|c| c.submitted)
        .unwrap_or(false)
}

pub(crate) fn store(env: &Env, contribution: &Contribution) {
    let key = contribution_key(contribution.period, &contribution.source);
    env.storage().persistent().set(&key, contribution);
    extend_persistent_ttl(env, &key);
}
