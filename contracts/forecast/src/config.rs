use soroban_sdk::{symbol_short, Env, Symbol};

use crate::errors::ForecastError;
use crate::types::{ForecastConfig, MAX_SOURCES};

const CONFIG: Symbol = symbol_short!("CONFIG");

pub fn validate(config: &ForecastConfig) -> Result<(), ForecastError> {
    if config.min_sources == 0 || config.min_sources > MAX_SOURCES {
        return Err(ForecastError::InvalidConfig);
    }
    if config.timeout_secs == 0 || config.collection_window_secs == 0 {
        return Err(ForecastError::InvalidConfig);
    }
    Ok(())
}

pub(crate) fn load(env: &Env) -> Result<ForecastConfig, ForecastError> {
    env.storage()
        .instance()
        .get(&CONFIG)
        .ok_or(ForecastError::NotInitialized)
}

pub(crate) fn store(env: &Env, config: &ForecastConfig) {
    env.storage().instance().set(&CONFIG, config);
}
