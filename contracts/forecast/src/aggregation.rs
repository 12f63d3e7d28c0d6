//! Aggregation engine: encrypted running totals per period and privacy
//! scaling at request time.
//!
//! A contribution is folded into its period's four totals when it is
//! submitted and subtracted again when its source is deactivated. A request
//! therefore touches a fixed set of ledger entries whatever the number of
//! contributors.

use common::extend_persistent_ttl;
use soroban_sdk::{symbol_short, Address, BytesN, Env, Symbol, Vec};

use crate::errors::ForecastError;
use crate::gateway::FheGatewayClient;
use crate::types::{Contribution, RunningTotals, PRIVACY_MULTIPLIER};

const TOTALS: Symbol = symbol_short!("TOTALS");

fn totals_key(period: u64) -> (Symbol, u64) {
    (TOTALS, period)
}

/// Four scaled encrypted totals, in field order, plus the participant count.
pub(crate) struct ScaledTotals {
    pub handles: Vec<BytesN<32>>,
    pub participants: u32,
}

pub fn load_totals(env: &Env, period: u64) -> Option<RunningTotals> {
    env.storage().persistent().get(&totals_key(period))
}

fn store_totals(env: &Env, totals: &RunningTotals) {
    let key = totals_key(totals.period);
    env.storage().persistent().set(&key, totals);
    extend_persistent_ttl(env, &key);
}

fn fields(c: &Contribution) -> [BytesN<32>; 4] {
    [
        c.temperature.clone(),
        c.humidity.clone(),
        c.pressure.clone(),
        c.wind_speed.clone(),
    ]
}

fn fold(
    gateway: &FheGatewayClient,
    me: &Address,
    totals: &mut RunningTotals,
    operands: [BytesN<32>; 4],
) {
    let [t, h, p, w] = operands;
    totals.temperature = gateway.add(me, &totals.temperature, &t);
    totals.humidity = gateway.add(me, &totals.humidity, &h);
    totals.pressure = gateway.add(me, &totals.pressure, &p);
    totals.wind_speed = gateway.add(me, &totals.wind_speed, &w);
}

/// Adds `contribution` to its period's totals.
pub(crate) fn include(
    env: &Env,
    gateway: &FheGatewayClient,
    contribution: &Contribution,
) -> Result<(), ForecastError> {
    let totals = match load_totals(env, contribution.period) {
        None => {
            let [temperature, humidity, pressure, wind_speed] = fields(contribution);
            RunningTotals {
                period: contribution.period,
                temperature,
                humidity,
                pressure,
                wind_speed,
                participants: 1,
            }
        }
        Some(mut totals) => {
            let me = env.current_contract_address();
            fold(gateway, &me, &mut totals, fields(contribution));
            totals.participants = totals
                .participants
                .checked_add(1)
                .ok_or(ForecastError::ArithmeticOverflow)?;
            totals
        }
    };
    store_totals(env, &totals);
    Ok(())
}

/// Removes a previously included `contribution` from its period's totals.
pub(crate) fn exclude(
    env: &Env,
    gateway: &FheGatewayClient,
    contribution: &Contribution,
) -> Result<(), ForecastError> {
    let mut totals =
        load_totals(env, contribution.period).ok_or(ForecastError::InvalidForecastState)?;
    let me = env.current_contract_address();
    let negated = fields(contribution).map(|handle| gateway.mul_const(&me, &handle, &-1));
    fold(gateway, &me, &mut totals, negated);
    totals.participants = totals
        .participants
        .checked_sub(1)
        .ok_or(ForecastError::ArithmeticOverflow)?;
    store_totals(env, &totals);
    Ok(())
}

/// Scales the period's totals for decryption once `min_sources` is met.
/// Nothing is written on rejection.
pub(crate) fn aggregate(
    env: &Env,
    gateway: &FheGatewayClient,
    period: u64,
    min_sources: u32,
) -> Result<ScaledTotals, ForecastError> {
    let totals = match load_totals(env, period) {
        Some(totals) if totals.participants >= min_sources => totals,
        _ => return Err(ForecastError::InsufficientParticipants),
    };

    let me = env.current_contract_address();
    let mut handles = Vec::new(env);
    for total in [
        &totals.temperature,
        &totals.humidity,
        &totals.pressure,
        &totals.wind_speed,
    ] {
        handles.push_back(gateway.mul_const(&me, total, &PRIVACY_MULTIPLIER));
    }

    Ok(ScaledTotals {
        handles,
        participants: totals.participants,
    })
}
