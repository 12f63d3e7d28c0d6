//! Callback processor for decrypted forecast totals.
//!
//! Steps, in order:
//! 1. the gateway must confirm the oracle's proof; nothing is recorded otherwise
//! 2. the request id is consumed (replays are rejected from here on)
//! 3. the request must map to a period still awaiting this exact request
//! 4. a result past the deadline times the period out instead of completing it
//! 5. totals are divided by `participants × PRIVACY_MULTIPLIER`
//! 6. the first three fields are obfuscated
//! 7. the record is completed and the next period opens

use soroban_sdk::{symbol_short, Bytes, Env, Vec};

use crate::decryption;
use crate::errors::ForecastError;
use crate::events;
use crate::gateway::FheGatewayClient;
use crate::obfuscation::{apply_obfuscation, OBFUSCATED_FIELDS};
use crate::records;
use crate::timeout;
use crate::types::{CallbackOutcome, ForecastStatus, FIELD_COUNT, PRIVACY_MULTIPLIER};

/// Turns a decrypted `sum × PRIVACY_MULTIPLIER` back into a mean.
pub fn reverse_privacy_division(scaled: i128, participants: u32) -> Result<i128, ForecastError> {
    let divisor = (participants as i128)
        .checked_mul(PRIVACY_MULTIPLIER)
        .ok_or(ForecastError::ArithmeticOverflow)?;
    if divisor == 0 {
        return Err(ForecastError::InvalidDivisor);
    }
    Ok(scaled / divisor)
}

pub(crate) fn process(
    env: &Env,
    gateway: &FheGatewayClient,
    request_id: u64,
    cleartexts: Vec<i128>,
    proof: Bytes,
) -> Result<CallbackOutcome, ForecastError> {
    if !crate::gateway::is_authentic(gateway, request_id, &cleartexts, &proof) {
        return Err(ForecastError::InvalidProof);
    }

    if decryption::is_processed(env, request_id) {
        return Err(ForecastError::RequestAlreadyProcessed);
    }
    decryption::mark_processed(env, request_id);

    let period = match decryption::period_for_request(env, request_id) {
        Some(period) => period,
        None => {
            events::publish_security_alert(env, request_id, None, symbol_short!("UNKNOWN"));
            return Ok(CallbackOutcome::Rejected);
        }
    };
    let awaiting = records::load_latest(env, period).and_then(|record| {
        let pending = decryption::load_pending(env, period)?;
        let current = record.status == ForecastStatus::DecryptionRequested
            && record.request_id == Some(request_id)
            && pending.request_id == request_id;
        if current {
            Some((record, pending))
        } else {
            None
        }
    });
    let (mut record, pending) = match awaiting {
        Some(found) => found,
        None => {
            events::publish_security_alert(env, request_id, Some(period), symbol_short!("STALE"));
            return Ok(CallbackOutcome::Rejected);
        }
    };

    let now = env.ledger().timestamp();
    if timeout::deadline_passed(now, pending.issued_at, pending.timeout_secs) {
        timeout::expire(env, &mut record, &pending)?;
        return Ok(CallbackOutcome::TimedOut);
    }

    if cleartexts.len() != FIELD_COUNT {
        return Err(ForecastError::InvalidCleartexts);
    }
    let mut values = [0i128; FIELD_COUNT as usize];
    for (index, value) in values.iter_mut().enumerate() {
        let scaled = cleartexts
            .get(index as u32)
            .ok_or(ForecastError::InvalidCleartexts)?;
        let average = reverse_privacy_division(scaled, pending.participants)?;
        *value = if (index as u32) < OBFUSCATED_FIELDS {
            apply_obfuscation(env, average, &pending.seed, index as u32)
        } else {
            average
        };
    }

    records::transition(&mut record, ForecastStatus::Completed)?;
    record.temperature = values[0];
    record.humidity = values[1];
    record.pressure = values[2];
    record.wind_speed = values[3];
    record.participants = pending.participants;
    record.completed_at = now;
    records::store(env, &record);
    decryption::clear_pending(env, period);
    records::set_last_completed(env, period);
    records::advance_period(env)?;

    events::publish_forecast_completed(env, &record, request_id);
    Ok(CallbackOutcome::Completed)
}
