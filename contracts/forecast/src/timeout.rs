//! Oracle deadline handling, shared by `check_timeout` and the callback.

use soroban_sdk::Env;

use crate::decryption;
use crate::errors::ForecastError;
use crate::events;
use crate::records;
use crate::types::{ForecastRecord, ForecastStatus, PendingRequest};

/// Strictly after `issued_at + timeout_secs`.
pub fn deadline_passed(now: u64, issued_at: u64, timeout_secs: u64) -> bool {
    now > issued_at.saturating_add(timeout_secs)
}

/// Moves a DecryptionRequested record to TimedOut and releases its pending
/// request.
pub(crate) fn expire(
    env: &Env,
    record: &mut ForecastRecord,
    pending: &PendingRequest,
) -> Result<(), ForecastError> {
    records::transition(record, ForecastStatus::TimedOut)?;
    record.completed_at = env.ledger().timestamp();
    records::store(env, record);
    decryption::clear_pending(env, pending.period);

    events::publish_forecast_timed_out(env, pending.period, pending.request_id, pending.issued_at);
    events::publish_refund_issued(env, pending.period, pending.request_id, pending.participants);
    Ok(())
}
