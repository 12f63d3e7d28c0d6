//! Capability checks, one per role.
//!
//! These are pure: callers load the admin address and the source record and
//! pass them in, so each rule can be tested without a contract environment.

use soroban_sdk::Address;

use crate::errors::ForecastError;
use crate::types::SourceInfo;

pub fn require_admin(admin: &Address, caller: &Address) -> Result<(), ForecastError> {
    if admin != caller {
        return Err(ForecastError::Unauthorized);
    }
    Ok(())
}

/// The source must be registered and currently active.
pub fn require_active_source(source: Option<&SourceInfo>) -> Result<(), ForecastError> {
    match source {
        None => Err(ForecastError::SourceNotRegistered),
        Some(info) if !info.active => Err(ForecastError::SourceInactive),
        Some(_) => Ok(()),
    }
}

/// Aggregation may be triggered by the admin or by any active source.
pub fn require_admin_or_active_source(
    admin: &Address,
    caller: &Address,
    source: Option<&SourceInfo>,
) -> Result<(), ForecastError> {
    if admin == caller {
        return Ok(());
    }
    require_active_source(source).map_err(|_| ForecastError::Unauthorized)
}
