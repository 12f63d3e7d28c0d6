#![no_std]

//! # Encrypted Forecast Aggregation
//!
//! Registered sources submit weather readings that are encrypted on arrival
//! through the FHE gateway and folded into per-period encrypted running
//! sums. Once enough sources have contributed, the contract scales each sum by
//! [`types::PRIVACY_MULTIPLIER`] and asks the gateway's oracle to decrypt
//! only those scaled totals. The oracle answers through
//! [`ForecastContract::on_decryption_result`], which verifies the proof,
//! rejects replays, enforces the deadline, divides back to an average,
//! obfuscates it and finalizes the period.
//!
//! ## Lifecycle of a period
//! ```text
//! Pending ──► Aggregating ──► DecryptionRequested ──► Completed ──► next period
//!                                     ├──► Failed    (mark_failed)  ──► retry_period
//!                                     └──► TimedOut  (deadline)     ──► retry_period
//! ```

#[cfg(test)]
extern crate std;

pub mod access;
mod aggregation;
pub mod callback;
pub mod config;
pub mod contribution;
pub mod decryption;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod obfuscation;
pub mod records;
pub mod sources;
pub mod timeout;
pub mod types;


use common::{extend_instance_ttl, ReentrancyGuard};
use soroban_sdk::{
    contract, contractimpl, symbol_short, Address, Bytes, Env, String, Symbol, Vec,
};

pub use errors::ForecastError;
use gateway::FheGatewayClient;
pub use types::{
    CallbackOutcome, Contribution, ForecastConfig, ForecastRecord, ForecastStatus,
    PendingRequest, Reading, RunningTotals, SourceInfo,
};

// ── Storage keys ────────────────────────────────────────────────────────────────

const ADMIN: Symbol = symbol_short!("ADMIN");
const INITIALIZED: Symbol = symbol_short!("INIT");
const GATEWAY: Symbol = symbol_short!("GATEWAY");

// ── Contract ───────────────────────────────────────────────────────────────────

#[contract]
pub struct ForecastContract;

#[contractimpl]
impl ForecastContract {
    /// Stores the admin, gateway and configuration and opens period 1.
    pub fn initialize(
        env: Env,
        admin: Address,
        gateway: Address,
        config: ForecastConfig,
    ) -> Result<(), ForecastError> {
        if env.storage().instance().has(&INITIALIZED) {
            return Err(ForecastError::AlreadyInitialized);
        }
        admin.require_auth();
        crate::config::validate(&config)?;

        env.storage().instance().set(&ADMIN, &admin);
        env.storage().instance().set(&GATEWAY, &gateway);
        crate::config::store(&env, &config);
        env.storage().instance().set(&INITIALIZED, &true);
        records::advance_period(&env)?;
        extend_instance_ttl(&env);

        events::publish_initialized(&env, admin, gateway);
        Ok(())
    }

    // ── Contributions ─────────────────────────────────────────────────────────

    /// Encrypts and stores `reading` as `source`'s contribution to the open
    /// period.
    pub fn submit_reading(env: Env, source: Address, reading: Reading) -> Result<(), ForecastError> {
        let _guard = ReentrancyGuard::acquire(&env)?;
        Self::require_initialized(&env)?;
        source.require_auth();

        access::require_active_source(sources::load(&env, &source).as_ref())?;
        let period = records::current_period(&env);
        if contribution::has_submitted(&env, period, &source) {
            return Err(ForecastError::AlreadySubmitted);
        }
        contribution::validate_reading(&reading)?;

        let config = crate::config::load(&env)?;
        let record = records::load_current(&env)?;
        if config.enforce_windows && Self::window_elapsed(&env, &record, &config) {
            return Err(ForecastError::CollectionWindowClosed);
        }
        if record.status != ForecastStatus::Pending {
            return Err(ForecastError::InvalidForecastState);
        }

        let gateway = Self::gateway(&env)?;
        let stored = Contribution {
            source: source.clone(),
            period,
            temperature: crate::gateway::encrypt(&env, &gateway, reading.temperature),
            humidity: crate::gateway::encrypt(&env, &gateway, reading.humidity),
            pressure: crate::gateway::encrypt(&env, &gateway, reading.pressure),
            wind_speed: crate::gateway::encrypt(&env, &gateway, reading.wind_speed),
            submitted_at: env.ledger().timestamp(),
            submitted: true,
        };
        contribution::store(&env, &stored);
        aggregation::include(&env, &gateway, &stored)?;
        sources::record_submission(&env, &source)?;
        extend_instance_ttl(&env);

        events::publish_contribution_submitted(&env, source, period);
        Ok(())
    }

    // ── Aggregation ───────────────────────────────────────────────────────────

    /// Aggregates the open period and requests decryption of the scaled
    /// totals. Returns the gateway request id.
    pub fn request_forecast(env: Env, caller: Address) -> Result<u64, ForecastError> {
        let _guard = ReentrancyGuard::acquire(&env)?;
        Self::require_initialized(&env)?;
        caller.require_auth();

        let admin = Self::load_admin(&env)?;
        access::require_admin_or_active_source(
            &admin,
            &caller,
            sources::load(&env, &caller).as_ref(),
        )?;

        let config = crate::config::load(&env)?;
        let mut record = records::load_current(&env)?;
        records::transition(&mut record, ForecastStatus::Aggregating)?;
        if config.enforce_windows && !Self::window_elapsed(&env, &record, &config) {
            return Err(ForecastError::CollectionWindowOpen);
        }

        let gateway = Self::gateway(&env)?;
        let totals = aggregation::aggregate(&env, &gateway, record.period, config.min_sources)?;
        let pending = decryption::issue(
            &env,
            &gateway,
            record.period,
            totals.handles,
            totals.participants,
            config.timeout_secs,
        );

        records::transition(&mut record, ForecastStatus::DecryptionRequested)?;
        record.request_id = Some(pending.request_id);
        record.participants = pending.participants;
        records::store(&env, &record);
        extend_instance_ttl(&env);

        events::publish_forecast_requested(
            &env,
            record.period,
            pending.request_id,
            pending.participants,
        );
        Ok(pending.request_id)
    }

    // ── Oracle callback ───────────────────────────────────────────────────────

    /// Called by the decryption oracle with the four decrypted scaled totals
    /// and its proof.
    ///
    /// Returns `Rejected` (not an error) for unknown or stale requests so the
    /// consumed request id and the security alert are kept.
    pub fn on_decryption_result(
        env: Env,
        request_id: u64,
        cleartexts: Vec<i128>,
        proof: Bytes,
    ) -> Result<CallbackOutcome, ForecastError> {
        let _guard = ReentrancyGuard::acquire(&env)?;
        Self::require_initialized(&env)?;

        let gateway = Self::gateway(&env)?;
        let outcome = callback::process(&env, &gateway, request_id, cleartexts, proof)?;
        extend_instance_ttl(&env);
        Ok(outcome)
    }

    // ── Timeouts & failures ───────────────────────────────────────────────────

    /// Permissionless. Times out `period` if its oracle deadline has passed;
    /// returns whether it did.
    pub fn check_timeout(env: Env, period: u64) -> Result<bool, ForecastError> {
        let _guard = ReentrancyGuard::acquire(&env)?;
        Self::require_initialized(&env)?;

        let mut record = records::load_latest(&env, period).ok_or(ForecastError::ForecastNotFound)?;
        if record.status != ForecastStatus::DecryptionRequested {
            return Err(ForecastError::InvalidForecastState);
        }
        let pending =
            decryption::load_pending(&env, period).ok_or(ForecastError::InvalidForecastState)?;

        let now = env.ledger().timestamp();
        if !timeout::deadline_passed(now, pending.issued_at, pending.timeout_secs) {
            return Ok(false);
        }
        timeout::expire(&env, &mut record, &pending)?;
        Ok(true)
    }

    /// Admin override: fails a period awaiting decryption without waiting for
    /// the deadline.
    pub fn mark_failed(
        env: Env,
        admin: Address,
        period: u64,
        reason: String,
    ) -> Result<(), ForecastError> {
        let _guard = ReentrancyGuard::acquire(&env)?;
        Self::require_initialized(&env)?;
        admin.require_auth();
        Self::require_admin(&env, &admin)?;

        let mut record = records::load_latest(&env, period).ok_or(ForecastError::ForecastNotFound)?;
        let pending =
            decryption::load_pending(&env, period).ok_or(ForecastError::InvalidForecastState)?;
        records::transition(&mut record, ForecastStatus::Failed)?;
        record.completed_at = env.ledger().timestamp();
        record.failure_reason = Some(reason.clone());
        records::store(&env, &record);
        decryption::clear_pending(&env, period);

        events::publish_forecast_failed(&env, period, pending.request_id, reason);
        events::publish_refund_issued(&env, period, pending.request_id, pending.participants);
        Ok(())
    }

    /// Opens a new Pending attempt for the current period after it failed or
    /// timed out. Returns the new attempt number.
    pub fn retry_period(env: Env, admin: Address) -> Result<u32, ForecastError> {
        let _guard = ReentrancyGuard::acquire(&env)?;
        Self::require_initialized(&env)?;
        admin.require_auth();
        Self::require_admin(&env, &admin)?;

        let record = records::load_current(&env)?;
        if !matches!(record.status, ForecastStatus::Failed | ForecastStatus::TimedOut) {
            return Err(ForecastError::InvalidForecastState);
        }
        let attempt = record
            .attempt
            .checked_add(1)
            .ok_or(ForecastError::ArithmeticOverflow)?;
        records::open(&env, record.period, attempt);
        extend_instance_ttl(&env);

        events::publish_forecast_retried(&env, record.period, attempt, admin);
        Ok(attempt)
    }

    // ── Source registry ───────────────────────────────────────────────────────

    pub fn register_source(env: Env, admin: Address, source: Address) -> Result<(), ForecastError> {
        let _guard = ReentrancyGuard::acquire(&env)?;
        Self::require_initialized(&env)?;
        admin.require_auth();
        Self::require_admin(&env, &admin)?;

        sources::register(&env, &source)?;
        extend_instance_ttl(&env);
        events::publish_source_registered(&env, source, admin);
        Ok(())
    }

    pub fn deactivate_source(env: Env, admin: Address, source: Address) -> Result<(), ForecastError> {
        let _guard = ReentrancyGuard::acquire(&env)?;
        Self::require_initialized(&env)?;
        admin.require_auth();
        Self::require_admin(&env, &admin)?;

        if sources::set_active(&env, &source, false)? {
            Self::recount_contribution(&env, &source, false)?;
        }
        extend_instance_ttl(&env);
        events::publish_source_deactivated(&env, source, admin);
        Ok(())
    }

    pub fn reactivate_source(env: Env, admin: Address, source: Address) -> Result<(), ForecastError> {
        let _guard = ReentrancyGuard::acquire(&env)?;
        Self::require_initialized(&env)?;
        admin.require_auth();
        Self::require_admin(&env, &admin)?;

        if sources::set_active(&env, &source, true)? {
            Self::recount_contribution(&env, &source, true)?;
        }
        extend_instance_ttl(&env);
        events::publish_source_reactivated(&env, source, admin);
        Ok(())
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    pub fn set_timing_enforced(env: Env, admin: Address, enforced: bool) -> Result<(), ForecastError> {
        let _guard = ReentrancyGuard::acquire(&env)?;
        Self::require_initialized(&env)?;
        admin.require_auth();
        Self::require_admin(&env, &admin)?;

        let mut config = crate::config::load(&env)?;
        config.enforce_windows = enforced;
        crate::config::store(&env, &config);
        extend_instance_ttl(&env);
        events::publish_config_updated(&env, admin, config);
        Ok(())
    }

    pub fn update_config(env: Env, admin: Address, config: ForecastConfig) -> Result<(), ForecastError> {
        let _guard = ReentrancyGuard::acquire(&env)?;
        Self::require_initialized(&env)?;
        admin.require_auth();
        Self::require_admin(&env, &admin)?;
        crate::config::validate(&config)?;

        crate::config::store(&env, &config);
        extend_instance_ttl(&env);
        events::publish_config_updated(&env, admin, config);
        Ok(())
    }

    // ── View functions ────────────────────────────────────────────────────────

    pub fn current_period(env: Env) -> u64 {
        records::current_period(&env)
    }

    /// Latest attempt of `period`.
    pub fn get_forecast(env: Env, period: u64) -> Option<ForecastRecord> {
        records::load_latest(&env, period)
    }

    pub fn get_forecast_attempt(env: Env, period: u64, attempt: u32) -> Option<ForecastRecord> {
        records::load(&env, period, attempt)
    }

    /// Most recently completed forecast.
    pub fn get_latest_forecast(env: Env) -> Option<ForecastRecord> {
        records::last_completed(&env).and_then(|period| records::load_latest(&env, period))
    }

    pub fn get_pending_request(env: Env, period: u64) -> Option<PendingRequest> {
        decryption::load_pending(&env, period)
    }

    pub fn get_contribution(env: Env, period: u64, source: Address) -> Option<Contribution> {
        contribution::load(&env, period, &source)
    }

    /// Encrypted sums and participant count `request_forecast` would use for
    /// `period` right now.
    pub fn get_running_totals(env: Env, period: u64) -> Option<RunningTotals> {
        aggregation::load_totals(&env, period)
    }

    pub fn has_submitted(env: Env, period: u64, source: Address) -> bool {
        contribution::has_submitted(&env, period, &source)
    }

    pub fn is_request_processed(env: Env, request_id: u64) -> bool {
        decryption::is_processed(&env, request_id)
    }

    pub fn get_source(env: Env, source: Address) -> Option<SourceInfo> {
        sources::load(&env, &source)
    }

    pub fn get_sources(env: Env) -> Vec<Address> {
        sources::list(&env)
    }

    pub fn active_source_count(env: Env) -> u32 {
        sources::active_count(&env)
    }

    pub fn get_config(env: Env) -> Result<ForecastConfig, ForecastError> {
        crate::config::load(&env)
    }

    pub fn get_admin(env: Env) -> Result<Address, ForecastError> {
        Self::load_admin(&env)
    }

    pub fn get_gateway(env: Env) -> Result<Address, ForecastError> {
        env.storage()
            .instance()
            .get(&GATEWAY)
            .ok_or(ForecastError::NotInitialized)
    }

    pub fn is_initialized(env: Env) -> bool {
        env.storage().instance().has(&INITIALIZED)
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn require_initialized(env: &Env) -> Result<(), ForecastError> {
        if !env.storage().instance().has(&INITIALIZED) {
            return Err(ForecastError::NotInitialized);
        }
        Ok(())
    }

    fn load_admin(env: &Env) -> Result<Address, ForecastError> {
        env.storage()
            .instance()
            .get(&ADMIN)
            .ok_or(ForecastError::NotInitialized)
    }

    fn require_admin(env: &Env, caller: &Address) -> Result<(), ForecastError> {
        access::require_admin(&Self::load_admin(env)?, caller)
    }

    fn gateway(env: &Env) -> Result<FheGatewayClient<'static>, ForecastError> {
        let address: Address = env
            .storage()
            .instance()
            .get(&GATEWAY)
            .ok_or(ForecastError::NotInitialized)?;
        Ok(FheGatewayClient::new(env, &address))
    }

    /// Adds or removes `source`'s contribution to the current period's
    /// running totals after its active flag flipped.
    fn recount_contribution(env: &Env, source: &Address, active: bool) -> Result<(), ForecastError> {
        let period = records::current_period(env);
        let stored = match contribution::load(env, period, source) {
            Some(c) if c.submitted => c,
            _ => return Ok(()),
        };
        let gateway = Self::gateway(env)?;
        if active {
            aggregation::include(env, &gateway, &stored)
        } else {
            aggregation::exclude(env, &gateway, &stored)
        }
    }

    fn window_elapsed(env: &Env, record: &ForecastRecord, config: &ForecastConfig) -> bool {
        env.ledger().timestamp() > record.opened_at.saturating_add(config.collection_window_secs)
    }
}
