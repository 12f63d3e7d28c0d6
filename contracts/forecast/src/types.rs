//! Data model shared by every forecast module.

use soroban_sdk::{contracttype, Address, BytesN, String};

/// Applied homomorphically to each encrypted sum before decryption, so the
/// oracle only ever sees `sum × PRIVACY_MULTIPLIER`.
pub const PRIVACY_MULTIPLIER: i128 = 1000;

/// Upper bound on the source registry.
pub const MAX_SOURCES: u32 = 64;

/// Number of tracked fields; also the cleartext count expected back.
pub const FIELD_COUNT: u32 = 4;

// Physical bounds, two-decimal fixed point, inclusive.
pub const TEMPERATURE_MIN: i128 = -5_000; // -50.00 °C
pub const TEMPERATURE_MAX: i128 = 6_000; // 60.00 °C
pub const HUMIDITY_MIN: i128 = 0;
pub const HUMIDITY_MAX: i128 = 10_000; // 100.00 %
pub const PRESSURE_MIN: i128 = 87_000; // 870.00 hPa
pub const PRESSURE_MAX: i128 = 108_500; // 1085.00 hPa
pub const WIND_SPEED_MIN: i128 = 0;
pub const WIND_SPEED_MAX: i128 = 20_000; // 200.00 m/s

/// Lifecycle of one forecast attempt.
///
/// ```text
/// Pending ──► Aggregating ──► DecryptionRequested ──► Completed
///                                     │
///                                     ├──► Failed    (admin override)
///                                     └──► TimedOut  (deadline passed)
/// ```
///
/// `Aggregating` only exists inside a `request_forecast` invocation.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ForecastStatus {
    Pending,
    Aggregating,
    DecryptionRequested,
    Completed,
    Failed,
    TimedOut,
}

impl ForecastStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ForecastStatus::Completed | ForecastStatus::Failed | ForecastStatus::TimedOut
        )
    }

    /// Single-step transitions allowed by the lifecycle above.
    pub fn can_transition_to(&self, next: ForecastStatus) -> bool {
        matches!(
            (self, next),
            (ForecastStatus::Pending, ForecastStatus::Aggregating)
                | (ForecastStatus::Aggregating, ForecastStatus::DecryptionRequested)
                | (ForecastStatus::DecryptionRequested, ForecastStatus::Completed)
                | (ForecastStatus::DecryptionRequested, ForecastStatus::Failed)
                | (ForecastStatus::DecryptionRequested, ForecastStatus::TimedOut)
        )
    }
}

/// Plaintext reading as submitted by a source, before encryption.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reading {
    pub temperature: i128,
    pub humidity: i128,
    pub pressure: i128,
    pub wind_speed: i128,
}

/// One source's encrypted reading for one period. Never mutated.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Contribution {
    pub source: Address,
    pub period: u64,
    pub temperature: BytesN<32>,
    pub humidity: BytesN<32>,
    pub pressure: BytesN<32>,
    pub wind_speed: BytesN<32>,
    pub submitted_at: u64,
    pub submitted: bool,
}

/// In-flight decryption request for a period.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingRequest {
    pub period: u64,
    pub request_id: u64,
    pub issued_at: u64,
    /// Oracle deadline in force when the request was issued; later config
    /// updates do not move it.
    pub timeout_secs: u64,
    pub participants: u32,
    /// Fixed at request time; drives the obfuscation offsets.
    pub seed: BytesN<32>,
}

/// Encrypted per-field sums of every counted contribution to one period.
///
/// Folded on each submission and adjusted when a contributing source is
/// deactivated or reactivated, so aggregation never walks the registry.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunningTotals {
    pub period: u64,
    pub temperature: BytesN<32>,
    pub humidity: BytesN<32>,
    pub pressure: BytesN<32>,
    pub wind_speed: BytesN<32>,
    pub participants: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ForecastRecord {
    pub period: u64,
    /// 1 for the first attempt; bumped by `retry_period`.
    pub attempt: u32,
    pub temperature: i128,
    pub humidity: i128,
    pub pressure: i128,
    pub wind_speed: i128,
    pub participants: u32,
    pub status: ForecastStatus,
    pub request_id: Option<u64>,
    pub opened_at: u64,
    /// Zero until the record reaches a terminal status.
    pub completed_at: u64,
    pub failure_reason: Option<String>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceInfo {
    pub address: Address,
    pub registered_at: u64,
    pub active: bool,
    pub submission_count: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ForecastConfig {
    /// Participants required before decryption may be requested.
    pub min_sources: u32,
    /// Deadline for the oracle, measured from the request timestamp.
    pub timeout_secs: u64,
    pub collection_window_secs: u64,
    /// When set, submissions close and aggregation opens once the collection
    /// window of the period has elapsed.
    pub enforce_windows: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            min_sources: 3,
            timeout_secs: 3_600,
            collection_window_secs: 86_400,
            enforce_windows: false,
        }
    }
}

/// Non-error results of `on_decryption_result`.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CallbackOutcome {
    Completed,
    TimedOut,
    /// Unknown period or a record no longer awaiting decryption. The request
    /// id stays consumed and a security alert is emitted.
    Rejected,
}
