#![allow(deprecated)] // events().publish migration tracked separately

//! Structured events for the forecast lifecycle.
//!
//! Every payload carries the period and, where one exists, the request id so
//! an indexer can rebuild a period's history from events alone.

use soroban_sdk::{contracttype, symbol_short, Address, Env, String, Symbol};

use crate::types::{ForecastConfig, ForecastRecord};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InitializedEvent {
    pub admin: Address,
    pub gateway: Address,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContributionSubmittedEvent {
    pub source: Address,
    pub period: u64,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ForecastRequestedEvent {
    pub period: u64,
    pub request_id: u64,
    pub participants: u32,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ForecastCompletedEvent {
    pub period: u64,
    pub attempt: u32,
    pub request_id: u64,
    pub temperature: i128,
    pub humidity: i128,
    pub pressure: i128,
    pub wind_speed: i128,
    pub participants: u32,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ForecastFailedEvent {
    pub period: u64,
    pub request_id: u64,
    pub reason: String,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ForecastTimedOutEvent {
    pub period: u64,
    pub request_id: u64,
    pub issued_at: u64,
    pub timestamp: u64,
}

/// Paired with every failure or timeout so participants can be compensated.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RefundIssuedEvent {
    pub period: u64,
    pub request_id: u64,
    pub participants: u32,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecurityAlertEvent {
    pub request_id: u64,
    pub period: Option<u64>,
    pub reason: Symbol,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceChangedEvent {
    pub source: Address,
    pub admin: Address,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigUpdatedEvent {
    pub admin: Address,
    pub config: ForecastConfig,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ForecastRetriedEvent {
    pub period: u64,
    pub attempt: u32,
    pub admin: Address,
    pub timestamp: u64,
}

pub fn publish_initialized(env: &Env, admin: Address, gateway: Address) {
    env.events().publish(
        (symbol_short!("INIT"),),
        InitializedEvent {
            admin,
            gateway,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_contribution_submitted(env: &Env, source: Address, period: u64) {
    env.events().publish(
        (symbol_short!("CONTRIB"), period),
        ContributionSubmittedEvent {
            source,
            period,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_forecast_requested(env: &Env, period: u64, request_id: u64, participants: u32) {
    env.events().publish(
        (symbol_short!("FC_REQ"), period),
        ForecastRequestedEvent {
            period,
            request_id,
            participants,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_forecast_completed(env: &Env, record: &ForecastRecord, request_id: u64) {
    env.events().publish(
        (symbol_short!("FC_DONE"), record.period),
        ForecastCompletedEvent {
            period: record.period,
            attempt: record.attempt,
            request_id,
            temperature: record.temperature,
            humidity: record.humidity,
            pressure: record.pressure,
            wind_speed: record.wind_speed,
            participants: record.participants,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_forecast_failed(env: &Env, period: u64, request_id: u64, reason: String) {
    env.events().publish(
        (symbol_short!("FC_FAIL"), period),
        ForecastFailedEvent {
            period,
            request_id,
            reason,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_forecast_timed_out(env: &Env, period: u64, request_id: u64, issued_at: u64) {
    env.events().publish(
        (symbol_short!("FC_TOUT"), period),
        ForecastTimedOutEvent {
            period,
            request_id,
            issued_at,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_refund_issued(env: &Env, period: u64, request_id: u64, participants: u32) {
    env.events().publish(
        (symbol_short!("REFUND"), period),
        RefundIssuedEvent {
            period,
            request_id,
            participants,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_security_alert(env: &Env, request_id: u64, period: Option<u64>, reason: Symbol) {
    env.events().publish(
        (symbol_short!("SEC_ALRT"), request_id),
        SecurityAlertEvent {
            request_id,
            period,
            reason,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_source_registered(env: &Env, source: Address, admin: Address) {
    publish_source_changed(env, symbol_short!("SRC_REG"), source, admin);
}

pub fn publish_source_deactivated(env: &Env, source: Address, admin: Address) {
    publish_source_changed(env, symbol_short!("SRC_DEAC"), source, admin);
}

pub fn publish_source_reactivated(env: &Env, source: Address, admin: Address) {
    publish_source_changed(env, symbol_short!("SRC_REAC"), source, admin);
}

fn publish_source_changed(env: &Env, topic: Symbol, source: Address, admin: Address) {
    env.events().publish(
        (topic, source.clone()),
        SourceChangedEvent {
            source,
            admin,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_config_updated(env: &Env, admin: Address, config: ForecastConfig) {
    env.events().publish(
        (symbol_short!("CFG_UPD"),),
        ConfigUpdatedEvent {
            admin,
            config,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_forecast_retried(env: &Env, period: u64, attempt: u32, admin: Address) {
    env.events().publish(
        (symbol_short!("FC_RETRY"), period),
        ForecastRetriedEvent {
            period,
            attempt,
            admin,
            timestamp: env.ledger().timestamp(),
        },
    );
}
