#![no_main]

//! Fuzz harness for the forecast contract driven through a real FHE gateway
//! and the simulated oracle.
//!
//! After every action the fuzzer checks:
//! - the period counter never decreases
//! - every period before the current one ended `Completed`
//! - the current period has a pending request exactly while it awaits
//!   decryption
//! - a completed forecast's wind speed lies inside the reading bounds
//! - a delivered response is never accepted twice

use arbitrary::Arbitrary;
use fhe_gateway::testutils::{deploy_gateway, SimulatedOracle};
use fhe_gateway::FheGatewayContractClient;
use forecast::types::{WIND_SPEED_MAX, WIND_SPEED_MIN};
use forecast::{
    CallbackOutcome, ForecastConfig, ForecastContract, ForecastContractClient, ForecastError,
    ForecastStatus, Reading,
};
use libfuzzer_sys::fuzz_target;
use soroban_sdk::{
    testutils::{Address as _, Ledger as _},
    Address, Bytes, Env, String,
};

/// One step against the deployed pair. Field widths keep most readings
/// inside the accepted bounds while still reaching both edges.
#[derive(Arbitrary, Debug)]
pub enum FuzzAction {
    Submit {
        source: u8,
        temperature: i16,
        humidity: u16,
        pressure: u16,
        wind_speed: u16,
    },
    Request,
    Relay,
    ForgedProof,
    Replay,
    AdvanceTime { delta: u16 },
    CheckTimeout,
    MarkFailed,
    Retry,
    Deactivate { source: u8 },
    Reactivate { source: u8 },
}

const SOURCES: usize = 4;

fuzz_target!(|actions: Vec<FuzzAction>| {
    let env = Env::default();
    env.mock_all_auths();
    #[allow(deprecated)]
    env.budget().reset_unlimited();

    let admin = Address::generate(&env);
    let relayer = Address::generate(&env);
    let oracle = SimulatedOracle::new([9u8; 32]);
    let gateway_id = deploy_gateway(&env, &oracle, &admin, &relayer);
    let gateway = FheGatewayContractClient::new(&env, &gateway_id);

    let contract_id = env.register(ForecastContract, ());
    let client = ForecastContractClient::new(&env, &contract_id);
    let config = ForecastConfig {
        min_sources: 2,
        timeout_secs: 600,
        ..ForecastConfig::default()
    };
    if client.try_initialize(&admin, &gateway_id, &config).is_err() {
        return;
    }

    let sources: Vec<Address> = (0..SOURCES)
        .map(|_| {
            let s = Address::generate(&env);
            client.register_source(&admin, &s);
            s
        })
        .collect();

    let mut last_delivered = None;
    let mut period_before = client.current_period();

    for action in actions.into_iter().take(64) {
        match action {
            FuzzAction::Submit {
                source,
                temperature,
                humidity,
                pressure,
                wind_speed,
            } => {
                let reading = Reading {
                    temperature: temperature as i128 / 5,
                    humidity: humidity as i128 / 6,
                    pressure: 87_000 + pressure as i128 / 3,
                    wind_speed: wind_speed as i128 / 3,
                };
                let who = &sources[source as usize % SOURCES];
                let _ = client.try_submit_reading(who, &reading);
            }
            FuzzAction::Request => {
                let _ = client.try_request_forecast(&admin);
            }
            FuzzAction::Relay => {
                if let Some(id) = gateway.pending_requests().first() {
                    let response = oracle.respond(&env, &gateway_id, id);
                    let result = client.try_on_decryption_result(
                        &response.request_id,
                        &response.cleartexts,
                        &response.proof,
                    );
                    if let Ok(Ok(_)) = result {
                        oracle.acknowledge(&env, &gateway_id, &relayer, id);
                    }
                    last_delivered = Some(response);
                }
            }
            FuzzAction::ForgedProof => {
                if let Some(id) = gateway.pending_requests().first() {
                    let response = oracle.respond(&env, &gateway_id, id);
                    let forged = Bytes::from_array(&env, &[0u8; 64]);
                    let result =
                        client.try_on_decryption_result(&id, &response.cleartexts, &forged);
                    assert_eq!(
                        result.err().and_then(|e| e.ok()),
                        Some(ForecastError::InvalidProof),
                        "INVARIANT VIOLATION: forged proof for request {} not rejected",
                        id
                    );
                }
            }
            FuzzAction::Replay => {
                if let Some(response) = &last_delivered {
                    let result = client.try_on_decryption_result(
                        &response.request_id,
                        &response.cleartexts,
                        &response.proof,
                    );
                    assert!(
                        !matches!(result, Ok(Ok(CallbackOutcome::Completed))),
                        "INVARIANT VIOLATION: replayed request {} completed a forecast",
                        response.request_id
                    );
                }
            }
            FuzzAction::AdvanceTime { delta } => {
                let ts = env.ledger().timestamp().saturating_add(delta as u64);
                env.ledger().set_timestamp(ts);
            }
            FuzzAction::CheckTimeout => {
                let _ = client.try_check_timeout(&client.current_period());
            }
            FuzzAction::MarkFailed => {
                let reason = String::from_str(&env, "fuzz");
                let _ = client.try_mark_failed(&admin, &client.current_period(), &reason);
            }
            FuzzAction::Retry => {
                let _ = client.try_retry_period(&admin);
            }
            FuzzAction::Deactivate { source } => {
                let _ = client.try_deactivate_source(&admin, &sources[source as usize % SOURCES]);
            }
            FuzzAction::Reactivate { source } => {
                let _ = client.try_reactivate_source(&admin, &sources[source as usize % SOURCES]);
            }
        }

        // ── Post-action invariant checks ──
        let period = client.current_period();
        assert!(
            period >= period_before,
            "INVARIANT VIOLATION: period went back {} -> {}",
            period_before,
            period
        );
        period_before = period;

        for earlier in 1..period {
            let record = client.get_forecast(&earlier).expect("earlier period exists");
            assert_eq!(
                record.status,
                ForecastStatus::Completed,
                "INVARIANT VIOLATION: period {} left behind in {:?}",
                earlier,
                record.status
            );
            assert!(
                (WIND_SPEED_MIN..=WIND_SPEED_MAX).contains(&record.wind_speed),
                "INVARIANT VIOLATION: wind speed {} out of bounds",
                record.wind_speed
            );
        }

        let current = client.get_forecast(&period).expect("current period exists");
        let pending = client.get_pending_request(&period);
        assert_eq!(
            current.status == ForecastStatus::DecryptionRequested,
            pending.is_some(),
            "INVARIANT VIOLATION: status {:?} with pending {:?}",
            current.status,
            pending
        );
    }
});
