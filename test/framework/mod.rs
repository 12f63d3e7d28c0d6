//! # Forecast Protocol Testing Framework
//!
//! Reusable harness for the forecast contract and its FHE gateway, supporting
//! property-based testing, invariant checking, state exploration and a
//! declarative scenario DSL.
//!
//! ## Architecture
//!
//! ```text
//! test/framework/
//! ├── mod.rs            : TestEnv, ForecastTestHarness, snapshots
//! ├── generators.rs     : proptest strategies for readings and actions
//! ├── invariants.rs     : state and transition invariants
//! ├── state_explorer.rs : action-sequence exploration
//! └── scenario_dsl.rs   : Given-When-Then scenario builder
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let harness = ForecastTestHarness::with_defaults(3);
//! harness.submit_all(&readings);
//! harness.request_forecast();
//! harness.relay_all();
//! assert_eq!(harness.current_period(), 2);
//! ```

extern crate std;

pub mod invariants;

use std::cell::RefCell;

pub use fhe_gateway::testutils::{DecryptionResponse, SimulatedOracle};

use fhe_gateway::testutils::deploy_gateway;
use fhe_gateway::FheGatewayContractClient;
use forecast::{
    CallbackOutcome, ForecastConfig, ForecastContract, ForecastContractClient, ForecastError,
    ForecastRecord, PendingRequest, Reading,
};
use soroban_sdk::{
    testutils::{Address as _, Ledger as _},
    Address, Bytes, Env, String,
};

/// Signing seed for the oracle used by every harness.
pub const ORACLE_SEED: [u8; 32] = [7u8; 32];

// ── Core Test Environment ────────────────────────────────────────────────────

/// Wraps the Soroban `Env` with time control and address management.
///
/// The CPU budget is lifted: Paillier arithmetic in the gateway is far more
/// expensive than the default test budget allows.
pub struct TestEnv {
    pub env: Env,
    generated_addresses: RefCell<std::vec::Vec<Address>>,
}

impl TestEnv {
    /// Create a new test environment with all auth mocked.
    #[allow(deprecated)]
    pub fn new() -> Self {
        let env = Env::default();
        env.mock_all_auths();
        env.budget().reset_unlimited();
        Self {
            env,
            generated_addresses: RefCell::new(std::vec::Vec::new()),
        }
    }

    /// Generate a fresh Soroban address.
    pub fn generate_address(&self) -> Address {
        let addr = Address::generate(&self.env);
        self.generated_addresses.borrow_mut().push(addr.clone());
        addr
    }

    /// Generate `n` distinct addresses.
    pub fn generate_addresses(&self, n: usize) -> std::vec::Vec<Address> {
        (0..n).map(|_| self.generate_address()).collect()
    }

    pub fn set_timestamp(&self, ts: u64) {
        self.env.ledger().set_timestamp(ts);
    }

    /// Advance the ledger timestamp by `delta` seconds.
    pub fn advance_time(&self, delta: u64) {
        let current = self.env.ledger().timestamp();
        self.env.ledger().set_timestamp(current.saturating_add(delta));
    }

    pub fn timestamp(&self) -> u64 {
        self.env.ledger().timestamp()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

// ── Forecast Harness ─────────────────────────────────────────────────────────

/// Gateway, forecast contract, registered sources and an oracle, wired
/// together the way a deployment would be.
pub struct ForecastTestHarness {
    pub env: TestEnv,
    pub client: ForecastContractClient<'static>,
    pub gateway: FheGatewayContractClient<'static>,
    pub contract_id: Address,
    pub gateway_id: Address,
    pub admin: Address,
    pub relayer: Address,
    pub oracle: SimulatedOracle,
    sources: RefCell<std::vec::Vec<Address>>,
    issued_requests: RefCell<std::vec::Vec<u64>>,
    last_response: RefCell<Option<DecryptionResponse>>,
}

impl ForecastTestHarness {
    /// Deploy both contracts, initialize them and register `source_count`
    /// sources.
    pub fn new(env: TestEnv, config: ForecastConfig, source_count: usize) -> Self {
        let admin = env.generate_address();
        let relayer = env.generate_address();
        let oracle = SimulatedOracle::new(ORACLE_SEED);
        let gateway_id = deploy_gateway(&env.env, &oracle, &admin, &relayer);

        let contract_id = env.env.register(ForecastContract, ());
        let client = ForecastContractClient::new(&env.env, &contract_id);
        client.initialize(&admin, &gateway_id, &config);
        let gateway = FheGatewayContractClient::new(&env.env, &gateway_id);

        let harness = Self {
            env,
            client,
            gateway,
            contract_id,
            gateway_id,
            admin,
            relayer,
            oracle,
            sources: RefCell::new(std::vec::Vec::new()),
            issued_requests: RefCell::new(std::vec::Vec::new()),
            last_response: RefCell::new(None),
        };
        for _ in 0..source_count {
            harness.add_source();
        }
        harness
    }

    /// Default configuration: three sources required, one hour oracle timeout.
    pub fn with_defaults(source_count: usize) -> Self {
        Self::new(TestEnv::new(), ForecastConfig::default(), source_count)
    }

    /// Register a new source and return its address.
    pub fn add_source(&self) -> Address {
        let source = self.env.generate_address();
        self.client.register_source(&self.admin, &source);
        self.sources.borrow_mut().push(source.clone());
        source
    }

    pub fn sources(&self) -> std::vec::Vec<Address> {
        self.sources.borrow().clone()
    }

    /// Source by index, wrapping around the registered list.
    pub fn source(&self, index: usize) -> Address {
        let sources = self.sources.borrow();
        sources[index % sources.len()].clone()
    }

    pub fn submit(&self, source: &Address, reading: &Reading) {
        self.client.submit_reading(source, reading);
    }

    /// Submits `readings[i]` from source `i`.
    pub fn submit_all(&self, readings: &[Reading]) {
        for (source, reading) in self.sources().iter().zip(readings.iter()) {
            self.submit(source, reading);
        }
    }

    pub fn request_forecast(&self) -> u64 {
        let request_id = self.client.request_forecast(&self.admin);
        self.issued_requests.borrow_mut().push(request_id);
        request_id
    }

    pub fn try_request_forecast(&self) -> Result<u64, ForecastError> {
        match self.client.try_request_forecast(&self.admin) {
            Ok(Ok(request_id)) => {
                self.issued_requests.borrow_mut().push(request_id);
                Ok(request_id)
            }
            Err(Ok(err)) => Err(err),
            other => panic!("unexpected request_forecast result: {:?}", other),
        }
    }

    /// Request ids handed out by `request_forecast` through this harness.
    pub fn issued_requests(&self) -> std::vec::Vec<u64> {
        self.issued_requests.borrow().clone()
    }

    /// Honest oracle answer for a queued request.
    pub fn respond(&self, request_id: u64) -> DecryptionResponse {
        self.oracle.respond(&self.env.env, &self.gateway_id, request_id)
    }

    /// Delivers `response` to the forecast callback, surfacing contract
    /// errors instead of panicking.
    pub fn deliver(&self, response: &DecryptionResponse) -> Result<CallbackOutcome, ForecastError> {
        let result = match self.client.try_on_decryption_result(
            &response.request_id,
            &response.cleartexts,
            &response.proof,
        ) {
            Ok(Ok(outcome)) => Ok(outcome),
            Err(Ok(err)) => Err(err),
            other => panic!("unexpected callback result: {:?}", other),
        };
        *self.last_response.borrow_mut() = Some(response.clone());
        result
    }

    /// The response most recently passed to `deliver`.
    pub fn last_response(&self) -> Option<DecryptionResponse> {
        self.last_response.borrow().clone()
    }

    /// A response for `request_id` whose proof is 64 zero bytes.
    pub fn forged_response(&self, request_id: u64) -> DecryptionResponse {
        let mut response = self.respond(request_id);
        response.proof = Bytes::from_array(&self.env.env, &[0u8; 64]);
        response
    }

    /// One relayer step: answer the oldest queued request and acknowledge it
    /// once the callback accepted the delivery. `None` when the queue is empty.
    pub fn relay_next(&self) -> Option<Result<CallbackOutcome, ForecastError>> {
        let request_id = self.oracle.next_pending(&self.env.env, &self.gateway_id)?;
        let response = self.respond(request_id);
        let result = self.deliver(&response);
        if result.is_ok() {
            self.oracle
                .acknowledge(&self.env.env, &self.gateway_id, &self.relayer, request_id);
        }
        Some(result)
    }

    /// Drains the gateway queue, stopping at the first rejected delivery.
    pub fn relay_all(&self) -> std::vec::Vec<Result<CallbackOutcome, ForecastError>> {
        let mut results = std::vec::Vec::new();
        while let Some(result) = self.relay_next() {
            let failed = result.is_err();
            results.push(result);
            if failed {
                break;
            }
        }
        results
    }

    pub fn check_timeout(&self, period: u64) -> Result<bool, ForecastError> {
        match self.client.try_check_timeout(&period) {
            Ok(Ok(expired)) => Ok(expired),
            Err(Ok(err)) => Err(err),
            other => panic!("unexpected check_timeout result: {:?}", other),
        }
    }

    pub fn mark_failed(&self, period: u64, reason: &str) {
        self.client
            .mark_failed(&self.admin, &period, &String::from_str(&self.env.env, reason));
    }

    pub fn retry_period(&self) -> u32 {
        self.client.retry_period(&self.admin)
    }

    pub fn current_period(&self) -> u64 {
        self.client.current_period()
    }

    pub fn forecast(&self, period: u64) -> Option<ForecastRecord> {
        self.client.get_forecast(&period)
    }

    pub fn gateway_queue_len(&self) -> u32 {
        self.gateway.pending_requests().len()
    }

    /// Whether the forecast contract's reentrancy lock is set between calls.
    pub fn lock_held(&self) -> bool {
        self.env
            .env
            .as_contract(&self.contract_id, || common::is_locked(&self.env.env))
    }

    /// Snapshot of all observable protocol state for invariant checking.
    pub fn snapshot(&self) -> ForecastSnapshot {
        let current_period = self.current_period();
        let mut records = std::vec::Vec::new();
        let mut pending = std::vec::Vec::new();

        for period in 1..=current_period {
            let latest_attempt = self.forecast(period).map(|r| r.attempt).unwrap_or(0);
            for attempt in 1..=latest_attempt {
                if let Some(record) = self.client.get_forecast_attempt(&period, &attempt) {
                    records.push(record);
                }
            }
            if let Some(request) = self.client.get_pending_request(&period) {
                pending.push(request);
            }
        }

        let processed_requests = self
            .issued_requests()
            .into_iter()
            .filter(|id| self.client.is_request_processed(id))
            .collect();

        ForecastSnapshot {
            timestamp: self.env.timestamp(),
            current_period,
            records,
            pending,
            registered_sources: self.client.get_sources().len(),
            active_sources: self.client.active_source_count(),
            config: self.client.get_config(),
            processed_requests,
            gateway_queue_len: self.gateway_queue_len(),
            lock_held: self.lock_held(),
        }
    }
}

/// Immutable view of forecast protocol state at a point in time.
#[derive(Debug, Clone)]
pub struct ForecastSnapshot {
    pub timestamp: u64,
    pub current_period: u64,
    /// Every attempt of every opened period, in period then attempt order.
    pub records: std::vec::Vec<ForecastRecord>,
    pub pending: std::vec::Vec<PendingRequest>,
    pub registered_sources: u32,
    pub active_sources: u32,
    pub config: ForecastConfig,
    pub processed_requests: std::vec::Vec<u64>,
    pub gateway_queue_len: u32,
    pub lock_held: bool,
}

impl ForecastSnapshot {
    /// Latest attempt for `period`.
    pub fn latest(&self, period: u64) -> Option<&ForecastRecord> {
        self.records.iter().rev().find(|r| r.period == period)
    }

    pub fn record(&self, period: u64, attempt: u32) -> Option<&ForecastRecord> {
        self.records
            .iter()
            .find(|r| r.period == period && r.attempt == attempt)
    }

    pub fn pending_for(&self, period: u64) -> Option<&PendingRequest> {
        self.pending.iter().find(|p| p.period == period)
    }
}

// ── Test Outcome Tracking ────────────────────────────────────────────────────

/// Result of a single test action, used by the state explorer and scenario DSL.
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    Ok,
    /// The contract rejected the action with this error code.
    ExpectedError(u32),
    UnexpectedError(std::string::String),
}

impl ActionOutcome {
    pub fn from_result<T>(result: Result<T, ForecastError>) -> Self {
        match result {
            Ok(_) => ActionOutcome::Ok,
            Err(e) => ActionOutcome::ExpectedError(e as u32),
        }
    }
}

/// Summary of a test run with coverage metrics.
#[derive(Debug, Clone)]
pub struct TestRunSummary {
    pub actions_executed: usize,
    pub invariant_checks: usize,
    pub invariant_violations: std::vec::Vec<std::string::String>,
    pub entry_points_hit: std::collections::HashSet<std::string::String>,
    pub transitions_observed: usize,
    pub forecasts_completed: usize,
}

impl TestRunSummary {
    pub fn new() -> Self {
        Self {
            actions_executed: 0,
            invariant_checks: 0,
            invariant_violations: std::vec::Vec::new(),
            entry_points_hit: std::collections::HashSet::new(),
            transitions_observed: 0,
            forecasts_completed: 0,
        }
    }

    /// True when no invariant violations were detected.
    pub fn passed(&self) -> bool {
        self.invariant_violations.is_empty()
    }

    /// Entry points hit / total known entry points.
    pub fn entry_point_coverage(&self, total_entry_points: usize) -> f64 {
        if total_entry_points == 0 {
            return 0.0;
        }
        self.entry_points_hit.len() as f64 / total_entry_points as f64
    }
}

impl Default for TestRunSummary {
    fn default() -> Self {
        Self::new()
    }
}
