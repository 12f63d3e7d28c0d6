//! # Protocol Invariants
//!
//! State invariants are checked against a single `ForecastSnapshot`;
//! transition invariants compare the snapshots taken before and after one
//! action. Both compose through their respective `*Set` builders.
//!
//! Each check is linear in the number of stored forecast records.

extern crate std;

use std::string::{String, ToString};
use std::vec::Vec;

use forecast::types::{WIND_SPEED_MAX, WIND_SPEED_MIN};
use forecast::ForecastStatus;

use super::ForecastSnapshot;

// ── Invariant Trait ──────────────────────────────────────────────────────────

/// A named invariant that can be verified against a state snapshot.
pub trait Invariant {
    /// Human-readable name for error messages.
    fn name(&self) -> &str;

    /// `Err(description)` on violation.
    fn check(&self, snapshot: &ForecastSnapshot) -> Result<(), String>;
}

// ── Built-in Invariants ──────────────────────────────────────────────────────

/// **Pending Iff Awaiting**: a pending request exists for a period exactly
/// when its latest attempt is `DecryptionRequested`, and both carry the same
/// request id.
pub struct PendingMatchesStatus;

impl Invariant for PendingMatchesStatus {
    fn name(&self) -> &str {
        "pending request <=> latest attempt awaiting decryption"
    }

    fn check(&self, snapshot: &ForecastSnapshot) -> Result<(), String> {
        for period in 1..=snapshot.current_period {
            let latest = snapshot.latest(period);
            let awaiting = latest
                .map(|r| r.status == ForecastStatus::DecryptionRequested)
                .unwrap_or(false);
            match (awaiting, snapshot.pending_for(period)) {
                (true, Some(pending)) => {
                    let record_id = latest.and_then(|r| r.request_id);
                    if record_id != Some(pending.request_id) {
                        return Err(std::format!(
                            "Period {}: record request {:?} != pending request {}",
                            period,
                            record_id,
                            pending.request_id
                        ));
                    }
                }
                (false, None) => {}
                (true, None) => {
                    return Err(std::format!(
                        "Period {} awaits decryption without a pending request",
                        period
                    ))
                }
                (false, Some(pending)) => {
                    return Err(std::format!(
                        "Period {} has stray pending request {} in status {:?}",
                        period,
                        pending.request_id,
                        latest.map(|r| r.status)
                    ))
                }
            }
        }
        Ok(())
    }
}

/// **Closed History**: every period before the current one ended `Completed`.
///
/// The period counter only moves when a forecast completes.
pub struct EarlierPeriodsCompleted;

impl Invariant for EarlierPeriodsCompleted {
    fn name(&self) -> &str {
        "all periods before current are completed"
    }

    fn check(&self, snapshot: &ForecastSnapshot) -> Result<(), String> {
        for period in 1..snapshot.current_period {
            match snapshot.latest(period).map(|r| r.status) {
                Some(ForecastStatus::Completed) => {}
                other => {
                    return Err(std::format!(
                        "Period {} < current {} ended in {:?}",
                        period,
                        snapshot.current_period,
                        other
                    ))
                }
            }
        }
        Ok(())
    }
}

/// **Single Completion**: at most one attempt per period is `Completed`, and
/// it is the latest one.
pub struct SingleCompletionPerPeriod;

impl Invariant for SingleCompletionPerPeriod {
    fn name(&self) -> &str {
        "at most one completed attempt per period"
    }

    fn check(&self, snapshot: &ForecastSnapshot) -> Result<(), String> {
        for period in 1..=snapshot.current_period {
            let completed: Vec<u32> = snapshot
                .records
                .iter()
                .filter(|r| r.period == period && r.status == ForecastStatus::Completed)
                .map(|r| r.attempt)
                .collect();
            if completed.len() > 1 {
                return Err(std::format!(
                    "Period {} completed by attempts {:?}",
                    period,
                    completed
                ));
            }
            if let (Some(attempt), Some(latest)) = (completed.first(), snapshot.latest(period)) {
                if latest.attempt != *attempt {
                    return Err(std::format!(
                        "Period {} has attempt {} after completed attempt {}",
                        period,
                        latest.attempt,
                        attempt
                    ));
                }
            }
        }
        Ok(())
    }
}

/// **Bounded Participation**: completed forecasts have between one and
/// `registered_sources` participants.
pub struct CompletedParticipantsBounded;

impl Invariant for CompletedParticipantsBounded {
    fn name(&self) -> &str {
        "1 <= participants <= registered sources for completed forecasts"
    }

    fn check(&self, snapshot: &ForecastSnapshot) -> Result<(), String> {
        for record in snapshot
            .records
            .iter()
            .filter(|r| r.status == ForecastStatus::Completed)
        {
            if record.participants == 0 || record.participants > snapshot.registered_sources {
                return Err(std::format!(
                    "Period {} completed with {} participants ({} registered)",
                    record.period,
                    record.participants,
                    snapshot.registered_sources
                ));
            }
        }
        Ok(())
    }
}

/// **Plausible Output**: wind speed is published unobfuscated, so its mean
/// stays inside the accepted reading bounds.
pub struct CompletedWindSpeedInBounds;

impl Invariant for CompletedWindSpeedInBounds {
    fn name(&self) -> &str {
        "completed wind speed within reading bounds"
    }

    fn check(&self, snapshot: &ForecastSnapshot) -> Result<(), String> {
        for record in snapshot
            .records
            .iter()
            .filter(|r| r.status == ForecastStatus::Completed)
        {
            if record.wind_speed < WIND_SPEED_MIN || record.wind_speed > WIND_SPEED_MAX {
                return Err(std::format!(
                    "Period {} wind speed {} outside [{}, {}]",
                    record.period,
                    record.wind_speed,
                    WIND_SPEED_MIN,
                    WIND_SPEED_MAX
                ));
            }
        }
        Ok(())
    }
}

/// **Timestamps**: open records have no completion time; closed records were
/// completed no earlier than they were opened.
pub struct CompletionTimestamps;

impl Invariant for CompletionTimestamps {
    fn name(&self) -> &str {
        "completed_at set only on terminal records and >= opened_at"
    }

    fn check(&self, snapshot: &ForecastSnapshot) -> Result<(), String> {
        for record in &snapshot.records {
            if record.status.is_terminal() {
                if record.completed_at < record.opened_at {
                    return Err(std::format!(
                        "Period {} attempt {} completed at {} before opening at {}",
                        record.period,
                        record.attempt,
                        record.completed_at,
                        record.opened_at
                    ));
                }
            } else if record.completed_at != 0 {
                return Err(std::format!(
                    "Period {} attempt {} is {:?} but has completed_at {}",
                    record.period,
                    record.attempt,
                    record.status,
                    record.completed_at
                ));
            }
        }
        Ok(())
    }
}

/// **Lock Released**: the reentrancy lock never outlives an invocation.
pub struct ReentrancyLockReleased;

impl Invariant for ReentrancyLockReleased {
    fn name(&self) -> &str {
        "reentrancy lock released between calls"
    }

    fn check(&self, snapshot: &ForecastSnapshot) -> Result<(), String> {
        if snapshot.lock_held {
            return Err("Reentrancy lock still held after the call returned".to_string());
        }
        Ok(())
    }
}

// ── Invariant Set ────────────────────────────────────────────────────────────

/// A composable set of invariants that are checked together.
pub struct InvariantSet {
    invariants: Vec<Box<dyn Invariant>>,
}

impl InvariantSet {
    pub fn new() -> Self {
        Self {
            invariants: Vec::new(),
        }
    }

    /// All built-in forecast invariants.
    pub fn forecast_defaults() -> Self {
        let mut set = Self::new();
        set.add(Box::new(PendingMatchesStatus));
        set.add(Box::new(EarlierPeriodsCompleted));
        set.add(Box::new(SingleCompletionPerPeriod));
        set.add(Box::new(CompletedParticipantsBounded));
        set.add(Box::new(CompletedWindSpeedInBounds));
        set.add(Box::new(CompletionTimestamps));
        set.add(Box::new(ReentrancyLockReleased));
        set
    }

    pub fn add(&mut self, invariant: Box<dyn Invariant>) {
        self.invariants.push(invariant);
    }

    /// Returns `(invariant_name, violation_message)` for every failure.
    pub fn check_all(&self, snapshot: &ForecastSnapshot) -> Vec<(String, String)> {
        let mut violations = Vec::new();
        for inv in &self.invariants {
            if let Err(msg) = inv.check(snapshot) {
                violations.push((inv.name().to_string(), msg));
            }
        }
        violations
    }

    /// Panics with a report listing every violation.
    pub fn assert_all(&self, snapshot: &ForecastSnapshot) {
        let violations = self.check_all(snapshot);
        if !violations.is_empty() {
            let mut report = String::from("Invariant violations detected:\n");
            for (name, msg) in &violations {
                report.push_str(&std::format!("  ✗ [{}]: {}\n", name, msg));
            }
            panic!("{}", report);
        }
    }

    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

impl Default for InvariantSet {
    fn default() -> Self {
        Self::new()
    }
}

// ── Transition Invariants ────────────────────────────────────────────────────

/// Invariants relating the snapshots before and after one action.
pub trait TransitionInvariant {
    fn name(&self) -> &str;
    fn check(&self, before: &ForecastSnapshot, after: &ForecastSnapshot) -> Result<(), String>;
}

/// **Monotonic Period**: the period counter never goes back, and moves by at
/// most one per action.
pub struct PeriodMonotonic;

impl TransitionInvariant for PeriodMonotonic {
    fn name(&self) -> &str {
        "current period advances by 0 or 1"
    }

    fn check(&self, before: &ForecastSnapshot, after: &ForecastSnapshot) -> Result<(), String> {
        let step = after.current_period.checked_sub(before.current_period);
        if !matches!(step, Some(0) | Some(1)) {
            return Err(std::format!(
                "Period moved {} -> {}",
                before.current_period,
                after.current_period
            ));
        }
        Ok(())
    }
}

/// Position of a status along the lifecycle; terminal statuses share a rank.
fn status_rank(status: ForecastStatus) -> u8 {
    match status {
        ForecastStatus::Pending => 0,
        ForecastStatus::Aggregating => 1,
        ForecastStatus::DecryptionRequested => 2,
        ForecastStatus::Completed | ForecastStatus::Failed | ForecastStatus::TimedOut => 3,
    }
}

/// **Forward Only**: a record's status only moves forward, and a terminal
/// record is never rewritten.
pub struct StatusMonotonic;

impl TransitionInvariant for StatusMonotonic {
    fn name(&self) -> &str {
        "record status only moves forward; terminal records frozen"
    }

    fn check(&self, before: &ForecastSnapshot, after: &ForecastSnapshot) -> Result<(), String> {
        for old in &before.records {
            let new = match after.record(old.period, old.attempt) {
                Some(r) => r,
                None => {
                    return Err(std::format!(
                        "Period {} attempt {} disappeared",
                        old.period,
                        old.attempt
                    ))
                }
            };
            if old.status.is_terminal() {
                if new != old {
                    return Err(std::format!(
                        "Terminal record {}#{} changed: {:?} -> {:?}",
                        old.period,
                        old.attempt,
                        old,
                        new
                    ));
                }
            } else if status_rank(new.status) < status_rank(old.status) {
                return Err(std::format!(
                    "Period {} attempt {} went back {:?} -> {:?}",
                    old.period,
                    old.attempt,
                    old.status,
                    new.status
                ));
            }
        }
        Ok(())
    }
}

/// **Sticky Replay Marks**: a processed request id stays processed.
pub struct ProcessedRequestsSticky;

impl TransitionInvariant for ProcessedRequestsSticky {
    fn name(&self) -> &str {
        "processed request ids are never released"
    }

    fn check(&self, before: &ForecastSnapshot, after: &ForecastSnapshot) -> Result<(), String> {
        for id in &before.processed_requests {
            if !after.processed_requests.contains(id) {
                return Err(std::format!("Request {} is no longer marked processed", id));
            }
        }
        Ok(())
    }
}

/// **Time Moves Forward**: the ledger clock never runs backwards.
pub struct MonotonicTime;

impl TransitionInvariant for MonotonicTime {
    fn name(&self) -> &str {
        "ledger timestamp is non-decreasing"
    }

    fn check(&self, before: &ForecastSnapshot, after: &ForecastSnapshot) -> Result<(), String> {
        if after.timestamp < before.timestamp {
            return Err(std::format!(
                "Time went backwards: {} -> {}",
                before.timestamp,
                after.timestamp
            ));
        }
        Ok(())
    }
}

/// Composite checker for transition invariants.
pub struct TransitionInvariantSet {
    invariants: Vec<Box<dyn TransitionInvariant>>,
}

impl TransitionInvariantSet {
    pub fn new() -> Self {
        Self {
            invariants: Vec::new(),
        }
    }

    pub fn forecast_defaults() -> Self {
        let mut set = Self::new();
        set.add(Box::new(PeriodMonotonic));
        set.add(Box::new(StatusMonotonic));
        set.add(Box::new(ProcessedRequestsSticky));
        set.add(Box::new(MonotonicTime));
        set
    }

    pub fn add(&mut self, invariant: Box<dyn TransitionInvariant>) {
        self.invariants.push(invariant);
    }

    pub fn check_all(
        &self,
        before: &ForecastSnapshot,
        after: &ForecastSnapshot,
    ) -> Vec<(String, String)> {
        let mut violations = Vec::new();
        for inv in &self.invariants {
            if let Err(msg) = inv.check(before, after) {
                violations.push((inv.name().to_string(), msg));
            }
        }
        violations
    }

    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

impl Default for TransitionInvariantSet {
    fn default() -> Self {
        Self::new()
    }
}
