//! Shared utilities and error types for the encrypted forecast contracts.
//!
//! This crate provides:
//! - [`CommonError`]: error codes raised by the shared helpers.
//! - [`reentrancy_guard`]: scoped lock around state-mutating entry points.
//! - [`ttl`]: storage time-to-live bumping used by every contract.
//!
//! Contract-specific errors map [`CommonError`] into their own enums so a
//! caller only ever sees one error type per contract.

#![no_std]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

use soroban_sdk::contracterror;

// ── Modules ──────────────────────────────────────────────────────────────────

pub mod reentrancy_guard;
pub mod ttl;

pub use reentrancy_guard::*;
pub use ttl::*;

// ── Shared error enum ────────────────────────────────────────────────────────

/// Error codes raised by the helpers in this crate.
///
/// # Code ranges
/// | Range   | Purpose                       |
/// |---------|-------------------------------|
/// | 1 – 9   | Lifecycle / initialisation    |
/// | 10 – 19 | Authentication & authorisation|
#[contracterror]
#[derive(Clone, Debug, Eq, PartialEq, Copy)]
#[repr(u32)]
pub enum CommonError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    /// A guarded entry point was entered while another one was running.
    Reentrancy = 3,
    AccessDenied = 10,
}
