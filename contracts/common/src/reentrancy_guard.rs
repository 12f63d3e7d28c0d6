//! Scoped reentrancy lock.
//!
//! [`ReentrancyGuard::acquire`] sets a flag in instance storage and returns a
//! guard value; the flag is cleared when the guard is dropped, so every exit
//! path of the guarded function (including `?` early returns) releases it.
//! A second `acquire` while the flag is set fails with
//! [`CommonError::Reentrancy`].

use soroban_sdk::{symbol_short, Env, Symbol};

use crate::CommonError;

const LOCKED: Symbol = symbol_short!("RE_LOCK");

pub struct ReentrancyGuard {
    env: Env,
}

impl ReentrancyGuard {
    /// Take the lock for the current contract.
    ///
    /// Bind the result to a named variable (`let _guard = ...`), not `_`,
    /// otherwise it is dropped immediately.
    pub fn acquire(env: &Env) -> Result<Self, CommonError> {
        if is_locked(env) {
            return Err(CommonError::Reentrancy);
        }
        env.storage().instance().set(&LOCKED, &true);
        Ok(Self { env: env.clone() })
    }
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        self.env.storage().instance().remove(&LOCKED);
    }
}

/// Returns `true` while a guard is held.
pub fn is_locked(env: &Env) -> bool {
    env.storage().instance().get(&LOCKED).unwrap_or(false)
}
