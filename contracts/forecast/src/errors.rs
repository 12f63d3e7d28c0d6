use common::CommonError;
use soroban_sdk::contracterror;

/// Errors returned by the forecast contract.
///
/// # Code ranges
/// | Range   | Purpose                          |
/// |---------|----------------------------------|
/// | 1 – 9   | Lifecycle / initialisation       |
/// | 10 – 19 | Authorisation                    |
/// | 20 – 29 | Source registry / reading bounds |
/// | 30 – 39 | Forecast state                   |
/// | 40 – 49 | Authenticity / replay            |
/// | 50 – 59 | Math / invariants                |
/// | 60 – 69 | Configuration                    |
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ForecastError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Reentrancy = 3,

    Unauthorized = 10,

    SourceNotRegistered = 20,
    SourceInactive = 21,
    SourceAlreadyRegistered = 22,
    TooManySources = 23,
    AlreadySubmitted = 24,
    InvalidTemperature = 25,
    InvalidHumidity = 26,
    InvalidPressure = 27,
    InvalidWindSpeed = 28,

    ForecastNotFound = 30,
    InvalidForecastState = 31,
    CollectionWindowClosed = 32,
    CollectionWindowOpen = 33,

    InvalidProof = 40,
    RequestAlreadyProcessed = 41,

    InsufficientParticipants = 50,
    InvalidDivisor = 51,
    InvalidCleartexts = 52,
    ArithmeticOverflow = 53,

    InvalidConfig = 60,
}

impl From<CommonError> for ForecastError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::NotInitialized => ForecastError::NotInitialized,
            CommonError::AlreadyInitialized => ForecastError::AlreadyInitialized,
            CommonError::Reentrancy => ForecastError::Reentrancy,
            CommonError::AccessDenied => ForecastError::Unauthorized,
        }
    }
}
