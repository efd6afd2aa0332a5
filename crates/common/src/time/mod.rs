//! Time abstractions.
//!
//! Services never call `Utc::now()` directly; they take a [`Clock`] so tests
//! can pin "now" to a fixed instant (working-hours windows, token expiry).

pub mod clock;

pub use clock::{Clock, MockClock, SystemClock};
