//! Availability: timezone-aware free-slot search over calendar busy time.

pub mod engine;
pub mod ports;
pub mod service;

pub use engine::{suggest_slots, SlotSearch};
pub use service::AvailabilityService;
