//! Application services.

pub mod briefing;
pub mod catalog_service;
pub mod round_timer;
pub mod session_controller;

pub use catalog_service::{CatalogListing, CatalogService, TaskListing};
pub use round_timer::{RoundTimer, TimerState};
pub use session_controller::{
    EndOutcome, HypothesisOutcome, QueryOutcome, SessionSnapshot, TaskSessionController,
    TimeoutOutcome,
};
