//! Driver layer for browser automation.
//!
//! This crate owns the WebDriver session used by the harvest pipeline and the
//! low-level helpers for talking to an unstable, automation-hostile page.
//!
//! - [`scout_browser::driver::ScoutSession`]: session lifecycle (create,
//!   liveness probe, destroy)
//! - [`scout_browser::wait::Waiter`]: bounded polling for element presence
//! - [`scout_browser::stealth`]: Chrome arguments and JS evasions
//! - [`scout_browser::pacing`]: settle and inter-unit delays
pub mod scout_browser;
