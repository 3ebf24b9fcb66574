//! The quote-retrieval state machine.
//!
//! Drives the vendor's trade-in wizard one work unit at a time:
//! navigate into the embedded frame, pick brand and model, grade the device,
//! submit, and pull the quoted price out of whatever the page rendered.
//!
//! - [`navigate`]: page load and frame entry
//! - [`select`]: brand and model dropdowns
//! - [`form`]: condition radios and the defect checklist
//! - [`extract`]: submit click and price parsing
//! - [`record`]: turning a work unit plus price into an output row
//! - [`harvest`]: the per-unit loop, stage seam, and recovery controller
pub mod extract;
pub mod form;
pub mod harvest;
pub mod navigate;
pub mod record;
pub mod select;
