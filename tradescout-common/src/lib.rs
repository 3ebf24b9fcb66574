//! Common types and utilities shared across tradescout crates.
//!
//! This crate defines the harvest data model, observability helpers, and the
//! shared error taxonomy used throughout the workspace. It is intentionally
//! lightweight so that every crate can depend on it without pulling in the
//! browser stack.
//!
//! # Overview
//!
//! - [`WorkUnit`]: one (brand, model, condition) quote attempt
//! - [`ValuationRecord`]: the row emitted for a completed attempt
//! - [`Condition`]: device grade and its on-form radio codes
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`ScoutError`] and [`Result`]: shared error handling
//!
//! # Examples
//!
//! ```rust
//! use tradescout_common::Condition;
//!
//! assert_eq!(Condition::Good.screen_code(), "LCDS-01-minor_scratches");
//! assert_eq!(Condition::Good.to_string(), "Good");
//! ```
use serde::{Deserialize, Serialize};

pub mod observability;

/// Radio id forced for the body sub-step no matter which grade was requested.
pub const BODY_FLAWLESS_CODE: &str = "DECO-01-flawless";

/// Device grade requested from the trade-in form.
///
/// The form's screen-condition group carries four radios; the
/// `heavy_scratches` one sits between the codes for [`Condition::Good`] and
/// [`Condition::Damaged`] and is never submitted by any grade here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Flawless,
    Good,
    Damaged,
}

impl Condition {
    /// All grades, in submission order.
    pub const ALL: [Condition; 3] = [Condition::Flawless, Condition::Good, Condition::Damaged];

    /// Radio element id for the screen-condition group.
    pub fn screen_code(&self) -> &'static str {
        match self {
            Condition::Flawless => "LCDS-01-flawless",
            Condition::Good => "LCDS-01-minor_scratches",
            Condition::Damaged => "LCDS-01-cracked",
        }
    }

    /// Visible wording next to the radio, used by the label-text fallback.
    pub fn screen_label(&self) -> &'static str {
        match self {
            Condition::Flawless => "Flawless",
            Condition::Good => "Minor scratches",
            Condition::Damaged => "Cracked",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Condition::Flawless => "Flawless",
            Condition::Good => "Good",
            Condition::Damaged => "Damaged",
        };
        f.write_str(s)
    }
}

/// One quote attempt. Immutable once enumerated; yields at most one
/// [`ValuationRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    pub brand: String,
    pub model: String,
    pub condition: Condition,
}

impl WorkUnit {
    pub fn new(brand: impl Into<String>, model: impl Into<String>, condition: Condition) -> Self {
        Self {
            brand: brand.into(),
            model: model.into(),
            condition,
        }
    }
}

/// Output row for a completed attempt. Field order matches the dataset's
/// fixed column layout; never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationRecord {
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Device Type")]
    pub device_type: String,
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "Capacity")]
    pub capacity: String,
    #[serde(rename = "Color")]
    pub color: String,
    #[serde(rename = "Launch RRP")]
    pub launch_rrp: String,
    #[serde(rename = "Condition")]
    pub condition: String,
    #[serde(rename = "Value Type")]
    pub value_type: String,
    #[serde(rename = "Currency")]
    pub currency: String,
    /// Numeric string with thousands separators stripped, or empty when no
    /// quote could be extracted.
    #[serde(rename = "Value")]
    pub value: String,
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Updated on")]
    pub updated_on: String,
    #[serde(rename = "Updated by")]
    pub updated_by: String,
    #[serde(rename = "Comments")]
    pub comments: String,
}

impl ValuationRecord {
    /// Column headers in dataset order.
    pub const HEADERS: [&'static str; 15] = [
        "Country",
        "Device Type",
        "Brand",
        "Model",
        "Capacity",
        "Color",
        "Launch RRP",
        "Condition",
        "Value Type",
        "Currency",
        "Value",
        "Source",
        "Updated on",
        "Updated by",
        "Comments",
    ];
}

/// Failures while loading the vendor page and entering its embedded frame.
#[derive(thiserror::Error, Debug)]
pub enum NavigationError {
    /// The page rendered without any iframe to switch into.
    #[error("no iframe found on the vendor page")]
    NoFrameFound,

    /// Page load exceeded the configured timeout.
    #[error("page load timed out")]
    LoadTimeout,

    /// The WebDriver session rejected the navigation outright.
    #[error("navigation failed: {0}")]
    Driver(#[from] anyhow::Error),
}

/// Failures while driving the brand and model dropdowns.
#[derive(thiserror::Error, Debug)]
pub enum SelectionError {
    /// No option matched the requested brand, even via positional fallback.
    #[error("brand not found in dropdown: {0}")]
    BrandNotFound(String),

    /// The model dropdown never offered the requested model.
    #[error("model not found in dropdown: {0}")]
    ModelNotFound(String),

    #[error("selection failed: {0}")]
    Driver(#[from] anyhow::Error),
}

/// Failures while filling the condition form. Each variant names the
/// sub-step that could not be completed.
#[derive(thiserror::Error, Debug)]
pub enum FormError {
    /// All locator strategies for the screen-condition radio failed.
    #[error("screen condition radio could not be selected: {0}")]
    ConditionUnselectable(String),

    /// The forced flawless-body radio could not be selected.
    #[error("body condition radio could not be selected")]
    BodyUnselectable,

    /// The defect checklist could not be cleared or the none-of-the-above
    /// checkbox could not be set.
    #[error("defect checklist could not be completed")]
    DefectChecklist,

    #[error("form interaction failed: {0}")]
    Driver(#[from] anyhow::Error),
}

/// Error types used across the harvest pipeline.
#[derive(thiserror::Error, Debug)]
pub enum ScoutError {
    #[error("navigation error: {0}")]
    Navigation(#[from] NavigationError),

    #[error("selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("form error: {0}")]
    Form(#[from] FormError),

    /// The browser session died. The only error that triggers corrective
    /// action instead of a plain skip.
    #[error("browser session is no longer alive")]
    SessionDeath,

    /// A driver (WebDriver, filesystem, etc.) reported an error.
    #[error("driver error: {0}")]
    Driver(#[from] anyhow::Error),

    /// Configuration was incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenient alias for results that use [`ScoutError`].
pub type Result<T> = std::result::Result<T, ScoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_codes_map_each_grade() {
        assert_eq!(Condition::Flawless.screen_code(), "LCDS-01-flawless");
        assert_eq!(Condition::Good.screen_code(), "LCDS-01-minor_scratches");
        assert_eq!(Condition::Damaged.screen_code(), "LCDS-01-cracked");
    }

    #[test]
    fn heavy_scratches_code_is_never_produced() {
        for c in Condition::ALL {
            assert_ne!(c.screen_code(), "LCDS-01-heavy_scratches");
        }
    }

    #[test]
    fn record_headers_count_matches_fields() {
        assert_eq!(ValuationRecord::HEADERS.len(), 15);
    }

    #[test]
    fn condition_displays_grade_name() {
        assert_eq!(Condition::Damaged.to_string(), "Damaged");
    }

    #[test]
    fn stage_errors_roll_up_into_scout_error() {
        let e: ScoutError = NavigationError::NoFrameFound.into();
        assert!(matches!(e, ScoutError::Navigation(_)));

        let e: ScoutError = SelectionError::BrandNotFound("Apple".into()).into();
        assert!(e.to_string().contains("Apple"));

        let e: ScoutError = FormError::BodyUnselectable.into();
        assert!(matches!(e, ScoutError::Form(_)));
    }
}
