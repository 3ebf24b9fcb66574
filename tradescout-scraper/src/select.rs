//! Brand and model dropdowns.

use fantoccini::Locator;
use tradescout_common::SelectionError;
use tradescout_config::BrandSpec;
use tradescout_drivers::scout_browser::{driver::ScoutSession, wait::WaitError};
use tracing::{debug, warn};

const BRAND_SELECT: &str = "select#select-brand";
const MODEL_SELECT: &str = "select#select-model";
/// Model options once the dropdown has repopulated for the chosen brand;
/// the placeholder keeps an empty value.
const MODEL_OPTIONS: &str = r#"select#select-model option[value]:not([value=""])"#;

/// True when the option label and the requested brand contain each other
/// (case-insensitive, either direction). Vendor labels drift between
/// "Apple", "Apple iPhone", and plain "iPhone"-era spellings.
fn brand_matches(option_text: &str, brand: &str) -> bool {
    let opt = option_text.trim().to_lowercase();
    let wanted = brand.trim().to_lowercase();
    if opt.is_empty() || wanted.is_empty() {
        return false;
    }
    opt.contains(&wanted) || wanted.contains(&opt)
}

/// Pick the brand option, by text match first and positional fallback second.
///
/// The fallback index is the raw option index with the placeholder at 0.
/// Fragile when the vendor reorders the dropdown; kept because the labels
/// have historically been less stable than the ordering.
pub async fn select_brand(session: &ScoutSession, brand: &BrandSpec) -> Result<(), SelectionError> {
    let dropdown = session
        .long_waiter()
        .first(BRAND_SELECT)
        .await
        .map_err(wait_to_driver)?;
    let options = dropdown
        .find_all(Locator::Css("option"))
        .await
        .map_err(anyhow::Error::from)?;

    for (i, option) in options.iter().enumerate() {
        if i == 0 {
            continue; // placeholder
        }
        let text = option.text().await.map_err(anyhow::Error::from)?;
        if brand_matches(&text, &brand.name) {
            debug!(target: "scrape.select", brand = %brand.name, index = i, option = %text.trim(), "brand matched by text");
            dropdown
                .select_by_index(i)
                .await
                .map_err(anyhow::Error::from)?;
            return Ok(());
        }
    }

    if brand.fallback_index > 0 && brand.fallback_index < options.len() {
        warn!(target: "scrape.select", brand = %brand.name, index = brand.fallback_index, "no text match; using positional fallback");
        dropdown
            .select_by_index(brand.fallback_index)
            .await
            .map_err(anyhow::Error::from)?;
        return Ok(());
    }

    Err(SelectionError::BrandNotFound(brand.name.clone()))
}

/// Enumerate the models offered for the currently selected brand.
///
/// Waits for the dependent dropdown to repopulate, then returns the visible
/// text of every non-placeholder option.
pub async fn list_models(session: &ScoutSession) -> Result<Vec<String>, SelectionError> {
    let options = session
        .long_waiter()
        .all(MODEL_OPTIONS)
        .await
        .map_err(wait_to_driver)?;

    let mut models = Vec::with_capacity(options.len());
    for option in &options {
        let text = option.text().await.map_err(anyhow::Error::from)?;
        let text = text.trim();
        if !text.is_empty() {
            models.push(text.to_string());
        }
    }
    debug!(target: "scrape.select", count = models.len(), "models enumerated");
    Ok(models)
}

/// Pick the model whose visible text equals `model` exactly (after trim).
pub async fn select_model(session: &ScoutSession, model: &str) -> Result<(), SelectionError> {
    // Repopulation is asynchronous; wait for real options before reading.
    session
        .long_waiter()
        .all(MODEL_OPTIONS)
        .await
        .map_err(|e| match e {
            WaitError::Timeout(_) => SelectionError::ModelNotFound(model.to_string()),
            WaitError::Driver(e) => SelectionError::Driver(e.into()),
        })?;

    let dropdown = session
        .short_waiter()
        .first(MODEL_SELECT)
        .await
        .map_err(wait_to_driver)?;
    let options = dropdown
        .find_all(Locator::Css("option"))
        .await
        .map_err(anyhow::Error::from)?;

    for (i, option) in options.iter().enumerate() {
        let text = option.text().await.map_err(anyhow::Error::from)?;
        if text.trim() == model {
            dropdown
                .select_by_index(i)
                .await
                .map_err(anyhow::Error::from)?;
            return Ok(());
        }
    }

    Err(SelectionError::ModelNotFound(model.to_string()))
}

fn wait_to_driver(e: WaitError) -> SelectionError {
    SelectionError::Driver(anyhow::Error::from(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brand_matches_substring_both_directions() {
        assert!(brand_matches("Apple iPhone", "Apple"));
        assert!(brand_matches("Apple", "Apple iPhone"));
        assert!(brand_matches("  samsung  ", "Samsung"));
    }

    #[test]
    fn brand_match_rejects_unrelated_and_empty() {
        assert!(!brand_matches("Xiaomi", "Apple"));
        assert!(!brand_matches("", "Apple"));
        assert!(!brand_matches("Apple", ""));
    }
}
