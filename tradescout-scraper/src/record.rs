//! Turning a work unit plus extracted price into an output row.

use chrono::Local;
use regex::Regex;
use std::sync::OnceLock;
use tradescout_common::{ValuationRecord, WorkUnit};
use tradescout_config::RecordMeta;

fn capacity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\d+\s*(?:GB|TB)").unwrap())
}

/// Pull the storage capacity out of the model text.
///
/// Vendors append capacity to the model name; when several appear
/// ("256GB/512GB" range listings) the last one is the variant actually
/// priced. No capacity yields an empty column.
pub fn capacity_of(model: &str) -> String {
    capacity_re()
        .find_iter(model)
        .last()
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Infer the device type column from the model name; phones are the default.
pub fn device_type_of(model: &str) -> &'static str {
    let m = model.to_lowercase();
    if m.contains("ipad") || m.contains("tab") {
        "Tablet"
    } else if m.contains("watch") {
        "Smartwatch"
    } else {
        "Smartphone"
    }
}

/// Stamp a completed (or failed) unit into a dataset row.
pub fn build_record(meta: &RecordMeta, unit: &WorkUnit, value: String) -> ValuationRecord {
    ValuationRecord {
        country: meta.country.clone(),
        device_type: device_type_of(&unit.model).to_string(),
        brand: unit.brand.clone(),
        model: unit.model.clone(),
        capacity: capacity_of(&unit.model),
        color: String::new(),
        launch_rrp: String::new(),
        condition: unit.condition.to_string(),
        value_type: meta.value_type.clone(),
        currency: meta.currency.clone(),
        value,
        source: meta.source.clone(),
        updated_on: Local::now().format("%Y-%m-%d").to_string(),
        updated_by: meta.updated_by.clone(),
        comments: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradescout_common::Condition;

    #[test]
    fn capacity_takes_last_match() {
        assert_eq!(capacity_of("iPhone 13 128GB"), "128GB");
        assert_eq!(capacity_of("Galaxy Tab S9 256GB/512GB"), "512GB");
        assert_eq!(capacity_of("iPhone 15 Pro 1TB"), "1TB");
        assert_eq!(capacity_of("Galaxy S24"), "");
    }

    #[test]
    fn device_type_infers_from_model_name() {
        assert_eq!(device_type_of("iPhone 13 128GB"), "Smartphone");
        assert_eq!(device_type_of("iPad Air 5 64GB"), "Tablet");
        assert_eq!(device_type_of("Galaxy Tab A9"), "Tablet");
        assert_eq!(device_type_of("Galaxy Watch 6"), "Smartwatch");
    }

    #[test]
    fn record_carries_meta_and_unit_fields() {
        let meta = RecordMeta::default();
        let unit = WorkUnit::new("Apple", "iPhone 13 128GB", Condition::Good);
        let rec = build_record(&meta, &unit, "1234".into());

        assert_eq!(rec.brand, "Apple");
        assert_eq!(rec.capacity, "128GB");
        assert_eq!(rec.device_type, "Smartphone");
        assert_eq!(rec.condition, "Good");
        assert_eq!(rec.value, "1234");
        assert_eq!(rec.value_type, "Trade-In");
        assert_eq!(rec.currency, "MYR");
        assert!(rec.color.is_empty());
    }

    #[test]
    fn empty_value_still_builds_a_record() {
        let meta = RecordMeta::default();
        let unit = WorkUnit::new("Samsung", "Galaxy S24", Condition::Damaged);
        let rec = build_record(&meta, &unit, String::new());
        assert!(rec.value.is_empty());
        assert_eq!(rec.model, "Galaxy S24");
    }
}
