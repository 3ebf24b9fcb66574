//! Condition radios and the defect checklist.
//!
//! The form is rendered by a client-side framework that re-keys its DOM
//! between releases, so no single locator is trusted. Each radio is resolved
//! through an ordered list of strategies; the first that reports success
//! short-circuits the rest.

use anyhow::Result;
use async_trait::async_trait;
use fantoccini::{Client, Locator};
use serde_json::json;
use tradescout_common::{Condition, FormError, BODY_FLAWLESS_CODE};
use tradescout_drivers::scout_browser::pacing::Pacer;
use tracing::{debug, warn};

/// A radio button described every way we know how to find it.
#[derive(Debug, Clone)]
pub struct RadioTarget {
    /// Element id, e.g. `LCDS-01-cracked`.
    pub id: String,
    /// Radio group name shared by the siblings.
    pub group: String,
    /// The `value` attribute distinguishing this radio within its group.
    pub value: String,
    /// Visible wording printed beside the radio.
    pub label: String,
}

impl RadioTarget {
    pub fn screen(condition: Condition) -> Self {
        Self::from_code(condition.screen_code(), condition.screen_label())
    }

    pub fn body() -> Self {
        Self::from_code(BODY_FLAWLESS_CODE, "Flawless")
    }

    /// Codes follow `GROUP-NN-value`; split on the second dash.
    fn from_code(code: &str, label: &str) -> Self {
        let (group, value) = match code.match_indices('-').nth(1) {
            Some((i, _)) => (&code[..i], &code[i + 1..]),
            None => (code, ""),
        };
        Self {
            id: code.to_string(),
            group: group.to_string(),
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// One way of locating and activating a radio. Returns `Ok(false)` when the
/// strategy simply found nothing; `Err` means the browser misbehaved while
/// this strategy was driving it. Both outcomes hand over to the next
/// strategy in the ladder. Generic over the driver so the ladder can run
/// against a stand-in.
#[async_trait]
pub trait RadioStrategy<D: Sync>: Send + Sync {
    fn name(&self) -> &'static str;
    async fn select(&self, driver: &D, target: &RadioTarget) -> Result<bool>;
}

/// Strategy 1: direct id lookup plus a synthetic change event, entirely in
/// JS. The framework ignores bare attribute flips, hence the dispatch.
pub struct ById;

#[async_trait]
impl RadioStrategy<Client> for ById {
    fn name(&self) -> &'static str {
        "by-id"
    }

    async fn select(&self, client: &Client, target: &RadioTarget) -> Result<bool> {
        let script = r#"
            const el = document.getElementById(arguments[0]);
            if (!el) return false;
            el.checked = true;
            el.dispatchEvent(new Event('change', { bubbles: true }));
            return true;
        "#;
        let outcome = client.execute(script, vec![json!(target.id)]).await?;
        Ok(outcome.as_bool().unwrap_or(false))
    }
}

/// Strategy 2: scan the radio group by name and match on the value
/// attribute, surviving id churn as long as the group name holds.
pub struct ByGroupValue;

#[async_trait]
impl RadioStrategy<Client> for ByGroupValue {
    fn name(&self) -> &'static str {
        "by-group-value"
    }

    async fn select(&self, client: &Client, target: &RadioTarget) -> Result<bool> {
        let selector = format!("input[type='radio'][name='{}']", target.group);
        let radios = client.find_all(Locator::Css(&selector)).await?;
        for radio in &radios {
            if radio.attr("value").await?.as_deref() == Some(target.value.as_str()) {
                radio.click().await?;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Strategy 3: find the visible label text and click the nearest enclosing
/// container's radio. Slowest and loosest; last resort.
pub struct ByLabelText;

#[async_trait]
impl RadioStrategy<Client> for ByLabelText {
    fn name(&self) -> &'static str {
        "by-label-text"
    }

    async fn select(&self, client: &Client, target: &RadioTarget) -> Result<bool> {
        let script = r#"
            const wanted = arguments[0];
            const nodes = document.querySelectorAll('p, label, span');
            for (const n of nodes) {
                if (n.textContent.trim() !== wanted) continue;
                let scope = n.closest('div') || n.parentElement;
                while (scope) {
                    const radio = scope.querySelector("input[type='radio']");
                    if (radio) {
                        radio.click();
                        radio.dispatchEvent(new Event('change', { bubbles: true }));
                        return true;
                    }
                    scope = scope.parentElement;
                }
            }
            return false;
        "#;
        let outcome = client.execute(script, vec![json!(target.label)]).await?;
        Ok(outcome.as_bool().unwrap_or(false))
    }
}

fn strategies() -> [Box<dyn RadioStrategy<Client>>; 3] {
    [Box::new(ById), Box::new(ByGroupValue), Box::new(ByLabelText)]
}

/// Run the ladder until a strategy reports success. A strategy that errors
/// (stale element, not-interactable) counts the same as one that found
/// nothing; only exhausting the whole ladder is a failure.
async fn select_radio<D: Sync>(
    driver: &D,
    strategies: &[Box<dyn RadioStrategy<D>>],
    target: &RadioTarget,
) -> bool {
    for strategy in strategies {
        match strategy.select(driver, target).await {
            Ok(true) => {
                debug!(target: "scrape.form", id = %target.id, strategy = strategy.name(), "radio selected");
                return true;
            }
            Ok(false) => {
                debug!(target: "scrape.form", id = %target.id, strategy = strategy.name(), "strategy found nothing");
            }
            Err(e) => {
                warn!(target: "scrape.form", id = %target.id, strategy = strategy.name(), error = %e, "strategy faulted, trying next");
            }
        }
    }
    false
}

/// Uncheck every defect checkbox, then check "None of the above".
///
/// The clear-then-set order guards against checkboxes left over from the
/// previous unit when the frame was served from cache.
const DEFECT_SCRIPT: &str = r#"
    const boxes = document.querySelectorAll("input[type='checkbox']");
    let none = null;
    for (const b of boxes) {
        const scope = b.closest('label') || b.parentElement;
        const text = scope ? scope.textContent.trim().toLowerCase() : '';
        if (text.includes('none of the above')) { none = b; continue; }
        if (b.checked) {
            b.click();
            b.dispatchEvent(new Event('change', { bubbles: true }));
        }
    }
    if (!none) return false;
    if (!none.checked) {
        none.click();
        none.dispatchEvent(new Event('change', { bubbles: true }));
    }
    return true;
"#;

/// Fill the whole condition form for `condition`.
///
/// Screen grade varies per unit; the body radio is always forced to
/// flawless and the defect checklist always ends at "None of the above",
/// matching how the dataset has been priced historically.
pub async fn fill_condition_form(
    client: &Client,
    pacer: &Pacer,
    condition: Condition,
) -> Result<(), FormError> {
    let ladder = strategies();

    let screen = RadioTarget::screen(condition);
    if !select_radio(client, &ladder, &screen).await {
        warn!(target: "scrape.form", condition = %condition, "all screen radio strategies failed");
        return Err(FormError::ConditionUnselectable(condition.to_string()));
    }
    pacer.settle().await;

    if !select_radio(client, &ladder, &RadioTarget::body()).await {
        return Err(FormError::BodyUnselectable);
    }
    pacer.settle().await;

    let outcome = client
        .execute(DEFECT_SCRIPT, vec![])
        .await
        .map_err(anyhow::Error::from)?;
    if !outcome.as_bool().unwrap_or(false) {
        return Err(FormError::DefectChecklist);
    }
    pacer.settle().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    enum Step {
        Hit,
        Miss,
        Fault,
    }

    struct Scripted {
        step: Step,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn boxed(step: Step) -> (Box<dyn RadioStrategy<()>>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let s = Scripted {
                step,
                calls: Arc::clone(&calls),
            };
            (Box::new(s), calls)
        }
    }

    #[async_trait]
    impl RadioStrategy<()> for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn select(&self, _driver: &(), _target: &RadioTarget) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.step {
                Step::Hit => Ok(true),
                Step::Miss => Ok(false),
                Step::Fault => Err(anyhow::anyhow!("stale element reference")),
            }
        }
    }

    #[tokio::test]
    async fn faulting_strategy_hands_over_to_the_next() {
        let (faulty, faulty_calls) = Scripted::boxed(Step::Fault);
        let (hit, hit_calls) = Scripted::boxed(Step::Hit);
        let (spare, spare_calls) = Scripted::boxed(Step::Miss);
        let ladder = [faulty, hit, spare];

        let target = RadioTarget::screen(Condition::Good);
        assert!(select_radio(&(), &ladder, &target).await);
        assert_eq!(faulty_calls.load(Ordering::SeqCst), 1);
        assert_eq!(hit_calls.load(Ordering::SeqCst), 1);
        // Success short-circuits the rest of the ladder.
        assert_eq!(spare_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ladder_fails_only_after_every_strategy_was_tried() {
        let (a, a_calls) = Scripted::boxed(Step::Fault);
        let (b, b_calls) = Scripted::boxed(Step::Miss);
        let (c, c_calls) = Scripted::boxed(Step::Fault);
        let ladder = [a, b, c];

        let target = RadioTarget::body();
        assert!(!select_radio(&(), &ladder, &target).await);
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
        assert_eq!(c_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn screen_target_splits_group_and_value() {
        let t = RadioTarget::screen(Condition::Good);
        assert_eq!(t.id, "LCDS-01-minor_scratches");
        assert_eq!(t.group, "LCDS-01");
        assert_eq!(t.value, "minor_scratches");
        assert_eq!(t.label, "Minor scratches");
    }

    #[test]
    fn body_target_is_always_flawless() {
        let t = RadioTarget::body();
        assert_eq!(t.id, "DECO-01-flawless");
        assert_eq!(t.group, "DECO-01");
        assert_eq!(t.value, "flawless");
    }
}
