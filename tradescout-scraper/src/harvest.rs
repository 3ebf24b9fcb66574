//! The per-unit loop and recovery controller.
//!
//! Stages are driven through the [`QuoteStages`] seam so the loop's skip,
//! record, and recovery policies can be exercised without a browser.

use std::time::Duration;

use async_trait::async_trait;
use tradescout_common::{Condition, FormError, NavigationError, SelectionError, WorkUnit};
use tradescout_config::{BrandSpec, ScoutConfig, WaitConfig};
use tradescout_drivers::scout_browser::{
    driver::{ScoutSession, SessionConfig},
    pacing::Pacer,
};
use tradescout_sink::RecordSink;
use tracing::{info, warn};

use crate::{extract, form, navigate, record, select};

/// Stage at which a unit failed; used for logging and skip accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Navigate,
    BrandSelect,
    ModelSelect,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Navigate => "navigate",
            Stage::BrandSelect => "brand-select",
            Stage::ModelSelect => "model-select",
        };
        f.write_str(s)
    }
}

/// Outcome of one work unit.
#[derive(Debug)]
enum UnitOutcome {
    /// Unit passed selection; emit exactly one record, empty-valued when the
    /// form or extraction came up short.
    Recorded { value: String },
    /// Unit never passed selection; no record.
    Skipped { stage: Stage },
    /// The browser died under us; the recovery controller takes over.
    SessionLost,
}

/// Everything the loop needs from the browser, one stage per method.
#[async_trait]
pub trait QuoteStages: Send {
    async fn enter(&mut self) -> Result<(), NavigationError>;
    async fn select_brand(&mut self, brand: &BrandSpec) -> Result<(), SelectionError>;
    async fn list_models(&mut self) -> Result<Vec<String>, SelectionError>;
    async fn select_model(&mut self, model: &str) -> Result<(), SelectionError>;
    async fn fill_condition_form(&mut self, condition: Condition) -> Result<(), FormError>;
    async fn submit_and_extract(&mut self) -> String;
    /// Liveness probe; must never error.
    async fn is_alive(&self) -> bool;
    /// Destroy and recreate the underlying session.
    async fn recycle(&mut self) -> anyhow::Result<()>;
    async fn pause_between_units(&mut self) {}
}

/// Counters for one whole run.
#[derive(Debug, Default, Clone, Copy)]
pub struct HarvestReport {
    pub records: usize,
    pub values_extracted: usize,
    pub skipped: usize,
    pub recoveries: usize,
}

impl HarvestReport {
    /// A run succeeds when it produced any records at all.
    pub fn succeeded(&self) -> bool {
        self.records > 0
    }
}

/// Drives every (brand, model, condition) combination through the stages.
pub struct Harvester<'a, S: QuoteStages> {
    stages: S,
    sink: &'a mut dyn RecordSink,
    cfg: &'a ScoutConfig,
}

impl<'a, S: QuoteStages> Harvester<'a, S> {
    pub fn new(stages: S, sink: &'a mut dyn RecordSink, cfg: &'a ScoutConfig) -> Self {
        Self { stages, sink, cfg }
    }

    /// Recover the stage driver, e.g. to shut its session down cleanly.
    pub fn into_stages(self) -> S {
        self.stages
    }

    pub async fn run(&mut self) -> anyhow::Result<HarvestReport> {
        let mut report = HarvestReport::default();
        let cfg = self.cfg;
        for brand in &cfg.brands {
            self.harvest_brand(brand, &mut report).await?;
        }
        info!(
            target: "scrape.harvest",
            records = report.records,
            values = report.values_extracted,
            skipped = report.skipped,
            recoveries = report.recoveries,
            "run finished"
        );
        Ok(report)
    }

    /// Discovery pass plus the unit loop for one brand.
    async fn harvest_brand(
        &mut self,
        brand: &BrandSpec,
        report: &mut HarvestReport,
    ) -> anyhow::Result<()> {
        if let Err(e) = self.stages.enter().await {
            warn!(target: "scrape.harvest", brand = %brand.name, error = %e, "navigation failed; skipping brand");
            self.recover_if_dead(report).await?;
            return Ok(());
        }
        if let Err(e) = self.stages.select_brand(brand).await {
            warn!(target: "scrape.harvest", brand = %brand.name, error = %e, "brand selection failed; skipping brand");
            self.recover_if_dead(report).await?;
            return Ok(());
        }
        let mut models = match self.stages.list_models().await {
            Ok(models) => models,
            Err(e) => {
                warn!(target: "scrape.harvest", brand = %brand.name, error = %e, "model enumeration failed; skipping brand");
                self.recover_if_dead(report).await?;
                return Ok(());
            }
        };
        let cfg = self.cfg;
        if let Some(cap) = cfg.run.max_models_per_brand {
            models.truncate(cap);
        }
        info!(target: "scrape.harvest", brand = %brand.name, models = models.len(), "harvesting brand");

        'models: for model in &models {
            for condition in &cfg.conditions {
                let unit = WorkUnit::new(&brand.name, model, *condition);
                match self.run_unit(brand, &unit).await {
                    UnitOutcome::Recorded { value } => {
                        if !value.is_empty() {
                            report.values_extracted += 1;
                        }
                        let rec = record::build_record(&self.cfg.record, &unit, value);
                        self.sink.append(&rec)?;
                        report.records += 1;
                    }
                    UnitOutcome::Skipped { stage } => {
                        warn!(target: "scrape.harvest", model = %unit.model, condition = %unit.condition, %stage, "unit skipped");
                        report.skipped += 1;
                    }
                    UnitOutcome::SessionLost => {
                        // Remaining conditions of this model are accepted
                        // data loss; resume at the next model.
                        warn!(target: "scrape.harvest", model = %unit.model, condition = %unit.condition, "session lost; recycling and advancing to next model");
                        report.recoveries += 1;
                        self.stages.recycle().await?;
                        continue 'models;
                    }
                }
                self.stages.pause_between_units().await;
            }
        }
        Ok(())
    }

    /// One pass of the per-unit state machine, always from a fresh page.
    async fn run_unit(&mut self, brand: &BrandSpec, unit: &WorkUnit) -> UnitOutcome {
        if let Err(e) = self.stages.enter().await {
            warn!(target: "scrape.harvest", model = %unit.model, error = %e, "navigate failed");
            return self.skip_or_lost(Stage::Navigate).await;
        }
        if let Err(e) = self.stages.select_brand(brand).await {
            warn!(target: "scrape.harvest", model = %unit.model, error = %e, "brand select failed");
            return self.skip_or_lost(Stage::BrandSelect).await;
        }
        if let Err(e) = self.stages.select_model(&unit.model).await {
            warn!(target: "scrape.harvest", model = %unit.model, error = %e, "model select failed");
            return self.skip_or_lost(Stage::ModelSelect).await;
        }
        if let Err(e) = self.stages.fill_condition_form(unit.condition).await {
            warn!(target: "scrape.harvest", model = %unit.model, condition = %unit.condition, error = %e, "condition form failed");
            if !self.stages.is_alive().await {
                return UnitOutcome::SessionLost;
            }
            // Selection passed, so the unit still yields its one record,
            // with an empty value.
            return UnitOutcome::Recorded {
                value: String::new(),
            };
        }
        let value = self.stages.submit_and_extract().await;
        UnitOutcome::Recorded { value }
    }

    async fn skip_or_lost(&mut self, stage: Stage) -> UnitOutcome {
        if self.stages.is_alive().await {
            UnitOutcome::Skipped { stage }
        } else {
            UnitOutcome::SessionLost
        }
    }

    async fn recover_if_dead(&mut self, report: &mut HarvestReport) -> anyhow::Result<()> {
        if !self.stages.is_alive().await {
            report.recoveries += 1;
            self.stages.recycle().await?;
        }
        Ok(())
    }
}

/// Stage driver backed by a real WebDriver session.
pub struct LiveStages {
    session: ScoutSession,
    pacer: Pacer,
    cfg: ScoutConfig,
}

impl LiveStages {
    pub async fn connect(cfg: ScoutConfig) -> anyhow::Result<Self> {
        let session = ScoutSession::create(session_config(&cfg)).await?;
        let pacer = pacer_from(&cfg.waits);
        Ok(Self {
            session,
            pacer,
            cfg,
        })
    }

    pub async fn shutdown(self) {
        self.session.destroy().await;
    }
}

fn session_config(cfg: &ScoutConfig) -> SessionConfig {
    SessionConfig {
        webdriver_url: cfg.webdriver_url.clone(),
        headless: cfg.headless,
        page_load_timeout: Duration::from_secs(cfg.waits.page_load_timeout_secs),
        poll: Duration::from_millis(cfg.waits.poll_ms),
        short_wait: Duration::from_secs(cfg.waits.short_secs),
        long_wait: Duration::from_secs(cfg.waits.long_secs),
    }
}

fn pacer_from(waits: &WaitConfig) -> Pacer {
    Pacer::new(
        Duration::from_millis(waits.settle_ms),
        Duration::from_millis(waits.action_delay_ms),
    )
}

#[async_trait]
impl QuoteStages for LiveStages {
    async fn enter(&mut self) -> Result<(), NavigationError> {
        navigate::enter(&self.session, &self.cfg.target_url).await
    }

    async fn select_brand(&mut self, brand: &BrandSpec) -> Result<(), SelectionError> {
        select::select_brand(&self.session, brand).await
    }

    async fn list_models(&mut self) -> Result<Vec<String>, SelectionError> {
        select::list_models(&self.session).await
    }

    async fn select_model(&mut self, model: &str) -> Result<(), SelectionError> {
        select::select_model(&self.session, model).await
    }

    async fn fill_condition_form(&mut self, condition: Condition) -> Result<(), FormError> {
        form::fill_condition_form(self.session.client(), &self.pacer, condition).await
    }

    async fn submit_and_extract(&mut self) -> String {
        extract::submit_and_extract(
            self.session.client(),
            &self.pacer,
            &self.cfg.record.currency_marker,
            Duration::from_secs(self.cfg.waits.short_secs),
            Duration::from_millis(self.cfg.waits.poll_ms),
        )
        .await
    }

    async fn is_alive(&self) -> bool {
        self.session.is_alive().await
    }

    /// Create the replacement before tearing down the old session so a
    /// failed recreation leaves the loop with a coherent error instead of
    /// no session at all. Waiters are rebuilt implicitly: they hang off the
    /// session handle.
    async fn recycle(&mut self) -> anyhow::Result<()> {
        let fresh = ScoutSession::create(session_config(&self.cfg)).await?;
        let old = std::mem::replace(&mut self.session, fresh);
        old.destroy().await;
        Ok(())
    }

    async fn pause_between_units(&mut self) {
        self.pacer.between_units().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::VecDeque;
    use tradescout_config::{RecordMeta, RunConfig};
    use tradescout_sink::MemorySink;

    /// Per-unit scripted behavior, consumed in processing order.
    #[derive(Debug, Clone, Copy)]
    enum Behavior {
        Value(&'static str),
        NoQuote,
        SelectionFails,
        FormFails,
        FormKillsSession,
    }

    struct ScriptedStages {
        models: Vec<String>,
        script: VecDeque<Behavior>,
        current: Option<Behavior>,
        alive: bool,
        recreations: usize,
        units_entered: usize,
    }

    impl ScriptedStages {
        fn new(models: &[&str], script: Vec<Behavior>) -> Self {
            Self {
                models: models.iter().map(|m| m.to_string()).collect(),
                script: script.into(),
                current: None,
                alive: true,
                recreations: 0,
                units_entered: 0,
            }
        }
    }

    #[async_trait]
    impl QuoteStages for ScriptedStages {
        async fn enter(&mut self) -> Result<(), NavigationError> {
            self.units_entered += 1;
            Ok(())
        }

        async fn select_brand(&mut self, _brand: &BrandSpec) -> Result<(), SelectionError> {
            Ok(())
        }

        async fn list_models(&mut self) -> Result<Vec<String>, SelectionError> {
            Ok(self.models.clone())
        }

        async fn select_model(&mut self, model: &str) -> Result<(), SelectionError> {
            let behavior = self.script.pop_front().unwrap_or(Behavior::NoQuote);
            if matches!(behavior, Behavior::SelectionFails) {
                self.current = None;
                return Err(SelectionError::ModelNotFound(model.to_string()));
            }
            self.current = Some(behavior);
            Ok(())
        }

        async fn fill_condition_form(&mut self, _condition: Condition) -> Result<(), FormError> {
            match self.current {
                Some(Behavior::FormFails) => {
                    Err(FormError::ConditionUnselectable("scripted".into()))
                }
                Some(Behavior::FormKillsSession) => {
                    self.alive = false;
                    Err(FormError::Driver(anyhow!("browser gone")))
                }
                _ => Ok(()),
            }
        }

        async fn submit_and_extract(&mut self) -> String {
            match self.current {
                Some(Behavior::Value(v)) => v.to_string(),
                _ => String::new(),
            }
        }

        async fn is_alive(&self) -> bool {
            self.alive
        }

        async fn recycle(&mut self) -> anyhow::Result<()> {
            self.alive = true;
            self.recreations += 1;
            Ok(())
        }
    }

    fn test_config(conditions: Vec<Condition>) -> ScoutConfig {
        ScoutConfig {
            target_url: "https://vendor.example/trade-in".into(),
            webdriver_url: "http://localhost:9515".into(),
            headless: true,
            brands: vec![BrandSpec {
                name: "Apple".into(),
                fallback_index: 1,
            }],
            conditions,
            waits: WaitConfig::default(),
            run: RunConfig::default(),
            record: RecordMeta::default(),
            output_path: "unused.csv".into(),
        }
    }

    #[tokio::test]
    async fn every_unit_past_selection_yields_exactly_one_record() {
        let cfg = test_config(Condition::ALL.to_vec());
        let stages = ScriptedStages::new(
            &["iPhone 13 128GB"],
            vec![
                Behavior::Value("1200"),
                Behavior::NoQuote,
                Behavior::FormFails,
            ],
        );
        let mut sink = MemorySink::default();
        let mut harvester = Harvester::new(stages, &mut sink, &cfg);
        let report = harvester.run().await.unwrap();

        assert_eq!(report.records, 3);
        assert_eq!(report.values_extracted, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(sink.records.len(), 3);
        assert_eq!(sink.records[0].value, "1200");
        assert!(sink.records[1].value.is_empty());
        // Form failure still produced its record, empty-valued.
        assert!(sink.records[2].value.is_empty());
        assert_eq!(sink.records[2].condition, "Damaged");
    }

    #[tokio::test]
    async fn selection_failure_skips_without_a_record() {
        let cfg = test_config(vec![Condition::Flawless, Condition::Good]);
        let stages = ScriptedStages::new(
            &["Galaxy S24"],
            vec![Behavior::SelectionFails, Behavior::Value("800")],
        );
        let mut sink = MemorySink::default();
        let mut harvester = Harvester::new(stages, &mut sink, &cfg);
        let report = harvester.run().await.unwrap();

        assert_eq!(report.records, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.records[0].condition, "Good");
    }

    #[tokio::test]
    async fn dead_session_recycles_once_and_resumes_at_next_model() {
        let cfg = test_config(Condition::ALL.to_vec());
        // Model A: Flawless records, Good kills the session; Damaged is
        // abandoned. Model B: all three record.
        let stages = ScriptedStages::new(
            &["Model A", "Model B"],
            vec![
                Behavior::Value("100"),
                Behavior::FormKillsSession,
                Behavior::Value("70"),
                Behavior::Value("50"),
                Behavior::Value("30"),
            ],
        );
        let mut sink = MemorySink::default();
        let mut harvester = Harvester::new(stages, &mut sink, &cfg);
        let report = harvester.run().await.unwrap();

        let stages = harvester.into_stages();
        assert_eq!(stages.recreations, 1);
        assert!(stages.alive);
        // One discovery entry plus one fresh entry per attempted unit.
        assert_eq!(stages.units_entered, 6);

        assert_eq!(report.recoveries, 1);
        assert_eq!(report.records, 4);
        // Completed record for Model A survived the recovery.
        assert_eq!(sink.records[0].model, "Model A");
        assert_eq!(sink.records[0].value, "100");
        assert!(sink.records[1..].iter().all(|r| r.model == "Model B"));
    }

    #[tokio::test]
    async fn model_cap_limits_the_harvest() {
        let mut cfg = test_config(vec![Condition::Good]);
        cfg.run.max_models_per_brand = Some(1);
        let stages = ScriptedStages::new(
            &["First", "Second", "Third"],
            vec![Behavior::Value("10")],
        );
        let mut sink = MemorySink::default();
        let mut harvester = Harvester::new(stages, &mut sink, &cfg);
        let report = harvester.run().await.unwrap();

        assert_eq!(report.records, 1);
        assert_eq!(sink.records[0].model, "First");
    }

    #[tokio::test]
    async fn end_to_end_good_iphone_always_produces_a_record() {
        let cfg = test_config(vec![Condition::Good]);
        for behavior in [Behavior::Value("1234"), Behavior::NoQuote] {
            let stages = ScriptedStages::new(&["iPhone 13 128GB"], vec![behavior]);
            let mut sink = MemorySink::default();
            let mut harvester = Harvester::new(stages, &mut sink, &cfg);
            let report = harvester.run().await.unwrap();

            assert!(report.succeeded());
            let rec = &sink.records[0];
            assert_eq!(rec.brand, "Apple");
            assert_eq!(rec.capacity, "128GB");
            assert_eq!(rec.device_type, "Smartphone");
            assert_eq!(rec.condition, "Good");
            match behavior {
                Behavior::Value(v) => assert_eq!(rec.value, v),
                _ => assert!(rec.value.is_empty()),
            }
        }
    }

    #[tokio::test]
    async fn empty_run_reports_failure() {
        let cfg = test_config(vec![Condition::Good]);
        let stages = ScriptedStages::new(&["Only"], vec![Behavior::SelectionFails]);
        let mut sink = MemorySink::default();
        let mut harvester = Harvester::new(stages, &mut sink, &cfg);
        let report = harvester.run().await.unwrap();

        assert!(!report.succeeded());
        assert_eq!(report.skipped, 1);
    }
}
