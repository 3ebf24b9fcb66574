//! Loader for workspace configuration with YAML + environment overlays.
//!
//! Precedence: `TRADESCOUT_`-prefixed environment variables win over file
//! values; `${VAR}` placeholders inside any string are expanded recursively
//! (depth-capped) after the sources are merged.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tradescout_common::Condition;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Top-level harvest configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoutConfig {
    /// Vendor page that embeds the trade-in wizard.
    pub target_url: String,
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    #[serde(default)]
    pub headless: bool,
    #[serde(default = "default_brands")]
    pub brands: Vec<BrandSpec>,
    /// Grades requested per model; defaults to all three.
    #[serde(default = "default_conditions")]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub waits: WaitConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub record: RecordMeta,
    #[serde(default = "default_output_path")]
    pub output_path: String,
}

/// A brand to harvest plus its positional escape hatch.
///
/// `fallback_index` is the raw `<select>` option index (placeholder at 0)
/// used when no option text matches the brand name. Known to be fragile when
/// the vendor reorders the dropdown; kept because the option labels have
/// historically been unreliable.
#[derive(Debug, Clone, Deserialize)]
pub struct BrandSpec {
    pub name: String,
    pub fallback_index: usize,
}

/// Polling and settle timings, in the units their names state.
#[derive(Debug, Clone, Deserialize)]
pub struct WaitConfig {
    /// Bounded wait for fast-appearing elements.
    #[serde(default = "default_short_secs")]
    pub short_secs: u64,
    /// Bounded wait for page and frame readiness.
    #[serde(default = "default_long_secs")]
    pub long_secs: u64,
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
    /// Pause after each form sub-step so client-side rendering catches up.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Pause between work units.
    #[serde(default = "default_action_delay_ms")]
    pub action_delay_ms: u64,
    #[serde(default = "default_page_load_timeout_secs")]
    pub page_load_timeout_secs: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            short_secs: default_short_secs(),
            long_secs: default_long_secs(),
            poll_ms: default_poll_ms(),
            settle_ms: default_settle_ms(),
            action_delay_ms: default_action_delay_ms(),
            page_load_timeout_secs: default_page_load_timeout_secs(),
        }
    }
}

/// Whole-run retry policy and scope caps.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Total attempts for the whole run; success is a non-empty result set.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Optional cap on models harvested per brand.
    #[serde(default)]
    pub max_models_per_brand: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            max_models_per_brand: None,
        }
    }
}

/// Constant columns stamped onto every emitted record.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordMeta {
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Textual prefix the vendor prints before prices.
    #[serde(default = "default_currency_marker")]
    pub currency_marker: String,
    #[serde(default = "default_value_type")]
    pub value_type: String,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_updated_by")]
    pub updated_by: String,
}

impl Default for RecordMeta {
    fn default() -> Self {
        Self {
            country: default_country(),
            currency: default_currency(),
            currency_marker: default_currency_marker(),
            value_type: default_value_type(),
            source: default_source(),
            updated_by: default_updated_by(),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".into()
}
fn default_brands() -> Vec<BrandSpec> {
    vec![
        BrandSpec {
            name: "Apple".into(),
            fallback_index: 1,
        },
        BrandSpec {
            name: "Samsung".into(),
            fallback_index: 2,
        },
    ]
}
fn default_conditions() -> Vec<Condition> {
    Condition::ALL.to_vec()
}
fn default_output_path() -> String {
    "valuations.csv".into()
}
fn default_short_secs() -> u64 {
    5
}
fn default_long_secs() -> u64 {
    15
}
fn default_poll_ms() -> u64 {
    500
}
fn default_settle_ms() -> u64 {
    1000
}
fn default_action_delay_ms() -> u64 {
    2000
}
fn default_page_load_timeout_secs() -> u64 {
    60
}
fn default_attempts() -> u32 {
    2
}
fn default_retry_delay_secs() -> u64 {
    30
}
fn default_country() -> String {
    "Malaysia".into()
}
fn default_currency() -> String {
    "MYR".into()
}
fn default_currency_marker() -> String {
    "RM".into()
}
fn default_value_type() -> String {
    "Trade-In".into()
}
fn default_source() -> String {
    "compasia".into()
}
fn default_updated_by() -> String {
    "tradescout".into()
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct ScoutConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for ScoutConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoutConfigLoader {
    /// Start with sensible defaults: YAML file + `TRADESCOUT_` env overrides.
    ///
    /// ```
    /// use tradescout_config::ScoutConfigLoader;
    ///
    /// let cfg = ScoutConfigLoader::new()
    ///     .with_yaml_str("target_url: \"https://vendor.example/trade-in\"")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(cfg.target_url, "https://vendor.example/trade-in");
    /// assert_eq!(cfg.brands.len(), 2);
    /// assert_eq!(cfg.waits.long_secs, 15);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// The loader combines YAML with `TRADESCOUT_`-prefixed environment
    /// variables and expands `${VAR}` placeholders before materialising the
    /// typed struct.
    ///
    /// ```
    /// use tradescout_config::ScoutConfigLoader;
    ///
    /// temp_env::with_var("QUOTE_PAGE", Some("https://vendor.example/quote"), || {
    ///     let cfg = ScoutConfigLoader::new()
    ///         .with_yaml_str("target_url: \"${QUOTE_PAGE}\"")
    ///         .load()
    ///         .expect("valid configuration");
    ///     assert_eq!(cfg.target_url, "https://vendor.example/quote");
    /// });
    /// ```
    pub fn load(self) -> Result<ScoutConfig, ConfigError> {
        // Later sources win in the merge, so the env source goes in last to
        // keep `TRADESCOUT_` variables ahead of file values.
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("TRADESCOUT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        // Merge first, expand second, then materialise the typed struct.
        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: ScoutConfig =
            serde_json::from_value(v).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}
