/// Configuration system for traffic-eval.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: [`schema::TrafficEvalConfig::default()`]
/// 2. **User global config**: `~/.traffic-eval/config.toml`
/// 3. **Project local config**: `.traffic-eval.toml` in the current directory
/// 4. **Environment variables**: `TRAFFIC_EVAL_*` overrides (highest precedence)
///
/// Later layers override earlier ones at the field level: a file that only
/// sets `[predictor] url` leaves every other value from the previous layer
/// untouched.
///
/// # Usage
///
/// ```rust,ignore
/// use traffic_eval::config;
///
/// let cfg = config::load();
/// let evaluator = traffic_eval::metrics::Evaluator::new(cfg.evaluation.tolerance_minutes);
/// ```
pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::TrafficEvalConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars. This is the primary entry point for every module that needs
/// configuration.
pub fn load() -> TrafficEvalConfig {
    let mut layered = toml::Value::try_from(TrafficEvalConfig::default())
        .unwrap_or_else(|_| toml::Value::Table(toml::map::Map::new()));

    for path in [global_config_path(), project_config_path()] {
        if let Some(overlay) = load_toml_file(path) {
            merge_values(&mut layered, overlay);
        }
    }

    let mut config: TrafficEvalConfig = layered.try_into().unwrap_or_default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

/// Load a TOML file as a raw value tree.
///
/// Returns `None` if the path is `None`, the file doesn't exist, or the
/// content is malformed. Malformed files are ignored so a typo never stops a
/// command from running on defaults.
fn load_toml_file(path: Option<PathBuf>) -> Option<toml::Value> {
    let path = path?;
    let content = fs::read_to_string(&path).ok()?;
    toml::from_str(&content).ok()
}

/// Recursively merge `overlay` into `base`. Tables merge key by key; any
/// other value in the overlay replaces the base value.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.traffic-eval/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".traffic-eval").join("config.toml"))
}

/// Path to the project local config: `.traffic-eval.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".traffic-eval.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `TRAFFIC_EVAL_TOLERANCE`: accuracy tolerance in minutes
/// - `TRAFFIC_EVAL_WINDOW`: observation window size
/// - `TRAFFIC_EVAL_OBSERVATIONS`: observation file path
/// - `TRAFFIC_EVAL_PREDICTOR_URL`: prediction service base URL
/// - `TRAFFIC_EVAL_PREDICTOR_TIMEOUT_MS`: prediction request timeout
/// - `TRAFFIC_EVAL_INTERVAL_SECS`: scheduler interval
/// - `TRAFFIC_EVAL_ADDR`: JSON API listen address
/// - `TRAFFIC_EVAL_LOG`: event logging on/off (`1`/`true`/`yes`/`on`)
/// - `TRAFFIC_EVAL_LOG_LEVEL`: stderr diagnostic level
fn apply_env_overrides<F>(config: &mut TrafficEvalConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("TRAFFIC_EVAL_TOLERANCE")
        && let Ok(t) = val.parse::<f64>()
        && t.is_finite()
    {
        config.evaluation.tolerance_minutes = t;
    }
    if let Some(val) = lookup("TRAFFIC_EVAL_WINDOW")
        && let Ok(n) = val.parse::<usize>()
    {
        config.evaluation.window_size = n;
    }
    if let Some(val) = lookup("TRAFFIC_EVAL_OBSERVATIONS")
        && !val.is_empty()
    {
        config.observations.path = val;
    }
    if let Some(val) = lookup("TRAFFIC_EVAL_PREDICTOR_URL")
        && !val.is_empty()
    {
        config.predictor.url = val;
    }
    if let Some(val) = lookup("TRAFFIC_EVAL_PREDICTOR_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.predictor.timeout_ms = ms;
    }
    if let Some(val) = lookup("TRAFFIC_EVAL_INTERVAL_SECS")
        && let Ok(secs) = val.parse::<u64>()
    {
        config.scheduler.interval_secs = secs;
    }
    if let Some(val) = lookup("TRAFFIC_EVAL_ADDR")
        && !val.is_empty()
    {
        config.web.addr = val;
    }
    if let Some(val) = lookup("TRAFFIC_EVAL_LOG") {
        config.logging.enabled = is_truthy(&val);
    }
    if let Some(val) = lookup("TRAFFIC_EVAL_LOG_LEVEL")
        && let Some(level) = parse_level(&val)
    {
        config.logging.level = level;
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse a log level string.
fn parse_level(val: &str) -> Option<schema::LogLevel> {
    match val.to_ascii_lowercase().as_str() {
        "debug" => Some(schema::LogLevel::Debug),
        "info" => Some(schema::LogLevel::Info),
        "warn" | "warning" => Some(schema::LogLevel::Warn),
        "error" => Some(schema::LogLevel::Error),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.traffic-eval/config.toml`.
///
/// Returns an error if the file already exists (use `force = true` to
/// overwrite).
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.traffic-eval/ directory")?;
    }

    fs::write(&path, TrafficEvalConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single config key to a value in the global config file.
///
/// Supports dotted keys like `predictor.url`. Values are parsed according to
/// the type of the existing (or default) value at that key.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&TrafficEvalConfig::default())
            .context("failed to serialize default config")?
    };

    let output = updated_toml(&content, key, value)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, output).context("failed to write config file")?;

    Ok(())
}

/// Apply a single dotted-key update to TOML text and validate the result
/// still deserializes into [`TrafficEvalConfig`].
fn updated_toml(content: &str, key: &str, value: &str) -> Result<String> {
    let mut root: toml::Value =
        toml::from_str(content).context("failed to parse config as TOML value")?;

    // Keys absent from a hand-written file fall back to the default's type.
    let defaults = toml::Value::try_from(TrafficEvalConfig::default())
        .context("failed to serialize default config")?;
    let mut merged = defaults;
    merge_values(&mut merged, root.clone());
    set_toml_value(&mut merged, key, value)?;

    let section_and_leaf = key.split('.').collect::<Vec<_>>();
    let new_value = lookup_value(&merged, &section_and_leaf)
        .cloned()
        .with_context(|| format!("config key not found: '{key}'"))?;
    insert_value(&mut root, &section_and_leaf, new_value)?;

    let _: TrafficEvalConfig = root
        .clone()
        .try_into()
        .with_context(|| format!("invalid value for '{key}': '{value}'"))?;

    toml::to_string_pretty(&root).context("failed to serialize updated config")
}

fn lookup_value<'a>(root: &'a toml::Value, parts: &[&str]) -> Option<&'a toml::Value> {
    parts.iter().try_fold(root, |current, part| current.get(*part))
}

fn insert_value(root: &mut toml::Value, parts: &[&str], value: toml::Value) -> Result<()> {
    let (leaf, sections) = parts.split_last().context("empty config key")?;
    let mut current = root;
    for &part in sections {
        let table = current
            .as_table_mut()
            .with_context(|| format!("expected table above '{part}'"))?;
        current = table
            .entry(part.to_string())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    current
        .as_table_mut()
        .context("expected table for config section")?
        .insert(leaf.to_string(), value);
    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        anyhow::bail!("empty config key segment in '{key}'");
    }

    let mut current = root;
    for &part in &parts[..parts.len() - 1] {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let leaf = parts[parts.len() - 1];
    let table = current.as_table_mut().with_context(|| {
        format!(
            "expected table at '{}'",
            key.rsplit_once('.').map(|(s, _)| s).unwrap_or("")
        )
    })?;

    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("config key not found: '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn is_truthy_accepts_variants() {
        assert!(is_truthy("1"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy("yes"));
        assert!(is_truthy("On"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("off"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn parse_level_handles_variants() {
        assert_eq!(parse_level("DEBUG"), Some(schema::LogLevel::Debug));
        assert_eq!(parse_level("warning"), Some(schema::LogLevel::Warn));
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn env_overrides_apply_typed_values() {
        let mut config = TrafficEvalConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("TRAFFIC_EVAL_TOLERANCE", "2.5"),
                ("TRAFFIC_EVAL_WINDOW", "12"),
                ("TRAFFIC_EVAL_PREDICTOR_URL", "http://predictor:8000"),
                ("TRAFFIC_EVAL_INTERVAL_SECS", "5"),
                ("TRAFFIC_EVAL_LOG", "off"),
                ("TRAFFIC_EVAL_LOG_LEVEL", "warn"),
            ]),
        );
        assert_eq!(config.evaluation.tolerance_minutes, 2.5);
        assert_eq!(config.evaluation.window_size, 12);
        assert_eq!(config.predictor.url, "http://predictor:8000");
        assert_eq!(config.scheduler.interval_secs, 5);
        assert!(!config.logging.enabled);
        assert_eq!(config.logging.level, schema::LogLevel::Warn);
    }

    #[test]
    fn env_overrides_ignore_unparseable_values() {
        let mut config = TrafficEvalConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("TRAFFIC_EVAL_TOLERANCE", "NaN"),
                ("TRAFFIC_EVAL_WINDOW", "lots"),
                ("TRAFFIC_EVAL_PREDICTOR_URL", ""),
            ]),
        );
        assert_eq!(config.evaluation.tolerance_minutes, 5.0);
        assert_eq!(config.evaluation.window_size, 50);
        assert_eq!(config.predictor.url, "http://localhost:8000");
    }

    #[test]
    fn merge_values_is_field_level() {
        let mut base = toml::Value::try_from(TrafficEvalConfig::default()).unwrap();
        let overlay: toml::Value = toml::from_str("[predictor]\ntimeout_ms = 500\n").unwrap();
        merge_values(&mut base, overlay);
        let config: TrafficEvalConfig = base.try_into().unwrap();
        assert_eq!(config.predictor.timeout_ms, 500);
        assert_eq!(config.predictor.url, "http://localhost:8000");
        assert_eq!(config.evaluation.window_size, 50);
    }

    #[test]
    fn set_toml_value_updates_float() {
        let mut root: toml::Value =
            toml::from_str("[evaluation]\ntolerance_minutes = 5.0\n").unwrap();
        set_toml_value(&mut root, "evaluation.tolerance_minutes", "3.5").unwrap();
        let value = root["evaluation"]["tolerance_minutes"].as_float().unwrap();
        assert!((value - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn set_toml_value_rejects_invalid_key() {
        let mut root: toml::Value = toml::from_str("[web]\naddr = \"x\"\n").unwrap();
        assert!(set_toml_value(&mut root, "nonexistent.key", "value").is_err());
        assert!(set_toml_value(&mut root, "web.missing", "value").is_err());
    }

    #[test]
    fn updated_toml_adds_key_missing_from_sparse_file() {
        let output = updated_toml("[predictor]\nurl = \"http://a\"\n", "scheduler.interval_secs", "9")
            .unwrap();
        let config: TrafficEvalConfig = toml::from_str(&output).unwrap();
        assert_eq!(config.scheduler.interval_secs, 9);
        assert_eq!(config.predictor.url, "http://a");
    }

    #[test]
    fn updated_toml_rejects_bad_enum_value() {
        assert!(updated_toml("", "logging.level", "chatty").is_err());
        assert!(updated_toml("", "evaluation.window_size", "many").is_err());
    }

    #[test]
    fn show_effective_config_returns_toml() {
        let toml_str = show_effective_config().unwrap();
        let _: TrafficEvalConfig = toml::from_str(&toml_str).unwrap();
    }
}
