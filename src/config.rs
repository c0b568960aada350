use std::{
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Mutex,
    time::Duration,
};

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{schedule, utils};

const DEFAULT_DISTANCE_KM: f64 = 5.0;
const DEFAULT_DISTANCE_OPTIONS: [f64; 3] = [5.0, 10.0, 20.0];
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_SUBMIT_DELAY_MS: u64 = 1000;
const DEFAULT_DRAFTS_SCOPE: &str = "community-pulse";

/// Environment variables and the config keys they override.
const ENV_OVERRIDES: [(&str, &str); 4] = [
    ("COMMUNITY_PULSE_DISTANCE_KM", "default_distance_km"),
    ("COMMUNITY_PULSE_REFERENCE_DATE", "reference_date"),
    ("COMMUNITY_PULSE_TIMEZONE", "timezone"),
    ("COMMUNITY_PULSE_SUBMIT_DELAY_MS", "submit_delay_ms"),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] io::Error),
    #[error("config json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config lock poisoned")]
    Poisoned,
    #[error("unknown config key: {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub default_distance_km: f64,
    pub distance_options: Vec<f64>,
    /// Pins the day the "today"/"tomorrow" filters refer to.
    pub reference_date: Option<NaiveDate>,
    pub timezone: String,
    pub submit_delay_ms: u64,
    pub drafts_scope: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_distance_km: DEFAULT_DISTANCE_KM,
            distance_options: DEFAULT_DISTANCE_OPTIONS.to_vec(),
            reference_date: None,
            timezone: DEFAULT_TIMEZONE.to_string(),
            submit_delay_ms: DEFAULT_SUBMIT_DELAY_MS,
            drafts_scope: DEFAULT_DRAFTS_SCOPE.to_string(),
        }
    }
}

impl AppConfig {
    pub fn tz(&self) -> Tz {
        Tz::from_str(&self.timezone).unwrap_or_else(|_| {
            tracing::warn!("unknown timezone {}, using UTC", self.timezone);
            Tz::UTC
        })
    }

    pub fn reference_date_or_today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| schedule::reference_today(self.tz()))
    }

    pub fn submit_delay(&self) -> Duration {
        Duration::from_millis(self.submit_delay_ms)
    }

    /// Sets one field from its textual form. `reference_date` accepts
    /// "none" to unpin the day; `distance_options` takes a comma list.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match key {
            "default_distance_km" => self.default_distance_km = parse_value(key, value)?,
            "distance_options" => {
                self.distance_options = value
                    .split(',')
                    .map(|km| parse_value(key, km.trim()))
                    .collect::<Result<_, _>>()?
            }
            "reference_date" if value.eq_ignore_ascii_case("none") => self.reference_date = None,
            "reference_date" => self.reference_date = Some(parse_value(key, value)?),
            "timezone" => {
                let tz: Tz = parse_value(key, value)?;
                self.timezone = tz.name().to_string();
            }
            "submit_delay_ms" => self.submit_delay_ms = parse_value(key, value)?,
            "drafts_scope" if !value.is_empty() => self.drafts_scope = value.to_string(),
            "drafts_scope" => return Err(invalid(key, value)),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    /// Applies `COMMUNITY_PULSE_*` overrides from the given lookup. Values
    /// that do not parse are logged and skipped.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (var, key) in ENV_OVERRIDES {
            let Some(raw) = lookup(var) else {
                continue;
            };
            if let Err(err) = self.set(key, &raw) {
                tracing::warn!("ignoring {var}: {err}");
            }
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| invalid(key, value))
}

/// The effective configuration: the JSON file, plus environment overrides
/// when loaded with [`ConfigStore::load`]. Updates only ever persist file
/// values, never the overrides.
pub struct ConfigStore {
    path: PathBuf,
    with_env: bool,
    data: Mutex<AppConfig>,
}

impl ConfigStore {
    pub fn load() -> Self {
        Self::open(utils::config_path(), true)
    }

    pub fn load_from(path: PathBuf) -> Self {
        Self::open(path, false)
    }

    fn open(path: PathBuf, with_env: bool) -> Self {
        let mut data = read_config(&path).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), "falling back to default config: {err}");
            AppConfig::default()
        });
        if with_env {
            data.apply_env_overrides();
        }
        Self {
            path,
            with_env,
            data: Mutex::new(data),
        }
    }

    pub fn read(&self) -> AppConfig {
        match self.data.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Applies `transform` to the stored file and returns the new effective
    /// config. An unreadable file is left alone and reported.
    pub fn update<F>(&self, transform: F) -> Result<AppConfig, ConfigError>
    where
        F: FnOnce(&mut AppConfig) -> Result<(), ConfigError>,
    {
        let mut guard = self.data.lock().map_err(|_| ConfigError::Poisoned)?;
        let mut stored = read_config(&self.path)?;
        transform(&mut stored)?;
        write_config(&self.path, &stored)?;

        if self.with_env {
            stored.apply_env_overrides();
        }
        *guard = stored.clone();
        tracing::info!(path = %self.path.display(), "config saved");
        Ok(stored)
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(serde_json::from_str(&contents)?),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(err) => Err(err.into()),
    }
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = ConfigStore::load_from(dir.path().join("config.json"));
        assert_eq!(store.read(), AppConfig::default());
        assert_eq!(store.read().submit_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn update_persists_to_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("config.json");
        let store = ConfigStore::load_from(path.clone());

        let date = NaiveDate::from_ymd_opt(2024, 12, 9).expect("valid date");
        store
            .update(|config| {
                config.set("default_distance_km", "10")?;
                config.set("reference_date", "2024-12-09")
            })
            .expect("update config");

        let reloaded = ConfigStore::load_from(path).read();
        assert_eq!(reloaded.default_distance_km, 10.0);
        assert_eq!(reloaded.reference_date_or_today(), date);
    }

    #[test]
    fn partial_and_invalid_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.json");

        fs::write(&path, r#"{"timezone":"America/Boise"}"#).expect("write");
        let config = ConfigStore::load_from(path.clone()).read();
        assert_eq!(config.tz(), chrono_tz::America::Boise);
        assert_eq!(config.default_distance_km, DEFAULT_DISTANCE_KM);

        fs::write(&path, "not json").expect("write");
        assert_eq!(ConfigStore::load_from(path).read(), AppConfig::default());
    }

    #[test]
    fn overrides_skip_invalid_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("COMMUNITY_PULSE_DISTANCE_KM", "20"),
            ("COMMUNITY_PULSE_REFERENCE_DATE", "2024-12-09"),
            ("COMMUNITY_PULSE_SUBMIT_DELAY_MS", "soon"),
        ]);
        let mut config = AppConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|value| value.to_string()));

        assert_eq!(config.default_distance_km, 20.0);
        assert_eq!(config.reference_date, NaiveDate::from_ymd_opt(2024, 12, 9));
        assert_eq!(config.submit_delay_ms, DEFAULT_SUBMIT_DELAY_MS);
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        let config = AppConfig {
            timezone: "Mars/Olympus".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(config.tz(), Tz::UTC);
    }

    #[test]
    fn set_parses_each_key() {
        let mut config = AppConfig::default();
        config.set("distance_options", "1, 2.5,40").expect("options");
        config.set("timezone", "Europe/Berlin").expect("timezone");
        config.set("submit_delay_ms", "250").expect("delay");
        config.set("reference_date", "2024-12-09").expect("date");
        config.set("reference_date", "None").expect("unpin");

        assert_eq!(config.distance_options, vec![1.0, 2.5, 40.0]);
        assert_eq!(config.tz(), chrono_tz::Europe::Berlin);
        assert_eq!(config.submit_delay(), Duration::from_millis(250));
        assert_eq!(config.reference_date, None);

        assert!(matches!(
            config.set("timezone", "Mars/Olympus"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set("drafts_scope", " "),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set("colour", "red"),
            Err(ConfigError::UnknownKey(key)) if key == "colour"
        ));
        assert_eq!(config.timezone, "Europe/Berlin");
    }

    #[test]
    fn update_never_persists_overrides() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.json");
        let mut store = ConfigStore::load_from(path.clone());
        store.with_env = true;
        if let Ok(data) = store.data.get_mut() {
            data.default_distance_km = 20.0;
        }

        store
            .update(|config| config.set("submit_delay_ms", "0"))
            .expect("update config");

        let on_disk = ConfigStore::load_from(path).read();
        assert_eq!(on_disk.submit_delay_ms, 0);
        assert_eq!(on_disk.default_distance_km, DEFAULT_DISTANCE_KM);
    }

    #[test]
    fn update_leaves_a_broken_file_alone() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").expect("write");

        let store = ConfigStore::load_from(path.clone());
        let err = store
            .update(|config| config.set("submit_delay_ms", "0"))
            .expect_err("broken file");
        assert!(matches!(err, ConfigError::Json(_)));
        assert_eq!(fs::read_to_string(&path).expect("read"), "not json");
    }
}
