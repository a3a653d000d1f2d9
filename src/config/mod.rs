// src/config/mod.rs
//! Service configuration: defaults, then an optional TOML file, then env vars.
//!
//! The refresh secret is only ever read from the environment and has no
//! default; without it `/refresh` rejects every request.

use anyhow::{anyhow, bail, Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::file::DEFAULT_CACHE_PATH;
use crate::calendar::filter::InclusionWindow;
use crate::calendar::providers::{SourceKind, DEFAULT_SOURCE_URL};
use crate::calendar::types::Impact;

pub const ENV_CONFIG_PATH: &str = "CALENDAR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/calendar.toml";

pub const ENV_TIMEZONE: &str = "CALENDAR_TIMEZONE";
pub const ENV_IMPACTS: &str = "CALENDAR_IMPACTS";
pub const ENV_CURRENCIES: &str = "CALENDAR_CURRENCIES";
pub const ENV_WINDOW: &str = "CALENDAR_WINDOW";
pub const ENV_REFRESH_SECRET: &str = "CALENDAR_REFRESH_SECRET";
pub const ENV_CACHE_PATH: &str = "CALENDAR_CACHE_PATH";
pub const ENV_SOURCE_KIND: &str = "CALENDAR_SOURCE_KIND";
pub const ENV_SOURCE_URL: &str = "CALENDAR_SOURCE_URL";
pub const ENV_SOURCE_TZ: &str = "CALENDAR_SOURCE_TZ";
pub const ENV_FETCH_TIMEOUT: &str = "CALENDAR_FETCH_TIMEOUT_SECS";
pub const ENV_PORT: &str = "PORT";

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Athens;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_PORT: u16 = 10000;

#[derive(Clone)]
pub struct ServiceConfig {
    /// Zone every rendered timestamp is converted into.
    pub timezone: Tz,
    pub impacts: Vec<Impact>,
    /// Currency allow-list; empty keeps all.
    pub currencies: Vec<String>,
    pub window: InclusionWindow,
    pub refresh_secret: Option<String>,
    pub cache_path: PathBuf,
    pub source_kind: SourceKind,
    pub source_url: String,
    /// Zone assumed for upstream timestamps without an offset (None = UTC).
    pub source_timezone: Option<String>,
    pub fetch_timeout: Duration,
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE,
            impacts: vec![Impact::High],
            currencies: Vec::new(),
            window: InclusionWindow::Today,
            refresh_secret: None,
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            source_kind: SourceKind::Xml,
            source_url: DEFAULT_SOURCE_URL.to_string(),
            source_timezone: None,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            port: DEFAULT_PORT,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("timezone", &self.timezone)
            .field("impacts", &self.impacts)
            .field("currencies", &self.currencies)
            .field("window", &self.window)
            .field(
                "refresh_secret",
                &self.refresh_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("cache_path", &self.cache_path)
            .field("source_kind", &self.source_kind)
            .field("source_url", &self.source_url)
            .field("source_timezone", &self.source_timezone)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("port", &self.port)
            .finish()
    }
}

/// TOML file layer. The secret is deliberately not accepted here.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    timezone: Option<String>,
    impacts: Option<Vec<String>>,
    currencies: Option<Vec<String>>,
    window: Option<String>,
    cache_path: Option<PathBuf>,
    source_kind: Option<String>,
    source_url: Option<String>,
    source_timezone: Option<String>,
    fetch_timeout_secs: Option<u64>,
    port: Option<u16>,
}

impl ServiceConfig {
    /// Load using env var + fallbacks:
    /// 1) $CALENDAR_CONFIG_PATH (must exist)
    /// 2) config/calendar.toml (if present)
    /// 3) built-in defaults
    ///
    /// Environment variables override file values.
    pub fn from_env() -> Result<Self> {
        let toml_str = match std::env::var(ENV_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
                }
                Some(read_file(&pb)?)
            }
            Err(_) => {
                let pb = PathBuf::from(DEFAULT_CONFIG_PATH);
                if pb.exists() {
                    Some(read_file(&pb)?)
                } else {
                    None
                }
            }
        };
        Self::from_sources(toml_str.as_deref(), |k| std::env::var(k).ok())
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Self::from_sources(Some(toml_str), |_| None)
    }

    /// Merge defaults, an optional TOML document and an env lookup.
    pub fn from_sources<F>(toml_str: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(s) = toml_str {
            let file: FileConfig = toml::from_str(s).context("parsing calendar config toml")?;
            cfg.apply_file(file)?;
        }

        let env = |k: &str| env(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = env(ENV_TIMEZONE) {
            cfg.timezone = parse_timezone(&v)?;
        }
        if let Some(v) = env(ENV_IMPACTS) {
            cfg.impacts = parse_impacts(split_list(&v))?;
        }
        if let Some(v) = env(ENV_CURRENCIES) {
            cfg.currencies = clean_currencies(split_list(&v));
        }
        if let Some(v) = env(ENV_WINDOW) {
            cfg.window = v.parse()?;
        }
        if let Some(v) = env(ENV_REFRESH_SECRET) {
            cfg.refresh_secret = Some(v);
        }
        if let Some(v) = env(ENV_CACHE_PATH) {
            cfg.cache_path = PathBuf::from(v);
        }
        if let Some(v) = env(ENV_SOURCE_KIND) {
            cfg.source_kind = v.parse()?;
        }
        if let Some(v) = env(ENV_SOURCE_URL) {
            cfg.source_url = v;
        }
        if let Some(v) = env(ENV_SOURCE_TZ) {
            cfg.source_timezone = Some(v);
        }
        if let Some(v) = env(ENV_FETCH_TIMEOUT) {
            let secs: u64 = v
                .parse()
                .with_context(|| format!("{ENV_FETCH_TIMEOUT} must be a number of seconds"))?;
            cfg.fetch_timeout = parse_timeout(secs)?;
        }
        if let Some(v) = env(ENV_PORT) {
            cfg.port = v
                .parse()
                .with_context(|| format!("{ENV_PORT} must be a port number"))?;
        }

        Ok(cfg)
    }

    fn apply_file(&mut self, file: FileConfig) -> Result<()> {
        if let Some(v) = file.timezone {
            self.timezone = parse_timezone(&v)?;
        }
        if let Some(v) = file.impacts {
            self.impacts = parse_impacts(v)?;
        }
        if let Some(v) = file.currencies {
            self.currencies = clean_currencies(v);
        }
        if let Some(v) = file.window {
            self.window = v.parse()?;
        }
        if let Some(v) = file.cache_path {
            self.cache_path = v;
        }
        if let Some(v) = file.source_kind {
            self.source_kind = v.parse()?;
        }
        if let Some(v) = file.source_url {
            self.source_url = v;
        }
        if let Some(v) = file.source_timezone.filter(|s| !s.trim().is_empty()) {
            self.source_timezone = Some(v);
        }
        if let Some(v) = file.fetch_timeout_secs {
            self.fetch_timeout = parse_timeout(v)?;
        }
        if let Some(v) = file.port {
            self.port = v;
        }
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("reading calendar config from {}", path.display()))
}

fn parse_timezone(s: &str) -> Result<Tz> {
    s.trim()
        .parse::<Tz>()
        .map_err(|_| anyhow!("unknown timezone {s:?}, expected an IANA name like Europe/Athens"))
}

fn parse_impacts<I, S>(items: I) -> Result<Vec<Impact>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.as_ref().trim();
        if !t.is_empty() {
            set.insert(t.parse::<Impact>()?);
        }
    }
    if set.is_empty() {
        bail!("at least one accepted impact level is required");
    }
    Ok(set.into_iter().collect())
}

fn clean_currencies(items: Vec<String>) -> Vec<String> {
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() {
            set.insert(t.to_ascii_uppercase());
        }
    }
    set.into_iter().collect()
}

fn parse_timeout(secs: u64) -> Result<Duration> {
    if secs == 0 {
        bail!("fetch timeout must be at least one second");
    }
    Ok(Duration::from_secs(secs))
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',').map(|p| p.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::{env, fs};

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_have_no_secret() {
        let cfg = ServiceConfig::from_sources(None, |_| None).unwrap();
        assert_eq!(cfg.timezone, chrono_tz::Europe::Athens);
        assert_eq!(cfg.impacts, vec![Impact::High]);
        assert_eq!(cfg.window, InclusionWindow::Today);
        assert!(cfg.refresh_secret.is_none());
        assert_eq!(cfg.port, 10000);
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(15));
    }

    #[test]
    fn toml_then_env_precedence() {
        let toml = r#"
            timezone = "Asia/Beirut"
            impacts = ["High", "medium", "high"]
            currencies = [" usd ", "", "EUR", "eur"]
            window = "week"
            source_kind = "json"
            fetch_timeout_secs = 10
        "#;
        let cfg = ServiceConfig::from_sources(
            Some(toml),
            env_of(&[
                (ENV_TIMEZONE, "Europe/Moscow"),
                (ENV_REFRESH_SECRET, "s3cret"),
                (ENV_PORT, "8080"),
                (ENV_WINDOW, "  "),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.timezone, chrono_tz::Europe::Moscow);
        assert_eq!(cfg.impacts, vec![Impact::High, Impact::Medium]);
        assert_eq!(cfg.currencies, vec!["EUR".to_string(), "USD".to_string()]);
        assert_eq!(cfg.window, InclusionWindow::Week);
        assert_eq!(cfg.source_kind, SourceKind::Json);
        assert_eq!(cfg.fetch_timeout, Duration::from_secs(10));
        assert_eq!(cfg.refresh_secret.as_deref(), Some("s3cret"));
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(ServiceConfig::from_toml_str(r#"timezone = "Mars/Olympus""#).is_err());
        assert!(ServiceConfig::from_toml_str(r#"impacts = ["huge"]"#).is_err());
        assert!(ServiceConfig::from_toml_str(r#"impacts = []"#).is_err());
        assert!(ServiceConfig::from_toml_str("fetch_timeout_secs = 0").is_err());
        assert!(ServiceConfig::from_toml_str(r#"refresh_secret = "inline""#).is_err());
        assert!(ServiceConfig::from_sources(None, env_of(&[(ENV_SOURCE_KIND, "csv")])).is_err());
    }

    #[test]
    fn debug_output_redacts_secret() {
        let cfg = ServiceConfig {
            refresh_secret: Some("hunter2".into()),
            ..ServiceConfig::default()
        };
        let s = format!("{cfg:?}");
        assert!(!s.contains("hunter2"));
        assert!(s.contains("<redacted>"));
    }

    #[serial_test::serial]
    #[test]
    fn from_env_uses_config_path_then_env() {
        // Isolate CWD so a real config/ in the repo does not interfere.
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_WINDOW);
        env::remove_var(ENV_PORT);

        let p = tmp.path().join("calendar.toml");
        fs::write(&p, "window = \"week\"\nport = 9000\n").unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        let cfg = ServiceConfig::from_env().unwrap();
        assert_eq!(cfg.window, InclusionWindow::Week);
        assert_eq!(cfg.port, 9000);

        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(ServiceConfig::from_env().is_err());
        env::remove_var(ENV_CONFIG_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
