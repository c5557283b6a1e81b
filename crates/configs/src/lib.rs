use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub roster: RosterConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            worker_threads: Some(4),
            log_format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { backend: StoreBackend::Redis, url: String::new() }
    }
}

/// Business policy for the roster: whether unknown class IDs are created on
/// the fly, whether an empty store gets demo data, and the upload size cap.
#[derive(Debug, Clone, Deserialize)]
pub struct RosterConfig {
    #[serde(default = "default_true")]
    pub auto_create_missing_class: bool,
    #[serde(default)]
    pub seed_on_empty: bool,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            auto_create_missing_class: true,
            seed_on_empty: false,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_log_format() -> String { "compact".into() }
fn default_true() -> bool { true }
fn default_max_upload_bytes() -> usize { 10 * 1024 * 1024 }

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/8";

/// `CONFIG_PATH`, or `config.toml` in the working directory.
pub fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`), falling back to defaults when the
    /// file is absent, then apply environment overrides and validate.
    pub fn load_and_validate() -> Result<Self> {
        let path = config_path();
        let mut cfg = if std::path::Path::new(&path).exists() {
            load_from_file(&path)?
        } else {
            AppConfig::default()
        };
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Apply environment overrides through a lookup function so tests can
    /// feed a fixed map instead of the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT").and_then(|p| p.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(w) = lookup("TOKIO_WORKER_THREADS").and_then(|v| v.parse::<usize>().ok()) {
            self.server.worker_threads = Some(w);
        }
        self.store.normalize_from_env(&lookup);
        if let Some(flag) = lookup("ROSTER_AUTO_CREATE_CLASS").and_then(|v| parse_bool(&v)) {
            self.roster.auto_create_missing_class = flag;
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.store.validate()?;
        if self.roster.max_upload_bytes == 0 {
            return Err(anyhow!("roster.max_upload_bytes must be > 0"));
        }
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        if let Some(w) = self.worker_threads {
            if w == 0 { self.worker_threads = Some(4); }
        } else {
            self.worker_threads = Some(4);
        }
        Ok(())
    }
}

impl StoreConfig {
    pub fn normalize_from_env<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("REDIS_URL") {
            self.url = url;
        }
        if self.url.trim().is_empty() && self.backend == StoreBackend::Redis {
            self.url = DEFAULT_REDIS_URL.to_string();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend == StoreBackend::Memory {
            return Ok(());
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("redis://") || lower.starts_with("rediss://")) {
            return Err(anyhow!("store.url must start with redis:// or rediss://"));
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn parses_full_file() {
        let cfg = parse(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9090
            log_format = "json"

            [store]
            backend = "memory"

            [roster]
            auto_create_missing_class = false
            seed_on_empty = true
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.log_format, "json");
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert!(!cfg.roster.auto_create_missing_class);
        assert!(cfg.roster.seed_on_empty);
        assert_eq!(cfg.roster.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn defaults_fill_redis_url() {
        let mut cfg = AppConfig::default();
        cfg.apply_env(lookup_from(&[]));
        cfg.normalize_and_validate().expect("valid");
        assert_eq!(cfg.store.url, DEFAULT_REDIS_URL);
        assert!(cfg.roster.auto_create_missing_class);
        assert_eq!(cfg.server.worker_threads, Some(4));
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = AppConfig::default();
        cfg.apply_env(lookup_from(&[
            ("SERVER_PORT", "7000"),
            ("REDIS_URL", "redis://cache:6379/2"),
            ("ROSTER_AUTO_CREATE_CLASS", "off"),
        ]));
        assert_eq!(cfg.server.port, 7000);
        assert_eq!(cfg.store.url, "redis://cache:6379/2");
        assert!(!cfg.roster.auto_create_missing_class);
    }

    #[test]
    fn rejects_non_redis_url() {
        let mut cfg = AppConfig::default();
        cfg.store.url = "http://localhost:6379".into();
        assert!(cfg.normalize_and_validate().is_err());
    }

    #[test]
    fn memory_backend_needs_no_url() {
        let mut cfg = AppConfig::default();
        cfg.store.backend = StoreBackend::Memory;
        cfg.normalize_and_validate().expect("memory is valid without url");
    }

    #[test]
    fn load_from_file_reads_toml() -> Result<()> {
        let path = std::env::temp_dir().join(format!("rollcall-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[server]\nport = 9090\n\n[store]\nbackend = \"memory\"\n")?;
        let cfg = load_from_file(&path.to_string_lossy())?;
        let _ = std::fs::remove_file(&path);

        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert!(load_from_file("/nonexistent/rollcall.toml").is_err());
        Ok(())
    }

    #[test]
    fn rejects_zero_upload_limit() {
        let mut cfg = AppConfig::default();
        cfg.store.url = DEFAULT_REDIS_URL.into();
        cfg.roster.max_upload_bytes = 0;
        assert!(cfg.normalize_and_validate().is_err());
    }
}
