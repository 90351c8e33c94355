use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_rdf_path")]
    pub rdf_path: PathBuf,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    /// Replaces the built-in country table when set.
    #[serde(default)]
    pub countries_path: Option<PathBuf>,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            rdf_path: default_rdf_path(),
            url: default_url(),
            snapshot_path: default_snapshot_path(),
            countries_path: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

fn default_rdf_path() -> PathBuf {
    PathBuf::from("data/registry.rdf")
}
fn default_url() -> String {
    "https://gitlab.com/crossref/open_funder_registry/-/raw/master/registry.rdf?inline=false"
        .to_string()
}
fn default_snapshot_path() -> PathBuf {
    PathBuf::from("data/funders.json")
}
fn default_fetch_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: usize,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            checkpoint_every: default_checkpoint_every(),
            page_size: default_page_size(),
        }
    }
}

fn default_index_path() -> PathBuf {
    PathBuf::from("data/funders.index")
}
fn default_checkpoint_every() -> usize {
    5000
}
fn default_page_size() -> i64 {
    20
}

impl Config {
    /// All defaults; used when no config file is present.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.index.checkpoint_every == 0 {
        anyhow::bail!("index.checkpoint_every must be >= 1");
    }
    if config.index.page_size < 1 {
        anyhow::bail!("index.page_size must be >= 1");
    }
    if config.source.fetch_timeout_secs == 0 {
        anyhow::bail!("source.fetch_timeout_secs must be >= 1");
    }
    if config.source.url.trim().is_empty() {
        anyhow::bail!("source.url must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("fundreg.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn empty_file_uses_defaults() {
        let (_dir, path) = write("");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.index.checkpoint_every, 5000);
        assert_eq!(cfg.index.page_size, 20);
        assert_eq!(cfg.source.snapshot_path, PathBuf::from("data/funders.json"));
        assert!(cfg.source.countries_path.is_none());
    }

    #[test]
    fn overrides_are_read() {
        let (_dir, path) = write(
            r#"
[source]
rdf_path = "/tmp/registry.rdf"
countries_path = "/tmp/countries.json"

[index]
path = "/tmp/idx"
checkpoint_every = 10
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.source.rdf_path, PathBuf::from("/tmp/registry.rdf"));
        assert_eq!(
            cfg.source.countries_path,
            Some(PathBuf::from("/tmp/countries.json"))
        );
        assert_eq!(cfg.index.path, PathBuf::from("/tmp/idx"));
        assert_eq!(cfg.index.checkpoint_every, 10);
    }

    #[test]
    fn zero_checkpoint_interval_is_rejected() {
        let (_dir, path) = write("[index]\ncheckpoint_every = 0\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("checkpoint_every"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_config(Path::new("/nonexistent/fundreg.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
