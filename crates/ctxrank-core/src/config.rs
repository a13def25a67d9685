//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Nested keys in env vars are separated by `__`, e.g.
//! `APP_ENGINE__WEIGHTS__W_VECTOR=0.6`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::data_processor::IngestConfig;
use crate::error::Error;
use crate::types::WeightSet;

/// Retrieval knobs for the reranker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Blocks rendered in context-assembly mode.
    pub top_k: usize,
    /// Floor used by listing callers that do not pass their own.
    pub default_min_score: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3, default_min_score: 0.1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorizerKind {
    Hashed,
    Fixed,
    Jitter,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    pub kind: VectorizerKind,
    pub dim: usize,
    /// Constant returned by the `fixed` vectorizer.
    pub score: f64,
    /// Seed for the `jitter` vectorizer.
    pub seed: u64,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self { kind: VectorizerKind::Hashed, dim: 4096, score: 0.8, seed: 42 }
    }
}

/// The `engine` section of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub weights: WeightSet,
    pub ingest: IngestConfig,
    pub retrieval: RetrievalConfig,
    pub vectorizer: VectorizerConfig,
}

impl EngineSettings {
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("engine.retrieval.top_k must be at least 1".into()));
        }
        if self.vectorizer.dim == 0 {
            return Err(Error::InvalidConfig("engine.vectorizer.dim must be at least 1".into()));
        }
        if self.ingest.max_content_chars == 0 {
            return Err(Error::InvalidConfig("engine.ingest.max_content_chars must be at least 1".into()));
        }
        Ok(())
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    /// Load `config.toml` and the per-environment overlay from `dir`.
    pub fn load_from(dir: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Defaults::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn engine(&self) -> anyhow::Result<EngineSettings> {
        self.get("engine")
    }

    fn validate(&self) -> anyhow::Result<()> {
        self.engine()?.validate()?;
        Ok(())
    }
}

#[derive(Debug, Default, Serialize)]
struct Defaults {
    engine: EngineSettings,
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
