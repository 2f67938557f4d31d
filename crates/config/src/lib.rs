//! Layered configuration for cdnget.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults;
//! 2. `config.{toml,yaml,json}` in the platform configuration directory;
//! 3. an explicit file given by the host;
//! 4. `CDNGET_` environment variables, nested keys split on `__`
//!    (`CDNGET_UPSTREAMS__CDNJS__PRIORITY=1`).

pub mod error;
mod upstream;

pub use crate::upstream::{UpstreamConfig, UpstreamKind};
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "CDNGET_";
const DEFAULT_DATABASE: &str = "cdnget.db";
const DEFAULT_CONTENT_ROOT: &str = "content";
const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite mirror store.
    pub database: PathBuf,
    /// Root directory mirrored content is written under.
    pub content_root: PathBuf,
    /// Upper bound on concurrent retrievals.
    pub concurrency: usize,
    /// Decide without writing anything.
    pub dry_run: bool,
    /// Upstream services by display name.
    pub upstreams: BTreeMap<String, UpstreamConfig>,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            content_root: PathBuf::from(DEFAULT_CONTENT_ROOT),
            concurrency: DEFAULT_CONCURRENCY,
            dry_run: false,
            upstreams: BTreeMap::new(),
        }
    }
}
impl Config {
    /// Load and validate the configuration from every source.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(explicit)?.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(upstreams = config.upstreams.len(), "loaded configuration");
        Ok(config)
    }

    /// The layered sources, before extraction.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(dirs) = ProjectDirs::from("", "", "cdnget") {
            let dir = dirs.config_dir();
            figment = figment
                .merge(Toml::file(dir.join("config.toml")))
                .merge(Yaml::file(dir.join("config.yaml")))
                .merge(Json::file(dir.join("config.json")));
        }
        if let Some(path) = explicit {
            figment = Self::merge_file(figment, path)?;
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
        if !path.is_file() {
            exn::bail!(ErrorKind::Invalid(format!("config file `{}` does not exist", path.display())));
        }
        let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
        Ok(match extension.as_deref() {
            Some("toml") => figment.merge(Toml::file(path)),
            Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            _ => exn::bail!(ErrorKind::Invalid(format!("unsupported config format `{}`", path.display()))),
        })
    }

    /// Check every rule that does not need the store.
    ///
    /// Service names and directory names must be non-blank once trimmed and
    /// unique ignoring case; the worker pool needs at least one worker.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            exn::bail!(ErrorKind::Invalid("concurrency must be greater than zero".to_string()));
        }
        let mut names = HashMap::new();
        let mut dir_names = HashMap::new();
        for (name, upstream) in &self.upstreams {
            let service = upstream.service(name)?;
            if let Some(other) = names.insert(service.name.to_ascii_lowercase(), name) {
                exn::bail!(ErrorKind::Invalid(format!("upstreams `{other}` and `{name}` share a name")));
            }
            if let Some(other) = dir_names.insert(service.dir_name.to_ascii_lowercase(), name) {
                exn::bail!(ErrorKind::Invalid(format!("upstreams `{other}` and `{name}` share a dir_name")));
            }
        }
        Ok(())
    }
}
