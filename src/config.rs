use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{DatasetRevision, Doi, Scope};
use crate::error::KiraError;
use crate::http::DEFAULT_TIMEOUT_SECS;

pub const DEFAULT_CONFIG_FILE: &str = "kira-dc.json";
pub const DEFAULT_OUTPUT_PATH: &str = "citations.csv";
const NOT_APPLICABLE: &str = "n/a";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub output_path: Option<Utf8PathBuf>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub standalone: Vec<StandaloneEntry>,
}

/// A dataset that is not held by the repository but has a DOI of its own.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StandaloneEntry {
    pub scope: String,
    #[serde(default)]
    pub package_id: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
    pub pub_date: String,
    pub title: String,
    pub creators: String,
    pub doi: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandaloneDataset {
    pub scope: String,
    pub package_id: String,
    pub revision: String,
    pub pub_date: String,
    pub title: String,
    pub creators: String,
    pub doi: Doi,
}

impl StandaloneDataset {
    pub fn to_revision(&self) -> DatasetRevision {
        DatasetRevision {
            scope: self.scope.clone(),
            package_id: self.package_id.clone(),
            revision: self.revision.clone(),
            title: self.title.clone(),
            pub_date: self.pub_date.clone(),
            creators: self.creators.clone(),
            doi: Some(self.doi.identifier().clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub scope: Option<Scope>,
    pub output_path: Utf8PathBuf,
    pub timeout: Duration,
    pub standalone: Vec<StandaloneDataset>,
}

impl ResolvedConfig {
    pub fn require_scope(&self) -> Result<&Scope, KiraError> {
        self.scope.as_ref().ok_or(KiraError::MissingScope)
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub scope: Option<String>,
    pub output_path: Option<Utf8PathBuf>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `kira-dc.json` when present in the current directory.
    ///
    /// Without an explicit path a missing default file is not an error; the
    /// run then relies on the overrides alone.
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, KiraError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| KiraError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content).map_err(|err| KiraError::ConfigParse(err.to_string()))?
        };

        Self::resolve_config(config, overrides)
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, KiraError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let scope = overrides
            .scope
            .or(config.scope)
            .map(|value| value.parse::<Scope>())
            .transpose()?;
        let output_path = overrides
            .output_path
            .or(config.output_path)
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUTPUT_PATH));
        let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

        let standalone = config
            .standalone
            .into_iter()
            .map(|entry| {
                Ok(StandaloneDataset {
                    doi: entry.doi.parse()?,
                    scope: entry.scope,
                    package_id: entry
                        .package_id
                        .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
                    revision: entry.revision.unwrap_or_else(|| NOT_APPLICABLE.to_string()),
                    pub_date: entry.pub_date,
                    title: entry.title,
                    creators: entry.creators,
                })
            })
            .collect::<Result<Vec<_>, KiraError>>()?;

        Ok(ResolvedConfig {
            schema_version,
            scope,
            output_path,
            timeout,
            standalone,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let resolved =
            ConfigLoader::resolve_config(Config::default(), ConfigOverrides::default()).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert!(resolved.scope.is_none());
        assert_eq!(resolved.output_path, Utf8PathBuf::from("citations.csv"));
        assert_eq!(resolved.timeout, Duration::from_secs(30));
    }

    #[test]
    fn overrides_win() {
        let config = Config {
            scope: Some("knb-lter-ble".to_string()),
            output_path: Some(Utf8PathBuf::from("a.csv")),
            ..Config::default()
        };
        let overrides = ConfigOverrides {
            scope: Some("edi".to_string()),
            output_path: Some(Utf8PathBuf::from("b.csv")),
        };
        let resolved = ConfigLoader::resolve_config(config, overrides).unwrap();
        assert_eq!(resolved.require_scope().unwrap().as_str(), "edi");
        assert_eq!(resolved.output_path, Utf8PathBuf::from("b.csv"));
    }
}
