// ebuild: a build orchestrator for C and C++ projects.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Project-level defaults read from `ebuild.toml` in the current working
//! directory. CLI flags win over this file, which wins over the built-in
//! defaults hardcoded below; nothing here is mandatory, and a missing
//! file is silently treated as all-defaults.

use std::path::{Path, PathBuf};

use ebuild_util::{Arch, Configuration};
use serde::Deserialize;

pub const PROJECT_CONFIG_FILE: &str = "ebuild.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
    #[serde(default)]
    pub configuration: Option<Configuration>,
    #[serde(default)]
    pub arch: Option<Arch>,
    #[serde(default)]
    pub jobs: Option<usize>,
}

impl ProjectConfig {
    /// Built-in defaults when neither a CLI flag nor a file value is set.
    pub fn configuration_or_default(&self, cli: Option<Configuration>) -> Configuration {
        cli.or(self.configuration).unwrap_or(Configuration::Debug)
    }

    pub fn arch_or_default(&self, cli: Option<Arch>) -> Arch {
        cli.or(self.arch).unwrap_or_else(Arch::host)
    }

    pub fn jobs_or_default(&self, cli: Option<usize>) -> usize {
        cli.or(self.jobs).unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Loads `ebuild.toml` from `dir` if present; an absent file is not an
/// error, it just yields the all-`None` default.
pub fn load(dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let path = dir.join(PROJECT_CONFIG_FILE);
    if !path.is_file() {
        return Ok(ProjectConfig::default());
    }
    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(dir.path()).unwrap();
        assert_eq!(config.configuration_or_default(None), Configuration::Debug);
    }

    #[test]
    fn cli_flag_overrides_file_value() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PROJECT_CONFIG_FILE), "configuration = \"release\"\n").unwrap();
        let config = load(dir.path()).unwrap();
        assert_eq!(config.configuration_or_default(None), Configuration::Release);
        assert_eq!(config.configuration_or_default(Some(Configuration::Debug)), Configuration::Debug);
    }

    #[test]
    fn search_paths_default_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(dir.path()).unwrap();
        assert!(config.search_paths.is_empty());
    }
}
