use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    str::FromStr,
};

use fad_consts::consts;
use serde::{de::IntoDeserializer, Deserialize, Serialize};
use url::Url;

/// Which extraction strategy to use for the downloaded archive.
///
/// `Subprocess` hands the blob URL to the external extraction utility, which
/// performs its own parallel range-fetching and inflate. `InProcess` downloads
/// the blob to a temporary file and unpacks it with an in-process unzip
/// implementation, for hosts where running the utility is not possible or not
/// allowed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionStrategy {
    #[default]
    Subprocess,
    InProcess,
}

impl FromStr for ExtractionStrategy {
    type Err = serde::de::value::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::deserialize(s.into_deserializer())
    }
}

impl std::fmt::Display for ExtractionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionStrategy::Subprocess => write!(f, "subprocess"),
            ExtractionStrategy::InProcess => write!(f, "in-process"),
        }
    }
}

/// Configuration of the external extraction utility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct ToolConfig {
    /// Version the tool cache is keyed under.
    pub version: String,

    /// Root directory of the tool cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Download URL per host operating system (`std::env::consts::OS` names).
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub urls: HashMap<String, Url>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        let urls = HashMap::from([
            ("linux".to_string(), consts::DEFAULT_TOOL_URL_LINUX.clone()),
            ("macos".to_string(), consts::DEFAULT_TOOL_URL_MACOS.clone()),
            (
                "windows".to_string(),
                consts::DEFAULT_TOOL_URL_WINDOWS.clone(),
            ),
        ]);
        Self {
            version: consts::TOOL_VERSION.to_string(),
            cache_dir: None,
            urls,
        }
    }
}

impl ToolConfig {
    /// The resolved tool cache root, falling back to the platform cache
    /// directory. `FAD_TOOL_CACHE_DIR` wins over everything.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = std::env::var_os("FAD_TOOL_CACHE_DIR") {
            return Some(PathBuf::from(dir));
        }
        self.cache_dir.clone().or_else(|| {
            dirs::cache_dir().map(|d| d.join(consts::FAD_DIR).join(consts::TOOLS_DIR))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Strategy used to unpack the downloaded artifact.
    pub extraction_strategy: ExtractionStrategy,

    /// Base URL of the GitHub REST API.
    pub api_url: Url,

    pub tool: ToolConfig,

    #[serde(skip)]
    pub loaded_from: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extraction_strategy: ExtractionStrategy::default(),
            api_url: Url::parse(consts::DEFAULT_API_URL).expect("default API URL must parse"),
            tool: ToolConfig::default(),
            loaded_from: Vec::new(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("no file was found at {0}")]
    FileNotFound(PathBuf),
    #[error("failed to read config from '{0}'")]
    ReadError(#[source] std::io::Error, PathBuf),
    #[error("failed to parse config from '{1}'")]
    ParseError(#[source] toml_edit::de::Error, PathBuf),
}

/// The global config file location, `FAD_CONFIG_FILE` taking precedence over
/// the platform config directory.
fn config_path_global() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("FAD_CONFIG_FILE") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join(consts::FAD_DIR).join(consts::CONFIG_FILE))
}

impl Config {
    /// Parse the given toml string and return a Config instance.
    pub fn from_toml(toml: &str) -> Result<Config, toml_edit::de::Error> {
        let de = toml_edit::de::Deserializer::from_str(toml)?;
        Config::deserialize(de)
    }

    /// Load the config from the given path.
    pub fn from_path(path: &Path) -> Result<Config, ConfigError> {
        tracing::debug!("Loading config from {}", path.display());
        let s = match fs_err::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(ConfigError::ReadError(e, path.to_path_buf())),
        };

        let mut config = Config::from_toml(&s)
            .map_err(|e| ConfigError::ParseError(e, path.to_path_buf()))?;
        config.loaded_from.push(path.to_path_buf());
        tracing::debug!("Loaded config from: {}", path.display());

        Ok(config)
    }

    /// Load the global config file, falling back to the built-in defaults
    /// when no file exists.
    pub fn load_global() -> Config {
        let Some(path) = config_path_global() else {
            return Config::default();
        };

        match Self::from_path(&path) {
            Ok(config) => Config::default().merge_config(config),
            Err(ConfigError::FileNotFound(_)) => Config::default(),
            Err(e) => {
                tracing::error!(
                    "Failed to load global config '{}' with error: {}",
                    path.display(),
                    e
                );
                Config::default()
            }
        }
    }

    /// Merge the `other` config into `self`.
    /// The `other` config will have higher priority.
    #[must_use]
    pub fn merge_config(mut self, mut other: Config) -> Self {
        other.loaded_from.extend(self.loaded_from);
        self.loaded_from = other.loaded_from;

        // URL tables merge key-wise so a user can override a single OS.
        for (os, url) in other.tool.urls {
            self.tool.urls.insert(os, url);
        }
        if other.tool.version != ToolConfig::default().version {
            self.tool.version = other.tool.version;
        }
        if other.tool.cache_dir.is_some() {
            self.tool.cache_dir = other.tool.cache_dir;
        }

        Self {
            extraction_strategy: other.extraction_strategy,
            api_url: other.api_url,
            tool: self.tool,
            loaded_from: self.loaded_from,
        }
    }
}
