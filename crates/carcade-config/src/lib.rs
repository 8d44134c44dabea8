//! Configuration management for Carcade.
//!
//! Parses `carcade.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Rule Lists
//!
//! Layout, ordering and pagination rules are ordered lists of
//! `(pattern, value)` pairs. The site pipeline tests them in order and the
//! first matching pattern wins:
//!
//! ```toml
//! [[ordering]]
//! pattern = "blog/*"
//! order = "alphabetically"
//!
//! [[pagination]]
//! pattern = "blog/*"
//! per_page = 10
//! ```
//!
//! ## Environment Variable Expansion
//!
//! `${VAR}` and `${VAR:-default}` are expanded in `server.host` and
//! `site.default_language`.

mod expand;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "carcade.toml";

/// Placeholder replaced by the page index in [`SiteSection::page_name`].
pub const PAGE_INDEX_PLACEHOLDER: &str = "{}";

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override the published output directory.
    pub output_dir: Option<PathBuf>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site-wide settings.
    pub site: SiteSection,
    /// Project paths as relative strings from TOML.
    paths: PathsConfigRaw,
    /// Node path pattern to template rules.
    pub layouts: Vec<LayoutRule>,
    /// Node path pattern to ordering directive rules.
    pub ordering: Vec<OrderingRule>,
    /// Node path pattern to page size rules.
    pub pagination: Vec<PaginationRule>,
    /// Named asset bundles.
    pub bundles: BTreeMap<String, BundleConfig>,
    /// Development server configuration.
    pub server: ServerConfig,

    /// Resolved project paths (set after loading).
    #[serde(skip)]
    pub paths_resolved: PathsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// `[site]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    /// Languages to build, one render pass each.
    pub languages: Vec<String>,
    /// Language rendered without a URL prefix.
    pub default_language: Option<String>,
    /// Node path that is served at the site root.
    pub home: Option<String>,
    /// Template used for nodes without a matching layout rule.
    pub default_layout: String,
    /// Name template for pagination nodes.
    pub page_name: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            languages: Vec::new(),
            default_language: None,
            home: None,
            default_layout: "default.html".to_owned(),
            page_name: "page{}".to_owned(),
        }
    }
}

/// Raw paths configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PathsConfigRaw {
    pages: Option<String>,
    layouts: Option<String>,
    #[serde(rename = "static")]
    static_dir: Option<String>,
    translations: Option<String>,
    output: Option<String>,
}

/// Resolved project paths.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathsConfig {
    /// Directory holding the config file.
    pub project_dir: PathBuf,
    /// Content root mirrored into the site tree.
    pub pages_dir: PathBuf,
    /// Template directory.
    pub layouts_dir: PathBuf,
    /// Static assets copied verbatim into every build.
    pub static_dir: PathBuf,
    /// Translation catalogs (`<language>.po`).
    pub translations_dir: PathBuf,
    /// Published output path.
    pub output_dir: PathBuf,
}

/// Template selection rule.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct LayoutRule {
    /// Glob over node paths.
    pub pattern: String,
    /// Template name relative to the layouts directory.
    pub template: String,
}

/// Sibling ordering rule.
///
/// `order` stays untyped here; the site pipeline decides which shapes it
/// understands.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct OrderingRule {
    /// Glob over `<node path>/*` keys.
    pub pattern: String,
    /// Ordering directive (`"alphabetically"` or a list of names).
    pub order: serde_json::Value,
}

/// Pagination rule.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct PaginationRule {
    /// Glob over `<node path>/*` keys.
    pub pattern: String,
    /// Children per page.
    pub per_page: usize,
}

/// Asset bundle: several static sources concatenated into one output file.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct BundleConfig {
    /// Output file name relative to the build directory.
    pub output: String,
    /// Source files relative to the static directory.
    #[serde(default)]
    pub inputs: Vec<String>,
}

/// Development server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8000,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`server.host`").
        field: String,
        /// Error message (e.g., "${`HOST`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `carcade.toml` in current directory and parents.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Parse a configuration string rooted at `base`.
    ///
    /// # Errors
    ///
    /// Returns error if the TOML is malformed or fails validation.
    pub fn from_toml_str(content: &str, base: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.expand_env_vars()?;
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    /// Language rendered without a URL prefix.
    ///
    /// Falls back to the first configured language.
    #[must_use]
    pub fn default_language(&self) -> Option<&str> {
        self.site
            .default_language
            .as_deref()
            .or_else(|| self.site.languages.first().map(String::as_str))
    }

    /// Languages to build; a single `None` pass when none are configured.
    #[must_use]
    pub fn build_languages(&self) -> Vec<Option<String>> {
        if self.site.languages.is_empty() {
            vec![None]
        } else {
            self.site.languages.iter().cloned().map(Some).collect()
        }
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(output_dir) = &settings.output_dir {
            self.paths_resolved.output_dir = if output_dir.is_absolute() {
                output_dir.clone()
            } else {
                self.paths_resolved.project_dir.join(output_dir)
            };
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    #[must_use]
    pub fn default_with_base(base: &Path) -> Self {
        let mut config = Self {
            site: SiteSection::default(),
            paths: PathsConfigRaw::default(),
            layouts: Vec::new(),
            ordering: Vec::new(),
            pagination: Vec::new(),
            bundles: BTreeMap::new(),
            server: ServerConfig::default(),
            paths_resolved: PathsConfig::default(),
            config_path: None,
        };
        config.resolve_paths(base);
        config
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config_dir = path.parent().unwrap_or(Path::new("."));
        let mut config = Self::from_toml_str(&content, config_dir)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_site()?;
        self.validate_rules()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_site(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.site.default_layout, "site.default_layout")?;
        if !self.site.page_name.contains(PAGE_INDEX_PLACEHOLDER) {
            return Err(ConfigError::Validation(format!(
                "site.page_name must contain {PAGE_INDEX_PLACEHOLDER}"
            )));
        }
        if let Some(default) = &self.site.default_language
            && !self.site.languages.is_empty()
            && !self.site.languages.contains(default)
        {
            return Err(ConfigError::Validation(format!(
                "site.default_language '{default}' is not listed in site.languages"
            )));
        }
        Ok(())
    }

    fn validate_rules(&self) -> Result<(), ConfigError> {
        for rule in &self.layouts {
            require_non_empty(&rule.pattern, "layouts.pattern")?;
            require_non_empty(&rule.template, "layouts.template")?;
        }
        for rule in &self.ordering {
            require_non_empty(&rule.pattern, "ordering.pattern")?;
        }
        for rule in &self.pagination {
            require_non_empty(&rule.pattern, "pagination.pattern")?;
            if rule.per_page == 0 {
                return Err(ConfigError::Validation(format!(
                    "pagination.per_page for '{}' must be greater than 0",
                    rule.pattern
                )));
            }
        }
        for (name, bundle) in &self.bundles {
            require_non_empty(&bundle.output, &format!("bundles.{name}.output"))?;
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;
        expand::expand_env_opt(&mut self.site.default_language, "site.default_language")?;
        Ok(())
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.paths_resolved = PathsConfig {
            project_dir: config_dir.to_path_buf(),
            pages_dir: resolve(self.paths.pages.as_deref(), "pages"),
            layouts_dir: resolve(self.paths.layouts.as_deref(), "layouts"),
            static_dir: resolve(self.paths.static_dir.as_deref(), "static"),
            translations_dir: resolve(self.paths.translations.as_deref(), "translations"),
            output_dir: resolve(self.paths.output.as_deref(), "www"),
        };
    }
}
