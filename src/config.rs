//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/treetable/treetable.toml`
//! 3. Local config: `<project_dir>/.treetable.toml`
//! 4. Environment variables: `TREETABLE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::{KindIcons, NodeKind, SortOrder};
use crate::i18n::{Catalog, Locale, FALLBACK_LOCALE};

/// Raw settings for intermediate parsing.
///
/// `None` means "not specified, inherit from the layer below".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub locale: Option<String>,
    pub default_locale: Option<String>,
    pub allow_root: Option<bool>,
    pub sort: Option<SortOrder>,
    pub root_id: Option<String>,
    pub types: Option<KindIcons>,
    pub locale_dir: Option<PathBuf>,
    pub source_url: Option<String>,
    pub crud_url: Option<String>,
}

/// Unified configuration for treetable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Locale used for user-facing text
    pub locale: String,
    /// Locale consulted for keys the requested one lacks
    pub default_locale: String,
    /// Whether nodes may live at the root level
    pub allow_root: bool,
    pub sort: SortOrder,
    /// Wire id of the root context
    pub root_id: String,
    /// Directory with additional `<code>.toml` locale files
    pub locale_dir: Option<PathBuf>,
    pub source_url: Option<String>,
    pub crud_url: Option<String>,
    /// Node kind to icon; a non-empty map restricts the allowed kinds
    pub types: KindIcons,
}

impl Default for Settings {
    fn default() -> Self {
        let mut types = KindIcons::new();
        types.insert(NodeKind::default(), "📄".to_string());
        types.insert(NodeKind::folder(), "📁".to_string());
        Self {
            locale: FALLBACK_LOCALE.to_string(),
            default_locale: FALLBACK_LOCALE.to_string(),
            allow_root: true,
            sort: SortOrder::default(),
            root_id: "#".to_string(),
            types,
            locale_dir: None,
            source_url: None,
            crud_url: None,
        }
    }
}

/// Get the XDG config directory for treetable.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "treetable").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("treetable.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".treetable.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Merge kind maps key-wise; overlay wins, a `!kind` key removes the kind.
pub fn merge_types(base: &KindIcons, overlay: &KindIcons) -> KindIcons {
    let mut result = base.clone();
    for (kind, icon) in overlay {
        if let Some(negated) = kind.as_str().strip_prefix('!') {
            result.remove(&NodeKind::new(negated));
        } else {
            result.insert(kind.clone(), icon.clone());
        }
    }
    result
}

impl Settings {
    /// Merge overlay config onto self (base); `types` merge key-wise.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            types: overlay
                .types
                .as_ref()
                .map(|o| merge_types(&self.types, o))
                .unwrap_or_else(|| self.types.clone()),
            ..self.apply_scalars(overlay)
        }
    }

    /// Apply global config onto defaults; a global `types` map REPLACES the
    /// compiled one.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            types: global
                .types
                .as_ref()
                .map(|g| merge_types(&KindIcons::new(), g))
                .unwrap_or_else(|| self.types.clone()),
            ..self.apply_scalars(global)
        }
    }

    fn apply_scalars(&self, overlay: &RawSettings) -> Self {
        Self {
            locale: overlay.locale.clone().unwrap_or_else(|| self.locale.clone()),
            default_locale: overlay
                .default_locale
                .clone()
                .unwrap_or_else(|| self.default_locale.clone()),
            allow_root: overlay.allow_root.unwrap_or(self.allow_root),
            sort: overlay.sort.unwrap_or(self.sort),
            root_id: overlay.root_id.clone().unwrap_or_else(|| self.root_id.clone()),
            types: self.types.clone(),
            locale_dir: overlay.locale_dir.clone().or_else(|| self.locale_dir.clone()),
            source_url: overlay.source_url.clone().or_else(|| self.source_url.clone()),
            crud_url: overlay.crud_url.clone().or_else(|| self.crud_url.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional project directory for local config
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/treetable/treetable.toml` (`types` REPLACES defaults)
    /// 3. Local config: `<project_dir>/.treetable.toml` (`types` merges key-wise)
    /// 4. Environment variables: `TREETABLE_*` prefix (explicit override)
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("load: global {}", global_path.display());
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(project) = project_dir {
            let local_path = local_config_path(project);
            if local_path.exists() {
                debug!("load: local {}", local_path.display());
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
                // relative locale dirs are anchored at the project
                if let Some(dir) = current.locale_dir.as_mut() {
                    if dir.is_relative() && raw.locale_dir.is_some() {
                        *dir = project.join(&*dir);
                    }
                }
            }
        }

        Self::apply_env_overrides(current)
    }

    /// Apply TREETABLE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("TREETABLE")
                .prefix_separator("_")
                .separator("__"),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("locale") {
            settings.locale = val;
        }
        if let Ok(val) = config.get_string("default_locale") {
            settings.default_locale = val;
        }
        if let Ok(val) = config.get_bool("allow_root") {
            settings.allow_root = val;
        }
        if let Ok(val) = config.get_string("sort") {
            settings.sort = val
                .parse()
                .map_err(|message| ApplicationError::Config { message })?;
        }
        if let Ok(val) = config.get_string("root_id") {
            settings.root_id = val;
        }
        if let Ok(val) = config.get_string("locale_dir") {
            settings.locale_dir = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("source_url") {
            settings.source_url = Some(val);
        }
        if let Ok(val) = config.get_string("crud_url") {
            settings.crud_url = Some(val);
        }
        if let Ok(table) = config.get_table("types") {
            let overlay: KindIcons = table
                .into_iter()
                .filter_map(|(k, v)| v.into_string().ok().map(|icon| (NodeKind::new(k), icon)))
                .collect();
            settings.types = merge_types(&settings.types, &overlay);
        }

        Ok(settings)
    }

    /// Built-in locales plus those found in `locale_dir`, with the configured default.
    pub fn catalog(&self) -> Result<Catalog, ApplicationError> {
        let mut catalog = Catalog::builtin()?.with_default(self.default_locale.clone());
        if let Some(dir) = &self.locale_dir {
            let loaded = catalog.load_dir(dir)?;
            debug!("catalog: {loaded} locale files from {}", dir.display());
        }
        Ok(catalog)
    }

    /// The configured locale, resolved with fallback.
    pub fn resolve_locale(&self) -> Result<Locale, ApplicationError> {
        Ok(self.catalog()?.resolve(&self.locale))
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r##"# treetable configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/treetable/treetable.toml  (defines your baseline)
#   Local:  <project>/.treetable.toml           (project-specific additions)
#   Env:    TREETABLE_* environment variables   (explicit overrides)
#
# Kind map semantics:
#   A global [types] table REPLACES the compiled defaults.
#   A local [types] table merges key-wise with the global one.
#   Use a "!kind" key in local config to REMOVE an inherited kind:
#     "!default" = ""

# Locale for labels and messages (en, de, fr, es, it, nl, pt-BR, ru, pl, bg)
# locale = "en"

# Locale consulted for keys missing from the one above
# default_locale = "en"

# Allow creating and moving nodes at the root level
# allow_root = true

# Sibling order: "name-ci" (case-insensitive), "name", "none" (arrival order)
# sort = "name-ci"

# Id the remote source uses for the root context
# root_id = "#"

# Directory with extra <code>.toml locale files
# locale_dir = "locales"

# Remote endpoints
# source_url = "https://example.org/tree/children"
# crud_url = "https://example.org/tree/crud"

[types]
# Allowed node kinds and their icons
# default = "📄"
# folder = "📁"
"##
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
