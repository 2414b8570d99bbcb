//! Locale code to display strings, with fallback.
//!
//! Lookup for a code walks, lowest to highest precedence:
//! 1. built-in `en`
//! 2. the catalog's default locale
//! 3. the primary language subtag (`pt` for `pt-BR`)
//! 4. the exact code
//!
//! Codes compare case-insensitively.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument};

use crate::i18n::locale::{Locale, RawLocale};

pub const FALLBACK_LOCALE: &str = "en";

const BUILTIN: [(&str, &str); 10] = [
    ("en", include_str!("../../locales/en.toml")),
    ("de", include_str!("../../locales/de.toml")),
    ("fr", include_str!("../../locales/fr.toml")),
    ("es", include_str!("../../locales/es.toml")),
    ("it", include_str!("../../locales/it.toml")),
    ("nl", include_str!("../../locales/nl.toml")),
    ("pt-BR", include_str!("../../locales/pt-BR.toml")),
    ("ru", include_str!("../../locales/ru.toml")),
    ("pl", include_str!("../../locales/pl.toml")),
    ("bg", include_str!("../../locales/bg.toml")),
];

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("parse locale {code}: {source}")]
    Parse {
        code: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("read locale file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("locale {code} is missing keys: {}", missing.join(", "))]
    Incomplete { code: String, missing: Vec<String> },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CatalogError {
    let path = path.to_path_buf();
    move |source| CatalogError::Io { path, source }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    locales: BTreeMap<String, RawLocale>,
    default: String,
}

impl Catalog {
    /// An empty catalog. Every resolved key falls back to its own name.
    pub fn empty() -> Self {
        Self {
            locales: BTreeMap::new(),
            default: FALLBACK_LOCALE.to_string(),
        }
    }

    /// Catalog with all compiled-in locales, `en` as default.
    pub fn builtin() -> Result<Self, CatalogError> {
        let mut catalog = Self::empty();
        for (code, content) in BUILTIN {
            catalog.insert(code, Self::parse(code, content)?);
        }
        catalog.validate(FALLBACK_LOCALE)?;
        Ok(catalog)
    }

    pub fn with_default(mut self, code: impl Into<String>) -> Self {
        self.default = code.into();
        self
    }

    pub fn default_code(&self) -> &str {
        &self.default
    }

    pub fn parse(code: &str, content: &str) -> Result<RawLocale, CatalogError> {
        toml::from_str(content).map_err(|source| CatalogError::Parse {
            code: code.to_string(),
            source,
        })
    }

    /// Add or replace a locale.
    pub fn insert(&mut self, code: &str, raw: RawLocale) {
        let key = self.key_of(code).unwrap_or_else(|| code.to_string());
        self.locales.insert(key, raw);
    }

    /// Merge every `<code>.toml` in `dir` over the locales already present.
    #[instrument(level = "debug", skip(self))]
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, CatalogError> {
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir).map_err(io_err(dir))? {
            let path = entry.map_err(io_err(dir))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            let Some(code) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = std::fs::read_to_string(&path).map_err(io_err(&path))?;
            let raw = Self::parse(code, &content)?;
            let merged = match self.get_raw(code) {
                Some(existing) => existing.merge(&raw),
                None => raw,
            };
            debug!("load_dir: {code} from {}", path.display());
            self.insert(code, merged);
            loaded += 1;
        }
        Ok(loaded)
    }

    fn key_of(&self, code: &str) -> Option<String> {
        self.locales
            .keys()
            .find(|k| k.eq_ignore_ascii_case(code))
            .cloned()
    }

    pub fn get_raw(&self, code: &str) -> Option<&RawLocale> {
        self.key_of(code).and_then(|k| self.locales.get(&k))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.key_of(code).is_some()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.locales.keys().map(String::as_str).collect()
    }

    /// Keys missing from `code` itself, without fallback. `None` if unknown.
    pub fn missing_keys(&self, code: &str) -> Option<Vec<&'static str>> {
        self.get_raw(code).map(RawLocale::missing_keys)
    }

    pub fn validate(&self, code: &str) -> Result<(), CatalogError> {
        let missing = self
            .missing_keys(code)
            .unwrap_or_else(|| RawLocale::default().missing_keys());
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Incomplete {
                code: code.to_string(),
                missing: missing.into_iter().map(String::from).collect(),
            })
        }
    }

    /// Codes consulted for `code`, lowest precedence first.
    fn chain(&self, code: &str) -> Vec<String> {
        let mut chain = vec![FALLBACK_LOCALE.to_string(), self.default.clone()];
        if let Some((primary, _)) = code.split_once(['-', '_']) {
            chain.push(primary.to_string());
        }
        chain.push(code.to_string());
        chain.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
        chain
    }

    /// Resolve `code` into a complete locale. Never fails.
    pub fn resolve(&self, code: &str) -> Locale {
        let raw = self
            .chain(code)
            .iter()
            .filter_map(|c| self.get_raw(c))
            .fold(RawLocale::default(), |acc, layer| acc.merge(layer));
        Locale::from_raw(code, &raw)
    }
}
