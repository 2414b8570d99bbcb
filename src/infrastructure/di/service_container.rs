//! Service container for dependency injection
//!
//! Wires settings, locale catalog, remote source and confirmation surface
//! into tree-table instances.

use std::sync::Arc;

use crate::application::{ApplicationResult, TreeConfig, TreeTable};
use crate::config::Settings;
use crate::i18n::{Catalog, Locale};
use crate::infrastructure::traits::{Confirmation, LogObserver, RemoteSource};

/// Container holding everything a tree-table needs.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Built-in plus configured locales
    pub catalog: Catalog,

    /// Remote data source shared by all tables
    pub source: Arc<dyn RemoteSource>,

    /// Delete confirmation surface
    pub confirmation: Arc<dyn Confirmation>,
}

impl ServiceContainer {
    pub fn new(
        settings: Settings,
        source: Arc<dyn RemoteSource>,
        confirmation: Arc<dyn Confirmation>,
    ) -> ApplicationResult<Self> {
        let catalog = settings.catalog()?;
        Ok(Self {
            settings: Arc::new(settings),
            catalog,
            source,
            confirmation,
        })
    }

    /// The configured locale, resolved with fallback.
    pub fn locale(&self) -> Locale {
        self.catalog.resolve(&self.settings.locale)
    }

    /// A fresh tree-table wired to the shared source, logging its events.
    pub fn table(&self) -> TreeTable {
        let config = TreeConfig::from_settings(&self.settings, self.source.clone());
        let table = TreeTable::new(config, self.confirmation.clone()).with_locale(self.locale());
        table.subscribe(Arc::new(LogObserver));
        table
    }
}
