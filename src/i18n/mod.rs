//! Localization catalog for user-facing strings.

pub mod catalog;
pub mod locale;

pub use catalog::{Catalog, CatalogError, FALLBACK_LOCALE};
pub use locale::{ActionLabels, Locale, Messages, RawActions, RawLocale, RawMessages};
