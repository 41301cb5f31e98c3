//! Configuration store port (trait).
//! Defines the interface for persisting the repository/platform configuration.

use crate::domain::AppConfig;
use crate::error::Result;

/// Port for loading and saving the configuration document.
/// Every save rewrites the whole document.
pub trait ConfigStore: Send + Sync {
    /// Load the configuration, falling back to built-in defaults when the
    /// stored document is missing or unreadable.
    fn load(&self) -> AppConfig;

    /// Persist the full configuration.
    fn save(&self, config: &AppConfig) -> Result<()>;
}
