use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::repository::{RepositoryError, TargetRepository};

/// Which store to open and how to reach it.
///
/// `connection_string` is handed to the factory for `backend` as is.
/// For `sqlite` it is a file path, a `sqlite:` URL or `:memory:`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }
}

/// Opens repositories for one backend.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Connect and return a repository ready for use, including any
    /// schema setup the backend needs.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn TargetRepository>, RepositoryError>;
}

/// Backend factories by name. The application registers every backend it
/// links at start-up, then opens whichever one the settings ask for.
#[derive(Default)]
pub struct RepositoryRegistry {
    factories: BTreeMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later registrations win over earlier ones with the same name.
    pub fn register(
        &mut self,
        factory: Box<dyn RepositoryFactory>,
    ) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Registered backend names in sorted order.
    pub fn available_backends(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Open a repository with the factory named by `config.backend`.
    ///
    /// # Errors
    /// [`RepositoryError::Configuration`] for an unregistered backend;
    /// otherwise whatever the factory returns.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn TargetRepository>, RepositoryError> {
        let Some(factory) = self.factories.get(config.backend.as_str()) else {
            return Err(RepositoryError::Configuration(format!(
                "no '{}' backend (registered: {})",
                config.backend,
                self.available_backends().join(", ")
            )));
        };
        factory.create(config).await
    }
}
