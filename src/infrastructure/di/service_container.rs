//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::ExportService;
use crate::config::Settings;
use crate::infrastructure::gpkg::GpkgDriver;
use crate::infrastructure::traits::{
    ContainerDriver, FileSystem, Prompter, RealFileSystem, StdinPrompter,
};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Container format driver
    pub driver: Arc<dyn ContainerDriver>,

    /// User prompts
    pub prompter: Arc<dyn Prompter>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(GpkgDriver::new()),
            Arc::new(StdinPrompter),
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        driver: Arc<dyn ContainerDriver>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            driver,
            prompter,
        }
    }

    /// Export service configured from the settings.
    pub fn export_service(&self) -> ExportService {
        let service = ExportService::new(
            Arc::clone(&self.fs),
            Arc::clone(&self.driver),
            Arc::clone(&self.prompter),
        )
        .with_group_separator(self.settings.naming.group_separator.clone());

        match &self.settings.scratch_dir {
            Some(dir) => service.with_scratch_parent(dir.clone()),
            None => service,
        }
    }
}
