//! On-demand installation of BestiaPop.
//!
//! Installing means cloning the repository into the configured install directory and then
//! installing its Python requirements with `pip`. The install directory doubles as the
//! "installed" marker, so a half-finished install is removed again on failure.

use crate::config::GeneratorConfig;
use crate::error::AcquisitionError;
use crate::install::error::InstallError;
use crate::process::command::ToolCommand;
use crate::utils::dir_exists;
use log::{debug, info, warn};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Outcome of [`Installer::ensure_installed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallationState {
    /// The install directory already existed; nothing was run.
    AlreadyPresent,
    /// The tool was cloned and its dependencies installed by this call.
    Installed,
}

/// Installs BestiaPop into [`GeneratorConfig::install_dir`].
///
/// Assumes `git` and `pip` (or whatever the config names) are runnable.
pub struct Installer<'a> {
    config: &'a GeneratorConfig,
}

impl<'a> Installer<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn install_dir(&self) -> &Path {
        &self.config.install_dir
    }

    pub async fn is_installed(&self) -> bool {
        dir_exists(self.install_dir()).await
    }

    /// Makes sure the tool is present, installing it if the install directory is missing.
    ///
    /// Calling this when the directory exists is a no-op. On failure the partially
    /// created install directory is deleted; a failure to delete it is logged and
    /// does not replace the original error.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError::Installation`] wrapping the [`InstallError`] of the
    /// stage that failed.
    pub async fn ensure_installed(
        &self,
        cancel: &CancellationToken,
    ) -> Result<InstallationState, AcquisitionError> {
        if self.is_installed().await {
            return Ok(InstallationState::AlreadyPresent);
        }

        info!("Installing bestiapop to {}", self.install_dir().display());
        match self.install(cancel).await {
            Ok(()) => {
                info!("Installed bestiapop to {}", self.install_dir().display());
                Ok(InstallationState::Installed)
            }
            Err(source) => {
                self.remove_partial_install().await;
                Err(AcquisitionError::Installation {
                    path: self.install_dir().to_path_buf(),
                    source,
                })
            }
        }
    }

    async fn install(&self, cancel: &CancellationToken) -> Result<(), InstallError> {
        let install_dir = self.install_dir();
        let parent = install_dir
            .parent()
            .ok_or_else(|| InstallError::NoParentDir(install_dir.to_path_buf()))?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| InstallError::ParentDirCreation(parent.to_path_buf(), e))?;

        self.clone_repository(parent, cancel).await?;
        self.install_dependencies(cancel).await
    }

    async fn clone_repository(
        &self,
        parent: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), InstallError> {
        let output = ToolCommand::new(&self.config.git, parent)
            .arg("clone")
            .arg(&self.config.repository_url)
            .arg(self.install_dir())
            .run(cancel, self.config.install_timeout)
            .await
            .map_err(InstallError::Clone)?;
        debug!("git clone output:\n{}", output.output);
        Ok(())
    }

    async fn install_dependencies(&self, cancel: &CancellationToken) -> Result<(), InstallError> {
        let output = ToolCommand::new(&self.config.pip, self.install_dir())
            .args(["install", "-r"])
            .arg(&self.config.requirements_file)
            .run(cancel, self.config.install_timeout)
            .await
            .map_err(InstallError::Dependencies)?;
        debug!("pip install output:\n{}", output.output);
        Ok(())
    }

    async fn remove_partial_install(&self) {
        let install_dir = self.install_dir();
        if !dir_exists(install_dir).await {
            return;
        }
        if let Err(e) = tokio::fs::remove_dir_all(install_dir).await {
            warn!(
                "Failed to remove partial bestiapop install at {}: {}",
                install_dir.display(),
                e
            );
        }
    }
}
