//! Configuration for locating, installing and running the BestiaPop tool.

use crate::error::AcquisitionError;
use crate::utils::default_install_dir;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Public repository BestiaPop is cloned from.
pub const REPOSITORY_URL: &str = "https://github.com/JJguri/bestiapop";

/// Entry point of the tool, relative to the install directory.
pub const ENTRY_SCRIPT: &str = "bestiapop/bestiapop.py";

/// Dependency manifest, relative to the install directory.
pub const REQUIREMENTS_FILE: &str = "requirements.txt";

/// Where BestiaPop lives and how to run it.
///
/// Every external program is named here rather than hard-coded, so the same orchestrator
/// can run against a system Python, a virtual environment, or a stand-in during testing.
///
/// # Examples
///
/// ```
/// use bestiapop::GeneratorConfig;
/// use std::time::Duration;
///
/// let config = GeneratorConfig::builder()
///     .install_dir("/opt/bestiapop")
///     .python("/opt/venv/bin/python")
///     .generator_timeout(Duration::from_secs(600))
///     .build();
///
/// assert_eq!(config.git.to_str(), Some("git"));
/// assert_eq!(
///     config.entry_script_path(),
///     std::path::Path::new("/opt/bestiapop/bestiapop/bestiapop.py")
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct GeneratorConfig {
    /// Directory the tool is cloned into. Its existence means "installed".
    #[builder(into)]
    pub install_dir: PathBuf,

    #[builder(into, default = REPOSITORY_URL.to_string())]
    pub repository_url: String,

    #[builder(into, default = PathBuf::from("python"))]
    pub python: PathBuf,

    #[builder(into, default = PathBuf::from("git"))]
    pub git: PathBuf,

    #[builder(into, default = PathBuf::from("pip"))]
    pub pip: PathBuf,

    #[builder(into, default = PathBuf::from(ENTRY_SCRIPT))]
    pub entry_script: PathBuf,

    #[builder(into, default = PathBuf::from(REQUIREMENTS_FILE))]
    pub requirements_file: PathBuf,

    /// Parent of generated output directories when a request names none.
    #[builder(into, default = std::env::temp_dir())]
    pub temp_root: PathBuf,

    /// Upper bound for each of `git clone` and `pip install`.
    pub install_timeout: Option<Duration>,

    /// Upper bound for the generator run.
    pub generator_timeout: Option<Duration>,
}

impl GeneratorConfig {
    /// Configuration with the default APSIM install location and programs taken from `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError::InstallDirResolution`] if the platform has no
    /// application data directory.
    pub fn new() -> Result<Self, AcquisitionError> {
        let install_dir = default_install_dir().map_err(AcquisitionError::InstallDirResolution)?;
        Ok(Self::builder().install_dir(install_dir).build())
    }

    pub fn entry_script_path(&self) -> PathBuf {
        self.install_dir.join(&self.entry_script)
    }
}
