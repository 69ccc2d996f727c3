use crate::host::HostError;
use crate::install::error::InstallError;
use crate::met::error::MetFileError;
use crate::process::error::CommandError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("Invalid acquisition request: {0}")]
    InvalidRequest(String),

    #[error("Failed to determine bestiapop install directory")]
    InstallDirResolution(#[source] std::io::Error),

    #[error("Failed to install bestiapop to '{path}'")]
    Installation {
        path: PathBuf,
        #[source]
        source: InstallError,
    },

    #[error("Failed to create output directory '{0}'")]
    OutputDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to read output directory '{0}'")]
    OutputDirRead(PathBuf, #[source] std::io::Error),

    #[error("Encountered an error while running bestiapop")]
    Generator(#[source] CommandError),

    #[error("bestiapop produced no .{extension} file in '{dir}'")]
    OutputNotFound {
        dir: PathBuf,
        extension: &'static str,
    },

    #[error(transparent)]
    WeatherFile(#[from] MetFileError),

    #[error("Unable to add the weather series to the simulation")]
    Adaptation(#[from] HostError),

    #[error("An acquisition is already in progress")]
    Busy,
}

impl AcquisitionError {
    /// Text printed by the failing external program, when there is any.
    pub fn process_output(&self) -> Option<&str> {
        match self {
            AcquisitionError::Generator(e) => e.output(),
            AcquisitionError::Installation {
                source: InstallError::Clone(e) | InstallError::Dependencies(e),
                ..
            } => e.output(),
            _ => None,
        }
    }
}
